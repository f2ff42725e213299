//! Repository key storage
//!
//! Each key is a flat file named after the key under a per-user directory
//! (`~/.appliancectl/repository-keys`). A file called `default` holds a
//! copy of the key used when no key name is given.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use tracing::{debug, info};

use super::error::RepositoryError;

/// File name of the default key copy
pub const DEFAULT_KEY: &str = "default";

/// Directory under the home directory holding the keys
const KEYS_SUBDIR: &str = ".appliancectl/repository-keys";

/// Options for [`KeyStore::create`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateKeyOptions {
    /// Also store the token as the default key
    pub make_default: bool,
    /// Overwrite an existing key of the same name
    pub force: bool,
}

/// Named authentication tokens on disk
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    /// Key store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Key store at the default per-user location
    pub fn open_default() -> Result<Self, RepositoryError> {
        Ok(Self::new(Self::default_location()?))
    }

    /// Get the default key directory
    pub fn default_location() -> Result<PathBuf, RepositoryError> {
        let dirs = BaseDirs::new().ok_or(RepositoryError::NoHomeDirectory)?;
        Ok(dirs.home_dir().join(KEYS_SUBDIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Store `token` under `name`.
    pub fn create(
        &self,
        name: &str,
        token: &str,
        options: &CreateKeyOptions,
    ) -> Result<(), RepositoryError> {
        validate_name(name)?;

        fs::create_dir_all(&self.dir).map_err(|e| RepositoryError::io(&self.dir, e))?;

        let path = self.key_path(name);
        if !options.force && path.exists() {
            return Err(RepositoryError::KeyFileExists(name.to_string()));
        }

        write_secret(&path, token)?;
        info!(key = name, "stored repository key");

        if options.make_default {
            write_secret(&self.key_path(DEFAULT_KEY), token)?;
            info!(key = name, "set default repository key");
        }

        Ok(())
    }

    /// Names of all stored keys, excluding the default copy, sorted.
    pub fn list(&self) -> Result<Vec<String>, RepositoryError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepositoryError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RepositoryError::io(&self.dir, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| RepositoryError::io(entry.path(), e))?
                .is_file();
            let name = entry.file_name().to_string_lossy().to_string();
            if is_file && name != DEFAULT_KEY {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a key. The default copy is removed too when it holds the
    /// same bytes. Returns whether the default was removed.
    pub fn delete(&self, name: &str) -> Result<bool, RepositoryError> {
        validate_name(name)?;

        let path = self.key_path(name);
        let key = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RepositoryError::KeyNotFound(name.to_string()))
            }
            Err(e) => return Err(RepositoryError::io(&path, e)),
        };

        let default_path = self.key_path(DEFAULT_KEY);
        let default = match fs::read(&default_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(RepositoryError::io(&default_path, e)),
        };

        let default_removed = default.as_deref() == Some(key.as_slice());
        if default_removed {
            fs::remove_file(&default_path).map_err(|e| RepositoryError::io(&default_path, e))?;
            debug!(key = name, "removed matching default key");
        }

        fs::remove_file(&path).map_err(|e| RepositoryError::io(&path, e))?;
        info!(key = name, "deleted repository key");
        Ok(default_removed)
    }

    /// Token stored under `name`.
    pub fn token(&self, name: &str) -> Result<String, RepositoryError> {
        validate_name(name)?;
        read_token(&self.key_path(name))?.ok_or_else(|| RepositoryError::KeyNotFound(name.to_string()))
    }

    /// Token for `key`, or the default token when no key is named.
    pub fn resolve(&self, key: Option<&str>) -> Result<String, RepositoryError> {
        match key {
            Some(name) => self.token(name),
            None => read_token(&self.key_path(DEFAULT_KEY))?.ok_or(RepositoryError::NoDefaultKey),
        }
    }
}

fn validate_name(name: &str) -> Result<(), RepositoryError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name == DEFAULT_KEY
        || name.contains(['/', '\\']);
    if invalid {
        return Err(RepositoryError::InvalidKeyName(name.to_string()));
    }
    Ok(())
}

fn read_token(path: &Path) -> Result<Option<String>, RepositoryError> {
    match fs::read_to_string(path) {
        // Hand-edited key files usually end in a newline, which would
        // otherwise be sent inside the Authorization header.
        Ok(token) => Ok(Some(token.trim_end().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RepositoryError::io(path, e)),
    }
}

fn write_secret(path: &Path, token: &str) -> Result<(), RepositoryError> {
    fs::write(path, token).map_err(|e| RepositoryError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| RepositoryError::io(path, e))?;
    }

    Ok(())
}
