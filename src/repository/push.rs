//! Package upload
//!
//! `POST {repository}/organisations/{org}/buckets/{bucket}/apps/{app}` with
//! a bearer token and the package bytes as the body. Anything other than
//! `200 OK` is an error carrying the status line and the response body.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tracing::{debug, info};

use super::error::RepositoryError;
use super::keys::KeyStore;

/// `ORG/BUCKET/APP` destination of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    pub org: String,
    pub bucket: String,
    pub app: String,
}

impl FromStr for AppTarget {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [org, bucket, app] if !org.is_empty() && !bucket.is_empty() && !app.is_empty() => {
                Ok(Self {
                    org: org.to_string(),
                    bucket: bucket.to_string(),
                    app: app.to_string(),
                })
            }
            _ => Err(RepositoryError::InvalidTarget(s.to_string())),
        }
    }
}

impl fmt::Display for AppTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.bucket, self.app)
    }
}

/// Build the upload endpoint for `target` on `repository`.
pub fn upload_url(repository: &str, target: &AppTarget) -> String {
    format!(
        "{}/organisations/{}/buckets/{}/apps/{}",
        repository.trim_end_matches('/'),
        target.org,
        target.bucket,
        target.app
    )
}

/// Map an HTTP reply to the upload outcome.
pub fn check_status(status: u16, reason: &str, body: String) -> Result<(), RepositoryError> {
    if status == 200 {
        return Ok(());
    }
    Err(RepositoryError::UploadFailed {
        status: format!("{} {}", status, reason).trim_end().to_string(),
        body,
    })
}

/// Sends a package body to a repository endpoint
pub trait Uploader: Send + Sync {
    fn post(
        &self,
        url: &str,
        token: &str,
        body: &mut dyn Read,
        length: u64,
    ) -> Result<(), RepositoryError>;
}

/// Blocking HTTP uploader
pub struct HttpUploader {
    agent: ureq::Agent,
}

impl HttpUploader {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Default for HttpUploader {
    fn default() -> Self {
        Self::new()
    }
}

fn reply_error(response: ureq::Response) -> RepositoryError {
    let status = response.status();
    let reason = response.status_text().to_string();
    match response.into_string() {
        Ok(body) => match check_status(status, &reason, body) {
            Err(e) => e,
            Ok(()) => RepositoryError::Transport(format!("unexpected reply {}", status)),
        },
        Err(e) => RepositoryError::Transport(format!(
            "{} {}: failed to read response body: {}",
            status, reason, e
        )),
    }
}

impl Uploader for HttpUploader {
    fn post(
        &self,
        url: &str,
        token: &str,
        body: &mut dyn Read,
        length: u64,
    ) -> Result<(), RepositoryError> {
        let result = self
            .agent
            .post(url)
            .set("Authorization", &format!("Bearer {}", token))
            .set("Content-Type", "application/octet-stream")
            .set("Content-Length", &length.to_string())
            .send(body);

        match result {
            Ok(response) if response.status() == 200 => Ok(()),
            Ok(response) | Err(ureq::Error::Status(_, response)) => Err(reply_error(response)),
            Err(ureq::Error::Transport(e)) => Err(RepositoryError::Transport(e.to_string())),
        }
    }
}

/// An upload captured by [`MemoryUploader`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub url: String,
    pub token: String,
    pub body: Vec<u8>,
}

/// In-process uploader that records requests and answers with a fixed
/// status, for tests
pub struct MemoryUploader {
    status: u16,
    reason: String,
    reply_body: String,
    uploads: Mutex<Vec<RecordedUpload>>,
}

impl MemoryUploader {
    /// Uploader that accepts everything
    pub fn accepting() -> Self {
        Self::replying(200, "OK", "")
    }

    /// Uploader that answers every request with `status`
    pub fn replying(status: u16, reason: &str, body: &str) -> Self {
        Self {
            status,
            reason: reason.to_string(),
            reply_body: body.to_string(),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        match self.uploads.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Uploader for MemoryUploader {
    fn post(
        &self,
        url: &str,
        token: &str,
        body: &mut dyn Read,
        _length: u64,
    ) -> Result<(), RepositoryError> {
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;

        let upload = RecordedUpload {
            url: url.to_string(),
            token: token.to_string(),
            body: bytes,
        };
        match self.uploads.lock() {
            Ok(mut guard) => guard.push(upload),
            Err(poisoned) => poisoned.into_inner().push(upload),
        }

        check_status(self.status, &self.reason, self.reply_body.clone())
    }
}

/// Options for [`push`]
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Repository base URL
    pub repository: String,
    /// Destination app
    pub target: AppTarget,
    /// Package file to upload
    pub source: PathBuf,
    /// Key name; the default key is used when absent
    pub key: Option<String>,
}

/// Result of a successful push
#[derive(Debug, Clone, PartialEq)]
pub struct PushReceipt {
    pub url: String,
    pub bytes: u64,
}

/// Authenticate and upload a package.
///
/// The key is resolved before the source is opened, so a missing key is
/// reported without touching the package.
pub fn push(
    store: &KeyStore,
    uploader: &dyn Uploader,
    options: &PushOptions,
) -> Result<PushReceipt, RepositoryError> {
    let token = store.resolve(options.key.as_deref())?;
    debug!(key = options.key.as_deref().unwrap_or("default"), "resolved repository key");

    let source = &options.source;
    let metadata = match source.metadata() {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(RepositoryError::SourceMissing(source.clone())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RepositoryError::SourceMissing(source.clone()))
        }
        Err(e) => return Err(RepositoryError::io(source, e)),
    };

    let mut file = File::open(source).map_err(|e| RepositoryError::io(source, e))?;
    let url = upload_url(&options.repository, &options.target);

    info!(url = %url, bytes = metadata.len(), "uploading package");
    uploader.post(&url, &token, &mut file, metadata.len())?;
    info!(target = %options.target, "package uploaded");

    Ok(PushReceipt {
        url,
        bytes: metadata.len(),
    })
}
