//! appliancectl CLI
//!
//! Entry point for the `appliancectl` command-line tool.

use std::path::{Path, PathBuf};
use std::process;

use appliancectl::{
    push, AppTarget, ConfigDocument, CreateKeyOptions, HttpUploader, KeyStore, LayeredConfig,
    PushOptions,
};
use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "appliancectl")]
#[command(about = "Appliance configuration and repository tool", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding repository keys (default: ~/.appliancectl/repository-keys)
    #[arg(long, global = true)]
    keys_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interact with package repositories
    Repositories {
        #[command(subcommand)]
        action: RepositoriesCommands,
    },

    /// Work with configuration documents
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum RepositoriesCommands {
    /// Create, list and delete repository authentication keys
    Keys {
        #[command(subcommand)]
        action: KeysCommands,
    },

    /// Push a package to a repository
    Push {
        /// Repository base URL
        repository: String,

        /// Destination as ORG/BUCKET/APP
        target: String,

        /// Package file to upload
        source: PathBuf,

        /// Key name (default key when omitted)
        #[arg(long, short = 'k')]
        key: Option<String>,
    },
}

#[derive(Subcommand)]
enum KeysCommands {
    /// Save a token under a name
    Create {
        name: String,
        token: String,

        /// Also use this key as the default
        #[arg(long)]
        default: bool,

        /// Overwrite an existing key
        #[arg(long)]
        force: bool,
    },

    /// List stored keys
    List,

    /// Delete a stored key
    Delete { name: String },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Merge configuration files left to right
    Merge {
        /// Files to merge; later files override earlier ones
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Start from the built-in defaults
        #[arg(long)]
        defaults: bool,

        /// Print the merged result with provenance as JSON
        #[arg(long)]
        json: bool,

        /// Write the merged document here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Load, resolve and print a single document
    Check {
        file: PathBuf,

        /// Print the resolved document as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn open_store(keys_dir: Option<PathBuf>) -> KeyStore {
    match keys_dir {
        Some(dir) => KeyStore::new(dir),
        None => KeyStore::open_default().unwrap_or_else(|e| fail(e)),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Repositories { action } => match action {
            RepositoriesCommands::Keys { action } => {
                let store = open_store(cli.keys_dir);
                match action {
                    KeysCommands::Create {
                        name,
                        token,
                        default,
                        force,
                    } => {
                        let options = CreateKeyOptions {
                            make_default: default,
                            force,
                        };
                        run_keys_create(&store, &name, &token, &options);
                    }
                    KeysCommands::List => run_keys_list(&store),
                    KeysCommands::Delete { name } => run_keys_delete(&store, &name),
                }
            }
            RepositoriesCommands::Push {
                repository,
                target,
                source,
                key,
            } => {
                let store = open_store(cli.keys_dir);
                let target: AppTarget = target.parse().unwrap_or_else(|e| fail(e));
                let options = PushOptions {
                    repository,
                    target,
                    source,
                    key,
                };
                run_push(&store, &options);
            }
        },
        Commands::Config { action } => match action {
            ConfigCommands::Merge {
                files,
                defaults,
                json,
                output,
            } => run_config_merge(&files, defaults, json, output),
            ConfigCommands::Check { file, json } => run_config_check(&file, json),
        },
    }
}

fn run_keys_create(store: &KeyStore, name: &str, token: &str, options: &CreateKeyOptions) {
    if let Err(e) = store.create(name, token, options) {
        fail(e);
    }
    println!("Saved key '{}'", name);
    if options.make_default {
        println!("Key '{}' is now the default", name);
    }
}

fn run_keys_list(store: &KeyStore) {
    let names = store.list().unwrap_or_else(|e| fail(e));
    if names.is_empty() {
        println!("no keys found");
        return;
    }
    for name in names {
        println!("{}", name);
    }
}

fn run_keys_delete(store: &KeyStore, name: &str) {
    match store.delete(name) {
        Ok(true) => println!("Deleted key '{}' (and the default key)", name),
        Ok(false) => println!("Deleted key '{}'", name),
        Err(e) => fail(e),
    }
}

fn run_push(store: &KeyStore, options: &PushOptions) {
    let uploader = HttpUploader::new();
    match push(store, &uploader, options) {
        Ok(receipt) => println!("Pushed {} bytes to {}", receipt.bytes, receipt.url),
        Err(e) => fail(e),
    }
}

fn run_config_merge(files: &[PathBuf], defaults: bool, json: bool, output: Option<PathBuf>) {
    let layered = LayeredConfig::build(files, defaults).unwrap_or_else(|e| fail(e));

    match output {
        Some(path) => {
            if json {
                layered.write_to_file(&path).unwrap_or_else(|e| fail(e));
            } else {
                layered.document.write_toml(&path).unwrap_or_else(|e| fail(e));
            }
            eprintln!("Wrote merged configuration to {}", path.display());
        }
        None => {
            let rendered = if json {
                layered.to_json().unwrap_or_else(|e| fail(e))
            } else {
                layered.document.to_toml().unwrap_or_else(|e| fail(e))
            };
            print!("{}", rendered);
        }
    }
}

fn run_config_check(file: &Path, json: bool) {
    let doc = ConfigDocument::load_file(file).unwrap_or_else(|e| fail(e));
    let digest = doc.content_digest().unwrap_or_else(|e| fail(e));
    let text = if json {
        doc.to_json().unwrap_or_else(|e| fail(e))
    } else {
        doc.to_toml().unwrap_or_else(|e| fail(e))
    };

    eprintln!("Configuration valid: {}", file.display());
    eprintln!("  Programs: {}", doc.programs.len());
    eprintln!("  Interfaces: {}", doc.networks.len());
    eprintln!("  Digest: {}", digest);
    print!("{}", text);
}
