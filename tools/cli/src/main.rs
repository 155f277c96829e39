//! Sluice CLI - Upload selected files and directories to an object store.
//!
//! Only files that are missing remotely or whose size changed are written.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sluice_storage::create_default_registry;
use sluice_sync::{KeyDeriver, SyncEngine, SyncResult, UploadOutcome};

use crate::config::{AppConfig, Overrides};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Sluice - Selective upload of local files to object storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload new and changed files.
    Sync {
        /// Configuration file (default: <config dir>/sluice/config.json).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Storage provider: "s3", "local" or "memory".
        #[arg(long)]
        provider: Option<String>,

        /// Bucket name.
        #[arg(short, long)]
        bucket: Option<String>,

        /// Root directory for the local provider.
        #[arg(long)]
        root: Option<PathBuf>,

        /// File to upload. Repeatable.
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Directory tree to upload. Repeatable.
        #[arg(short, long = "dir")]
        dirs: Vec<PathBuf>,

        /// Prefix stripped from local paths to form keys. Repeatable, first match wins.
        #[arg(short, long = "omit-prefix")]
        omit_prefixes: Vec<String>,

        /// Concurrent uploads per directory.
        #[arg(short, long, allow_negative_numbers = true)]
        parallelism: Option<i64>,

        /// Storage class for written objects.
        #[arg(short, long)]
        storage_class: Option<String>,

        /// Leave dot files and dot directories out of directory targets.
        #[arg(long)]
        skip_hidden: bool,

        /// Decide what would be uploaded without writing.
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Validate the configuration without touching the store.
    Check {
        /// Configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the object key each path maps to.
    Key {
        /// Local paths.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Prefix stripped from local paths. Repeatable, first match wins.
        #[arg(short, long = "omit-prefix")]
        omit_prefixes: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Sync {
            config,
            provider,
            bucket,
            root,
            files,
            dirs,
            omit_prefixes,
            parallelism,
            storage_class,
            skip_hidden,
            dry_run,
        } => {
            let overrides = Overrides {
                provider,
                bucket,
                root,
                files,
                directories: dirs,
                omit_prefixes,
                parallelism,
                storage_class,
                skip_hidden,
                dry_run,
            };
            cmd_sync(config, overrides).await
        }

        Commands::Check { config } => cmd_check(config),

        Commands::Key {
            paths,
            config,
            omit_prefixes,
        } => cmd_key(config, &paths, omit_prefixes),
    }
}

fn load(path: Option<PathBuf>, overrides: Overrides) -> Result<AppConfig> {
    AppConfig::load(path.as_deref())?.resolve(overrides)
}

/// Run one sync pass.
async fn cmd_sync(config_path: Option<PathBuf>, overrides: Overrides) -> Result<()> {
    let config = load(config_path, overrides)?;
    config
        .sync
        .validate()
        .context("Invalid sync configuration")?;

    let registry = create_default_registry();
    let store = registry
        .open(&config.store)
        .context("Failed to open object store")?;

    info!(
        "Syncing to {} bucket {}",
        config.store.provider,
        config.store.bucket_label()
    );

    let engine = SyncEngine::new(Arc::clone(&store), config.sync);
    let result = engine.run().await.context("Sync aborted")?;

    print_summary(&result);

    if result.failed() > 0 {
        anyhow::bail!("{} file(s) failed to upload", result.failed());
    }
    Ok(())
}

fn print_summary(result: &SyncResult) {
    for report in result.failures() {
        if let UploadOutcome::Failed(err) = &report.outcome {
            println!("  FAILED {}: {}", report.path.display(), err);
        }
    }

    println!("Sync finished in {:.2?}", result.duration);
    println!("  Uploaded: {}", result.uploaded());
    println!("  Skipped:  {}", result.skipped());
    println!("  Failed:   {}", result.failed());
}

/// Validate configuration only.
fn cmd_check(config_path: Option<PathBuf>) -> Result<()> {
    let config = load(config_path, Overrides::default())?;

    config
        .store
        .validate()
        .context("Invalid store configuration")?;
    config
        .sync
        .validate()
        .context("Invalid sync configuration")?;

    let registry = create_default_registry();
    if !registry.has_provider(&config.store.provider) {
        anyhow::bail!(
            "Unknown provider '{}'. Available: {}",
            config.store.provider,
            registry.providers().join(", ")
        );
    }

    println!("Configuration is valid.");
    println!("  Provider: {}", config.store.provider);
    println!("  Bucket: {}", config.store.bucket_label());
    println!("  Files: {}", config.sync.files.len());
    println!("  Directories: {}", config.sync.directories.len());
    println!("  Storage class: {}", config.sync.storage_class);

    Ok(())
}

/// Print derived keys.
fn cmd_key(config_path: Option<PathBuf>, paths: &[PathBuf], omit_prefixes: Vec<String>) -> Result<()> {
    let config = load(
        config_path,
        Overrides {
            omit_prefixes,
            ..Overrides::default()
        },
    )?;

    let keys = KeyDeriver::new(config.sync.omit_path_prefixes);
    for path in paths {
        println!("{} -> {}", path.display(), keys.derive(path));
    }

    Ok(())
}
