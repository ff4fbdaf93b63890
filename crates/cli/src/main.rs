//! minfs - mount an S3-compatible object store as a local directory.
//!
//! ```text
//! minfs [-o option=value,...] <mountpoint> <target-url>
//! ```
//!
//! The target URL has the form `<scheme>://<host>[:port]/<bucket>[/<basePath>]`.
//! Credentials come from `MINIO_ACCESS_KEY` / `MINIO_SECRET_KEY` /
//! `MINFS_SECRET_TOKEN`, falling back to the SDK's default provider chain.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use minfs_cache::CacheStore;
use minfs_storage::{
    ClientFactory, ClientPool, ObjectClient, StorageError, StorageSettings,
};
use minfs_storage_s3::S3ObjectClient;
use minfs_vfs::{MinFs, MountContext, MountOptions};

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "minfs")]
#[command(about = "Mount an S3-compatible object store as a local directory")]
struct Cli {
    /// Mount options: cache=<path>, quota=<gb>, uid=<n>, gid=<n>,
    /// mode=<octal>, insecure, debug.
    #[arg(short = 'o', value_delimiter = ',')]
    options: Vec<String>,

    /// Directory to mount on.
    mountpoint: PathBuf,

    /// Target URL: <scheme>://<host>[:port]/<bucket>[/<basePath>]
    target: String,
}

/// Builds one shared S3 client per uid. Per-uid credential mapping is not
/// configured here, so every uid gets a client with the same settings.
struct S3Factory {
    settings: StorageSettings,
}

#[async_trait]
impl ClientFactory for S3Factory {
    async fn build(&self, uid: u32) -> Result<Arc<dyn ObjectClient>, StorageError> {
        tracing::debug!(uid, "constructing object client");
        let client: S3ObjectClient = S3ObjectClient::new(self.settings.clone()).await?;
        Ok(Arc::new(client))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config: Config = match Config::from_args(cli.mountpoint, &cli.target, &cli.options) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("minfs: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let default_level: &str = if config.debug { "debug" } else { "info" };
    let filter: EnvFilter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "mount failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    let fs: MinFs = runtime.block_on(async {
        let settings: StorageSettings =
            StorageSettings::new(config.endpoint.clone()).with_insecure(config.insecure);
        let pool = ClientPool::new(Arc::new(S3Factory { settings }));

        let cache_dir: PathBuf = match config.cache_dir.clone() {
            Some(dir) => dir,
            None => {
                // No persistent cache configured; fall back to a
                // per-invocation directory under the system temp root.
                let dir: PathBuf = std::env::temp_dir().join(format!("minfs-{}", std::process::id()));
                tracing::warn!(dir = %dir.display(), "no cache directory configured; using temp dir");
                dir
            }
        };
        let store: CacheStore = CacheStore::new(cache_dir)?;

        let options = MountOptions::default()
            .with_bucket(config.bucket.clone())
            .with_base_path(config.base_path.clone())
            .with_owner(config.uid, config.gid)
            .with_file_mode(config.mode)
            .with_quota_gb(config.quota_gb);

        let ctx = Arc::new(MountContext::new(pool, store));
        anyhow::Ok(MinFs::new(ctx, options)?)
    })?;

    tracing::info!(
        mountpoint = %config.mountpoint.display(),
        endpoint = %config.endpoint,
        bucket = config.bucket.as_deref().unwrap_or("<all>"),
        "mounting"
    );

    // Blocks until the kernel unmounts us; the evictor task dies with the
    // process.
    minfs_vfs::mount(fs, &config.mountpoint)?;

    tracing::info!("unmounted cleanly");
    Ok(())
}
