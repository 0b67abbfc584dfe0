//! nfsvold - NFS volume plugin daemon.
//!
//! Serves the Docker volume plugin protocol on a Unix socket. Every volume
//! is a directory on one NFS share, mounted when Docker activates the plugin
//! and unmounted when the daemon stops.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nfsvol::{DryRunMount, MountRoot, NamePolicy, ShareConfig};
use nfsvol_common::paths::{MOUNT_NAMESPACE, PLUGIN_SOCKET};
use tokio::net::UnixListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// NFS server host or address
    #[arg(long, env = "NFS_SERVER", default_value = "")]
    server: String,

    /// Export path on the NFS server
    #[arg(long, env = "NFS_PATH", default_value = "")]
    export: String,

    /// Options passed to `mount -o`
    #[arg(long, env = "NFS_MOUNT_OPTS", default_value = "")]
    mount_options: String,

    /// Unix socket to serve the plugin API on
    #[arg(long, default_value_os_t = PLUGIN_SOCKET.clone())]
    socket: PathBuf,

    /// Directory the share is mounted under
    #[arg(long, default_value_os_t = MOUNT_NAMESPACE.clone())]
    mount_namespace: PathBuf,

    /// Seconds to wait for mount and umount
    #[arg(long, default_value_t = 30)]
    mount_timeout: u64,

    /// Reject volume names containing '/', '..' or NUL
    #[arg(long, env = "NFSVOL_STRICT_NAMES")]
    strict_names: bool,

    /// Log mount commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Args {
    fn share_config(&self) -> ShareConfig {
        let policy = if self.strict_names {
            NamePolicy::Strict
        } else {
            NamePolicy::Verbatim
        };
        ShareConfig::new(self.server.clone(), &self.export)
            .with_mount_options(self.mount_options.clone())
            .with_namespace(self.mount_namespace.clone())
            .with_timeout(Duration::from_secs(self.mount_timeout))
            .with_name_policy(policy)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.share_config();
    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "Share not configured, activation will fail");
    }

    let root = if args.dry_run {
        tracing::warn!("Dry run: the share will not be mounted");
        Arc::new(MountRoot::with_facility(config, Arc::new(DryRunMount::new())))
    } else {
        Arc::new(MountRoot::new(config))
    };

    let app = api::server::app(api::server::AppState::new(root.clone()));
    let listener = bind_socket(&args.socket)?;

    tracing::info!(
        socket = %args.socket.display(),
        root = %root.root_path().display(),
        "Plugin nfs listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Plugin server failed");

    tracing::info!("Plugin nfs stopping, unmounting share");
    unmount_share(&root).await;

    if let Err(e) = std::fs::remove_file(&args.socket) {
        tracing::debug!(socket = %args.socket.display(), error = %e, "Socket already gone");
    }

    tracing::info!("Plugin nfs stopped");
    served
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Bind the plugin socket, replacing a stale one left by a previous run.
fn bind_socket(path: &Path) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove stale socket {}", path.display()))?;
    }

    UnixListener::bind(path).with_context(|| format!("Failed to bind {}", path.display()))
}

/// Unmount the share, waiting at most twice the mount timeout.
async fn unmount_share(root: &MountRoot) {
    if !root.is_mounted() {
        return;
    }

    let limit = root.config().timeout * 2;
    match tokio::time::timeout(limit, root.deactivate()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Unmount failed"),
        Err(_) => tracing::warn!(?limit, "Unmount did not finish in time"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
