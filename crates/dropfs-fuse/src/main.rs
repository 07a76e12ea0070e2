//! dropmount - Mount a dropfs snapshot as a read-only FUSE filesystem.
//!
//! Usage: dropmount [--snapshot data.msgpack] <mountpoint>

use anyhow::{Context, Result};
use clap::Parser;
use dropfs_core::DEFAULT_SNAPSHOT_FILE;
use dropfs_fuse::{mount, MountConfig};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dropmount")]
#[command(about = "Mount a directory snapshot as a read-only FUSE filesystem")]
#[command(version)]
struct Cli {
    /// Mountpoint for the filesystem
    mount: PathBuf,

    /// Snapshot file to serve
    #[arg(short, long, default_value = DEFAULT_SNAPSHOT_FILE)]
    snapshot: PathBuf,

    /// Filesystem name shown as the mount source
    #[arg(short, long, default_value = dropfs_fuse::config::DEFAULT_FS_NAME)]
    name: String,

    /// Owner of every entry (default: current user)
    #[arg(long)]
    uid: Option<u32>,

    /// Group of every entry (default: current group)
    #[arg(long)]
    gid: Option<u32>,

    /// Kernel attribute cache TTL in seconds
    #[arg(long, default_value_t = dropfs_fuse::config::DEFAULT_TTL.as_secs())]
    ttl: u64,

    /// Refuse to mount over a non-empty directory
    #[arg(long)]
    no_nonempty: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    if !cli.mount.exists() {
        anyhow::bail!("Mountpoint does not exist: {}", cli.mount.display());
    }

    let root = dropfs_core::load(&cli.snapshot).context("Failed to load snapshot")?;

    let config = MountConfig::default()
        .fs_name(cli.name.clone())
        .attr_ttl(Duration::from_secs(cli.ttl))
        .allow_nonempty(!cli.no_nonempty)
        .ownership(cli.uid, cli.gid);

    mount_and_wait(&cli, root, &config)
}

/// Mount the filesystem and wait for Ctrl+C.
fn mount_and_wait(cli: &Cli, root: dropfs_core::DirNode, config: &MountConfig) -> Result<()> {
    // Set up channel for signal handling
    let (tx, rx) = mpsc::channel::<()>();

    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("Failed to set signal handler")?;

    info!("Mounting filesystem (press Ctrl+C to unmount)");

    let session = mount::spawn(root, &cli.mount, config).context("Failed to mount filesystem")?;

    match rx.recv() {
        Ok(()) => {
            info!("Received interrupt signal, unmounting...");
        }
        Err(_) => {
            warn!("Signal channel closed unexpectedly");
        }
    }

    drop(session);
    info!("Filesystem unmounted");
    Ok(())
}
