//! Mounting glue.
//!
//! Spawns a single background fuser session for a decoded tree. Requests are
//! handled one at a time on that session's thread. Dropping the returned
//! session unmounts.

use crate::config::MountConfig;
use crate::error::FsError;
use crate::filesystem::ManifestFs;
use dropfs_core::DirNode;
use fuser::BackgroundSession;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};

/// Errors that can occur while mounting.
#[derive(Debug, Error)]
pub enum MountError {
    /// The mountpoint does not exist or is not a directory.
    #[error("Mountpoint is not a directory: {0}")]
    InvalidMountpoint(String),

    /// The tree could not be served.
    #[error("Failed to build filesystem: {0}")]
    Filesystem(#[from] FsError),

    /// The kernel or fusermount refused the mount.
    #[error("Failed to mount filesystem: {0}")]
    Mount(#[from] io::Error),
}

/// Mounts `root` at `mountpoint` and returns the running session.
pub fn spawn(
    root: DirNode,
    mountpoint: &Path,
    config: &MountConfig,
) -> Result<BackgroundSession, MountError> {
    if !mountpoint.is_dir() {
        return Err(MountError::InvalidMountpoint(
            mountpoint.display().to_string(),
        ));
    }

    let options = config.mount_options();
    let fs = ManifestFs::with_config(root, config)?;

    info!(
        mountpoint = %mountpoint.display(),
        fs_name = %config.fs_name,
        "Mounting filesystem"
    );
    let session = fuser::spawn_mount2(fs, mountpoint, &options).map_err(|e| {
        error!(error = %e, "Mount failed");
        MountError::Mount(e)
    })?;
    info!("Filesystem mounted at {}", mountpoint.display());
    Ok(session)
}
