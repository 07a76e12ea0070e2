//! Mount configuration for the FUSE filesystem.
//!
//! The snapshot never changes after mount, so the kernel may cache
//! attributes and entries for a long time.

use fuser::MountOption;
use std::time::Duration;

/// Default time-to-live for cached attributes and entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default filesystem display name.
pub const DEFAULT_FS_NAME: &str = "dropfs";

/// Filesystem subtype shown in the mount table (`fuse.dropfs`).
pub const SUBTYPE: &str = "dropfs";

/// Configuration options for the FUSE filesystem.
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// Name shown as the mount source (`FSName`).
    pub fs_name: String,

    /// Time-to-live for attributes and entries handed to the kernel.
    ///
    /// Default: 1 hour.
    pub attr_ttl: Duration,

    /// Allow mounting over a non-empty directory.
    ///
    /// Default: true.
    pub allow_nonempty: bool,

    /// Owner override. `None` uses the mounting user.
    pub uid: Option<u32>,

    /// Group override. `None` uses the mounting user's group.
    pub gid: Option<u32>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            fs_name: DEFAULT_FS_NAME.to_string(),
            attr_ttl: DEFAULT_TTL,
            allow_nonempty: true,
            uid: None,
            gid: None,
        }
    }
}

impl MountConfig {
    /// Sets the filesystem display name.
    #[must_use]
    pub fn fs_name(mut self, name: impl Into<String>) -> Self {
        self.fs_name = name.into();
        self
    }

    /// Sets the cache TTL for attributes and entries.
    #[must_use]
    pub fn attr_ttl(mut self, ttl: Duration) -> Self {
        self.attr_ttl = ttl;
        self
    }

    /// Sets whether a non-empty mountpoint is accepted.
    #[must_use]
    pub fn allow_nonempty(mut self, allow: bool) -> Self {
        self.allow_nonempty = allow;
        self
    }

    /// Sets the owning user and group.
    #[must_use]
    pub fn ownership(mut self, uid: Option<u32>, gid: Option<u32>) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Assembles the mount options passed to fuser.
    ///
    /// Always read-only with kernel-side permission checks.
    pub fn mount_options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName(self.fs_name.clone()),
            MountOption::Subtype(SUBTYPE.to_string()),
            MountOption::RO,
            // Let kernel handle permission checks - avoids access() calls for every operation
            MountOption::DefaultPermissions,
        ];

        if self.allow_nonempty {
            options.push(MountOption::CUSTOM("nonempty".to_string()));
        }

        // On macOS, set the volume name shown in Finder
        #[cfg(target_os = "macos")]
        options.push(MountOption::CUSTOM(format!("volname={}", self.fs_name)));

        options
    }
}
