//! Read-only FUSE filesystem for dropfs snapshots.
//!
//! This crate mounts a static directory tree (names, sizes, hierarchy) decoded
//! by `dropfs-core` so ordinary tools can browse it. File content is never
//! served.
//!
//! # Features
//!
//! - Lazy, stable inode numbering for the lifetime of the mount
//! - Resumable directory listings with positional offsets
//! - Unicode-normalized name lookup (decomposed names match composed ones)
//! - Long kernel cache TTLs, since the tree never changes
//!
//! # Usage
//!
//! ```ignore
//! use dropfs_fuse::{mount, MountConfig};
//!
//! let root = dropfs_core::load(Path::new("data.msgpack"))?;
//! let session = mount::spawn(root, mountpoint, &MountConfig::default())?;
//! ```

pub mod attr;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod inode;
pub mod mount;
pub mod ops;

pub use attr::MountContext;
pub use config::MountConfig;
pub use error::{FsError, FsResult};
pub use filesystem::ManifestFs;
pub use inode::{InodeTable, ROOT_INODE};
pub use mount::MountError;
pub use ops::{DirEntries, DirEntry, FsStatistics, ManifestOps};
