//! Core model for dropfs.
//!
//! This crate holds everything that is independent of the kernel protocol:
//!
//! - [`tree`] - the immutable directory tree ([`DirNode`], [`FileNode`], [`Node`])
//! - [`snapshot`] - the MessagePack snapshot decoder that produces the tree
//! - [`names`] - Unicode normalization applied to incoming lookup names
//! - [`error`] - [`SnapshotError`], the decoder's failure type
//!
//! # Usage
//!
//! ```ignore
//! use dropfs_core::snapshot;
//!
//! let root = snapshot::load(Path::new("data.msgpack"))?;
//! println!("{} entries at top level", root.child_count());
//! ```

pub mod error;
pub mod names;
pub mod snapshot;
pub mod tree;

pub use error::{SnapshotError, SnapshotResult};
pub use snapshot::{decode, decode_slice, load, DEFAULT_SNAPSHOT_FILE};
pub use tree::{DirNode, FileNode, Node, TreeStats};
