//! The operation set the FUSE adapter relies on.
//!
//! [`ManifestOps`] is the whole contract between the protocol layer and the
//! tree: five operations, no handles, no mutation. Anything implementing it
//! can sit behind the `fuser::Filesystem` adapter.

use crate::attr::MountContext;
use crate::error::FsResult;
use crate::inode::InodeTable;
use dropfs_core::DirNode;
use fuser::FileAttr;
use std::ffi::OsStr;
use std::sync::Arc;

/// Read-only filesystem operations over a static tree.
pub trait ManifestOps {
    /// Returns the attributes of `ino`.
    fn get_attributes(&self, ino: u64) -> FsResult<FileAttr>;

    /// Resolves `name` inside directory `parent`, numbering the child if it
    /// has never been seen.
    fn lookup(&self, parent: u64, name: &OsStr) -> FsResult<FileAttr>;

    /// Opens a directory. The returned handle is the inode number itself.
    fn open_directory(&self, ino: u64) -> FsResult<u64>;

    /// Lists directory `ino` starting at `offset`.
    ///
    /// Offsets are positional and stable for the mount: offset N always
    /// resumes at the same entry.
    fn read_directory(&self, ino: u64, offset: i64) -> FsResult<DirEntries<'_>>;

    /// Returns approximate filesystem statistics.
    fn statistics(&self) -> FsStatistics;
}

/// One directory listing entry.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Entry name as stored in the snapshot.
    pub name: String,
    /// Attributes, with the entry's inode already assigned.
    pub attr: FileAttr,
    /// Offset that resumes the listing after this entry.
    pub next_offset: i64,
}

/// Lazy listing of a directory: folders first, then files, each group in
/// snapshot order.
///
/// Inodes are assigned as entries are produced, so a listing the kernel
/// abandons half-way only numbers what it actually saw.
pub struct DirEntries<'a> {
    dir: Arc<DirNode>,
    position: usize,
    inodes: &'a InodeTable,
    ctx: &'a MountContext,
}

impl<'a> DirEntries<'a> {
    pub(crate) fn new(
        dir: Arc<DirNode>,
        position: usize,
        inodes: &'a InodeTable,
        ctx: &'a MountContext,
    ) -> Self {
        Self {
            dir,
            position,
            inodes,
            ctx,
        }
    }
}

impl Iterator for DirEntries<'_> {
    type Item = FsResult<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.dir.entry_at(self.position)?;
        self.position += 1;
        // Offsets come from positions in an in-memory tree; they fit in i64.
        let next_offset = i64::try_from(self.position).unwrap_or(i64::MAX);
        Some(self.inodes.ensure_inode(&node).map(|ino| DirEntry {
            name: node.name().to_string(),
            attr: self.ctx.node_attr(ino, &node),
            next_offset,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.dir.child_count().saturating_sub(self.position);
        (left, Some(left))
    }
}

/// Filesystem statistics in `statfs` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStatistics {
    /// Total blocks.
    pub blocks: u64,
    /// Free blocks.
    pub bfree: u64,
    /// Blocks available to unprivileged users.
    pub bavail: u64,
    /// Total inodes.
    pub files: u64,
    /// Free inodes.
    pub ffree: u64,
    /// Block size.
    pub bsize: u32,
    /// Maximum name length.
    pub namelen: u32,
    /// Fragment size.
    pub frsize: u32,
}
