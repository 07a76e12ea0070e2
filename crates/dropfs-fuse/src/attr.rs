//! Attribute records for tree nodes.
//!
//! All attributes are derived from the node kind, its size, and the
//! [`MountContext`] captured once at mount time. Nothing here changes after
//! mount, so every timestamp is the mount time.

use dropfs_core::Node;
use fuser::{FileAttr, FileType};
use std::time::SystemTime;

/// Block size reported in attributes and filesystem statistics.
pub const BLOCK_SIZE: u32 = 4096;

/// File permissions (r--r--r--).
pub const FILE_PERM: u16 = 0o444;

/// Directory permissions (r-xr-xr-x).
pub const DIR_PERM: u16 = 0o555;

/// Process-wide state fixed at mount time.
#[derive(Debug, Clone, Copy)]
pub struct MountContext {
    /// Owner of every entry.
    pub uid: u32,
    /// Group of every entry.
    pub gid: u32,
    /// Used for atime, mtime, ctime and crtime alike.
    pub mount_time: SystemTime,
    /// Permission bits for files.
    pub file_perm: u16,
    /// Permission bits for directories.
    pub dir_perm: u16,
}

impl MountContext {
    /// Captures the current user, group and time.
    pub fn current() -> Self {
        // SAFETY: getuid/getgid have no preconditions and cannot fail.
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };
        Self::with_ownership(uid, gid)
    }

    /// Creates a context owned by `uid`/`gid`, stamped with the current time.
    pub fn with_ownership(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            gid,
            mount_time: SystemTime::now(),
            file_perm: FILE_PERM,
            dir_perm: DIR_PERM,
        }
    }

    /// Builds the attribute record for a directory.
    pub fn dir_attr(&self, ino: u64) -> FileAttr {
        build(self, ino, FileType::Directory, self.dir_perm, 0)
    }

    /// Builds the attribute record for a regular file.
    pub fn file_attr(&self, ino: u64, size: u64) -> FileAttr {
        build(self, ino, FileType::RegularFile, self.file_perm, size)
    }

    /// Builds the attribute record for either kind of node.
    pub fn node_attr(&self, ino: u64, node: &Node) -> FileAttr {
        match node {
            Node::Dir(_) => self.dir_attr(ino),
            Node::File(f) => self.file_attr(ino, f.size()),
        }
    }
}

/// Builds an attribute record. Pure; never fails.
pub fn build(ctx: &MountContext, ino: u64, kind: FileType, perm: u16, size: u64) -> FileAttr {
    let time = ctx.mount_time;
    FileAttr {
        ino,
        size,
        blocks: size.div_ceil(u64::from(BLOCK_SIZE)),
        atime: time,
        mtime: time,
        ctime: time,
        crtime: time,
        kind,
        perm,
        nlink: if kind == FileType::Directory { 2 } else { 1 },
        uid: ctx.uid,
        gid: ctx.gid,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}
