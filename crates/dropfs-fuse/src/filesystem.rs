//! FUSE filesystem over a decoded snapshot tree.
//!
//! [`ManifestFs`] implements [`ManifestOps`] against the in-memory tree and
//! the [`InodeTable`], and then implements the fuser `Filesystem` trait as a
//! thin adapter over those operations.
//!
//! # FUSE operations
//!
//! | Operation | Notes |
//! |-----------|-------|
//! | init/destroy | Log only |
//! | lookup | NFC-normalizes the name, folders shadow files |
//! | getattr | Root answered without a table lookup |
//! | opendir/releasedir | Handle is the inode number, no state |
//! | readdir | Positional offsets, no `.`/`..` entries |
//! | statfs | Nominal figures, zero free blocks and inodes |
//!
//! Everything else (content reads, writes, xattrs, links) keeps fuser's
//! default `ENOSYS` reply. The mount is read-only.

use crate::attr::{MountContext, BLOCK_SIZE};
use crate::config::MountConfig;
use crate::error::{FsError, FsResult};
use crate::inode::{InodeTable, ROOT_INODE};
use crate::ops::{DirEntries, FsStatistics, ManifestOps};
use dropfs_core::{names, DirNode};
use fuser::{
    FileAttr, Filesystem, KernelConfig, ReplyAttr, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyStatfs, Request,
};
use libc::c_int;
use std::ffi::OsStr;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Longest file name reported by `statfs`.
///
/// On Linux this is 254 because Nautilus (GNOME Files) tests namelen+1 when
/// checking filename validity and rejects names at the 255 boundary.
#[cfg(target_os = "linux")]
const NAME_MAX: u32 = 254;
#[cfg(not(target_os = "linux"))]
const NAME_MAX: u32 = 255;

/// Read-only FUSE filesystem serving a static directory tree.
pub struct ManifestFs {
    /// Ownership, permissions and timestamps for every entry.
    ctx: MountContext,
    /// Inode numbers handed out so far.
    inodes: InodeTable,
    /// TTL for entry and attribute replies.
    attr_ttl: Duration,
    /// Nominal size of the tree in blocks, fixed at construction.
    total_blocks: u64,
}

impl ManifestFs {
    /// Creates a filesystem with the default configuration, owned by the
    /// current user.
    pub fn new(root: DirNode) -> FsResult<Self> {
        Self::with_config(root, &MountConfig::default())
    }

    /// Creates a filesystem with custom configuration.
    pub fn with_config(root: DirNode, config: &MountConfig) -> FsResult<Self> {
        let current = MountContext::current();
        let ctx = MountContext::with_ownership(
            config.uid.unwrap_or(current.uid),
            config.gid.unwrap_or(current.gid),
        );
        Self::with_context(root, ctx, config)
    }

    /// Creates a filesystem with an explicit mount context.
    ///
    /// Fails if `root` was already numbered by another session.
    pub fn with_context(
        root: DirNode,
        ctx: MountContext,
        config: &MountConfig,
    ) -> FsResult<Self> {
        let stats = root.stats();
        let total_blocks = stats.total_bytes.div_ceil(u64::from(BLOCK_SIZE)).max(1);
        let inodes = InodeTable::with_root(root)?;

        info!(
            root = inodes.root().name(),
            directories = stats.directories,
            files = stats.files,
            total_bytes = stats.total_bytes,
            uid = ctx.uid,
            gid = ctx.gid,
            attr_ttl_secs = config.attr_ttl.as_secs(),
            "ManifestFs initialized"
        );

        Ok(Self {
            ctx,
            inodes,
            attr_ttl: config.attr_ttl,
            total_blocks,
        })
    }

    /// Returns the number of inodes handed out, including the root.
    pub fn inode_count(&self) -> usize {
        self.inodes.len()
    }

    fn reply_ttl(&self) -> &Duration {
        &self.attr_ttl
    }
}

impl ManifestOps for ManifestFs {
    fn get_attributes(&self, ino: u64) -> FsResult<FileAttr> {
        if ino == ROOT_INODE {
            return Ok(self.ctx.dir_attr(ROOT_INODE));
        }
        let node = self.inodes.resolve(ino)?;
        Ok(self.ctx.node_attr(ino, &node))
    }

    fn lookup(&self, parent: u64, name: &OsStr) -> FsResult<FileAttr> {
        // A file parent is reported like an unknown one.
        let dir = match self.inodes.resolve_dir(parent) {
            Err(FsError::NotADirectory(_)) => return Err(FsError::UnknownInode(parent)),
            other => other?,
        };

        let Some(key) = names::decode_os_name(name) else {
            debug!(parent, name = %name.to_string_lossy(), "lookup: name is not UTF-8");
            return Err(FsError::InvalidName(name.to_string_lossy().into_owned()));
        };

        let Some(node) = dir.child(&key) else {
            // Kernels look up .DS_Store, ._* and similar all the time
            if names::is_hidden(name) {
                trace!(parent, name = %key, "lookup: hidden entry not found");
            } else {
                warn!(parent, name = %key, "lookup: entry not found");
            }
            return Err(FsError::NameNotFound {
                parent,
                name: key.into_owned(),
            });
        };

        let ino = self.inodes.ensure_inode(&node)?;
        Ok(self.ctx.node_attr(ino, &node))
    }

    fn open_directory(&self, ino: u64) -> FsResult<u64> {
        self.inodes.resolve_dir(ino)?;
        Ok(ino)
    }

    fn read_directory(&self, ino: u64, offset: i64) -> FsResult<DirEntries<'_>> {
        let start = usize::try_from(offset).map_err(|_| FsError::InvalidOffset(offset))?;
        let dir = self.inodes.resolve_dir(ino)?;
        Ok(DirEntries::new(dir, start, &self.inodes, &self.ctx))
    }

    fn statistics(&self) -> FsStatistics {
        FsStatistics {
            blocks: self.total_blocks,
            bfree: 0,
            bavail: 0,
            files: self.inodes.len() as u64,
            ffree: 0,
            bsize: BLOCK_SIZE,
            namelen: NAME_MAX,
            frsize: BLOCK_SIZE,
        }
    }
}

impl Filesystem for ManifestFs {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!(root = self.inodes.root().name(), "FUSE filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        info!(inodes = self.inodes.len(), "FUSE filesystem destroyed");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        trace!(parent = parent, name = ?name, "lookup");
        match ManifestOps::lookup(self, parent, name) {
            Ok(attr) => reply.entry(self.reply_ttl(), &attr, 0),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        trace!(inode = ino, "getattr");
        match self.get_attributes(ino) {
            Ok(attr) => reply.attr(self.reply_ttl(), &attr),
            Err(e) => {
                debug!(inode = ino, error = %e, "getattr failed");
                reply.error(e.to_errno());
            }
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        trace!(inode = ino, "opendir");
        match self.open_directory(ino) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        trace!(inode = ino, offset = offset, "readdir");
        let entries = match self.read_directory(ino, offset) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    reply.error(e.to_errno());
                    return;
                }
            };
            // buffer.add returns true if buffer is full
            if reply.add(entry.attr.ino, entry.next_offset, entry.attr.kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let s = self.statistics();
        reply.statfs(
            s.blocks, s.bfree, s.bavail, s.files, s.ffree, s.bsize, s.namelen, s.frsize,
        );
    }
}
