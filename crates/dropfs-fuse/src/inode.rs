//! Inode management for the FUSE filesystem.
//!
//! Inode numbers are handed out lazily, the first time a node is seen by
//! `lookup` or `readdir`, and never reused or revoked for the lifetime of
//! the mount. The tree is static and small, so there is no `forget`
//! bookkeeping.
//!
//! The inode→node half of the mapping lives in a `DashMap`. The node→inode
//! half is the node's own write-once slot, so checking whether a node is
//! already numbered is a single atomic load.

use crate::error::{FsError, FsResult};
use dashmap::DashMap;
use dropfs_core::{DirNode, Node};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// The root inode number (FUSE convention).
pub const ROOT_INODE: u64 = 1;

/// First inode number handed out after the root.
const FIRST_CHILD_INODE: u64 = ROOT_INODE + 1;

/// Bidirectional mapping between inode numbers and tree nodes.
pub struct InodeTable {
    /// The tree this table numbers, bound to [`ROOT_INODE`].
    root: Arc<DirNode>,
    /// Inode number to node.
    nodes: DashMap<u64, Node>,
    /// Next number to hand out. The lock covers allocate-and-record so a
    /// node can never be numbered twice.
    next: Mutex<u64>,
}

impl InodeTable {
    /// Takes ownership of `root` and binds it to [`ROOT_INODE`].
    ///
    /// Fails with [`FsError::ForeignNode`] if the root already carries an
    /// inode number from another table.
    pub fn with_root(root: DirNode) -> FsResult<Self> {
        let root = Arc::new(root);
        if root.inode_slot().set(ROOT_INODE).is_err() {
            return Err(FsError::ForeignNode(root.name().to_string()));
        }
        let nodes = DashMap::new();
        nodes.insert(ROOT_INODE, Node::Dir(Arc::clone(&root)));
        Ok(Self {
            root,
            nodes,
            next: Mutex::new(FIRST_CHILD_INODE),
        })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Arc<DirNode> {
        &self.root
    }

    /// Returns the node's inode number, assigning the next free one if the
    /// node has never been seen.
    ///
    /// Idempotent: repeated calls for the same node return the same number,
    /// and every number returned resolves back to the node. A node numbered
    /// by a different table is rejected with [`FsError::ForeignNode`].
    pub fn ensure_inode(&self, node: &Node) -> FsResult<u64> {
        if let Some(&ino) = node.inode_slot().get() {
            return self.check_owned(ino, node);
        }

        let mut next = self.next.lock();
        // Another thread may have numbered the node while we waited.
        if let Some(&ino) = node.inode_slot().get() {
            return self.check_owned(ino, node);
        }
        let ino = *next;
        let after = ino.checked_add(1).ok_or(FsError::InodesExhausted)?;
        if node.inode_slot().set(ino).is_err() {
            return Err(FsError::ForeignNode(node.name().to_string()));
        }
        *next = after;
        self.nodes.insert(ino, node.clone());
        drop(next);

        trace!(inode = ino, name = node.name(), "assigned inode");
        Ok(ino)
    }

    fn check_owned(&self, ino: u64, node: &Node) -> FsResult<u64> {
        match self.nodes.get(&ino) {
            Some(entry) if entry.value().same_node(node) => Ok(ino),
            _ => Err(FsError::ForeignNode(node.name().to_string())),
        }
    }

    /// Returns the node bound to `ino`.
    pub fn resolve(&self, ino: u64) -> FsResult<Node> {
        self.nodes
            .get(&ino)
            .map(|entry| entry.value().clone())
            .ok_or(FsError::UnknownInode(ino))
    }

    /// Returns the directory bound to `ino`.
    pub fn resolve_dir(&self, ino: u64) -> FsResult<Arc<DirNode>> {
        match self.resolve(ino)? {
            Node::Dir(dir) => Ok(dir),
            Node::File(_) => Err(FsError::NotADirectory(ino)),
        }
    }

    /// Returns the number of inodes handed out, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is present from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
