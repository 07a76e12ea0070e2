//! Immutable directory tree decoded from a snapshot.
//!
//! A tree is built once (by the [`snapshot`](crate::snapshot) decoder or by
//! hand in tests) and never changes afterwards. Children are kept in
//! insertion order, which is the order directory listings are served in.
//!
//! Each node carries a write-once inode slot. The decoder leaves it empty;
//! a mount session fills it the first time the node is observed, so asking
//! "does this node already have an inode" never needs a second map.

use indexmap::IndexMap;
use std::sync::{Arc, OnceLock};

/// A regular file: a name and a size. No content is referenced.
#[derive(Debug)]
pub struct FileNode {
    name: String,
    size: u64,
    inode: OnceLock<u64>,
}

impl FileNode {
    /// Creates a file node with an unassigned inode slot.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            inode: OnceLock::new(),
        }
    }

    /// Returns the file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the file size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the write-once inode slot for this node.
    pub fn inode_slot(&self) -> &OnceLock<u64> {
        &self.inode
    }
}

/// A directory with name-keyed file and sub-directory children.
///
/// A name may appear both as a file and as a folder; lookups resolve such a
/// collision in favour of the folder.
#[derive(Debug)]
pub struct DirNode {
    name: String,
    files: IndexMap<String, Arc<FileNode>>,
    folders: IndexMap<String, Arc<DirNode>>,
    inode: OnceLock<u64>,
}

impl DirNode {
    /// Creates a directory from its children.
    ///
    /// Children are keyed by their own names. A repeated name keeps the
    /// position of its first occurrence and the value of its last.
    pub fn new(name: impl Into<String>, files: Vec<FileNode>, folders: Vec<DirNode>) -> Self {
        Self {
            name: name.into(),
            files: files
                .into_iter()
                .map(|f| (f.name.clone(), Arc::new(f)))
                .collect(),
            folders: folders
                .into_iter()
                .map(|d| (d.name.clone(), Arc::new(d)))
                .collect(),
            inode: OnceLock::new(),
        }
    }

    /// Returns the directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the write-once inode slot for this node.
    pub fn inode_slot(&self) -> &OnceLock<u64> {
        &self.inode
    }

    /// Looks up a sub-directory by exact name.
    pub fn folder(&self, name: &str) -> Option<&Arc<DirNode>> {
        self.folders.get(name)
    }

    /// Looks up a file by exact name.
    pub fn file(&self, name: &str) -> Option<&Arc<FileNode>> {
        self.files.get(name)
    }

    /// Looks up a child by exact name, folders first.
    pub fn child(&self, name: &str) -> Option<Node> {
        self.folder(name)
            .map(|d| Node::Dir(Arc::clone(d)))
            .or_else(|| self.file(name).map(|f| Node::File(Arc::clone(f))))
    }

    /// Sub-directories in insertion order.
    pub fn folders(&self) -> impl ExactSizeIterator<Item = &Arc<DirNode>> {
        self.folders.values()
    }

    /// Files in insertion order.
    pub fn files(&self) -> impl ExactSizeIterator<Item = &Arc<FileNode>> {
        self.files.values()
    }

    /// Number of direct children (folders plus files).
    pub fn child_count(&self) -> usize {
        self.folders.len() + self.files.len()
    }

    /// Returns the child at `index` in listing order: every folder, then
    /// every file.
    pub fn entry_at(&self, index: usize) -> Option<Node> {
        match index.checked_sub(self.folders.len()) {
            None => self
                .folders
                .get_index(index)
                .map(|(_, d)| Node::Dir(Arc::clone(d))),
            Some(file_index) => self
                .files
                .get_index(file_index)
                .map(|(_, f)| Node::File(Arc::clone(f))),
        }
    }

    /// Walks the whole subtree and counts its contents.
    ///
    /// The directory itself is included in `directories`.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut pending: Vec<&DirNode> = vec![self];
        while let Some(dir) = pending.pop() {
            stats.directories += 1;
            stats.files += dir.files.len() as u64;
            stats.total_bytes = dir
                .files
                .values()
                .fold(stats.total_bytes, |acc, f| acc.saturating_add(f.size));
            pending.extend(dir.folders.values().map(|d| &**d));
        }
        stats
    }
}

/// Either kind of tree node.
#[derive(Debug, Clone)]
pub enum Node {
    /// A directory.
    Dir(Arc<DirNode>),
    /// A regular file.
    File(Arc<FileNode>),
}

impl Node {
    /// Returns the node's name.
    pub fn name(&self) -> &str {
        match self {
            Node::Dir(d) => d.name(),
            Node::File(f) => f.name(),
        }
    }

    /// Returns the node's write-once inode slot.
    pub fn inode_slot(&self) -> &OnceLock<u64> {
        match self {
            Node::Dir(d) => d.inode_slot(),
            Node::File(f) => f.inode_slot(),
        }
    }

    /// Returns the directory if this node is one.
    pub fn as_dir(&self) -> Option<&Arc<DirNode>> {
        match self {
            Node::Dir(d) => Some(d),
            Node::File(_) => None,
        }
    }

    /// Returns true for directories.
    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Dir(_))
    }

    /// Returns true if both handles point at the same tree node.
    pub fn same_node(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Dir(a), Node::Dir(b)) => Arc::ptr_eq(a, b),
            (Node::File(a), Node::File(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Aggregate counts for a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Directories, including the starting directory.
    pub directories: u64,
    /// Regular files.
    pub files: u64,
    /// Sum of all file sizes.
    pub total_bytes: u64,
}
