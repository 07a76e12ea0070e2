//! Error handling and errno mapping for the FUSE driver.
//!
//! Every variant here is a per-request condition. None of them ends the
//! session; the adapter turns them into errno replies.

use thiserror::Error;

/// Errors produced by the filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// The inode was never handed out in this mount session.
    #[error("Unknown inode: {0}")]
    UnknownInode(u64),

    /// No child of `parent` matches the (normalized) name.
    #[error("No entry named {name:?} in inode {parent}")]
    NameNotFound {
        /// Directory that was searched.
        parent: u64,
        /// Normalized name that was looked up.
        name: String,
    },

    /// The name is not valid UTF-8 and so cannot match any entry.
    #[error("Name is not valid UTF-8: {0}")]
    InvalidName(String),

    /// A directory operation targeted a file.
    #[error("Not a directory: {0}")]
    NotADirectory(u64),

    /// A directory offset the driver never produced.
    #[error("Invalid directory offset: {0}")]
    InvalidOffset(i64),

    /// The inode counter has no numbers left.
    #[error("Inode numbers exhausted")]
    InodesExhausted,

    /// The node already carries an inode number from a different table.
    #[error("Node {0:?} is numbered by another inode table")]
    ForeignNode(String),
}

impl FsError {
    /// Converts this error to a libc error code for FUSE.
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::UnknownInode(_) | FsError::NameNotFound { .. } | FsError::InvalidName(_) => {
                libc::ENOENT
            }
            FsError::NotADirectory(_) => libc::ENOTDIR,
            FsError::InvalidOffset(_) => libc::EINVAL,
            FsError::InodesExhausted => libc::EOVERFLOW,
            FsError::ForeignNode(_) => libc::EIO,
        }
    }
}

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_error_all_variants() {
        assert_eq!(
            FsError::UnknownInode(999).to_errno(),
            libc::ENOENT,
            "UnknownInode should map to ENOENT"
        );
        assert_eq!(
            FsError::NameNotFound {
                parent: 1,
                name: "missing".to_string()
            }
            .to_errno(),
            libc::ENOENT,
            "NameNotFound should map to ENOENT"
        );
        assert_eq!(
            FsError::InvalidName("bad".to_string()).to_errno(),
            libc::ENOENT,
            "InvalidName should map to ENOENT"
        );
        assert_eq!(
            FsError::NotADirectory(3).to_errno(),
            libc::ENOTDIR,
            "NotADirectory should map to ENOTDIR"
        );
        assert_eq!(FsError::InvalidOffset(-1).to_errno(), libc::EINVAL);
        assert_eq!(FsError::InodesExhausted.to_errno(), libc::EOVERFLOW);
        assert_eq!(FsError::ForeignNode("docs".to_string()).to_errno(), libc::EIO);
    }

    #[test]
    fn test_fs_error_display() {
        assert!(FsError::UnknownInode(42).to_string().contains("42"));

        let e = FsError::NameNotFound {
            parent: 7,
            name: "notes.txt".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.txt"));
        assert!(msg.contains('7'));
    }
}
