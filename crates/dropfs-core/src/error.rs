//! Error types for snapshot decoding.

use rmp::decode::{NumValueReadError, ValueReadError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while decoding a tree snapshot.
///
/// Every variant is fatal for the mount: a snapshot that fails to decode
/// must never be partially served.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot could not be read.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The snapshot file could not be loaded.
    #[error("error loading {}: {source}", path.display())]
    Load {
        /// The snapshot file that failed.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: Box<SnapshotError>,
    },

    /// A MessagePack value could not be read.
    #[error("invalid msgpack value: {0}")]
    Decode(#[from] ValueReadError<io::Error>),

    /// A MessagePack integer could not be read or is out of range.
    #[error("invalid msgpack integer: {0}")]
    Number(#[from] NumValueReadError<io::Error>),

    /// The document is not valid MessagePack, or has the wrong shape.
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    /// An extension block carries a type code this decoder does not know.
    #[error("unknown msgpack extension type {0}")]
    UnknownExtension(i8),

    /// A record lacks a required key.
    #[error("{record} record is missing key `{key}`")]
    MissingKey {
        /// The kind of record (`directory`, `file`, `document`).
        record: &'static str,
        /// The missing key.
        key: &'static str,
    },

    /// The document nests deeper than the decoder allows.
    #[error("snapshot nesting exceeds {0} levels")]
    TooDeep(usize),
}

impl SnapshotError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        SnapshotError::Malformed(msg.into())
    }
}

/// Result type for snapshot decoding.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
