//! Binary snapshot decoder.
//!
//! A snapshot is a single MessagePack document holding a map with a `root`
//! key. Tree nodes are MessagePack extension blocks whose payload is itself
//! a MessagePack map:
//!
//! | ext code | node      | payload keys                                  |
//! |----------|-----------|-----------------------------------------------|
//! | 21       | directory | `name` (str), `files` (array), `folders` (array) |
//! | 81       | file      | `name` (str), `size` (non-negative int)        |
//!
//! Extension blocks are turned into nodes as soon as they are read, wherever
//! they appear, so an unknown extension code is fatal even inside a key the
//! decoder would otherwise ignore.

use crate::error::{SnapshotError, SnapshotResult};
use crate::tree::{DirNode, FileNode};
use rmp::Marker;
use rmp::decode::{self as rmpd, ExtMeta};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Extension type code for directory records.
pub const EXT_DIRECTORY: i8 = 21;

/// Extension type code for file records.
pub const EXT_FILE: i8 = 81;

/// Snapshot file name used when none is given.
pub const DEFAULT_SNAPSHOT_FILE: &str = "data.msgpack";

/// Maximum container/extension nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 512;

/// Loads and decodes the snapshot stored at `path`.
///
/// Failures are wrapped in [`SnapshotError::Load`] so the message names the
/// offending file.
pub fn load(path: &Path) -> SnapshotResult<DirNode> {
    let wrap = |source: SnapshotError| SnapshotError::Load {
        path: path.to_path_buf(),
        source: Box::new(source),
    };
    let file = File::open(path).map_err(|e| wrap(e.into()))?;
    let root = decode(BufReader::new(file)).map_err(wrap)?;
    let stats = root.stats();
    info!(
        path = %path.display(),
        directories = stats.directories,
        files = stats.files,
        total_bytes = stats.total_bytes,
        "Snapshot loaded"
    );
    Ok(root)
}

/// Decodes a snapshot from a reader, returning the root directory.
pub fn decode<R: Read>(mut reader: R) -> SnapshotResult<DirNode> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    decode_slice(&buf)
}

/// Decodes a snapshot held in memory, returning the root directory.
pub fn decode_slice(bytes: &[u8]) -> SnapshotResult<DirNode> {
    debug!(len = bytes.len(), "Decoding snapshot");
    let mut decoder = Decoder::default();
    let entries = match decoder.read_document(bytes)? {
        Value::Map(entries) => entries,
        other => {
            return Err(SnapshotError::malformed(format!(
                "top-level value is {}, expected a map",
                other.kind()
            )));
        }
    };
    for (key, value) in entries {
        if key.as_key() == Some("root") {
            return match value {
                Value::Dir(root) => Ok(root),
                other => Err(SnapshotError::malformed(format!(
                    "`root` is {}, expected a directory",
                    other.kind()
                ))),
            };
        }
    }
    Err(SnapshotError::MissingKey {
        record: "document",
        key: "root",
    })
}

/// A decoded MessagePack value, with extension blocks already resolved.
///
/// Booleans and floats never carry tree data, so only their presence is kept.
#[derive(Debug)]
enum Value {
    Nil,
    Bool,
    Uint(u64),
    Int(i64),
    Float,
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Dir(DirNode),
    File(FileNode),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool => "a boolean",
            Value::Uint(_) | Value::Int(_) => "an integer",
            Value::Float => "a float",
            Value::Str(_) => "a string",
            Value::Bin(_) => "binary",
            Value::Array(_) => "an array",
            Value::Map(_) => "a map",
            Value::Dir(_) => "a directory",
            Value::File(_) => "a file",
        }
    }

    fn as_key(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Text may arrive as `str` or, from legacy packers, as `bin`.
    fn into_text(self, record: &'static str) -> SnapshotResult<String> {
        match self {
            Value::Str(s) => Ok(s),
            Value::Bin(b) => String::from_utf8(b).map_err(|_| {
                SnapshotError::malformed(format!("{record} name is not valid UTF-8"))
            }),
            other => Err(SnapshotError::malformed(format!(
                "{record} name is {}, expected text",
                other.kind()
            ))),
        }
    }
}

/// Walks MessagePack values with `rmp`'s readers, tracking nesting depth.
#[derive(Default)]
struct Decoder {
    depth: usize,
}

impl Decoder {
    /// Reads exactly one value and requires the buffer to end there.
    fn read_document(&mut self, bytes: &[u8]) -> SnapshotResult<Value> {
        let mut rd = bytes;
        let value = self.read_value(&mut rd)?;
        if !rd.is_empty() {
            return Err(SnapshotError::malformed(format!(
                "{} trailing bytes after document",
                rd.len()
            )));
        }
        Ok(value)
    }

    fn read_value(&mut self, rd: &mut &[u8]) -> SnapshotResult<Value> {
        let value = match peek_marker(rd)? {
            Marker::Null => {
                rmpd::read_nil(rd)?;
                Value::Nil
            }
            Marker::True | Marker::False => {
                rmpd::read_bool(rd)?;
                Value::Bool
            }
            Marker::FixPos(_) | Marker::U8 | Marker::U16 | Marker::U32 | Marker::U64 => {
                Value::Uint(rmpd::read_int(rd)?)
            }
            Marker::FixNeg(_) | Marker::I8 | Marker::I16 | Marker::I32 | Marker::I64 => {
                Value::Int(rmpd::read_int(rd)?)
            }
            Marker::F32 => {
                rmpd::read_f32(rd)?;
                Value::Float
            }
            Marker::F64 => {
                rmpd::read_f64(rd)?;
                Value::Float
            }
            Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => {
                let len = rmpd::read_str_len(rd)?;
                let bytes = take(rd, len)?;
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    SnapshotError::malformed(format!("invalid UTF-8 in string: {e}"))
                })?;
                Value::Str(text.to_owned())
            }
            Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => {
                let len = rmpd::read_bin_len(rd)?;
                Value::Bin(take(rd, len)?.to_vec())
            }
            Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => {
                let len = rmpd::read_array_len(rd)?;
                self.read_array(rd, len)?
            }
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => {
                let len = rmpd::read_map_len(rd)?;
                self.read_map(rd, len)?
            }
            Marker::FixExt1
            | Marker::FixExt2
            | Marker::FixExt4
            | Marker::FixExt8
            | Marker::FixExt16
            | Marker::Ext8
            | Marker::Ext16
            | Marker::Ext32 => {
                let ExtMeta { typeid, size } = rmpd::read_ext_meta(rd)?;
                let payload = take(rd, size)?;
                self.read_extension(typeid, payload)?
            }
            Marker::Reserved => {
                return Err(SnapshotError::malformed("reserved marker byte 0xc1"));
            }
        };
        Ok(value)
    }

    fn descend(&mut self) -> SnapshotResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SnapshotError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn read_array(&mut self, rd: &mut &[u8], len: u32) -> SnapshotResult<Value> {
        self.descend()?;
        // Every element takes at least one byte, so cap the preallocation.
        let mut items = Vec::with_capacity(capacity(len, rd.len()));
        for _ in 0..len {
            items.push(self.read_value(rd)?);
        }
        self.depth -= 1;
        Ok(Value::Array(items))
    }

    fn read_map(&mut self, rd: &mut &[u8], len: u32) -> SnapshotResult<Value> {
        self.descend()?;
        let mut entries = Vec::with_capacity(capacity(len, rd.len() / 2));
        for _ in 0..len {
            let key = self.read_value(rd)?;
            let value = self.read_value(rd)?;
            entries.push((key, value));
        }
        self.depth -= 1;
        Ok(Value::Map(entries))
    }

    /// Turns one extension block into a tree node.
    fn read_extension(&mut self, code: i8, payload: &[u8]) -> SnapshotResult<Value> {
        let record = match code {
            EXT_DIRECTORY => "directory",
            EXT_FILE => "file",
            other => return Err(SnapshotError::UnknownExtension(other)),
        };
        self.descend()?;
        let fields = match self.read_document(payload)? {
            Value::Map(fields) => fields,
            other => {
                return Err(SnapshotError::malformed(format!(
                    "{record} payload is {}, expected a map",
                    other.kind()
                )));
            }
        };
        self.depth -= 1;
        if code == EXT_DIRECTORY {
            decode_directory(fields).map(Value::Dir)
        } else {
            decode_file(fields).map(Value::File)
        }
    }
}

fn peek_marker(rd: &[u8]) -> SnapshotResult<Marker> {
    rd.first()
        .map(|&b| Marker::from_u8(b))
        .ok_or_else(|| SnapshotError::malformed("unexpected end of data"))
}

/// Splits `len` raw bytes off the front of `rd`.
fn take<'a>(rd: &mut &'a [u8], len: u32) -> SnapshotResult<&'a [u8]> {
    let wanted = usize::try_from(len).unwrap_or(usize::MAX);
    let Some((head, tail)) = rd.split_at_checked(wanted) else {
        return Err(SnapshotError::malformed(format!(
            "unexpected end of data: wanted {len} bytes, {} left",
            rd.len()
        )));
    };
    *rd = tail;
    Ok(head)
}

fn capacity(len: u32, limit: usize) -> usize {
    usize::try_from(len).unwrap_or(usize::MAX).min(limit)
}

fn decode_directory(fields: Vec<(Value, Value)>) -> SnapshotResult<DirNode> {
    let mut name = None;
    let mut files = None;
    let mut folders = None;
    for (key, value) in fields {
        match key.as_key() {
            Some("name") => name = Some(value.into_text("directory")?),
            Some("files") => files = Some(collect_children(value, "files", file_child)?),
            Some("folders") => folders = Some(collect_children(value, "folders", folder_child)?),
            _ => {}
        }
    }
    let missing = |key| SnapshotError::MissingKey {
        record: "directory",
        key,
    };
    Ok(DirNode::new(
        name.ok_or_else(|| missing("name"))?,
        files.ok_or_else(|| missing("files"))?,
        folders.ok_or_else(|| missing("folders"))?,
    ))
}

fn file_child(value: Value) -> Result<FileNode, Value> {
    match value {
        Value::File(f) => Ok(f),
        other => Err(other),
    }
}

fn folder_child(value: Value) -> Result<DirNode, Value> {
    match value {
        Value::Dir(d) => Ok(d),
        other => Err(other),
    }
}

fn collect_children<T>(
    value: Value,
    key: &'static str,
    extract: fn(Value) -> Result<T, Value>,
) -> SnapshotResult<Vec<T>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(SnapshotError::malformed(format!(
                "directory `{key}` is {}, expected an array",
                other.kind()
            )));
        }
    };
    items
        .into_iter()
        .map(|item| {
            extract(item).map_err(|other| {
                SnapshotError::malformed(format!("directory `{key}` contains {}", other.kind()))
            })
        })
        .collect()
}

fn decode_file(fields: Vec<(Value, Value)>) -> SnapshotResult<FileNode> {
    let mut name = None;
    let mut size = None;
    for (key, value) in fields {
        match key.as_key() {
            Some("name") => name = Some(value.into_text("file")?),
            Some("size") => {
                size = Some(match value {
                    Value::Uint(n) => n,
                    Value::Int(n) => u64::try_from(n).map_err(|_| {
                        SnapshotError::malformed(format!("file size {n} is negative"))
                    })?,
                    other => {
                        return Err(SnapshotError::malformed(format!(
                            "file size is {}, expected an integer",
                            other.kind()
                        )));
                    }
                });
            }
            _ => {}
        }
    }
    let missing = |key| SnapshotError::MissingKey {
        record: "file",
        key,
    };
    Ok(FileNode::new(
        name.ok_or_else(|| missing("name"))?,
        size.ok_or_else(|| missing("size"))?,
    ))
}
