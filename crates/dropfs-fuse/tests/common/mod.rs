//! Snapshot builders for driver tests.
//!
//! Encodes trees in the on-disk MessagePack format so tests exercise the
//! real decoder rather than hand-built nodes.

// Not all tests use all builders
#![allow(dead_code)]

use dropfs_core::snapshot::{EXT_DIRECTORY, EXT_FILE};
use dropfs_core::DirNode;
use dropfs_fuse::{ManifestFs, MountConfig, MountContext};
use rmp::encode;

/// A tree description that encodes to a snapshot.
pub enum Spec {
    File(&'static str, u64),
    Dir(&'static str, Vec<Spec>),
}

pub fn file(name: &'static str, size: u64) -> Spec {
    Spec::File(name, size)
}

pub fn dir(name: &'static str, children: Vec<Spec>) -> Spec {
    Spec::Dir(name, children)
}

fn ext(code: i8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    encode::write_ext_meta(&mut out, u32::try_from(payload.len()).unwrap(), code).unwrap();
    out.extend_from_slice(payload);
    out
}

fn encode_node(spec: &Spec) -> Vec<u8> {
    let mut payload = Vec::new();
    match spec {
        Spec::File(name, size) => {
            encode::write_map_len(&mut payload, 2).unwrap();
            encode::write_str(&mut payload, "name").unwrap();
            encode::write_str(&mut payload, name).unwrap();
            encode::write_str(&mut payload, "size").unwrap();
            encode::write_uint(&mut payload, *size).unwrap();
            ext(EXT_FILE, &payload)
        }
        Spec::Dir(name, children) => {
            let (dirs, files): (Vec<&Spec>, Vec<&Spec>) =
                children.iter().partition(|c| matches!(c, Spec::Dir(..)));
            encode::write_map_len(&mut payload, 3).unwrap();
            encode::write_str(&mut payload, "name").unwrap();
            encode::write_str(&mut payload, name).unwrap();
            encode::write_str(&mut payload, "files").unwrap();
            encode::write_array_len(&mut payload, u32::try_from(files.len()).unwrap()).unwrap();
            for f in files {
                payload.extend_from_slice(&encode_node(f));
            }
            encode::write_str(&mut payload, "folders").unwrap();
            encode::write_array_len(&mut payload, u32::try_from(dirs.len()).unwrap()).unwrap();
            for d in dirs {
                payload.extend_from_slice(&encode_node(d));
            }
            ext(EXT_DIRECTORY, &payload)
        }
    }
}

/// Encodes `root` as a complete snapshot document.
pub fn encode_snapshot(root: &Spec) -> Vec<u8> {
    let mut out = Vec::new();
    encode::write_map_len(&mut out, 1).unwrap();
    encode::write_str(&mut out, "root").unwrap();
    out.extend_from_slice(&encode_node(root));
    out
}

/// Encodes and decodes `root`.
pub fn decode(root: &Spec) -> DirNode {
    dropfs_core::decode_slice(&encode_snapshot(root)).expect("snapshot should decode")
}

/// Builds a filesystem over `root` owned by uid 1000 / gid 1000.
pub fn mount(root: &Spec) -> ManifestFs {
    ManifestFs::with_context(
        decode(root),
        MountContext::with_ownership(1000, 1000),
        &MountConfig::default(),
    )
    .expect("fresh tree should mount")
}

/// root { folders: [docs { files: [a.txt=10] }], files: [readme.md=5] }
pub fn scenario() -> Spec {
    dir(
        "root",
        vec![
            dir("docs", vec![file("a.txt", 10)]),
            file("readme.md", 5),
        ],
    )
}
