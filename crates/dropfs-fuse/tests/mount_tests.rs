//! Real-mount smoke tests.
//!
//! Mounts a snapshot through the kernel and browses it with std::fs.
//!
//! Run: `cargo nextest run -p dropfs-fuse --features fuse-tests mount_tests`

#![cfg(all(target_os = "linux", feature = "fuse-tests"))]

mod common;

use common::*;
use dropfs_fuse::{mount, MountConfig};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// How long to wait for mount to become ready.
const MOUNT_READY_TIMEOUT: Duration = Duration::from_secs(5);

fn fuse_available() -> bool {
    Path::new("/dev/fuse").exists()
}

macro_rules! skip_if_no_fuse {
    () => {
        if !fuse_available() {
            eprintln!("Skipping test: FUSE not available on this system");
            return;
        }
    };
}

/// Polls until `path` lists `expected` entries, or the timeout passes.
fn wait_for_entries(path: &Path, expected: usize) -> bool {
    let deadline = Instant::now() + MOUNT_READY_TIMEOUT;
    while Instant::now() < deadline {
        if fs::read_dir(path).map(Iterator::count).unwrap_or(0) == expected {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    false
}

#[test]
fn test_browse_mounted_snapshot() {
    skip_if_no_fuse!();
    let mountpoint = tempfile::tempdir().unwrap();
    let config = MountConfig::default()
        .fs_name("dropfs-test")
        .allow_nonempty(false);

    let session = match mount::spawn(decode(&scenario()), mountpoint.path(), &config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Skipping test: mount failed: {e}");
            return;
        }
    };
    assert!(wait_for_entries(mountpoint.path(), 2), "mount never became ready");

    let mut listed: Vec<String> = fs::read_dir(mountpoint.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    listed.sort();
    assert_eq!(listed, ["docs", "readme.md"]);

    let readme = fs::metadata(mountpoint.path().join("readme.md")).unwrap();
    assert!(readme.is_file());
    assert_eq!(readme.len(), 5);
    assert_eq!(readme.permissions().mode() & 0o777, 0o444);

    let docs = fs::metadata(mountpoint.path().join("docs")).unwrap();
    assert!(docs.is_dir());
    assert_eq!(docs.permissions().mode() & 0o777, 0o555);

    let nested = fs::metadata(mountpoint.path().join("docs/a.txt")).unwrap();
    assert_eq!(nested.len(), 10);

    assert!(fs::metadata(mountpoint.path().join("missing")).is_err());
    assert!(fs::write(mountpoint.path().join("new.txt"), b"x").is_err());

    drop(session);
}
