//! Shared test utilities for integration tests
//!
//! Fixture builders and a preconfigured command used across the
//! CLI test files.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;

/// Config keys cleared from the child environment so the host setup
/// never leaks into a test.
const CONFIG_KEYS: &[&str] = &[
    "BATCH_SIZE",
    "RENAME_INPUT_FILES",
    "ALLOWED_EXTENSIONS",
    "INPUT_DIR",
    "BATCH_DIR",
    "WRITE_MANIFEST",
    "ON_COPY_ERROR",
    "IGNORE_NAMES",
    "RUST_LOG",
];

/// `batchsplit` running inside `dir` with a clean environment
pub fn batchsplit(dir: &Path) -> Command
{
    let mut cmd = Command::cargo_bin("batchsplit").expect("batchsplit binary");
    cmd.current_dir(dir);
    for key in CONFIG_KEYS
    {
        cmd.env_remove(key);
    }
    cmd
}

/// Write `len` bytes to `rel` under the fixture root
pub fn put(
    tmp: &assert_fs::TempDir,
    rel: &str,
    len: usize,
)
{
    tmp.child(rel)
        .write_binary(&vec![b'x'; len])
        .expect("write fixture file");
}

/// Three 200-byte files across two top-level folders
/// (`A/a1`, `A/a2`, `B/b1`) under `input_files/`.
pub fn make_two_group_fixture() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    put(&tmp, "input_files/A/a1", 200);
    put(&tmp, "input_files/A/a2", 200);
    put(&tmp, "input_files/B/b1", 200);
    tmp
}

/// A wedding-style media tree with mixed case, spaces and OS clutter.
pub fn make_media_fixture() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    put(&tmp, "input_files/Wedding/Photos - Regular/IMG001.JPG", 64);
    put(&tmp, "input_files/Wedding/Photos - Regular/IMG_0002.jpg", 64);
    put(&tmp, "input_files/Wedding/Photos - Regular/IMG_0003.jpg", 64);
    put(&tmp, "input_files/Wedding/Videos/Day 1/clip.MOV", 128);
    put(&tmp, "input_files/Wedding/Videos/Day 2/clip.MOV", 128);
    put(&tmp, "input_files/Wedding/.DS_Store", 8);
    put(&tmp, "input_files/loose file.txt", 16);
    tmp
}

/// Every regular file under `root`, as sorted `/`-separated relative paths
pub fn list_files(root: &Path) -> Vec<String>
{
    fn visit(
        root: &Path,
        dir: &Path,
        out: &mut Vec<String>,
    )
    {
        for entry in std::fs::read_dir(dir).expect("read_dir")
        {
            let path = entry
                .expect("entry")
                .path();
            if path.is_dir()
            {
                visit(root, &path, out);
            }
            else
            {
                let rel = path
                    .strip_prefix(root)
                    .expect("under root");
                out.push(
                    rel.to_string_lossy()
                        .replace('\\', "/"),
                );
            }
        }
    }

    let mut out = Vec::new();
    visit(root, root, &mut out);
    out.sort();
    out
}
