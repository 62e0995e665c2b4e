// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use bundler_resolver::FileSystemLookup;
use camino::{Utf8Path, Utf8PathBuf};

/// The real, `std::fs`-backed filesystem port (spec §6, "Filesystem port":
/// `lstat`/`readFile`/`readdir`). `bundler-resolver` only needs the `exists`/`is_dir`/
/// `read_to_string` slice of that port; `bundler-watcher`'s own crawl handles
/// `readdir`, and `FileMap::stat` handles `lstat`.
#[derive(Clone, Debug, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        OsFileSystem
    }

    pub fn read_to_string(&self, path: &Utf8Path) -> std::io::Result<String> {
        std::fs::read_to_string(path.as_std_path())
    }
}

impl FileSystemLookup for OsFileSystem {
    fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        path.as_std_path().is_dir()
    }

    fn read_to_string(&self, path: &Utf8Path) -> std::io::Result<String> {
        std::fs::read_to_string(path.as_std_path())
    }
}

/// Reads an asset file's raw bytes for fingerprinting (spec §4.2, assets carry no
/// transform, only a content fingerprint).
pub fn read_bytes(path: &Utf8PathBuf) -> std::io::Result<Vec<u8>> {
    std::fs::read(path.as_std_path())
}
