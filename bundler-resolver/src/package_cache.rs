// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::package_json::PackageJson;
use crate::{Error, Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// The filesystem operations the resolver and package cache need (spec §6,
/// "Filesystem port" seen from the resolution side). Kept minimal and synchronous: the
/// resolver itself is specified as "a pure function (no I/O beyond what the injected
/// `fileSystemLookup` performs)" (spec §4.3).
pub trait FileSystemLookup {
    fn exists(&self, path: &Utf8Path) -> bool;
    fn is_dir(&self, path: &Utf8Path) -> bool;
    fn read_to_string(&self, path: &Utf8Path) -> std::io::Result<String>;
}

/// Read-through `package.json` cache (spec §4.2, "PackageCache").
///
/// `getPackage`/`getPackageOf` are exposed as `get_package`/`get_package_of`. Both are
/// invalidated by FileMap events on `package.json` paths via [`PackageCache::invalidate`];
/// `bundler-resolver` itself has no FileMap dependency, so wiring that invalidation to
/// watcher events is the embedder's job (see `bundler`'s `IncrementalBundler`).
///
/// Owns its `FS` via `Rc` rather than borrowing it, so an embedder can keep a cache
/// alive for as long as it keeps its filesystem handle alive, without a self-referential
/// struct.
pub struct PackageCache<FS> {
    fs: Rc<FS>,
    entries: RefCell<HashMap<Utf8PathBuf, Rc<PackageJson>>>,
}

impl<FS: FileSystemLookup> PackageCache<FS> {
    pub fn new(fs: Rc<FS>) -> Self {
        PackageCache {
            fs,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Reads and parses the `package.json` at `package_json_path`, memoizing the
    /// result.
    pub fn get_package(&self, package_json_path: &Utf8Path) -> Result<Rc<PackageJson>, Error> {
        if let Some(cached) = self.entries.borrow().get(package_json_path) {
            return Ok(cached.clone());
        }
        let contents = self.fs.read_to_string(package_json_path).map_err(|e| Error::Io {
            path: package_json_path.to_path_buf(),
            message: e.to_string(),
        })?;
        let package = Rc::new(PackageJson::parse(package_json_path.to_path_buf(), &contents)?);
        self.entries.borrow_mut().insert(package_json_path.to_path_buf(), package.clone());
        Ok(package)
    }

    /// Walks ancestor directories of `absolute_path` looking for the nearest
    /// `package.json`, returning it along with `absolute_path`'s path relative to that
    /// package's directory.
    pub fn get_package_of(&self, absolute_path: &Utf8Path) -> Result<Option<(Rc<PackageJson>, Utf8PathBuf)>, Error> {
        let mut dir = absolute_path.parent();
        while let Some(candidate_dir) = dir {
            let package_json = candidate_dir.join("package.json");
            if self.fs.exists(&package_json) {
                let package = self.get_package(&package_json)?;
                let relative = absolute_path
                    .strip_prefix(candidate_dir)
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|_| absolute_path.to_path_buf());
                return Ok(Some((package, relative)));
            }
            dir = candidate_dir.parent();
        }
        Ok(None)
    }

    /// Drops any cached entry for `package_json_path`, forcing the next lookup to
    /// re-read it from disk.
    pub fn invalidate(&self, package_json_path: &Utf8Path) {
        self.entries.borrow_mut().remove(package_json_path);
    }
}
