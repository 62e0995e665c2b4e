// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::package_cache::FileSystemLookup;
use crate::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;

/// An in-memory filesystem for resolver tests. A path is "a directory" if it was never
/// given file contents via [`TestFs::file`] but has at least one descendant.
#[derive(Clone, Debug, Default)]
pub(crate) struct TestFs {
    files: HashMap<Utf8PathBuf, String>,
}

impl TestFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn file(&mut self, path: &str, contents: impl Into<String>) -> &mut Self {
        self.files.insert(Utf8PathBuf::from(path), contents.into());
        self
    }
}

impl FileSystemLookup for TestFs {
    fn exists(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        let prefix = format!("{}/", path);
        self.files.keys().any(|p| p.as_str().starts_with(&prefix))
    }

    fn read_to_string(&self, path: &Utf8Path) -> std::io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
    }
}
