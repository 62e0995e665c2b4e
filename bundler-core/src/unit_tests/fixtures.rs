// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::graph_impl::{GraphDriver, LoadedModule, RawDependency, ResolvedSpecifier};
use crate::module::{DependencyKind, Fingerprint};
use crate::module_id::{ModuleId, ModuleIdFactory, SequentialModuleIdFactory};
use crate::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;

/// A fake filesystem for graph-engine tests: maps a path to the list of specifiers it
/// "requires". Mutate `files` between a build and an `apply_batch` call to simulate an
/// edit, the way a real filesystem would be mutated by the watcher.
#[derive(Clone, Debug, Default)]
pub(crate) struct TestFs {
    pub(crate) files: HashMap<Utf8PathBuf, Vec<&'static str>>,
}

impl TestFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&mut self, path: &str, deps: Vec<&'static str>) {
        self.files.insert(Utf8PathBuf::from(path), deps);
    }

    pub(crate) fn remove(&mut self, path: &str) {
        self.files.remove(Utf8Path::new(path));
    }
}

/// A [`GraphDriver`] over a [`TestFs`]: specifiers are resolved by treating them as
/// already-absolute paths (no node_modules/extension probing -- that's
/// `bundler-resolver`'s job, exercised separately).
pub(crate) struct TestDriver<'a> {
    pub(crate) fs: &'a TestFs,
    pub(crate) ids: SequentialModuleIdFactory,
}

impl<'a> TestDriver<'a> {
    pub(crate) fn new(fs: &'a TestFs) -> Self {
        Self {
            fs,
            ids: SequentialModuleIdFactory::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TestDriverError(pub(crate) String);

impl std::fmt::Display for TestDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
impl std::error::Error for TestDriverError {}

impl<'a> GraphDriver for TestDriver<'a> {
    type Error = TestDriverError;

    fn load(&mut self, path: &Utf8Path) -> Result<LoadedModule, Self::Error> {
        let deps = self
            .fs
            .files
            .get(path)
            .ok_or_else(|| TestDriverError(format!("no such file: {}", path)))?;
        // The fingerprint is a stand-in content hash: good enough to detect "did this
        // module's effective content change" without pulling in a real hasher here.
        let mut fingerprint_bytes = Vec::new();
        for dep in deps {
            fingerprint_bytes.extend_from_slice(dep.as_bytes());
            fingerprint_bytes.push(0);
        }
        Ok(LoadedModule {
            code: format!("/* {} */", path),
            source_map: None,
            asset_metadata: None,
            fingerprint: Fingerprint(fingerprint_bytes.into_boxed_slice()),
            dependencies: deps
                .iter()
                .map(|spec| RawDependency {
                    specifier: spec.to_string(),
                    kind: DependencyKind::Require,
                    locations: Vec::new(),
                })
                .collect(),
        })
    }

    fn resolve(&mut self, _origin: &Utf8Path, specifier: &str) -> Result<ResolvedSpecifier, Self::Error> {
        let path = Utf8PathBuf::from(specifier);
        if self.fs.files.contains_key(&path) {
            Ok(ResolvedSpecifier::SourceFile(path))
        } else {
            Err(TestDriverError(format!("cannot resolve: {}", specifier)))
        }
    }

    fn module_id(&mut self, path: &Utf8Path) -> ModuleId {
        self.ids.create_module_id(path)
    }

    fn release_module_id(&mut self, path: &Utf8Path) {
        self.ids.release_module_id(path);
    }
}
