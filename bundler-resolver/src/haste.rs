// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Utf8PathBuf;
use indexmap::IndexMap;

/// The flat-namespace Haste module/package index (spec §4.3, step 2: "try Haste
/// (flat-namespace) module/package index"; GLOSSARY: "flat-namespace module lookup by
/// declared name, independent of directory location").
///
/// Population (via `@providesModule`-style annotations, or `package.json` `name`
/// fields under a Haste root) is the crawler's responsibility; this type is just the
/// lookup table the resolver consults, kept separate so it can be rebuilt
/// independently as the FileMap reports changes.
#[derive(Clone, Debug, Default)]
pub struct Haste {
    modules: IndexMap<String, Utf8PathBuf>,
    packages: IndexMap<String, Utf8PathBuf>,
}

impl Haste {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `path` under the Haste module name `name`. Last write wins, matching
    /// the flat namespace's "one provider per name" assumption; a collision is logged
    /// since it usually indicates two modules declaring the same Haste name.
    pub fn register_module(&mut self, name: impl Into<String>, path: Utf8PathBuf) {
        let name = name.into();
        if let Some(existing) = self.modules.get(&name) {
            if existing != &path {
                log::warn!("Haste module name '{}' claimed by both {} and {}", name, existing, path);
            }
        }
        self.modules.insert(name, path);
    }

    /// Registers the package rooted at `dir` under its Haste package name.
    pub fn register_package(&mut self, name: impl Into<String>, dir: Utf8PathBuf) {
        self.packages.insert(name.into(), dir);
    }

    pub fn unregister(&mut self, path: &camino::Utf8Path) {
        self.modules.retain(|_, p| p != path);
        self.packages.retain(|_, p| p != path);
    }

    pub fn lookup_module(&self, name: &str) -> Option<&camino::Utf8Path> {
        self.modules.get(name).map(|p| p.as_path())
    }

    pub fn lookup_package(&self, name: &str) -> Option<&camino::Utf8Path> {
        self.packages.get(name).map(|p| p.as_path())
    }
}
