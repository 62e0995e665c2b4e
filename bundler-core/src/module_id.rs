// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Utf8Path;
use std::fmt;

/// A stable integer identifier assigned to a module for use in the serialized bundle.
///
/// IDs are assigned by a caller-supplied [`ModuleIdFactory`], which is expected to
/// maintain a process-wide stable mapping (see spec §4.6, "Module-ID policy"). The
/// graph only guarantees that an ID is never reused *within its own lifetime* while its
/// node is live; it does not itself guarantee cross-graph stability -- that is the
/// factory's job.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ModuleId(pub u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A process-wide factory mapping absolute module paths to stable [`ModuleId`]s.
///
/// Per spec §9 ("Global state"), the module-ID factory is one of exactly two
/// process-wide mutable singletons (the other being the logger), and both are passed in
/// by the embedder rather than owned by the graph.
pub trait ModuleIdFactory {
    /// Returns the stable ID for `path`, allocating a new one if this is the first time
    /// `path` has been seen.
    fn create_module_id(&mut self, path: &Utf8Path) -> ModuleId;

    /// Forgets `path`'s assigned ID, called by the graph when `path`'s node is deleted
    /// (spec invariant G3: "an ID is released only when its node is deleted; re-added
    /// modules get a new ID"). The next `create_module_id` call for the same path must
    /// allocate a fresh ID rather than returning the one just released. The default
    /// does nothing, matching spec §4.6's weaker "process-wide stable mapping"
    /// wording for factories that don't need G3 (e.g. a pure hash of the path, which
    /// has nothing to forget).
    fn release_module_id(&mut self, _path: &Utf8Path) {}
}

/// A simple counter-based [`ModuleIdFactory`] suitable for tests and for embedders that
/// don't need IDs stable across process restarts.
#[derive(Clone, Debug, Default)]
pub struct SequentialModuleIdFactory {
    next: u32,
    assigned: indexmap::IndexMap<camino::Utf8PathBuf, ModuleId>,
}

impl SequentialModuleIdFactory {
    /// Creates a new, empty factory.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModuleIdFactory for SequentialModuleIdFactory {
    fn create_module_id(&mut self, path: &Utf8Path) -> ModuleId {
        if let Some(id) = self.assigned.get(path) {
            return *id;
        }
        let id = ModuleId(self.next);
        self.next += 1;
        self.assigned.insert(path.to_path_buf(), id);
        id
    }

    fn release_module_id(&mut self, path: &Utf8Path) {
        self.assigned.shift_remove(path);
    }
}
