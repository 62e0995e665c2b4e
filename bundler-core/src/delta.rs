// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::module::Module;
use crate::revision::RevisionId;
use crate::Utf8PathBuf;

/// `{added: Module[], modified: Module[], deleted: pathSet, reset: bool}` (spec §3,
/// "Delta").
///
/// `reset = true` means the caller's prior revision was too old or unknown, and a full
/// build is enclosed in `added` in its entirety (spec §4.7, `getDelta`).
#[derive(Clone, Debug, Default)]
pub struct Delta {
    pub(crate) added: Vec<OwnedModule>,
    pub(crate) modified: Vec<OwnedModule>,
    pub(crate) deleted: Vec<Utf8PathBuf>,
    pub(crate) revision: RevisionId,
    pub(crate) reset: bool,
}

/// An owned snapshot of a graph node, detached from the graph's lifetime so deltas can
/// outlive the mutation that produced them (the graph keeps mutating after a delta is
/// handed to a listener).
#[derive(Clone, Debug)]
pub struct OwnedModule {
    pub path: Utf8PathBuf,
    pub id: crate::ModuleId,
    pub code: String,
    pub source_map: Option<String>,
    pub asset_metadata: Option<serde_json::Value>,
    pub dependencies: Vec<crate::Dependency>,
}

impl<'g> From<Module<'g>> for OwnedModule {
    fn from(module: Module<'g>) -> Self {
        OwnedModule {
            path: module.path().to_path_buf(),
            id: module.id(),
            code: module.code().to_string(),
            source_map: module.source_map().map(str::to_string),
            asset_metadata: module.asset_metadata().cloned(),
            dependencies: module.dependencies().to_vec(),
        }
    }
}

impl Delta {
    pub(crate) fn empty(revision: RevisionId) -> Self {
        Delta {
            added: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
            revision,
            reset: false,
        }
    }

    pub(crate) fn reset(snapshot: Vec<OwnedModule>, revision: RevisionId) -> Self {
        Delta {
            added: snapshot,
            modified: Vec::new(),
            deleted: Vec::new(),
            revision,
            reset: true,
        }
    }

    /// Modules newly inserted into the graph since the baseline revision.
    pub fn added(&self) -> &[OwnedModule] {
        &self.added
    }

    /// Modules whose code changed since the baseline revision (not newly inserted).
    pub fn modified(&self) -> &[OwnedModule] {
        &self.modified
    }

    /// Paths removed from the graph since the baseline revision.
    pub fn deleted(&self) -> &[Utf8PathBuf] {
        &self.deleted
    }

    /// The revision this delta brings the graph to.
    pub fn revision(&self) -> RevisionId {
        self.revision
    }

    /// True if the caller's baseline revision was too old/unknown and `added` is a full
    /// snapshot rather than an incremental diff.
    pub fn is_reset(&self) -> bool {
        self.reset
    }

    /// True if this delta changes nothing (a quiescent batch that touched no tracked
    /// path, or a no-op coalesced event).
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Composes two deltas applied back-to-back into the delta that would have resulted
    /// from applying them as one batch (spec §8, "Round-trip / idempotence":
    /// `applyDelta(applyDelta(G, d1), d2) == applyDelta(G, compose(d1, d2))`).
    pub fn compose(first: &Delta, second: &Delta) -> Delta {
        use std::collections::BTreeMap;

        // Index first's effects by path, then let second's effects override/cancel them.
        #[derive(Clone)]
        enum Effect {
            Added(OwnedModule),
            Modified(OwnedModule),
            Deleted,
        }

        let mut effects: BTreeMap<Utf8PathBuf, Effect> = BTreeMap::new();
        for m in &first.added {
            effects.insert(m.path.clone(), Effect::Added(m.clone()));
        }
        for m in &first.modified {
            effects.insert(m.path.clone(), Effect::Modified(m.clone()));
        }
        for p in &first.deleted {
            effects.insert(p.clone(), Effect::Deleted);
        }

        for m in &second.added {
            let entry = effects.entry(m.path.clone()).or_insert_with(|| Effect::Added(m.clone()));
            *entry = match entry {
                // If the path was added in `first` and touched again in `second`, it's
                // still a net "added" against the pre-`first` baseline.
                Effect::Added(_) => Effect::Added(m.clone()),
                _ => Effect::Modified(m.clone()),
            };
        }
        for m in &second.modified {
            let entry = effects.entry(m.path.clone()).or_insert_with(|| Effect::Modified(m.clone()));
            *entry = match entry {
                Effect::Added(_) => Effect::Added(m.clone()),
                _ => Effect::Modified(m.clone()),
            };
        }
        for p in &second.deleted {
            match effects.remove(p) {
                // Added then deleted within the composed window nets out to nothing.
                Some(Effect::Added(_)) => {}
                _ => {
                    effects.insert(p.clone(), Effect::Deleted);
                }
            }
        }

        let mut composed = Delta::empty(second.revision);
        for (path, effect) in effects {
            match effect {
                Effect::Added(m) => composed.added.push(m),
                Effect::Modified(m) => composed.modified.push(m),
                Effect::Deleted => composed.deleted.push(path),
            }
        }
        composed
    }
}
