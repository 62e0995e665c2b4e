// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::delta::{Delta, OwnedModule};
use crate::module::{Dependency, DependencyKind, Fingerprint, SourceLocation};
use crate::module_id::{ModuleId, ModuleIdFactory};
use crate::petgraph_support::{reachability, scc::Sccs};
use crate::revision::RevisionId;
use crate::{Error, Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;

/// Internal edge weight: which entry of the source module's `dependencies` this edge
/// was derived from, so edges can be rebuilt/diffed without a second lookup.
#[derive(Copy, Clone, Debug)]
struct DependencyEdge {
    dep_index: u32,
}

/// A graph of modules and dependency edges between them, for one *(entry, options)*
/// pair (spec §3, "Graph").
///
/// Mirrors `guppy::graph::PackageGraph`: a flat `petgraph` arena (`dep_graph`) holding
/// only paths as node weights, with the richer per-module data kept in a side table
/// (`GraphData`) so that petgraph's `NodeIndex` stays an internal implementation detail
/// never exposed to callers -- callers address modules by path or by the
/// caller-assigned [`ModuleId`].
#[derive(Clone)]
pub struct Graph {
    dep_graph: DiGraph<Utf8PathBuf, DependencyEdge>,
    paths: IndexMap<Utf8PathBuf, NodeIndex>,
    data: GraphData,
    revision: RevisionId,
}

#[derive(Clone)]
struct GraphData {
    modules: HashMap<Utf8PathBuf, ModuleRecordImpl>,
    entry_points: IndexSet<Utf8PathBuf>,
}

#[derive(Clone)]
struct ModuleRecordImpl {
    id: ModuleId,
    node_ix: NodeIndex,
    fingerprint: Fingerprint,
    code: String,
    source_map: Option<String>,
    asset_metadata: Option<serde_json::Value>,
    dependencies: Vec<Dependency>,
}

/// The driver a [`Graph`] uses to turn paths into modules and specifiers into resolved
/// paths (spec §6, "Consumed interfaces": Filesystem port, Transformer port,
/// ModuleID factory). `bundler-core` never does I/O itself; this trait is the seam.
pub trait GraphDriver {
    /// The error type surfaced by this driver's resolution/transform failures.
    type Error: std::error::Error + 'static;

    /// Reads and transforms the file at `path`, returning its code, source map,
    /// dependency specifiers, and fingerprint.
    fn load(&mut self, path: &Utf8Path) -> Result<LoadedModule, Self::Error>;

    /// Resolves `specifier` as referenced from `origin`.
    fn resolve(&mut self, origin: &Utf8Path, specifier: &str) -> Result<ResolvedSpecifier, Self::Error>;

    /// Returns the stable module ID for `path` (spec §4.6, "Module-ID policy").
    fn module_id(&mut self, path: &Utf8Path) -> ModuleId;

    /// Called when `path`'s node is deleted from the graph, whether by an explicit
    /// delete event or orphan GC (spec invariant G3: "an ID is released only when its
    /// node is deleted; re-added modules get a new ID"). The default does nothing --
    /// an embedder whose `ModuleIdFactory` has no G3 obligation (e.g. a purely
    /// path-keyed hash with no process-wide reuse concern) doesn't need to override
    /// this.
    fn release_module_id(&mut self, _path: &Utf8Path) {}
}

/// The result of transforming a single source file (spec §6, "Transformer port").
#[derive(Clone, Debug)]
pub struct LoadedModule {
    pub code: String,
    pub source_map: Option<String>,
    pub asset_metadata: Option<serde_json::Value>,
    pub fingerprint: Fingerprint,
    pub dependencies: Vec<RawDependency>,
}

/// A dependency specifier as reported by the transformer, prior to resolution.
#[derive(Clone, Debug)]
pub struct RawDependency {
    pub specifier: String,
    pub kind: DependencyKind,
    pub locations: Vec<SourceLocation>,
}

/// The result of resolving a specifier (spec §4.3, "Resolution variants").
#[derive(Clone, Debug)]
pub enum ResolvedSpecifier {
    SourceFile(Utf8PathBuf),
    AssetFiles(Vec<Utf8PathBuf>),
    Empty,
}

impl Graph {
    fn empty() -> Self {
        Graph {
            dep_graph: DiGraph::new(),
            paths: IndexMap::new(),
            data: GraphData {
                modules: HashMap::new(),
                entry_points: IndexSet::new(),
            },
            revision: RevisionId::INITIAL,
        }
    }

    fn node_ix(&mut self, path: &Utf8Path) -> NodeIndex {
        if let Some(ix) = self.paths.get(path) {
            return *ix;
        }
        let ix = self.dep_graph.add_node(path.to_path_buf());
        self.paths.insert(path.to_path_buf(), ix);
        ix
    }

    /// Builds a fresh graph from a set of entry points (spec §4.6, "Initial build").
    pub fn build<D: GraphDriver>(
        entry_points: impl IntoIterator<Item = Utf8PathBuf>,
        driver: &mut D,
    ) -> Result<Graph, Error> {
        let mut graph = Graph::empty();
        let entries: Vec<Utf8PathBuf> = entry_points.into_iter().collect();
        for entry in &entries {
            graph.data.entry_points.insert(entry.clone());
        }

        let mut queue: std::collections::VecDeque<Utf8PathBuf> = entries.into_iter().collect();
        let mut queued: std::collections::HashSet<Utf8PathBuf> = queue.iter().cloned().collect();

        while let Some(path) = queue.pop_front() {
            if graph.data.modules.contains_key(&path) {
                continue;
            }
            graph.load_and_insert(&path, driver)?;
            let dep_targets: Vec<Option<Utf8PathBuf>> = graph.data.modules[&path]
                .dependencies
                .iter()
                .map(|d| d.resolved.clone())
                .collect();
            for target in dep_targets.into_iter().flatten() {
                if !graph.data.modules.contains_key(&target) && !queued.contains(&target) {
                    queued.insert(target.clone());
                    queue.push_back(target);
                }
            }
        }

        graph.verify()?;
        Ok(graph)
    }

    /// Loads `path` via the driver, resolves its dependencies, and inserts it as a node
    /// (with edges to its -- possibly not-yet-loaded -- dependencies).
    fn load_and_insert<D: GraphDriver>(&mut self, path: &Utf8Path, driver: &mut D) -> Result<(), Error> {
        let loaded = driver.load(path).map_err(|e| Error::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let id = driver.module_id(path);
        let node_ix = self.node_ix(path);

        let mut dependencies = Vec::with_capacity(loaded.dependencies.len());
        for raw in loaded.dependencies {
            let resolved = driver.resolve(path, &raw.specifier).map_err(|e| Error::ResolveFailed {
                origin: path.to_path_buf(),
                specifier: raw.specifier.clone(),
                message: e.to_string(),
                code_frame: raw.locations.first().and_then(|loc| crate::module::render_code_frame(&loaded.code, *loc)),
            })?;
            let (resolved_path, asset_candidates) = match resolved {
                ResolvedSpecifier::SourceFile(p) => (Some(p.clone()), vec![p]),
                ResolvedSpecifier::AssetFiles(mut paths) => {
                    // Tie-break: lexicographically smallest path wins (spec §4.3).
                    paths.sort();
                    let smallest = paths.first().cloned();
                    (smallest, paths)
                }
                ResolvedSpecifier::Empty => (None, Vec::new()),
            };
            let dep_index = dependencies.len() as u32;
            if let Some(target) = &resolved_path {
                let target_ix = self.node_ix(target);
                self.dep_graph.add_edge(node_ix, target_ix, DependencyEdge { dep_index });
            }
            dependencies.push(Dependency {
                specifier: raw.specifier,
                kind: raw.kind,
                locations: raw.locations,
                resolved: resolved_path,
                asset_candidates,
            });
        }

        self.data.modules.insert(
            path.to_path_buf(),
            ModuleRecordImpl {
                id,
                node_ix,
                fingerprint: loaded.fingerprint,
                code: loaded.code,
                source_map: loaded.source_map,
                asset_metadata: loaded.asset_metadata,
                dependencies,
            },
        );
        Ok(())
    }

    /// Removes every outgoing edge from `path`'s node, leaving the node itself (and its
    /// module record) in place. Used before re-resolving a modified module's
    /// dependencies, and before deleting a module outright.
    fn clear_outgoing_edges(&mut self, path: &Utf8Path) {
        if let Some(&node_ix) = self.paths.get(path) {
            let edges: Vec<_> = self
                .dep_graph
                .edges_directed(node_ix, Direction::Outgoing)
                .map(|e| e.id())
                .collect();
            for edge in edges {
                self.dep_graph.remove_edge(edge);
            }
        }
    }

    /// Applies a batch of watcher-driven file events to the graph (spec §4.6,
    /// "Incremental update"). The batch is applied transactionally: on any driver
    /// error, the graph is rolled back to its pre-batch state (spec §4.6,
    /// "Atomicity").
    pub fn apply_batch<D: GraphDriver>(
        &mut self,
        modified: &[Utf8PathBuf],
        deleted: &[Utf8PathBuf],
        driver: &mut D,
    ) -> Result<Delta, Error> {
        let backup = self.clone();
        match self.apply_batch_inner(modified, deleted, driver) {
            Ok(delta) => Ok(delta),
            Err(e) => {
                *self = backup;
                Err(e)
            }
        }
    }

    fn apply_batch_inner<D: GraphDriver>(
        &mut self,
        modified: &[Utf8PathBuf],
        deleted: &[Utf8PathBuf],
        driver: &mut D,
    ) -> Result<Delta, Error> {
        let mut added_paths: IndexSet<Utf8PathBuf> = IndexSet::new();
        let mut modified_paths: IndexSet<Utf8PathBuf> = IndexSet::new();
        let mut forced_deleted: Vec<Utf8PathBuf> = Vec::new();

        // Deleted files: unconditionally drop the node (spec §4.6, "for each, if
        // present in nodes, mark for removal"). Anything that was the sole referrer of
        // one of these is picked up by the reachability sweep below.
        for path in deleted {
            if self.data.modules.contains_key(path) {
                self.remove_node(path, driver);
                forced_deleted.push(path.clone());
            }
        }

        // Modified files: re-transform, diff the dependency list, and re-resolve any
        // newly appearing specifiers (spec §4.6, "Propagation").
        let mut queue: std::collections::VecDeque<Utf8PathBuf> = std::collections::VecDeque::new();
        for path in modified {
            if !self.data.modules.contains_key(path) {
                // Not yet part of the graph; irrelevant unless a dependent pulls it in
                // below, which re-transforms it as part of normal traversal.
                continue;
            }
            self.reload_module(path, driver, &mut modified_paths)?;
            queue.push_back(path.clone());
        }

        // Transitively load any newly discovered dependency targets.
        while let Some(path) = queue.pop_front() {
            let dep_targets: Vec<Option<Utf8PathBuf>> = self.data.modules[&path]
                .dependencies
                .iter()
                .map(|d| d.resolved.clone())
                .collect();
            for target in dep_targets.into_iter().flatten() {
                if !self.data.modules.contains_key(&target) {
                    self.load_and_insert(&target, driver)?;
                    added_paths.insert(target.clone());
                    queue.push_back(target);
                }
            }
        }

        // Mark-and-sweep orphan collection (spec §9): anything unreachable from the
        // entry set is garbage, cycles included.
        let roots = self
            .data
            .entry_points
            .iter()
            .filter_map(|p| self.paths.get(p).copied());
        let reachable = reachability::reachable_from(&self.dep_graph, roots);

        let mut deleted_paths: Vec<Utf8PathBuf> = forced_deleted;
        let unreachable: Vec<Utf8PathBuf> = self
            .paths
            .iter()
            .filter(|(_, ix)| !reachable.contains(ix.index()))
            .map(|(path, _)| path.clone())
            .collect();
        for path in unreachable {
            self.remove_node(&path, driver);
            added_paths.shift_remove(&path);
            modified_paths.shift_remove(&path);
            deleted_paths.push(path);
        }

        let revision = self.revision.next();
        self.revision = revision;

        let mut delta = Delta::empty(revision);
        for path in added_paths {
            delta.added.push(self.owned_module(&path));
        }
        for path in modified_paths {
            // A module that was added in this same batch (reachable transitively) is
            // reported only once, as "added".
            if self.data.modules.contains_key(&path) {
                delta.modified.push(self.owned_module(&path));
            }
        }
        delta.deleted = deleted_paths;

        self.verify()?;
        Ok(delta)
    }

    fn reload_module<D: GraphDriver>(
        &mut self,
        path: &Utf8Path,
        driver: &mut D,
        modified_paths: &mut IndexSet<Utf8PathBuf>,
    ) -> Result<(), Error> {
        let old_fingerprint = self.data.modules[path].fingerprint.clone();
        self.clear_outgoing_edges(path);
        self.load_and_insert(path, driver)?;
        if self.data.modules[path].fingerprint != old_fingerprint {
            modified_paths.insert(path.to_path_buf());
        }
        Ok(())
    }

    fn remove_node<D: GraphDriver>(&mut self, path: &Utf8Path, driver: &mut D) {
        driver.release_module_id(path);
        self.data.modules.remove(path);
        if let Some(ix) = self.paths.remove(path) {
            self.dep_graph.remove_node(ix);
            // petgraph's remove_node does an O(1) swap-remove that can invalidate the
            // last node index; patch up the reverse-lookup map for whichever path was
            // moved into the freed slot.
            if let Some(moved_path) = self.dep_graph.node_weight(ix) {
                self.paths.insert(moved_path.clone(), ix);
                if let Some(record) = self.data.modules.get_mut(moved_path) {
                    record.node_ix = ix;
                }
            }
        }
    }

    fn owned_module(&self, path: &Utf8Path) -> OwnedModule {
        self.module(path).expect("path just inserted/modified").into()
    }

    /// Returns information about dependency cycles in this graph (spec §9, "Cycles &
    /// back-references").
    pub fn cycles(&self) -> Vec<Vec<&Utf8Path>> {
        let sccs = Sccs::new(&self.dep_graph);
        sccs.cycles()
            .map(|scc| scc.iter().map(|ix| self.dep_graph[*ix].as_path()).collect())
            .collect()
    }

    /// Returns the current revision of this graph.
    pub fn revision(&self) -> RevisionId {
        self.revision
    }

    /// A full snapshot of every module currently in the graph, expressed as a `reset`
    /// delta (spec §4.7, `getDelta`: "if the journal doesn't contain `since`, reset is
    /// true and a full snapshot is enclosed in `added`"). Used by an embedder that keeps
    /// its own revision journal once that journal can't satisfy a caller's request.
    pub fn snapshot_delta(&self) -> Delta {
        let modules: Vec<OwnedModule> = self.modules().map(OwnedModule::from).collect();
        Delta::reset(modules, self.revision)
    }

    /// A delta reporting no changes, stamped with this graph's current revision. Used
    /// by an embedder whose caller already has this exact revision (spec §4.7,
    /// `getDelta`: nothing to report when `since` already names the latest revision).
    pub fn empty_delta(&self) -> Delta {
        Delta::empty(self.revision)
    }

    /// Returns the number of modules in this graph.
    pub fn module_count(&self) -> usize {
        self.data.modules.len()
    }

    /// Returns an iterator over the entry-point paths of this graph.
    pub fn entry_points(&self) -> impl Iterator<Item = &Utf8Path> {
        self.data.entry_points.iter().map(|p| p.as_path())
    }

    /// Returns an iterator over every module in this graph.
    pub fn modules(&self) -> impl Iterator<Item = Module<'_>> {
        self.data.modules.keys().map(move |path| self.module(path).expect("key from modules map"))
    }

    /// Returns the module at `path`, if present.
    pub fn module(&self, path: &Utf8Path) -> Option<Module<'_>> {
        let inner = self.data.modules.get(path)?;
        Some(Module { graph: self, path, inner })
    }

    /// Looks up a module by its previously assigned [`ModuleId`]. `O(n)`; intended for
    /// diagnostics and tests, not hot paths.
    pub fn module_by_id(&self, id: ModuleId) -> Option<Module<'_>> {
        self.data
            .modules
            .iter()
            .find(|(_, record)| record.id == id)
            .map(|(path, inner)| Module { graph: self, path, inner })
    }

    /// Verifies internal invariants G1-G4 (spec §3, "Graph"). Not part of the
    /// documented public API surface used in production; primarily for tests and
    /// `debug_assert!`-style self-checks after a batch.
    pub fn verify(&self) -> Result<(), Error> {
        if self.dep_graph.node_count() != self.data.modules.len() {
            return Err(Error::GraphInternalError(format!(
                "node count {} does not match module count {}",
                self.dep_graph.node_count(),
                self.data.modules.len(),
            )));
        }
        for (path, record) in &self.data.modules {
            // G4: every resolved dependency path is present as a node.
            for dep in &record.dependencies {
                if let Some(target) = &dep.resolved {
                    if !self.data.modules.contains_key(target) {
                        return Err(Error::GraphInternalError(format!(
                            "{} depends on {}, which is not in the graph",
                            path, target
                        )));
                    }
                }
            }
            // G2: every non-entry node has at least one inverse edge.
            if !self.data.entry_points.contains(path) {
                let in_degree = self
                    .dep_graph
                    .edges_directed(record.node_ix, Direction::Incoming)
                    .count();
                if in_degree == 0 {
                    return Err(Error::GraphInternalError(format!(
                        "{} is not an entry point and has no inverse edges",
                        path
                    )));
                }
            }
        }
        // G3: module IDs are unique.
        let mut ids: Vec<ModuleId> = self.data.modules.values().map(|r| r.id).collect();
        ids.sort();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::GraphInternalError("duplicate module IDs in graph".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("module_count", &self.module_count())
            .field("revision", &self.revision)
            .field("entry_points", &self.data.entry_points)
            .finish()
    }
}

/// A view onto a single module in a [`Graph`] (spec §3, "Module (graph node)").
#[derive(Copy, Clone)]
pub struct Module<'g> {
    graph: &'g Graph,
    path: &'g Utf8Path,
    inner: &'g ModuleRecordImpl,
}

impl<'g> Module<'g> {
    pub fn path(&self) -> &'g Utf8Path {
        self.path
    }

    pub fn id(&self) -> ModuleId {
        self.inner.id
    }

    pub fn fingerprint(&self) -> &'g Fingerprint {
        &self.inner.fingerprint
    }

    pub fn code(&self) -> &'g str {
        &self.inner.code
    }

    pub fn source_map(&self) -> Option<&'g str> {
        self.inner.source_map.as_deref()
    }

    pub fn asset_metadata(&self) -> Option<&'g serde_json::Value> {
        self.inner.asset_metadata.as_ref()
    }

    /// Returns this module's dependencies, in source order (spec invariant, §3
    /// "Module"; tested by §8 I7).
    pub fn dependencies(&self) -> &'g [Dependency] {
        &self.inner.dependencies
    }

    /// Returns true if this module is one of the graph's entry points.
    pub fn is_entry_point(&self) -> bool {
        self.graph.data.entry_points.contains(self.path)
    }

    /// Returns the modules that depend on this one (spec §3, "Inverse edges").
    pub fn inverse_dependents(&self) -> impl Iterator<Item = Module<'g>> + 'g {
        let graph = self.graph;
        graph
            .dep_graph
            .edges_directed(self.inner.node_ix, Direction::Incoming)
            .map(move |edge| {
                let path = &graph.dep_graph[edge.source()];
                graph.module(path).expect("source of edge must exist")
            })
    }
}

impl<'g> fmt::Debug for Module<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("path", &self.path)
            .field("id", &self.inner.id)
            .field("dependencies", &self.inner.dependencies.len())
            .finish()
    }
}

impl<'g> PartialEq for Module<'g> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.path == other.path
    }
}

impl<'g> Eq for Module<'g> {}
