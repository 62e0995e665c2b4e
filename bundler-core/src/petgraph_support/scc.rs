// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

// Grounded on guppy/src/petgraph_support/scc.rs: memoize kosaraju_scc (iterative, unlike
// tarjan_scc, which matters once graphs get deep) and expose only the multi-node SCCs,
// since those are the only ones relevant to cycle reporting.

use petgraph::graph::{DiGraph, IndexType, NodeIndex};

#[derive(Clone, Debug)]
pub(crate) struct Sccs<Ix: IndexType> {
    sccs: Vec<Vec<NodeIndex<Ix>>>,
}

impl<Ix: IndexType> Sccs<Ix> {
    pub(crate) fn new<N, E>(graph: &DiGraph<N, E, Ix>) -> Self {
        let sccs = petgraph::algo::kosaraju_scc(graph);
        Self { sccs }
    }

    /// Returns all the strongly connected components with more than one member, i.e.
    /// genuine cycles rather than single nodes.
    pub(crate) fn cycles(&self) -> impl Iterator<Item = &[NodeIndex<Ix>]> {
        self.sccs
            .iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.as_slice())
    }
}
