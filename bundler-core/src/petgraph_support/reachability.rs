// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use fixedbitset::FixedBitSet;
use petgraph::graph::{DiGraph, IndexType, NodeIndex};

/// Computes the set of nodes reachable from `roots`, following outgoing edges.
///
/// This is the "mark" half of the mark-and-sweep orphan collection described in spec
/// §9 ("cycles are collected with a mark-and-sweep sweep over the nodes unreachable
/// from the entry set after each batch"). A plain multi-root DFS is sufficient and
/// correctly subsumes both the simple in-degree-reaches-zero case and strongly
/// connected orphan islands: a cycle with no path from any root is, by construction,
/// never visited.
pub(crate) fn reachable_from<N, E, Ix: IndexType>(
    graph: &DiGraph<N, E, Ix>,
    roots: impl IntoIterator<Item = NodeIndex<Ix>>,
) -> FixedBitSet {
    let mut seen = FixedBitSet::with_capacity(graph.node_count());
    let mut stack: Vec<NodeIndex<Ix>> = Vec::new();
    for root in roots {
        if !seen.contains(root.index()) {
            seen.insert(root.index());
            stack.push(root);
        }
    }
    while let Some(node) = stack.pop() {
        for neighbor in graph.neighbors(node) {
            if !seen.contains(neighbor.index()) {
                seen.insert(neighbor.index());
                stack.push(neighbor);
            }
        }
    }
    seen
}
