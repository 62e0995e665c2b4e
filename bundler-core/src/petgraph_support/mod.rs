// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small helpers built on top of `petgraph` primitives, split out the way `guppy` keeps
//! its own petgraph glue in a dedicated `petgraph_support` module rather than inlining
//! it into the graph implementation.

pub(crate) mod reachability;
pub(crate) mod scc;
