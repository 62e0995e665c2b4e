// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The module graph and its delta-maintenance algorithm.
//!
//! `bundler-core` owns the *(entry, options) -> Graph* data structure described in the
//! bundler's design: a flat arena of [`Module`] nodes connected by ordered dependency
//! edges, with inverse edges used for reference counting and orphan collection. The
//! graph itself performs no I/O; callers supply a [`GraphDriver`] that resolves
//! specifiers and transforms source files. This mirrors how `guppy`'s `PackageGraph` is
//! a pure function of parsed `cargo metadata`, with no knowledge of how that metadata
//! was produced.

mod delta;
pub mod errors;
mod graph_impl;
mod module;
mod module_id;
pub(crate) mod petgraph_support;
mod revision;
#[cfg(test)]
mod unit_tests;

pub use delta::Delta;
pub use errors::Error;
pub use graph_impl::{Graph, GraphDriver, LoadedModule, Module, RawDependency, ResolvedSpecifier};
pub use module::{Dependency, DependencyKind, Fingerprint, SourceLocation};
pub use module_id::{ModuleId, ModuleIdFactory, SequentialModuleIdFactory};
pub use revision::RevisionId;

#[doc(no_inline)]
pub use camino::{Utf8Path, Utf8PathBuf};
