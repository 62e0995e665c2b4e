// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transform worker pool (spec §4.5), the layered transform cache that sits in
//! front of it (spec §4.4), and the constant-folding pass that is part of the
//! transform contract.
//!
//! The concrete AST transformer -- parsing source, applying Babel/swc-style
//! transforms, and emitting code + dependency specifiers -- is a pluggable external
//! collaborator (spec §1, "Deliberately out of scope"); this crate only owns the
//! *scheduling* around it ([`TransformWorkerPool`]), the *caching* in front of it
//! ([`TransformCache`]), and the small, self-contained *constant-folding* algorithm
//! that the transform contract requires afterwards ([`fold`]).

mod cache;
mod errors;
pub mod fold;
#[cfg(test)]
mod unit_tests;
mod worker_pool;

pub use cache::{MemoryStore, TransformCache, TransformStore};
pub use errors::Error;
pub use worker_pool::{
    DependencyKind, RawTransformOutput, SourceLocation, TransformDependency, Transformer, TransformOptions, TransformResult,
    TransformWorkerPool,
};

#[doc(no_inline)]
pub use camino::{Utf8Path, Utf8PathBuf};
