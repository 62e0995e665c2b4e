// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains the top-level error type aggregating every component's errors (spec §7).

use crate::incremental::GraphId;
use camino::Utf8PathBuf;
use std::error;
use std::fmt;

use Error::*;

/// Error type describing the sorts of errors `bundler`'s driver and
/// `IncrementalBundler` can return.
///
/// Mirrors spec §7's five error kinds plus `WorkerCrash`. `CacheWriteError` has no
/// variant here: per §7 it is "aggregated across failing stores; logged but
/// NON-fatal", so the driver logs it (`log::warn!`) and proceeds rather than
/// propagating it as an `Error`.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// §7 (1) ResolutionError: surfaced with a code frame, never retried.
    Resolution(bundler_resolver::Error),
    /// §7 (2) TransformError: the offending module is not inserted; the caller gets a
    /// partial-build error.
    Transform(bundler_transform::Error),
    /// §7 (4) CacheReadError: fatal to the current `get`, failing the current build.
    CacheRead { store: String, message: String },
    /// §7 (6) WorkerCrash: internal; the pool already retries once before surfacing
    /// this.
    WorkerCrash { path: Utf8PathBuf },
    /// A filesystem read failed outside the transform/resolve seams (e.g. reading the
    /// entry file itself).
    Io { path: Utf8PathBuf, message: String },
    /// The graph engine reported an internal error (invariant violation, or a
    /// driver-reported load/resolve failure already wrapped above).
    Graph(bundler_core::Error),
    /// §7 (5) WatcherError: non-fatal to the graph (it continues on its last known
    /// snapshot), but fatal to the specific watcher operation that surfaced it.
    Watcher(bundler_watcher::Error),
    /// `getDelta`/`endGraph` was called with a `graphId` that has no corresponding
    /// live graph (never built, or already ended).
    UnknownGraph(GraphId),
    /// The graph's initial build failed; every caller waiting on the same in-flight
    /// build (spec §4.7: concurrent `buildGraph` calls for the same `graphId` share
    /// one build) sees this, stringified, since the original error isn't `Clone`.
    BuildFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution(e) => write!(f, "resolution failed: {}", e),
            Transform(e) => write!(f, "transform failed: {}", e),
            CacheRead { store, message } => write!(f, "cache read failed ({}): {}", store, message),
            WorkerCrash { path } => write!(f, "transform worker crashed while processing {}", path),
            Io { path, message } => write!(f, "io error at {}: {}", path, message),
            Graph(e) => write!(f, "graph error: {}", e),
            Watcher(e) => write!(f, "watcher error: {}", e),
            UnknownGraph(id) => write!(f, "unknown graph id: {}", id),
            BuildFailed(message) => write!(f, "graph build failed: {}", message),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Resolution(e) => Some(e),
            Transform(e) => Some(e),
            Graph(e) => Some(e),
            Watcher(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bundler_resolver::Error> for Error {
    fn from(e: bundler_resolver::Error) -> Self {
        Error::Resolution(e)
    }
}

impl From<bundler_transform::Error> for Error {
    fn from(e: bundler_transform::Error) -> Self {
        Error::Transform(e)
    }
}

impl From<bundler_core::Error> for Error {
    fn from(e: bundler_core::Error) -> Self {
        Error::Graph(e)
    }
}

impl From<bundler_watcher::Error> for Error {
    fn from(e: bundler_watcher::Error) -> Self {
        Error::Watcher(e)
    }
}
