// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains types that describe errors that `bundler-transform` methods can return.

use std::error;
use std::fmt;

use Error::*;

/// Error type describing the sorts of errors the transform cache and worker pool can
/// return.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A cache store failed during `get` (spec §4.4: "On any store error during get:
    /// propagate -- get failures are fatal to this request").
    StoreGetFailed { store: String, message: String },
    /// One or more stores failed during `set` (spec §4.4: "Collect failures ... throw
    /// an aggregated error naming the stores that failed, preserving the individual
    /// causes").
    StoreSetFailed(Vec<(String, String)>),
    /// The transformer itself reported a failure for this file.
    TransformFailed { path: String, message: String },
    /// The worker assigned to this call panicked (spec §4.5, "Isolation"). The worker
    /// thread itself survives and keeps serving other calls; only this call fails.
    WorkerCrashed { path: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreGetFailed { store, message } => write!(f, "transform cache store '{}' failed on get: {}", store, message),
            StoreSetFailed(failures) => {
                write!(f, "transform cache set failed on {} store(s): ", failures.len())?;
                for (i, (store, message)) in failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", store, message)?;
                }
                Ok(())
            }
            TransformFailed { path, message } => write!(f, "failed to transform {}: {}", path, message),
            WorkerCrashed { path } => write!(f, "worker crashed while transforming {}", path),
        }
    }
}

impl error::Error for Error {}
