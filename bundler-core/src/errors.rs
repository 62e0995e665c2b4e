// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains types that describe errors that `bundler-core` methods can return.

use crate::Utf8PathBuf;
use std::error;
use std::fmt;

use Error::*;

/// Error type describing the sorts of errors the graph engine can return.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A path was requested that isn't present in this graph.
    UnknownModule(Utf8PathBuf),
    /// An internal invariant of the graph was violated. Surfacing this is always a bug.
    GraphInternalError(String),
    /// The driver failed while loading or transforming a module.
    LoadFailed {
        /// The module that failed to load.
        path: Utf8PathBuf,
        /// The underlying driver error, formatted eagerly so this type stays driver-agnostic.
        message: String,
    },
    /// The driver failed to resolve a dependency specifier.
    ResolveFailed {
        /// The module the specifier was found in.
        origin: Utf8PathBuf,
        /// The textual specifier that failed to resolve.
        specifier: String,
        /// The underlying driver error, formatted eagerly so this type stays driver-agnostic.
        message: String,
        /// A code frame pointing at the specifier's first source location, when the
        /// transformer reported one (spec §4.3: "wrapped ... with a code-frame
        /// pointing at the source location recorded on the dependency").
        code_frame: Option<String>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownModule(path) => write!(f, "unknown module: {}", path),
            GraphInternalError(msg) => write!(f, "internal error in module graph: {}", msg),
            LoadFailed { path, message } => write!(f, "failed to load {}: {}", path, message),
            ResolveFailed {
                origin,
                specifier,
                message,
                code_frame,
            } => {
                write!(f, "failed to resolve '{}' from {}: {}", specifier, origin, message)?;
                if let Some(frame) = code_frame {
                    write!(f, "\n{}", frame)?;
                }
                Ok(())
            }
        }
    }
}

impl error::Error for Error {}
