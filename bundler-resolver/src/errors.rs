// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains types that describe errors that `bundler-resolver` methods can return.

use crate::Utf8PathBuf;
use std::error;
use std::fmt;

use Error::*;

/// Error type describing the sorts of errors specifier resolution can return (spec
/// §4.3, "Error taxonomy"). All three variants are meant to be wrapped by the
/// embedder into a single user-facing error with a code-frame pointing at the source
/// location recorded on the dependency -- that wrapping lives in the `bundler` crate,
/// not here, so this type stays free of any notion of "source location".
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A relative or absolute specifier that could not be mapped to a file.
    FailedToResolvePath {
        origin: Utf8PathBuf,
        specifier: String,
        /// Every file path tried, in probe order.
        file_candidates: Vec<Utf8PathBuf>,
        /// Every directory path tried (for directory/`package.json` probing).
        dir_candidates: Vec<Utf8PathBuf>,
    },
    /// A bare specifier that could not be found in Haste or any `node_modules`.
    FailedToResolveName {
        origin: Utf8PathBuf,
        specifier: String,
        /// Every `node_modules` directory searched, in order.
        searched_dirs: Vec<Utf8PathBuf>,
        /// `extraNodeModules`/`nodeModulesPaths` entries consulted as a fallback.
        extra_paths: Vec<Utf8PathBuf>,
    },
    /// A structurally invalid specifier, e.g. an unsupported URL scheme.
    FailedToResolveUnsupported { specifier: String, reason: String },
    /// A `package.json` could not be parsed as JSON.
    InvalidPackageJson { path: Utf8PathBuf, message: String },
    /// The filesystem lookup reported an I/O failure while reading a `package.json`.
    Io { path: Utf8PathBuf, message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedToResolvePath {
                origin,
                specifier,
                file_candidates,
                dir_candidates,
            } => {
                write!(
                    f,
                    "failed to resolve '{}' from {} as a path (tried file candidates: {}; directory candidates: {})",
                    specifier,
                    origin,
                    join_paths(file_candidates),
                    join_paths(dir_candidates),
                )
            }
            FailedToResolveName {
                origin,
                specifier,
                searched_dirs,
                extra_paths,
            } => write!(
                f,
                "failed to resolve '{}' from {}: not found in node_modules directories: {}; extra paths: {}",
                specifier,
                origin,
                join_paths(searched_dirs),
                join_paths(extra_paths),
            ),
            FailedToResolveUnsupported { specifier, reason } => {
                write!(f, "cannot resolve '{}': {}", specifier, reason)
            }
            InvalidPackageJson { path, message } => {
                write!(f, "invalid package.json at {}: {}", path, message)
            }
            Io { path, message } => write!(f, "failed to read {}: {}", path, message),
        }
    }
}

impl error::Error for Error {}

/// Renders a candidate-path list for an error message (spec §8 scenario 3: "the
/// message names both candidate prefixes"); `"(none)"` when the list is empty so the
/// message still reads as a complete sentence.
fn join_paths(paths: &[Utf8PathBuf]) -> String {
    if paths.is_empty() {
        return "(none)".to_string();
    }
    paths.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
}
