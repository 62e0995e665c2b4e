// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains types that describe errors that `bundler-watcher` methods can return.

use std::error;
use std::fmt;

use crate::Utf8PathBuf;
use Error::*;

/// Error type describing the sorts of errors the file map and watcher can return.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The backend failed to start watching a root (spec §4.1: "Backends are
    /// variants over capability set {watch(root, cb), stop()}").
    BackendStartFailed { root: Utf8PathBuf, message: String },
    /// The backend reported an error on an already-running watch. Per §4.1 this
    /// does not abort `ready`; it is surfaced to subscribers as an `error` event
    /// instead of returned from `start`.
    BackendRuntimeError { message: String },
    /// An invalid ignore regex was supplied.
    InvalidIgnoreRegex { pattern: String, message: String },
    /// An invalid glob pattern was supplied to a subscription predicate
    /// (spec §4.1: "predicate ... typically a glob + dot-file + ignore regex
    /// filter").
    InvalidGlobPattern { pattern: String, message: String },
    /// Crawling a root failed outright (e.g. the root does not exist).
    CrawlFailed { root: Utf8PathBuf, message: String },
    /// `close()` was called twice, or `subscribe`/`stat` was called after `close()`.
    Closed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStartFailed { root, message } => write!(f, "failed to start watching {}: {}", root, message),
            BackendRuntimeError { message } => write!(f, "watcher backend error: {}", message),
            InvalidIgnoreRegex { pattern, message } => write!(f, "invalid ignore pattern '{}': {}", pattern, message),
            InvalidGlobPattern { pattern, message } => write!(f, "invalid glob pattern '{}': {}", pattern, message),
            CrawlFailed { root, message } => write!(f, "failed to crawl {}: {}", root, message),
            Closed => write!(f, "file map is closed"),
        }
    }
}

impl error::Error for Error {}
