// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Utf8PathBuf;

/// `touch` subsumes both *add* and *modify* (spec §4.1); consumers disambiguate
/// via their own tracking set. A `delete` is only ever emitted for a path the
/// file map already knew about, so spurious deletes are suppressed upstream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    Touch,
    Delete,
}

/// What kind of filesystem entry a path names, as discovered by `lstat`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
}

/// The result of an `lstat`-style probe (spec §4.1: `stat(path) → {mtimeMs,
/// size, type} | null`).
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    pub mtime_ms: u128,
    pub size: u64,
    pub kind: FileKind,
}

/// A single coalesced change (spec §4.1: `{event, relativePath, root,
/// metadata?}`).
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub relative_path: Utf8PathBuf,
    pub root: Utf8PathBuf,
    pub metadata: Option<Metadata>,
}

impl Event {
    pub fn absolute_path(&self) -> Utf8PathBuf {
        self.root.join(&self.relative_path)
    }
}
