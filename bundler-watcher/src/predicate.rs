// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Error, Event};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Builds a `subscribe` predicate matching any of `patterns` against an
/// event's path relative to the watch root (spec §4.1: "predicate ...
/// typically a glob + dot-file + ignore regex filter" -- the dot-file and
/// ignore-regex halves are already applied upstream by `FileMap`'s own
/// `IgnorePolicy`, so this only needs to cover the glob half).
pub fn glob_predicate(patterns: &[&str]) -> Result<impl Fn(&Event) -> bool + Send + Sync + 'static, Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| Error::InvalidGlobPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    let set: GlobSet = builder.build().map_err(|e| Error::InvalidGlobPattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })?;
    Ok(move |event: &Event| set.is_match(event.relative_path.as_std_path()))
}
