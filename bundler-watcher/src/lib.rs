// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The file map and change watcher (spec §4.1): a recursive crawl of every
//! watch root followed by a coalesced, debounced stream of `touch`/`delete`
//! events, plus the ignore policy (glob/regex + dot-file exclusion) consumers
//! filter subscriptions through.

mod backend;
mod errors;
mod event;
mod file_map;
mod health_check;
mod ignore;
mod predicate;
#[cfg(test)]
mod unit_tests;

pub use backend::{BackendEvent, BackendEventKind, FileSystemBackend, NotifyBackend};
pub use errors::Error;
pub use event::{Event, EventKind, FileKind, Metadata};
pub use file_map::{FileMap, Message, Subscription, Watcher};
pub use health_check::{HealthCheck, HealthCheckConfig};
pub use ignore::IgnorePolicy;
pub use predicate::glob_predicate;

pub use camino::{Utf8Path, Utf8PathBuf};
