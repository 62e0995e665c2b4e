// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Error, Utf8Path, Utf8PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Raw event kind as reported by a backend, before coalescing/debouncing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackendEventKind {
    Create,
    Modify,
    Remove,
    /// A kind the backend can't classify (e.g. a rename); treated as `touch`
    /// for every path it names, matching the conservative handling in
    /// `notify`-based watchers upstream.
    Other,
}

/// A single raw notification from a backend, ahead of `FileMap`'s own
/// per-path coalescing (spec §4.1, §5 "coalesced per path within a debouncing
/// window").
#[derive(Clone, Debug)]
pub struct BackendEvent {
    pub path: Utf8PathBuf,
    pub kind: BackendEventKind,
}

/// Backends are variants over capability set `{watch(root, cb), stop()}`
/// (spec §4.1). The default backend performs a recursive readdir on start,
/// then subscribes to OS change notifications; `FileMap` does the crawl
/// itself and only uses the backend for the live stream.
pub trait FileSystemBackend: Send {
    fn watch(&mut self, root: &Utf8Path, sender: mpsc::Sender<Result<BackendEvent, Error>>) -> Result<(), Error>;

    /// Stops watching. Per spec §4.1, backends may require a bounded cooldown
    /// (~100ms) before their resources are guaranteed released; implementations
    /// must not return before that cooldown elapses.
    fn stop(&mut self) -> Result<(), Error>;
}

/// Default backend, grounded on `notify::RecommendedWatcher` (the same choice
/// made by `turborepo-filewatch` for non-macOS platforms).
pub struct NotifyBackend {
    watcher: Option<notify::RecommendedWatcher>,
}

impl NotifyBackend {
    pub fn new() -> Self {
        NotifyBackend { watcher: None }
    }
}

impl Default for NotifyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystemBackend for NotifyBackend {
    fn watch(&mut self, root: &Utf8Path, sender: mpsc::Sender<Result<BackendEvent, Error>>) -> Result<(), Error> {
        use notify::{EventKind, RecursiveMode, Watcher};

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                let kind = match event.kind {
                    EventKind::Create(_) => BackendEventKind::Create,
                    EventKind::Modify(_) => BackendEventKind::Modify,
                    EventKind::Remove(_) => BackendEventKind::Remove,
                    _ => BackendEventKind::Other,
                };
                for path in event.paths {
                    if let Ok(path) = Utf8PathBuf::try_from(path) {
                        let _ = sender.send(Ok(BackendEvent { path, kind }));
                    }
                }
            }
            Err(e) => {
                let _ = sender.send(Err(Error::BackendRuntimeError { message: e.to_string() }));
            }
        })
        .map_err(|e| Error::BackendStartFailed {
            root: root.to_path_buf(),
            message: e.to_string(),
        })?;

        watcher.watch(root.as_std_path(), RecursiveMode::Recursive).map_err(|e| Error::BackendStartFailed {
            root: root.to_path_buf(),
            message: e.to_string(),
        })?;

        self.watcher = Some(watcher);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Error> {
        // Dropping the watcher tears down the OS-level subscription; the
        // notify backends on some platforms (inotify, FSEvents) need a short
        // grace period before their file descriptors/threads are reclaimed.
        self.watcher.take();
        std::thread::sleep(Duration::from_millis(100));
        Ok(())
    }
}
