// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::backend::{BackendEvent, BackendEventKind, FileSystemBackend};
use crate::event::{Event, EventKind, FileKind, Metadata};
use crate::health_check::{HealthCheck, HealthCheckAction, HealthCheckConfig};
use crate::ignore::IgnorePolicy;
use crate::{Error, Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A message delivered to a `Subscription` (spec §4.1: events; plus crawl/watch
/// errors surfaced on an `error` channel per §5 without aborting `ready`).
#[derive(Clone, Debug)]
pub enum Message {
    Changed(Event),
    Error(String),
}

struct Subscriber {
    predicate: Arc<dyn Fn(&Event) -> bool + Send + Sync>,
    sender: mpsc::Sender<Message>,
}

/// A live handle returned by `FileMap::subscribe`.
pub struct Subscription {
    receiver: mpsc::Receiver<Message>,
}

impl Subscription {
    pub fn recv(&self) -> Result<Message, mpsc::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<Message, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Message, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn iter(&self) -> mpsc::Iter<'_, Message> {
        self.receiver.iter()
    }
}

/// `watch(root, cb) -> stopFn` (spec §6, "Watcher port"): the recursive crawl
/// plus live change stream, coalesced and debounced per path (spec §5).
pub struct FileMap {
    root: Utf8PathBuf,
    extensions: Vec<String>,
    ignore: IgnorePolicy,
    debounce: Duration,
    known_paths: Mutex<IndexSet<Utf8PathBuf>>,
    subscribers: Mutex<Vec<Subscriber>>,
    backend: Mutex<Box<dyn FileSystemBackend>>,
    worker: Mutex<Option<std::thread::JoinHandle<()>>>,
    health_check_config: HealthCheckConfig,
    closed: AtomicBool,
}

/// Type alias matching the port name used in spec §6.
pub type Watcher = FileMap;

impl FileMap {
    pub fn new(root: Utf8PathBuf, extensions: Vec<String>, ignore: IgnorePolicy, backend: Box<dyn FileSystemBackend>) -> Self {
        FileMap {
            root,
            extensions,
            ignore,
            debounce: Duration::from_millis(50),
            known_paths: Mutex::new(IndexSet::new()),
            subscribers: Mutex::new(Vec::new()),
            backend: Mutex::new(backend),
            worker: Mutex::new(None),
            health_check_config: HealthCheckConfig::default(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_health_check(mut self, config: HealthCheckConfig) -> Self {
        self.health_check_config = config;
        self
    }

    /// The set of relative paths currently known to the file map (the crawl
    /// result, kept live by subsequent events).
    pub fn files(&self) -> Vec<Utf8PathBuf> {
        self.known_paths.lock().unwrap().iter().cloned().collect()
    }

    /// Completes when the initial crawl is done and the backend is watching.
    /// Crawl errors do not abort this call; they are broadcast as
    /// `Message::Error` to any subscribers registered so far.
    pub fn start(self: &Arc<Self>) -> Result<(), Error> {
        let (files, crawl_errors) = self.crawl();
        {
            let mut known = self.known_paths.lock().unwrap();
            for path in files {
                known.insert(path);
            }
        }
        for error in &crawl_errors {
            log::warn!("{}", error);
        }
        let crawl_messages: Vec<String> = crawl_errors.iter().map(|e| e.to_string()).collect();
        self.broadcast_errors(&crawl_messages);

        let (raw_tx, raw_rx) = mpsc::channel::<Result<BackendEvent, Error>>();
        self.backend.lock().unwrap().watch(&self.root, raw_tx)?;

        let this = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name("file-map-watcher".to_string())
            .spawn(move || this.run(raw_rx))
            .expect("failed to spawn file map watcher thread");
        *self.worker.lock().unwrap() = Some(handle);
        Ok(())
    }

    fn run(&self, raw_rx: mpsc::Receiver<Result<BackendEvent, Error>>) {
        let mut pending: HashMap<Utf8PathBuf, EventKind> = HashMap::new();
        let mut health_check = HealthCheck::new(self.health_check_config, Instant::now());
        loop {
            match raw_rx.recv_timeout(self.debounce) {
                Ok(Ok(event)) => {
                    health_check.record_event(Instant::now());
                    self.fold_raw_event(event, &mut pending);
                }
                Ok(Err(e)) => {
                    log::warn!("watcher backend error: {}", e);
                    self.broadcast_errors(&[e.to_string()]);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    self.flush(&mut pending);
                    if health_check.tick(Instant::now()) == HealthCheckAction::Restart {
                        log::warn!("watcher health check failed; backend appears unresponsive");
                        self.broadcast_errors(&["health check timed out".to_string()]);
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    self.flush(&mut pending);
                    return;
                }
            }
        }
    }

    fn fold_raw_event(&self, event: BackendEvent, pending: &mut HashMap<Utf8PathBuf, EventKind>) {
        if self.ignore.is_ignored(&event.path) {
            return;
        }
        let relative_path = match event.path.strip_prefix(&self.root) {
            Ok(p) => p.to_path_buf(),
            Err(_) => return,
        };
        if !self.extensions.is_empty() && !matches_extension(&relative_path, &self.extensions) {
            return;
        }

        let mut known = self.known_paths.lock().unwrap();
        match event.kind {
            BackendEventKind::Remove => {
                // A delete is only emitted for a path we already knew about
                // (spec §4.1); spurious deletes for untracked paths are
                // suppressed.
                if known.shift_remove(&relative_path) {
                    pending.insert(relative_path, EventKind::Delete);
                }
            }
            BackendEventKind::Create | BackendEventKind::Modify | BackendEventKind::Other => {
                known.insert(relative_path.clone());
                // Last write wins within the debounce window: touch,touch ->
                // touch; touch,delete -> delete; delete,touch -> touch
                // (spec §5).
                pending.insert(relative_path, EventKind::Touch);
            }
        }
    }

    fn flush(&self, pending: &mut HashMap<Utf8PathBuf, EventKind>) {
        if pending.is_empty() {
            return;
        }
        let root = self.root.clone();
        for (relative_path, kind) in pending.drain() {
            let metadata = if kind == EventKind::Touch {
                self.stat(&root.join(&relative_path)).ok().flatten()
            } else {
                None
            };
            let event = Event {
                kind,
                relative_path,
                root: root.clone(),
                metadata,
            };
            self.dispatch(event);
        }
    }

    fn dispatch(&self, event: Event) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|subscriber| {
            if !(subscriber.predicate)(&event) {
                return true;
            }
            subscriber.sender.send(Message::Changed(event.clone())).is_ok()
        });
    }

    fn broadcast_errors(&self, messages: &[String]) {
        let mut subscribers = self.subscribers.lock().unwrap();
        for message in messages {
            subscribers.retain(|subscriber| subscriber.sender.send(Message::Error(message.clone())).is_ok());
        }
    }

    /// Delivers events (and crawl/backend errors) matching `predicate`
    /// (spec §4.1: "typically a glob + dot-file + ignore regex filter").
    pub fn subscribe<F>(&self, predicate: F) -> Subscription
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(Subscriber {
            predicate: Arc::new(predicate),
            sender: tx,
        });
        Subscription { receiver: rx }
    }

    /// `lstat`-style probe. A failed stat is swallowed (returns `Ok(None)`)
    /// unless it's an error other than "not found", matching spec §4.1's
    /// "a failed lstat ... is swallowed ... (treated as irrelevant)".
    pub fn stat(&self, path: &Utf8Path) -> Result<Option<Metadata>, Error> {
        match std::fs::symlink_metadata(path.as_std_path()) {
            Ok(metadata) => {
                let kind = if metadata.file_type().is_symlink() {
                    FileKind::Symlink
                } else if metadata.is_dir() {
                    FileKind::Directory
                } else {
                    FileKind::File
                };
                let mtime_ms = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_millis())
                    .unwrap_or(0);
                Ok(Some(Metadata {
                    mtime_ms,
                    size: metadata.len(),
                    kind,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(_) => Ok(None),
        }
    }

    /// Stops the backend and joins the background thread. The bounded
    /// cooldown on backend teardown (spec §4.1, ~100ms) happens inside
    /// `FileSystemBackend::stop`; this call does not return before it elapses.
    /// Closing an already-closed file map is an error.
    pub fn close(&self) -> Result<(), Error> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        self.backend.lock().unwrap().stop()?;
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn crawl(&self) -> (Vec<Utf8PathBuf>, Vec<Error>) {
        let mut files = Vec::new();
        let mut errors = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let entries = match std::fs::read_dir(dir.as_std_path()) {
                Ok(entries) => entries,
                Err(e) => {
                    errors.push(Error::CrawlFailed { root: dir.clone(), message: e.to_string() });
                    continue;
                }
            };
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        errors.push(Error::CrawlFailed { root: dir.clone(), message: e.to_string() });
                        continue;
                    }
                };
                let path = match Utf8PathBuf::try_from(entry.path()) {
                    Ok(path) => path,
                    Err(_) => continue,
                };
                if self.ignore.is_ignored(&path) {
                    continue;
                }
                let file_type = match entry.file_type() {
                    Ok(ft) => ft,
                    Err(e) => {
                        errors.push(Error::CrawlFailed { root: path.clone(), message: e.to_string() });
                        continue;
                    }
                };
                if file_type.is_dir() {
                    stack.push(path);
                } else {
                    let relative_path = match path.strip_prefix(&self.root) {
                        Ok(p) => p.to_path_buf(),
                        Err(_) => continue,
                    };
                    if self.extensions.is_empty() || matches_extension(&relative_path, &self.extensions) {
                        files.push(relative_path);
                    }
                }
            }
        }

        (files, errors)
    }
}

fn matches_extension(path: &Utf8Path, extensions: &[String]) -> bool {
    match path.extension() {
        Some(ext) => extensions.iter().any(|candidate| candidate == ext),
        None => false,
    }
}
