// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::backend::{BackendEvent, FileSystemBackend};
use crate::{Error, Utf8Path};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

/// A backend test double: `watch` just captures the sender so the test can
/// push synthetic raw events directly, bypassing the real OS watch.
pub struct FakeBackend {
    pub sender: Arc<Mutex<Option<mpsc::Sender<Result<BackendEvent, Error>>>>>,
    pub stopped: Arc<AtomicBool>,
}

impl FakeBackend {
    pub fn new() -> Self {
        FakeBackend {
            sender: Arc::new(Mutex::new(None)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle(&self) -> FakeBackendHandle {
        FakeBackendHandle {
            sender: self.sender.clone(),
            stopped: self.stopped.clone(),
        }
    }
}

#[derive(Clone)]
pub struct FakeBackendHandle {
    sender: Arc<Mutex<Option<mpsc::Sender<Result<BackendEvent, Error>>>>>,
    stopped: Arc<AtomicBool>,
}

impl FakeBackendHandle {
    pub fn send(&self, event: BackendEvent) {
        if let Some(sender) = self.sender.lock().unwrap().as_ref() {
            let _ = sender.send(Ok(event));
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl FileSystemBackend for FakeBackend {
    fn watch(&mut self, _root: &Utf8Path, sender: mpsc::Sender<Result<BackendEvent, Error>>) -> Result<(), Error> {
        *self.sender.lock().unwrap() = Some(sender);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.stopped.store(true, Ordering::SeqCst);
        *self.sender.lock().unwrap() = None;
        Ok(())
    }
}
