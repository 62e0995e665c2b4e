// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::cache::TransformStore;
use crate::worker_pool::TransformResult;
use crate::TransformCache;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct RecordingStore {
    name: &'static str,
    entries: Mutex<std::collections::HashMap<String, TransformResult>>,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
    fail_get: bool,
    fail_set: bool,
}

impl RecordingStore {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(RecordingStore {
            name,
            entries: Mutex::new(std::collections::HashMap::new()),
            get_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
            fail_get: false,
            fail_set: false,
        })
    }

    fn failing_get(name: &'static str) -> Arc<Self> {
        Arc::new(RecordingStore {
            name,
            entries: Mutex::new(std::collections::HashMap::new()),
            get_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
            fail_get: true,
            fail_set: false,
        })
    }

    fn failing_set(name: &'static str) -> Arc<Self> {
        Arc::new(RecordingStore {
            name,
            entries: Mutex::new(std::collections::HashMap::new()),
            get_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
            fail_get: false,
            fail_set: true,
        })
    }
}

impl TransformStore for RecordingStore {
    fn name(&self) -> &str {
        self.name
    }

    fn get(&self, key: &str) -> Result<Option<TransformResult>, String> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get {
            return Err("simulated get failure".to_string());
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &TransformResult) -> Result<(), String> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_set {
            return Err("simulated set failure".to_string());
        }
        self.entries.lock().unwrap().insert(key.to_string(), value.clone());
        Ok(())
    }
}

fn sample_result() -> TransformResult {
    TransformResult {
        output: "module.exports = 1;".to_string(),
        dependencies: vec![],
        sha1: "deadbeef".to_string(),
    }
}

#[test]
fn disabled_cache_always_misses_and_set_is_a_noop() {
    let cache = TransformCache::disabled();
    assert!(cache.get("key").unwrap().is_none());
    cache.set("key", &sample_result()).unwrap();
}

#[test]
fn hit_on_second_store_backfills_the_first() {
    let memory = RecordingStore::new("memory");
    let disk = RecordingStore::new("disk");
    disk.entries.lock().unwrap().insert("key".to_string(), sample_result());

    let cache = TransformCache::new(vec![memory.clone(), disk.clone()]);
    let hit = cache.get("key").unwrap();
    assert_eq!(hit.unwrap().sha1, "deadbeef");

    // Back-fill is fire-and-forget; give the spawned thread a moment to land.
    for _ in 0..50 {
        if memory.entries.lock().unwrap().contains_key("key") {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    assert!(memory.entries.lock().unwrap().contains_key("key"), "earlier store should be back-filled on a later hit");
}

#[test]
fn get_failure_on_any_store_propagates() {
    let failing = RecordingStore::failing_get("flaky");
    let cache = TransformCache::new(vec![failing]);
    let err = cache.get("key").unwrap_err();
    assert!(err.to_string().contains("flaky"));
}

#[test]
fn set_failure_is_aggregated_but_does_not_stop_other_stores() {
    let good = RecordingStore::new("good");
    let bad = RecordingStore::failing_set("bad");
    let cache = TransformCache::new(vec![good.clone(), bad]);

    let err = cache.set("key", &sample_result()).unwrap_err();
    assert!(err.to_string().contains("bad"));
    assert!(good.entries.lock().unwrap().contains_key("key"), "a failing store must not block a healthy one");
}

#[test]
fn miss_across_every_store_returns_none() {
    let a = RecordingStore::new("a");
    let b = RecordingStore::new("b");
    let cache = TransformCache::new(vec![a, b]);
    assert!(cache.get("missing").unwrap().is_none());
}
