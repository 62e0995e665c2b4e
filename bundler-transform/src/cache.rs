// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::worker_pool::TransformResult;
use crate::Error;
use std::sync::Arc;

/// One backing store in a [`TransformCache`]'s ordered list (spec §4.4: "e.g.,
/// in-memory -> local disk -> remote"). Grounded on the `DashMap`-backed
/// `CompilationCache` idiom seen in the pack's JS-bundler example, generalized to an
/// arbitrary ordered chain of such stores instead of a single one.
pub trait TransformStore: Send + Sync {
    /// A short, human-readable name used in cache-observability log lines and in
    /// aggregated `set` error messages.
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<TransformResult>, String>;

    fn set(&self, key: &str, value: &TransformResult) -> Result<(), String>;
}

/// An in-memory [`TransformStore`], typically `S₀` in the chain.
#[derive(Default)]
pub struct MemoryStore {
    entries: dashmap::DashMap<String, TransformResult>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransformStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<TransformResult>, String> {
        Ok(self.entries.get(key).map(|entry| entry.clone()))
    }

    fn set(&self, key: &str, value: &TransformResult) -> Result<(), String> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// Ordered chain of transform-result stores (spec §4.4, "TransformCache").
///
/// An empty chain is the "disabled cache" configuration: `get` always misses and `set`
/// is a no-op, exactly as specified.
pub struct TransformCache {
    stores: Vec<Arc<dyn TransformStore>>,
}

impl TransformCache {
    pub fn new(stores: Vec<Arc<dyn TransformStore>>) -> Self {
        TransformCache { stores }
    }

    /// Disabled cache: no backing stores.
    pub fn disabled() -> Self {
        TransformCache { stores: Vec::new() }
    }

    /// Tries each store in order; on the first hit, synchronously kicks off
    /// fire-and-forget back-fills of every earlier (faster) store, then returns (spec
    /// §4.4, `get`).
    pub fn get(&self, key: &str) -> Result<Option<TransformResult>, Error> {
        for (i, store) in self.stores.iter().enumerate() {
            log::trace!("start {}::{}", store.name(), key);
            let result = store.get(key).map_err(|message| Error::StoreGetFailed {
                store: store.name().to_string(),
                message,
            })?;
            log::trace!("end {}::{} ({})", store.name(), key, if result.is_some() { "hit" } else { "miss" });
            if let Some(value) = result {
                for earlier in &self.stores[..i] {
                    let earlier = Arc::clone(earlier);
                    let key = key.to_string();
                    let value = value.clone();
                    std::thread::spawn(move || {
                        if let Err(message) = earlier.set(&key, &value) {
                            log::warn!("back-fill of {} failed: {}", earlier.name(), message);
                        }
                    });
                }
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Writes to every store in parallel, blocking until all complete. Any failures are
    /// collected into a single aggregated [`Error::StoreSetFailed`] (spec §4.4, `set`).
    pub fn set(&self, key: &str, value: &TransformResult) -> Result<(), Error> {
        if self.stores.is_empty() {
            return Ok(());
        }
        let handles: Vec<_> = self
            .stores
            .iter()
            .map(|store| {
                let store = Arc::clone(store);
                let key = key.to_string();
                let value = value.clone();
                std::thread::spawn(move || store.set(&key, &value).map_err(|message| (store.name().to_string(), message)))
            })
            .collect();

        let mut failures = Vec::new();
        for handle in handles {
            if let Err(failure) = handle.join().expect("transform store thread panicked") {
                failures.push(failure);
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::StoreSetFailed(failures))
        }
    }
}
