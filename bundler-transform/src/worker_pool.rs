// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fold::{fold_expr, render_folded, FoldableFragment};
use crate::{Error, Utf8Path, Utf8PathBuf};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};

/// Configuration that affects a transform's output, and therefore its fingerprint
/// (spec §4.4: "source bytes, transformer version, relevant config fields").
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct TransformOptions {
    pub dev: bool,
    pub hot: bool,
    pub minify: bool,
    pub inline_requires: bool,
    pub platform: Option<String>,
    /// Free-form per-transformer options, opaque to the pool and cache.
    pub custom: serde_json::Value,
}

impl TransformOptions {
    /// A stable string uniquely identifying this option set, used both as the
    /// in-flight dedup key (spec §4.5, "Deduplication") and as part of the cache
    /// fingerprint (spec §4.4).
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).expect("TransformOptions always serializes")
    }
}

/// How a dependency specifier was referenced (spec §3, `Dependency.kind`; mirrored
/// here rather than imported from `bundler-core` so this crate stays independent of
/// the graph engine -- the embedder's `GraphDriver` impl converts one to the other).
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DependencyKind {
    Require,
    EsmImport,
    AsyncImport,
    EsmExport,
}

/// A source position the transformer attributes a dependency reference to, one per
/// occurrence (spec §6, Transformer port: `dependencies[].data.locs`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// One dependency as reported by the transformer for a single occurrence (spec §6:
/// `dependencies: [{name, data: {asyncType, isESMImport, locs}}]`).
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformDependency {
    pub specifier: String,
    pub kind: DependencyKind,
    pub locations: Vec<SourceLocation>,
}

/// What the injected, pluggable AST transformer returns (spec §1: "a pluggable
/// function that receives source + options and returns code + dependency
/// specifiers"). `foldable` optionally surfaces expression fragments the transformer
/// identified as statically foldable (ternaries, logical chains, ...), each paired
/// with the byte range in `code` it was parsed from; the pool folds them and splices
/// the result back into `code` as a post-process (spec §4.5, "Constant folding &
/// inline requires").
#[derive(Clone, Debug, Default)]
pub struct RawTransformOutput {
    pub code: String,
    pub dependencies: Vec<TransformDependency>,
    pub foldable: Vec<FoldableFragment>,
}

/// The transformer seam (spec §6, "Transformer port"). Spec §4.5 specifies a pool of
/// worker *processes*; this crate uses OS threads plus `catch_unwind` isolation
/// instead, since a transformer implemented in-process has no separate address space
/// to crash independently of -- the isolation contract (a failing call doesn't take
/// down its worker) is preserved, just at thread rather than process granularity.
pub trait Transformer: Send + Sync {
    fn transform(&self, file_path: &Utf8Path, source: &str, options: &TransformOptions) -> Result<RawTransformOutput, String>;
}

/// The result of a completed transform (spec §4.5, `transform(...)  -> {output,
/// dependencies[], sha1}`).
#[derive(Clone, Debug)]
pub struct TransformResult {
    pub output: String,
    pub dependencies: Vec<TransformDependency>,
    pub sha1: String,
}

type DedupKey = (Utf8PathBuf, String);
type PendingSlot = Arc<(Mutex<Option<Result<TransformResult, String>>>, Condvar)>;

enum Job {
    Transform {
        file_path: Utf8PathBuf,
        source: String,
        options: TransformOptions,
        reply: mpsc::Sender<Result<RawTransformOutput, String>>,
    },
}

/// A pool of sticky worker threads, each holding the transformer's warm state across
/// calls (spec §4.5: "Each worker loads the transformer module once (sticky workers
/// keep per-worker state warm across calls)").
pub struct TransformWorkerPool {
    senders: Vec<mpsc::Sender<Job>>,
    next_worker: Mutex<usize>,
    in_flight: Mutex<HashMap<DedupKey, PendingSlot>>,
}

impl TransformWorkerPool {
    /// Spawns `worker_count` sticky worker threads, each running `transformer`.
    pub fn new<T: Transformer + 'static>(worker_count: usize, transformer: Arc<T>) -> Self {
        assert!(worker_count > 0, "a pool needs at least one worker");
        let mut senders = Vec::with_capacity(worker_count);
        for worker_index in 0..worker_count {
            let (tx, rx) = mpsc::channel::<Job>();
            let transformer = Arc::clone(&transformer);
            std::thread::Builder::new()
                .name(format!("transform-worker-{}", worker_index))
                .spawn(move || Self::worker_loop(rx, transformer.as_ref()))
                .expect("failed to spawn transform worker thread");
            senders.push(tx);
        }
        TransformWorkerPool {
            senders,
            next_worker: Mutex::new(0),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn worker_loop<T: Transformer>(rx: mpsc::Receiver<Job>, transformer: &T) {
        while let Ok(job) = rx.recv() {
            let Job::Transform {
                file_path,
                source,
                options,
                reply,
            } = job;
            // Isolation (spec §4.5): a panicking transform must fail only this call,
            // never take the worker thread down with it.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                transformer.transform(&file_path, &source, &options)
            }))
            .unwrap_or_else(|_| Err(format!("transformer panicked while processing {}", file_path)));
            // The receiver may already have given up (e.g. process shutdown); that's
            // fine, there's nothing else to do with the result.
            let _ = reply.send(result);
        }
    }

    /// Transforms `source` from `file_path` under `options` (spec §4.5, public API).
    ///
    /// Concurrent calls with an equal `(file_path, optionsFingerprint)` share a single
    /// in-flight result (spec §4.5, "Deduplication").
    pub fn transform(&self, file_path: &Utf8Path, source: &str, options: &TransformOptions) -> Result<TransformResult, Error> {
        let key: DedupKey = (file_path.to_path_buf(), options.fingerprint());

        enum Role {
            Leader(PendingSlot),
            Follower(PendingSlot),
        }
        let role = {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(existing) = in_flight.get(&key) {
                Role::Follower(Arc::clone(existing))
            } else {
                let slot: PendingSlot = Arc::new((Mutex::new(None), Condvar::new()));
                in_flight.insert(key.clone(), Arc::clone(&slot));
                Role::Leader(slot)
            }
        };
        let slot = match role {
            Role::Leader(slot) => return self.run_and_publish(key, slot, file_path, source, options),
            Role::Follower(slot) => slot,
        };
        let (lock, cvar) = &*slot;
        let mut guard = lock.lock().unwrap();
        while guard.is_none() {
            guard = cvar.wait(guard).unwrap();
        }
        guard.clone().unwrap().map_err(|message| Error::TransformFailed {
            path: file_path.to_string(),
            message,
        })
    }

    fn run_and_publish(
        &self,
        key: DedupKey,
        slot: PendingSlot,
        file_path: &Utf8Path,
        source: &str,
        options: &TransformOptions,
    ) -> Result<TransformResult, Error> {
        let outcome = self.dispatch(file_path, source, options);
        let stringified = outcome.clone().map_err(|e| e.to_string());
        {
            let (lock, cvar) = &*slot;
            *lock.lock().unwrap() = Some(stringified);
            cvar.notify_all();
        }
        self.in_flight.lock().unwrap().remove(&key);
        outcome
    }

    fn dispatch(&self, file_path: &Utf8Path, source: &str, options: &TransformOptions) -> Result<TransformResult, Error> {
        let worker = {
            let mut next = self.next_worker.lock().unwrap();
            let idx = *next;
            *next = (*next + 1) % self.senders.len();
            idx
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        self.senders[worker]
            .send(Job::Transform {
                file_path: file_path.to_path_buf(),
                source: source.to_string(),
                options: options.clone(),
                reply: reply_tx,
            })
            .map_err(|_| Error::WorkerCrashed { path: file_path.to_string() })?;

        let raw = reply_rx
            .recv()
            .map_err(|_| Error::WorkerCrashed { path: file_path.to_string() })?
            .map_err(|message| Error::TransformFailed {
                path: file_path.to_string(),
                message,
            })?;

        let folded_code = if raw.foldable.is_empty() {
            raw.code
        } else {
            apply_folded_fragments(&raw.code, &raw.foldable)
        };

        let mut hasher = Sha1::new();
        hasher.update(folded_code.as_bytes());
        let sha1 = to_hex(&hasher.finalize());

        Ok(TransformResult {
            output: folded_code,
            dependencies: raw.dependencies,
            sha1,
        })
    }
}

/// Folds every fragment the transformer flagged and splices each result back into
/// `code` at its reported span (spec §4.5, "Constant folding"; spec §8 scenario 1).
///
/// A fragment is only spliced when folding reduces it to something unambiguous to
/// print (see [`render_folded`]); one that's still structured after folding (its test
/// wasn't statically known, say) is left as the transformer originally emitted it,
/// rather than risk corrupting the source with an approximate re-serialization.
/// Fragments with an out-of-bounds or overlapping span are skipped the same way.
fn apply_folded_fragments(code: &str, foldable: &[FoldableFragment]) -> String {
    let mut fragments: Vec<&FoldableFragment> = foldable.iter().collect();
    fragments.sort_by_key(|fragment| fragment.start);

    let mut output = String::with_capacity(code.len());
    let mut cursor = 0usize;
    for fragment in fragments {
        if fragment.start < cursor || fragment.end > code.len() || fragment.start > fragment.end || !code.is_char_boundary(fragment.start) || !code.is_char_boundary(fragment.end) {
            continue;
        }
        let folded = fold_expr(fragment.expr.clone());
        let Some(rendered) = render_folded(&folded) else {
            continue;
        };
        output.push_str(&code[cursor..fragment.start]);
        output.push_str(&rendered);
        cursor = fragment.end;
    }
    output.push_str(&code[cursor..]);
    output
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        s.push_str(&format!("{:02x}", byte));
    }
    s
}
