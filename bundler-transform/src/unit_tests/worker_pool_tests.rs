// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fold::{BinaryOp, Expr, FoldableFragment, Literal};
use crate::worker_pool::{RawTransformOutput, Transformer};
use crate::{TransformOptions, TransformWorkerPool, Utf8Path};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

struct CountingTransformer {
    calls: AtomicUsize,
    delay: std::time::Duration,
}

impl Transformer for CountingTransformer {
    fn transform(&self, file_path: &Utf8Path, _source: &str, _options: &TransformOptions) -> Result<RawTransformOutput, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(RawTransformOutput {
            code: format!("/* {} */", file_path),
            dependencies: vec![],
            foldable: vec![],
        })
    }
}

#[test]
fn concurrent_calls_with_equal_key_share_one_in_flight_transform() {
    let transformer = Arc::new(CountingTransformer {
        calls: AtomicUsize::new(0),
        delay: std::time::Duration::from_millis(50),
    });
    let pool = Arc::new(TransformWorkerPool::new(4, transformer.clone()));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                pool.transform(Utf8Path::new("/app/src/foo.js"), "source", &TransformOptions::default()).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert_eq!(result.output, "/* /app/src/foo.js */");
    }
    assert_eq!(transformer.calls.load(Ordering::SeqCst), 1, "eight identical requests must share one transform");
}

/// Stands in for a real parser reporting one statically-foldable ternary (spec §8
/// scenario 1: `'android' === 'android' ? {a:1} : {a:0}` -> `{a:1}`).
struct FoldingTransformer;

impl Transformer for FoldingTransformer {
    fn transform(&self, _file_path: &Utf8Path, source: &str, _options: &TransformOptions) -> Result<RawTransformOutput, String> {
        let start = source.find("'android'").expect("fixture source contains the ternary");
        let end = source.find(';').unwrap_or(source.len());
        Ok(RawTransformOutput {
            code: source.to_string(),
            dependencies: vec![],
            foldable: vec![FoldableFragment {
                expr: Expr::Conditional {
                    test: Box::new(Expr::Binary {
                        op: BinaryOp::StrictEq,
                        left: Box::new(Expr::Literal(Literal::String("android".to_string()))),
                        right: Box::new(Expr::Literal(Literal::String("android".to_string()))),
                    }),
                    consequent: Box::new(Expr::Other("{a:1}".to_string())),
                    alternate: Box::new(Expr::Other("{a:0}".to_string())),
                },
                start,
                end,
            }],
        })
    }
}

#[test]
fn a_foldable_ternary_is_spliced_into_the_returned_output() {
    let pool = TransformWorkerPool::new(1, Arc::new(FoldingTransformer));
    let source = "const platform = 'android' === 'android' ? {a:1} : {a:0};";

    let result = pool.transform(Utf8Path::new("/app/src/platform.js"), source, &TransformOptions::default()).unwrap();

    assert_eq!(result.output, "const platform = {a:1};");
}

#[test]
fn distinct_fingerprints_are_not_deduplicated() {
    let transformer = Arc::new(CountingTransformer {
        calls: AtomicUsize::new(0),
        delay: std::time::Duration::from_millis(1),
    });
    let pool = TransformWorkerPool::new(2, transformer.clone());

    let mut dev_options = TransformOptions::default();
    dev_options.dev = true;
    let mut prod_options = TransformOptions::default();
    prod_options.dev = false;

    pool.transform(Utf8Path::new("/app/src/foo.js"), "source", &dev_options).unwrap();
    pool.transform(Utf8Path::new("/app/src/foo.js"), "source", &prod_options).unwrap();

    assert_eq!(transformer.calls.load(Ordering::SeqCst), 2);
}

struct CrashOnceTransformer {
    crash_next: std::sync::atomic::AtomicBool,
}

impl Transformer for CrashOnceTransformer {
    fn transform(&self, file_path: &Utf8Path, _source: &str, _options: &TransformOptions) -> Result<RawTransformOutput, String> {
        if self.crash_next.swap(false, Ordering::SeqCst) {
            panic!("simulated worker crash");
        }
        Ok(RawTransformOutput {
            code: format!("/* {} */", file_path),
            dependencies: vec![],
            foldable: vec![],
        })
    }
}

#[test]
fn a_crashing_call_fails_alone_and_the_pool_keeps_serving() {
    let transformer = Arc::new(CrashOnceTransformer {
        crash_next: std::sync::atomic::AtomicBool::new(true),
    });
    let pool = TransformWorkerPool::new(1, transformer);

    let first = pool.transform(Utf8Path::new("/app/src/a.js"), "source", &TransformOptions::default());
    assert!(first.is_err());

    let second = pool.transform(Utf8Path::new("/app/src/b.js"), "source", &TransformOptions::default());
    assert!(second.is_ok(), "the pool must keep serving requests after a worker panics");
}
