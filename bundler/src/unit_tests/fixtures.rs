// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use bundler_transform::{RawTransformOutput, TransformDependency, DependencyKind, Transformer, TransformOptions};
use camino::Utf8Path;

/// A transformer standing in for a real JS parser: every `require('specifier')`
/// occurrence in the source becomes a dependency. Good enough to exercise the real
/// resolver/graph wiring without pulling in an AST parser just for tests.
pub(crate) struct FixtureTransformer;

impl Transformer for FixtureTransformer {
    fn transform(&self, _path: &Utf8Path, source: &str, _options: &TransformOptions) -> Result<RawTransformOutput, String> {
        let mut dependencies = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find("require('") {
            let after = &rest[start + "require('".len()..];
            let end = after.find('\'').ok_or_else(|| "unterminated require(...)".to_string())?;
            dependencies.push(TransformDependency {
                specifier: after[..end].to_string(),
                kind: DependencyKind::Require,
                locations: Vec::new(),
            });
            rest = &after[end + 1..];
        }
        Ok(RawTransformOutput {
            code: source.to_string(),
            dependencies,
            foldable: Vec::new(),
        })
    }
}
