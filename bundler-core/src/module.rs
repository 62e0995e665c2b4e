// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Utf8PathBuf;
use std::fmt;

/// A deterministic hash summarizing everything a transform depends on: source bytes,
/// transformer version, and the relevant slice of config (spec §3, "Dependency"; §4.4,
/// "Fingerprint key"). `bundler-core` treats this as opaque bytes produced by the
/// driver -- it never hashes anything itself, matching the "Filesystem port" /
/// "Transformer port" boundary in spec §6.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Fingerprint(pub Box<[u8]>);

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fingerprint(")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        f.write_str(")")
    }
}

/// The kind of a dependency edge, as classified by the transformer (spec §3,
/// "Dependency").
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum DependencyKind {
    /// A plain CommonJS `require(...)` call.
    Require,
    /// A static ES module `import ... from ...` declaration.
    EsmImport,
    /// A dynamic `import(...)` expression.
    AsyncImport,
    /// An ES module `export ... from ...` re-export.
    EsmExport,
}

impl DependencyKind {
    /// Returns true for dependency kinds that must be resolved eagerly during the
    /// initial traversal, as opposed to dynamic imports a bundler may choose to split.
    pub fn is_static(&self) -> bool {
        !matches!(self, DependencyKind::AsyncImport)
    }
}

/// A location in source text, used to build code frames for resolution/transform
/// errors (spec §4.3, "All three are wrapped ... with a code-frame pointing at the
/// source location").
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SourceLocation {
    /// One-based line number.
    pub line: u32,
    /// Zero-based column offset.
    pub column: u32,
}

/// Renders the source line at `location` with a caret under its column (spec §4.3:
/// "wrapped ... with a code-frame pointing at the source location"). Returns `None`
/// when `location.line` falls outside `source`, which a malformed or stale location
/// shouldn't prevent the rest of the error from being reported.
pub fn render_code_frame(source: &str, location: SourceLocation) -> Option<String> {
    let line_index = location.line.checked_sub(1)?;
    let line_text = source.lines().nth(line_index as usize)?;
    let prefix = format!("{} | ", location.line);
    let caret_column = (location.column as usize).min(line_text.chars().count());
    let mut frame = format!("{}{}\n", prefix, line_text);
    frame.push_str(&" ".repeat(prefix.chars().count() + caret_column));
    frame.push('^');
    Some(frame)
}

/// A dependency attached to a module (spec §3, "Dependency").
///
/// The `resolved` field is `None` exactly when the specifier resolved to the
/// empty-module sentinel (spec invariant G4); it is otherwise guaranteed to name a path
/// present in the owning graph once the graph is quiescent.
#[derive(Clone, Debug)]
pub struct Dependency {
    /// The textual specifier as written in the source (`./foo`, `react`, ...).
    pub specifier: String,
    /// Whether this is a require, static import, dynamic import, or re-export.
    pub kind: DependencyKind,
    /// Every source location this specifier was referenced from. A specifier that
    /// appears more than once (e.g. `require('x')` called twice) keeps one `Dependency`
    /// with multiple locations rather than being duplicated.
    pub locations: Vec<SourceLocation>,
    /// The resolved path, or `None` for the empty-module sentinel.
    pub resolved: Option<Utf8PathBuf>,
    /// The full set of candidate asset paths when resolution produced more than one
    /// (spec §9 Open Questions: `assetFiles` resolutions can carry multiple paths).
    /// `resolved` is always the lexicographically smallest of this set when non-empty,
    /// preserving the current coercion behavior while still letting a serializer see
    /// every candidate.
    pub asset_candidates: Vec<Utf8PathBuf>,
}

impl Dependency {
    pub(crate) fn matches_specifier(&self, specifier: &str) -> bool {
        self.specifier == specifier
    }
}
