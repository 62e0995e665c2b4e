// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Error, Utf8PathBuf};
use serde_json::Value;

/// A parsed `package.json`, kept as a `serde_json::Value` rather than a fixed struct
/// so that unrecognized fields (most of them) are never lost and resolution logic can
/// reach into `exports`/`browser` maps of arbitrary shape (spec §4.3, step 4).
#[derive(Clone, Debug)]
pub struct PackageJson {
    pub path: Utf8PathBuf,
    pub name: Option<String>,
    raw: Value,
}

impl PackageJson {
    pub(crate) fn parse(path: Utf8PathBuf, contents: &str) -> Result<Self, Error> {
        let raw: Value = serde_json::from_str(contents).map_err(|e| Error::InvalidPackageJson {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let name = raw.get("name").and_then(Value::as_str).map(str::to_string);
        Ok(PackageJson { path, name, raw })
    }

    /// The directory this `package.json` lives in.
    pub fn dir(&self) -> &camino::Utf8Path {
        self.path.parent().expect("package.json always has a parent directory")
    }

    /// Reads a top-level string field (`main`, `browser` when it's a plain string,
    /// `react-native`, or any other `resolverMainFields` entry).
    pub fn main_field(&self, field: &str) -> Option<&str> {
        self.raw.get(field).and_then(Value::as_str)
    }

    /// Looks up `specifier` in a string-keyed remapping field (the object form of
    /// `browser`, which maps module specifiers -- not just the package's own entry
    /// point -- to replacements or `false` for "treat as empty").
    pub fn remap_field(&self, field: &str, specifier: &str) -> Option<BrowserRemap<'_>> {
        let map = self.raw.get(field)?.as_object()?;
        match map.get(specifier) {
            Some(Value::Bool(false)) => Some(BrowserRemap::Empty),
            Some(Value::String(s)) => Some(BrowserRemap::To(s)),
            _ => None,
        }
    }

    /// Resolves `subpath` (`"."` for the package root) through the `exports` field,
    /// honoring `conditions` in priority order with an eventual `"default"` fallback
    /// (spec §4.3, "conditional export resolution per configured conditions").
    pub fn resolve_exports(&self, subpath: &str, conditions: &[String]) -> Option<String> {
        let exports = self.raw.get("exports")?;
        match exports {
            Value::String(s) => (subpath == ".").then(|| s.clone()),
            Value::Object(map) => {
                if let Some(value) = map.get(subpath) {
                    Self::pick_condition(value, conditions)
                } else if subpath == "." && !map.keys().any(|k| k.starts_with('.')) {
                    // A flat conditions map used directly as the root export.
                    Self::pick_condition(exports, conditions)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn pick_condition(value: &Value, conditions: &[String]) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => {
                for cond in conditions {
                    if let Some(v) = map.get(cond.as_str()) {
                        if let Some(s) = Self::pick_condition(v, conditions) {
                            return Some(s);
                        }
                    }
                }
                map.get("default").and_then(|v| Self::pick_condition(v, conditions))
            }
            _ => None,
        }
    }
}

/// The result of looking a specifier up in a `browser`-style remapping field.
#[derive(Copy, Clone, Debug)]
pub enum BrowserRemap<'a> {
    /// The specifier is remapped to `false`: treat it as the empty module.
    Empty,
    /// The specifier is remapped to another specifier or relative path.
    To(&'a str),
}
