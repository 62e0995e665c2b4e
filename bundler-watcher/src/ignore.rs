// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Error, Utf8Path};
use regex::Regex;

/// Ignore policy (spec §4.1): "a single regex (tested against absolute path)
/// plus hidden-file exclusion unless `dot=true`".
#[derive(Clone, Debug, Default)]
pub struct IgnorePolicy {
    regex: Option<Regex>,
    dot: bool,
}

impl IgnorePolicy {
    pub fn new(pattern: Option<&str>, dot: bool) -> Result<Self, Error> {
        let regex = pattern
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| Error::InvalidIgnoreRegex {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;
        Ok(IgnorePolicy { regex, dot })
    }

    /// `true` if `path` (absolute) should be excluded from the crawl and event
    /// stream.
    pub fn is_ignored(&self, path: &Utf8Path) -> bool {
        if !self.dot && has_dot_component(path) {
            return true;
        }
        match &self.regex {
            Some(regex) => regex.is_match(path.as_str()),
            None => false,
        }
    }
}

fn has_dot_component(path: &Utf8Path) -> bool {
    path.components().any(|c| c.as_str().starts_with('.') && c.as_str() != "." && c.as_str() != "..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Utf8PathBuf;

    #[test]
    fn default_policy_excludes_dot_files() {
        let policy = IgnorePolicy::new(None, false).unwrap();
        assert!(policy.is_ignored(&Utf8PathBuf::from("/repo/.git/HEAD")));
        assert!(!policy.is_ignored(&Utf8PathBuf::from("/repo/src/index.js")));
    }

    #[test]
    fn dot_true_permits_hidden_files() {
        let policy = IgnorePolicy::new(None, true).unwrap();
        assert!(!policy.is_ignored(&Utf8PathBuf::from("/repo/.git/HEAD")));
    }

    #[test]
    fn regex_is_tested_against_the_absolute_path() {
        let policy = IgnorePolicy::new(Some("node_modules"), true).unwrap();
        assert!(policy.is_ignored(&Utf8PathBuf::from("/repo/node_modules/foo/index.js")));
        assert!(!policy.is_ignored(&Utf8PathBuf::from("/repo/src/index.js")));
    }
}
