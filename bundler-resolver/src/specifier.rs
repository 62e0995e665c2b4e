// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Error;

/// The classification of a dependency specifier (spec §4.3, step 2).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SpecifierKind<'a> {
    /// Begins with `./` or `../`: resolved against the origin's directory.
    Relative(&'a str),
    /// Begins with `/`: resolved against the project root.
    Absolute(&'a str),
    /// Anything else: a package name, optionally with a subpath (`lodash/fp`,
    /// `@scope/pkg/sub`).
    Bare(&'a str),
}

/// Classifies `specifier`, or reports it as structurally unsupported (spec §4.3,
/// `FailedToResolveUnsupported`: "unsupported URL scheme").
pub fn classify(specifier: &str) -> Result<SpecifierKind<'_>, Error> {
    let is_relative_or_absolute =
        specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/');
    if !is_relative_or_absolute {
        if let Some(colon) = specifier.find(':') {
            let scheme = &specifier[..colon];
            let looks_like_scheme = scheme
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_alphabetic())
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
            if looks_like_scheme {
                return Err(Error::FailedToResolveUnsupported {
                    specifier: specifier.to_string(),
                    reason: format!("unsupported URL scheme '{}'", scheme),
                });
            }
        }
    }
    if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
        Ok(SpecifierKind::Relative(specifier))
    } else if let Some(stripped) = specifier.strip_prefix('/') {
        if stripped.is_empty() {
            Err(Error::FailedToResolveUnsupported {
                specifier: specifier.to_string(),
                reason: "empty absolute specifier".to_string(),
            })
        } else {
            Ok(SpecifierKind::Absolute(specifier))
        }
    } else if specifier.is_empty() {
        Err(Error::FailedToResolveUnsupported {
            specifier: specifier.to_string(),
            reason: "empty specifier".to_string(),
        })
    } else {
        Ok(SpecifierKind::Bare(specifier))
    }
}

/// Splits a bare specifier into its package name and subpath, honoring scoped package
/// names (`@scope/name/sub` -> `("@scope/name", "sub")`).
pub(crate) fn split_bare_specifier(specifier: &str) -> (&str, &str) {
    if specifier.starts_with('@') {
        if let Some(scope_slash) = specifier.find('/') {
            let rest = &specifier[scope_slash + 1..];
            return match rest.find('/') {
                Some(name_slash) => {
                    let split_at = scope_slash + 1 + name_slash;
                    (&specifier[..split_at], &specifier[split_at + 1..])
                }
                None => (specifier, ""),
            };
        }
        return (specifier, "");
    }
    match specifier.find('/') {
        Some(slash) => (&specifier[..slash], &specifier[slash + 1..]),
        None => (specifier, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_scoped_package_with_subpath() {
        assert_eq!(split_bare_specifier("@scope/pkg/sub/path"), ("@scope/pkg", "sub/path"));
        assert_eq!(split_bare_specifier("@scope/pkg"), ("@scope/pkg", ""));
        assert_eq!(split_bare_specifier("lodash/fp"), ("lodash", "fp"));
        assert_eq!(split_bare_specifier("lodash"), ("lodash", ""));
    }

    #[test]
    fn classifies_specifiers() {
        assert_eq!(classify("./foo").unwrap(), SpecifierKind::Relative("./foo"));
        assert_eq!(classify("../foo").unwrap(), SpecifierKind::Relative("../foo"));
        assert_eq!(classify("/abs/foo").unwrap(), SpecifierKind::Absolute("/abs/foo"));
        assert_eq!(classify("react").unwrap(), SpecifierKind::Bare("react"));
        assert!(classify("data:text/plain,hi").is_err());
    }
}
