// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::haste::Haste;
use crate::package_cache::PackageCache;
use crate::resolver::{resolve, Resolution, ResolverOptions};
use crate::unit_tests::fixtures::TestFs;
use crate::{Error, Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;

fn default_options<'a>(
    source_exts: &'a [String],
    asset_exts: &'a [String],
    asset_resolutions: &'a [String],
    main_fields: &'a [String],
    conditions: &'a [String],
    extra_node_modules: &'a indexmap::IndexMap<String, Utf8PathBuf>,
    node_modules_paths: &'a [Utf8PathBuf],
    block_list: &'a [regex::Regex],
) -> ResolverOptions<'a> {
    ResolverOptions {
        platform: Some("ios"),
        conditions,
        source_exts,
        asset_exts,
        asset_resolutions,
        prefer_native_platform: true,
        main_fields,
        use_haste: true,
        use_exports: true,
        disable_hierarchical_lookup: false,
        extra_node_modules,
        node_modules_paths,
        empty_module_specifier: Some("react-native-empty-module"),
        block_list,
    }
}

struct Fixture {
    fs: TestFs,
    source_exts: Vec<String>,
    asset_exts: Vec<String>,
    asset_resolutions: Vec<String>,
    main_fields: Vec<String>,
    conditions: Vec<String>,
    extra_node_modules: indexmap::IndexMap<String, Utf8PathBuf>,
    node_modules_paths: Vec<Utf8PathBuf>,
    block_list: Vec<regex::Regex>,
    haste: Haste,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            fs: TestFs::new(),
            source_exts: vec!["js".to_string(), "json".to_string()],
            asset_exts: vec!["png".to_string()],
            asset_resolutions: vec!["@3x".to_string(), "@2x".to_string()],
            main_fields: vec!["react-native".to_string(), "browser".to_string(), "main".to_string()],
            conditions: vec!["react-native".to_string(), "require".to_string()],
            extra_node_modules: indexmap::IndexMap::new(),
            node_modules_paths: Vec::new(),
            block_list: Vec::new(),
            haste: Haste::new(),
        }
    }

    fn resolve(&self, origin: &str, specifier: &str) -> Result<Resolution, Error> {
        let package_cache = PackageCache::new(std::rc::Rc::new(self.fs.clone()));
        let options = default_options(
            &self.source_exts,
            &self.asset_exts,
            &self.asset_resolutions,
            &self.main_fields,
            &self.conditions,
            &self.extra_node_modules,
            &self.node_modules_paths,
            &self.block_list,
        );
        resolve(
            &self.fs,
            &self.haste,
            &package_cache,
            Utf8Path::new(origin),
            specifier,
            &options,
            None,
        )
    }
}

#[test]
fn resolves_relative_specifier_with_exact_extension() {
    let mut fx = Fixture::new();
    fx.fs.file("/app/src/foo.js", "");
    fx.fs.file("/app/src/bar.js", "require('./foo')");

    let resolution = fx.resolve("/app/src/bar.js", "./foo").unwrap();
    assert_eq!(resolution, Resolution::SourceFile(Utf8PathBuf::from("/app/src/foo.js")));
}

#[test]
fn prefers_platform_specific_extension_over_base() {
    let mut fx = Fixture::new();
    fx.fs.file("/app/src/foo.ios.js", "");
    fx.fs.file("/app/src/foo.js", "");

    let resolution = fx.resolve("/app/src/bar.js", "./foo").unwrap();
    assert_eq!(resolution, Resolution::SourceFile(Utf8PathBuf::from("/app/src/foo.ios.js")));
}

#[test]
fn relative_resolution_failure_carries_candidates() {
    let fx = Fixture::new();
    let err = fx.resolve("/app/src/foo.js", "./bar").unwrap_err();
    match err {
        Error::FailedToResolvePath {
            specifier,
            file_candidates,
            ..
        } => {
            assert_eq!(specifier, "./bar");
            assert!(file_candidates.iter().any(|p| p.as_str() == "/app/src/bar.ios.js"));
            assert!(file_candidates.iter().any(|p| p.as_str() == "/app/src/bar.js"));
        }
        other => panic!("expected FailedToResolvePath, got {:?}", other),
    }
}

#[test]
fn resolves_bare_specifier_via_node_modules_main_field() {
    let mut fx = Fixture::new();
    fx.fs.file(
        "/app/node_modules/left-pad/package.json",
        r#"{"name": "left-pad", "main": "index.js"}"#,
    );
    fx.fs.file("/app/node_modules/left-pad/index.js", "");

    let resolution = fx.resolve("/app/src/foo.js", "left-pad").unwrap();
    assert_eq!(
        resolution,
        Resolution::SourceFile(Utf8PathBuf::from("/app/node_modules/left-pad/index.js"))
    );
}

#[test]
fn walks_up_ancestor_node_modules_directories() {
    let mut fx = Fixture::new();
    fx.fs.file(
        "/app/node_modules/left-pad/package.json",
        r#"{"name": "left-pad", "main": "index.js"}"#,
    );
    fx.fs.file("/app/node_modules/left-pad/index.js", "");

    // Deeply nested origin with no node_modules of its own at that level.
    let resolution = fx.resolve("/app/src/deep/nested/foo.js", "left-pad").unwrap();
    assert_eq!(
        resolution,
        Resolution::SourceFile(Utf8PathBuf::from("/app/node_modules/left-pad/index.js"))
    );
}

#[test]
fn block_list_hides_an_otherwise_resolvable_package() {
    let mut fx = Fixture::new();
    fx.fs.file(
        "/app/node_modules/left-pad/package.json",
        r#"{"name": "left-pad", "main": "index.js"}"#,
    );
    fx.fs.file("/app/node_modules/left-pad/index.js", "");
    fx.block_list = vec![regex::Regex::new(r"/node_modules/left-pad/").unwrap()];

    let err = fx.resolve("/app/src/foo.js", "left-pad").unwrap_err();
    assert!(matches!(err, Error::FailedToResolveName { .. }));
}

#[test]
fn exports_field_takes_priority_over_main_fields() {
    let mut fx = Fixture::new();
    fx.fs.file(
        "/app/node_modules/pkg/package.json",
        r#"{"name": "pkg", "main": "fallback.js", "exports": {".": {"react-native": "./rn.js", "default": "./fallback.js"}}}"#,
    );
    fx.fs.file("/app/node_modules/pkg/rn.js", "");
    fx.fs.file("/app/node_modules/pkg/fallback.js", "");

    let resolution = fx.resolve("/app/src/foo.js", "pkg").unwrap();
    assert_eq!(resolution, Resolution::SourceFile(Utf8PathBuf::from("/app/node_modules/pkg/rn.js")));
}

#[test]
fn resolves_scoped_package_subpath() {
    let mut fx = Fixture::new();
    fx.fs.file(
        "/app/node_modules/@scope/pkg/package.json",
        r#"{"name": "@scope/pkg", "main": "index.js"}"#,
    );
    fx.fs.file("/app/node_modules/@scope/pkg/sub.js", "");

    let resolution = fx.resolve("/app/src/foo.js", "@scope/pkg/sub").unwrap();
    assert_eq!(
        resolution,
        Resolution::SourceFile(Utf8PathBuf::from("/app/node_modules/@scope/pkg/sub.js"))
    );
}

#[test]
fn haste_module_resolves_independent_of_directory() {
    let mut fx = Fixture::new();
    fx.fs.file("/app/src/deep/nested/MyHasteModule.js", "");
    fx.haste
        .register_module("MyHasteModule", Utf8PathBuf::from("/app/src/deep/nested/MyHasteModule.js"));

    let resolution = fx.resolve("/app/src/foo.js", "MyHasteModule").unwrap();
    assert_eq!(
        resolution,
        Resolution::SourceFile(Utf8PathBuf::from("/app/src/deep/nested/MyHasteModule.js"))
    );
}

#[test]
fn asset_resolution_returns_all_density_variants() {
    let mut fx = Fixture::new();
    fx.fs.file("/app/src/logo@2x.png", "");
    fx.fs.file("/app/src/logo@3x.png", "");
    fx.fs.file("/app/src/logo.png", "");

    let resolution = fx.resolve("/app/src/foo.js", "./logo").unwrap();
    match resolution {
        Resolution::AssetFiles(mut paths) => {
            paths.sort();
            assert_eq!(
                paths,
                vec![
                    Utf8PathBuf::from("/app/src/logo.png"),
                    Utf8PathBuf::from("/app/src/logo@2x.png"),
                    Utf8PathBuf::from("/app/src/logo@3x.png"),
                ]
            );
        }
        other => panic!("expected AssetFiles, got {:?}", other),
    }
}

#[test]
fn empty_module_sentinel_short_circuits() {
    let fx = Fixture::new();
    let resolution = fx.resolve("/app/src/foo.js", "react-native-empty-module").unwrap();
    assert_eq!(resolution, Resolution::Empty);
}

#[test]
fn bare_specifier_not_found_reports_searched_directories() {
    let fx = Fixture::new();
    let err = fx.resolve("/app/src/foo.js", "does-not-exist").unwrap_err();
    match err {
        Error::FailedToResolveName { searched_dirs, .. } => {
            assert!(searched_dirs.iter().any(|d| d.as_str() == "/app/src/node_modules"));
            assert!(searched_dirs.iter().any(|d| d.as_str() == "/app/node_modules"));
        }
        other => panic!("expected FailedToResolveName, got {:?}", other),
    }
}

#[test]
fn unsupported_url_scheme_is_rejected() {
    let fx = Fixture::new();
    let err = fx.resolve("/app/src/foo.js", "data:text/plain,hello").unwrap_err();
    assert!(matches!(err, Error::FailedToResolveUnsupported { .. }));
}

#[test]
fn resolution_is_deterministic_for_equal_inputs() {
    let mut fx = Fixture::new();
    fx.fs.file("/app/src/foo.js", "");
    let first = fx.resolve("/app/src/bar.js", "./foo").unwrap();
    let second = fx.resolve("/app/src/bar.js", "./foo").unwrap();
    assert_eq!(first, second);
}
