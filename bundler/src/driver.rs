// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The concrete [`bundler_core::GraphDriver`] wiring the resolver, transform pool, and
//! transform cache together (spec §6: this is the embedder gluing the Filesystem,
//! Transformer, and ModuleID-factory ports to the graph engine).

use crate::config::{BundlerConfig, GraphOptions};
use crate::errors::Error;
use crate::filesystem::OsFileSystem;
use bundler_core::{DependencyKind, Fingerprint, GraphDriver, LoadedModule, ModuleId, ModuleIdFactory, RawDependency, ResolvedSpecifier, SourceLocation};
use bundler_resolver::{Haste, PackageCache, Resolution, ResolverOptions};
use bundler_transform::{TransformCache, TransformOptions, TransformWorkerPool};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use regex::Regex;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// One `GraphDriver` per live graph (spec §4.7: each `graphId` owns its own
/// resolution/transform state, while the module-ID factory below is the one
/// process-wide singleton spec §9 allows).
pub struct BundlerDriver {
    fs: Rc<OsFileSystem>,
    package_cache: PackageCache<OsFileSystem>,
    haste: Arc<Mutex<Haste>>,
    module_ids: Arc<Mutex<dyn ModuleIdFactory + Send>>,
    transform_pool: Arc<TransformWorkerPool>,
    transform_cache: Arc<TransformCache>,

    source_exts: Vec<String>,
    asset_exts: Vec<String>,
    asset_resolutions: Vec<String>,
    main_fields: Vec<String>,
    conditions: Vec<String>,
    extra_node_modules: IndexMap<String, Utf8PathBuf>,
    node_modules_paths: Vec<Utf8PathBuf>,
    block_list: Vec<Regex>,
    disable_hierarchical_lookup: bool,
    prefer_native_platform: bool,
    use_haste: bool,
    use_exports: bool,

    transform_options: TransformOptions,
    cache_version: String,
}

impl BundlerDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &BundlerConfig,
        graph_options: &GraphOptions,
        fs: Rc<OsFileSystem>,
        haste: Arc<Mutex<Haste>>,
        module_ids: Arc<Mutex<dyn ModuleIdFactory + Send>>,
        transform_pool: Arc<TransformWorkerPool>,
        transform_cache: Arc<TransformCache>,
        block_list: Vec<Regex>,
    ) -> Self {
        let platform = graph_options.platform.clone().or_else(|| config.platforms.first().cloned());
        let conditions = config.resolver.conditions_for(platform.as_deref());

        let mut transform_options = TransformOptions {
            dev: graph_options.dev.unwrap_or(config.transformer.dev),
            hot: config.transformer.hot,
            minify: graph_options.minify.unwrap_or(config.transformer.minify),
            inline_requires: config.transformer.inline_requires,
            platform: platform.clone(),
            custom: serde_json::Value::Null,
        };
        transform_options.custom = serde_json::json!({ "cacheVersion": config.transformer.cache_version });

        BundlerDriver {
            fs: Rc::clone(&fs),
            package_cache: PackageCache::new(fs),
            haste,
            module_ids,
            transform_pool,
            transform_cache,
            source_exts: config.source_exts.clone(),
            asset_exts: config.asset_exts.clone(),
            asset_resolutions: vec!["@3x".to_string(), "@2x".to_string()],
            main_fields: config.resolver.main_fields.clone(),
            conditions,
            extra_node_modules: config.resolver.extra_node_modules.clone(),
            node_modules_paths: config.resolver.node_modules_paths.clone(),
            block_list,
            disable_hierarchical_lookup: config.resolver.disable_hierarchical_lookup,
            prefer_native_platform: config.resolver.prefer_native_platform,
            use_haste: config.resolver.use_haste,
            use_exports: config.resolver.enable_package_exports,
            transform_options,
            cache_version: config.transformer.cache_version.clone(),
        }
    }

    fn resolver_options(&self) -> ResolverOptions<'_> {
        ResolverOptions {
            platform: self.transform_options.platform.as_deref(),
            conditions: &self.conditions,
            source_exts: &self.source_exts,
            asset_exts: &self.asset_exts,
            asset_resolutions: &self.asset_resolutions,
            prefer_native_platform: self.prefer_native_platform,
            main_fields: &self.main_fields,
            use_haste: self.use_haste,
            use_exports: self.use_exports,
            disable_hierarchical_lookup: self.disable_hierarchical_lookup,
            extra_node_modules: &self.extra_node_modules,
            node_modules_paths: &self.node_modules_paths,
            empty_module_specifier: None,
            block_list: &self.block_list,
        }
    }

    fn is_asset(&self, path: &Utf8Path) -> bool {
        match path.extension() {
            Some(ext) => self.asset_exts.iter().any(|candidate| candidate == ext),
            None => false,
        }
    }

    fn load_asset(&self, path: &Utf8Path) -> Result<LoadedModule, Error> {
        let bytes = crate::filesystem::read_bytes(&path.to_path_buf()).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(LoadedModule {
            code: String::new(),
            source_map: None,
            asset_metadata: Some(serde_json::json!({ "path": path.as_str() })),
            fingerprint: Fingerprint(bytes.into_boxed_slice()),
            dependencies: Vec::new(),
        })
    }

    /// Called by the watch loop when a `package.json` is touched or deleted, so the
    /// resolver never serves a stale parse (`PackageCache::invalidate`, spec §6
    /// "Persisted state layout") or a stale Haste package-name mapping (spec §4.3).
    pub fn on_package_json_event(&self, package_json_path: &Utf8Path, deleted: bool) {
        self.package_cache.invalidate(package_json_path);
        let Some(dir) = package_json_path.parent() else { return };
        let mut haste = self.haste.lock().unwrap();
        if deleted {
            haste.unregister(dir);
        } else if let Some(name) = dir.file_name() {
            haste.register_package(name, dir.to_path_buf());
        }
    }

    fn load_source(&self, path: &Utf8Path) -> Result<LoadedModule, Error> {
        let source = self.fs.read_to_string(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let cache_key = transform_cache_key(path, &source, &self.transform_options, &self.cache_version);
        let result = match self.transform_cache.get(&cache_key).map_err(map_transform_error)? {
            Some(hit) => hit,
            None => {
                let transformed = self
                    .transform_pool
                    .transform(path, &source, &self.transform_options)
                    .map_err(map_transform_error)?;
                if let Err(e) = self.transform_cache.set(&cache_key, &transformed) {
                    // §7 (3) CacheWriteError: aggregated across stores, logged, non-fatal.
                    log::warn!("failed to write transform cache entry for {}: {}", path, e);
                }
                transformed
            }
        };

        Ok(LoadedModule {
            code: result.output,
            source_map: None,
            asset_metadata: None,
            fingerprint: Fingerprint(result.sha1.into_bytes().into_boxed_slice()),
            dependencies: fold_dependencies(result.dependencies),
        })
    }
}

impl GraphDriver for BundlerDriver {
    type Error = Error;

    fn load(&mut self, path: &Utf8Path) -> Result<LoadedModule, Self::Error> {
        if self.is_asset(path) {
            self.load_asset(path)
        } else {
            self.load_source(path)
        }
    }

    fn resolve(&mut self, origin: &Utf8Path, specifier: &str) -> Result<ResolvedSpecifier, Self::Error> {
        let haste = self.haste.lock().unwrap();
        let options = self.resolver_options();
        let resolution = bundler_resolver::resolve(self.fs.as_ref(), &haste, &self.package_cache, origin, specifier, &options, None)?;
        Ok(match resolution {
            Resolution::SourceFile(p) => ResolvedSpecifier::SourceFile(p),
            Resolution::AssetFiles(p) => ResolvedSpecifier::AssetFiles(p),
            Resolution::Empty => ResolvedSpecifier::Empty,
        })
    }

    fn module_id(&mut self, path: &Utf8Path) -> ModuleId {
        self.module_ids.lock().unwrap().create_module_id(path)
    }

    fn release_module_id(&mut self, path: &Utf8Path) {
        self.module_ids.lock().unwrap().release_module_id(path);
    }
}

/// §7 (4) CacheReadError and §7 (6) WorkerCrash both need their own `Error` variant
/// rather than folding into the catch-all `Error::Transform`: a cache read failure is
/// fatal to the current `get`, and a worker crash is the pool's last-resort report
/// after its own internal retry (spec §4.5, "Isolation").
fn map_transform_error(e: bundler_transform::Error) -> Error {
    match e {
        bundler_transform::Error::StoreGetFailed { store, message } => Error::CacheRead { store, message },
        bundler_transform::Error::WorkerCrashed { path } => Error::WorkerCrash { path: Utf8PathBuf::from(path) },
        other => Error::Transform(other),
    }
}

/// Groups a transform's per-occurrence dependency reports by specifier, merging
/// locations into one `RawDependency` each (spec §3, "Dependency": "a specifier that
/// appears more than once ... keeps one `Dependency` with multiple locations").
fn fold_dependencies(raw: Vec<bundler_transform::TransformDependency>) -> Vec<RawDependency> {
    let mut by_specifier: IndexMap<String, RawDependency> = IndexMap::new();
    for dep in raw {
        let kind = convert_kind(dep.kind);
        let locations: Vec<SourceLocation> = dep.locations.iter().map(|l| SourceLocation { line: l.line, column: l.column }).collect();
        by_specifier
            .entry(dep.specifier.clone())
            .and_modify(|existing| existing.locations.extend(locations.clone()))
            .or_insert(RawDependency {
                specifier: dep.specifier,
                kind,
                locations,
            });
    }
    by_specifier.into_values().collect()
}

fn convert_kind(kind: bundler_transform::DependencyKind) -> DependencyKind {
    match kind {
        bundler_transform::DependencyKind::Require => DependencyKind::Require,
        bundler_transform::DependencyKind::EsmImport => DependencyKind::EsmImport,
        bundler_transform::DependencyKind::AsyncImport => DependencyKind::AsyncImport,
        bundler_transform::DependencyKind::EsmExport => DependencyKind::EsmExport,
    }
}

/// The opaque cache key (spec §6, "Persisted state layout": "the key is an opaque byte
/// sequence produced from the fingerprint hash"). Folds `cacheVersion` in so bumping it
/// invalidates every entry without touching stored files (SPEC_FULL.md supplement #4).
fn transform_cache_key(path: &Utf8Path, source: &str, options: &TransformOptions, cache_version: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(path.as_str().as_bytes());
    hasher.update(source.as_bytes());
    hasher.update(options.fingerprint().as_bytes());
    hasher.update(cache_version.as_bytes());
    let digest = hasher.finalize();
    let mut key = String::with_capacity(digest.len() * 2);
    for byte in digest {
        key.push_str(&format!("{:02x}", byte));
    }
    key
}
