// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The recognized configuration surface (spec §6, "Configuration surface").
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundlerConfig {
    pub project_root: Utf8PathBuf,
    pub watch_folders: Vec<Utf8PathBuf>,
    pub asset_exts: Vec<String>,
    pub source_exts: Vec<String>,
    /// Legal values for the platform axis (e.g. `["ios", "android"]`).
    pub platforms: Vec<String>,
    pub resolver: ResolverConfig,
    pub transformer: TransformerConfig,
    pub watcher: WatcherConfig,
    /// If true, every cache store is ignored on start (spec §6, `resetCache`).
    pub reset_cache: bool,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        BundlerConfig {
            project_root: Utf8PathBuf::from("."),
            watch_folders: Vec::new(),
            asset_exts: default_asset_exts(),
            source_exts: default_source_exts(),
            platforms: vec!["ios".to_string(), "android".to_string()],
            resolver: ResolverConfig::default(),
            transformer: TransformerConfig::default(),
            watcher: WatcherConfig::default(),
            reset_cache: false,
        }
    }
}

fn default_asset_exts() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webp", "ttf", "otf"].iter().map(|s| s.to_string()).collect()
}

fn default_source_exts() -> Vec<String> {
    ["js", "jsx", "ts", "tsx", "json"].iter().map(|s| s.to_string()).collect()
}

/// `resolver.*` (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    pub disable_hierarchical_lookup: bool,
    pub extra_node_modules: IndexMap<String, Utf8PathBuf>,
    pub node_modules_paths: Vec<Utf8PathBuf>,
    pub prefer_native_platform: bool,
    pub main_fields: Vec<String>,
    pub enable_package_exports: bool,
    pub condition_names: Vec<String>,
    pub conditions_by_platform: HashMap<String, Vec<String>>,
    /// Regex patterns; directories matching any of these are excluded from Haste and
    /// `node_modules` lookup (spec §6; supplemented in `bundler-resolver`, since the
    /// algorithm hasn't fully run until a pattern's validity is known -- invalid
    /// patterns are rejected in [`ResolverConfig::compile_block_list`]).
    pub block_list: Vec<String>,
    pub use_haste: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            disable_hierarchical_lookup: false,
            extra_node_modules: IndexMap::new(),
            node_modules_paths: Vec::new(),
            prefer_native_platform: true,
            main_fields: vec!["react-native".to_string(), "browser".to_string(), "main".to_string()],
            enable_package_exports: true,
            condition_names: vec!["require".to_string()],
            conditions_by_platform: HashMap::new(),
            block_list: Vec::new(),
            use_haste: true,
        }
    }
}

impl ResolverConfig {
    /// Compiles `block_list` into `regex::Regex`es, failing on the first invalid
    /// pattern.
    pub fn compile_block_list(&self) -> Result<Vec<regex::Regex>, regex::Error> {
        self.block_list.iter().map(|pattern| regex::Regex::new(pattern)).collect()
    }

    /// The condition names to use for `platform`, falling back to `condition_names`
    /// when no per-platform override is configured (spec §6,
    /// `conditionsByPlatform`).
    pub fn conditions_for(&self, platform: Option<&str>) -> Vec<String> {
        platform
            .and_then(|platform| self.conditions_by_platform.get(platform))
            .cloned()
            .unwrap_or_else(|| self.condition_names.clone())
    }
}

/// `transformer.*` (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformerConfig {
    pub workers: usize,
    pub sticky_workers: bool,
    pub transformer_path: Option<Utf8PathBuf>,
    /// Folded into the fingerprint hash so bumping it invalidates every cache entry
    /// without touching stored files (SPEC_FULL.md supplement #4).
    pub cache_version: String,
    pub dev: bool,
    pub hot: bool,
    pub minify: bool,
    pub inline_requires: bool,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        TransformerConfig {
            workers: num_cpus::get().max(1),
            sticky_workers: true,
            transformer_path: None,
            cache_version: String::new(),
            dev: true,
            hot: false,
            minify: false,
            inline_requires: false,
        }
    }
}

/// `watcher.*` (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatcherConfig {
    pub health_check: HealthCheckConfig,
    pub additional_exts: Vec<String>,
    /// Regex excluding paths from the crawl/event stream (spec §4.1, "ignore policy").
    pub ignore_pattern: Option<String>,
    /// If true, dot-prefixed path components are not excluded by default.
    pub dot: bool,
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig {
            health_check: HealthCheckConfig::default(),
            additional_exts: Vec::new(),
            ignore_pattern: Some(r"(^|/)node_modules/".to_string()),
            dot: false,
            debounce_ms: 50,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthCheckConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        HealthCheckConfig {
            enabled: false,
            interval_ms: 30_000,
            timeout_ms: 5_000,
        }
    }
}

impl From<HealthCheckConfig> for bundler_watcher::HealthCheckConfig {
    fn from(config: HealthCheckConfig) -> Self {
        bundler_watcher::HealthCheckConfig {
            enabled: config.enabled,
            interval: std::time::Duration::from_millis(config.interval_ms),
            timeout: std::time::Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Per-build overrides that participate in `graphId = hash(entryFile, transformOptions,
/// graphOptions)` (spec §4.7).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphOptions {
    pub platform: Option<String>,
    pub dev: Option<bool>,
    pub minify: Option<bool>,
}
