// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::haste::Haste;
use crate::package_cache::{FileSystemLookup, PackageCache};
use crate::package_json::BrowserRemap;
use crate::specifier::{classify, split_bare_specifier, SpecifierKind};
use crate::{Error, Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use regex::Regex;

/// The result of resolving a specifier (spec §4.3, "Resolution variants").
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    SourceFile(Utf8PathBuf),
    AssetFiles(Vec<Utf8PathBuf>),
    Empty,
}

/// Configuration consulted by [`resolve`] (spec §4.3 and §9 "Configuration surface").
#[derive(Clone, Debug)]
pub struct ResolverOptions<'a> {
    pub platform: Option<&'a str>,
    /// `exports` condition names, in priority order (e.g. `["react-native", "browser", "require"]`).
    pub conditions: &'a [String],
    pub source_exts: &'a [String],
    pub asset_exts: &'a [String],
    /// Resolution-density suffixes tried before the bare extension (e.g. `["@3x", "@2x"]`).
    pub asset_resolutions: &'a [String],
    /// Inserts `.native.*` between platform-specific and platform-agnostic candidates.
    pub prefer_native_platform: bool,
    /// `resolverMainFields`, in priority order (e.g. `["react-native", "browser", "main"]`).
    pub main_fields: &'a [String],
    pub use_haste: bool,
    /// True if `exports` conditional resolution should be consulted at all.
    pub use_exports: bool,
    /// Disables the upward `node_modules` walk (spec §4.3: "unless hierarchical lookup
    /// is disabled").
    pub disable_hierarchical_lookup: bool,
    pub extra_node_modules: &'a IndexMap<String, Utf8PathBuf>,
    pub node_modules_paths: &'a [Utf8PathBuf],
    /// The specifier that denotes the empty-module sentinel (spec §4.3, step 5).
    pub empty_module_specifier: Option<&'a str>,
    /// `resolver.blockList`: directories excluded from Haste and `node_modules` lookup
    /// before either is consulted, tested against the absolute candidate path.
    pub block_list: &'a [Regex],
}

/// True if `path` matches any pattern in `options.block_list`.
fn is_blocked(path: &Utf8Path, options: &ResolverOptions<'_>) -> bool {
    options.block_list.iter().any(|re| re.is_match(path.as_str()))
}

/// A user-supplied resolution override (spec §4.3, step 1).
///
/// `hook` may re-enter the resolver via the `reenter` callback it's given, e.g. to
/// resolve a rewritten specifier through the normal algorithm.
pub trait ResolveRequestHook {
    fn resolve_request(
        &mut self,
        origin: &Utf8Path,
        specifier: &str,
        platform: Option<&str>,
        reenter: &mut dyn FnMut(&str) -> Result<Resolution, Error>,
    ) -> Option<Result<Resolution, Error>>;
}

/// Resolves `specifier` as referenced from `origin` (spec §4.3).
///
/// Pure beyond what `fs` reports: given the same `haste`/`package_cache` contents and
/// the same arguments, always returns the same result (spec invariant I6).
#[allow(clippy::too_many_arguments)]
pub fn resolve<FS: FileSystemLookup>(
    fs: &FS,
    haste: &Haste,
    package_cache: &PackageCache<FS>,
    origin: &Utf8Path,
    specifier: &str,
    options: &ResolverOptions<'_>,
    mut hook: Option<&mut dyn ResolveRequestHook>,
) -> Result<Resolution, Error> {
    if let Some(hook) = hook.as_deref_mut() {
        let mut reenter = |spec: &str| resolve(fs, haste, package_cache, origin, spec, options, None);
        if let Some(result) = hook.resolve_request(origin, specifier, options.platform, &mut reenter) {
            return result;
        }
    }

    if options.empty_module_specifier == Some(specifier) {
        return Ok(Resolution::Empty);
    }

    match classify(specifier)? {
        SpecifierKind::Relative(spec) => {
            let origin_dir = origin.parent().unwrap_or(Utf8Path::new("/"));
            let base = origin_dir.join(spec);
            resolve_path_like(fs, package_cache, origin, specifier, &base, options)
        }
        SpecifierKind::Absolute(spec) => {
            let base = Utf8PathBuf::from(spec);
            resolve_path_like(fs, package_cache, origin, specifier, &base, options)
        }
        SpecifierKind::Bare(spec) => resolve_bare(fs, haste, package_cache, origin, specifier, spec, options),
    }
}

fn resolve_path_like<FS: FileSystemLookup>(
    fs: &FS,
    package_cache: &PackageCache<FS>,
    origin: &Utf8Path,
    original_specifier: &str,
    base: &Utf8Path,
    options: &ResolverOptions<'_>,
) -> Result<Resolution, Error> {
    let mut file_candidates = Vec::new();
    let mut dir_candidates = Vec::new();

    if let Some(path) = probe_source_file(fs, base, options, &mut file_candidates) {
        return Ok(Resolution::SourceFile(path));
    }
    if let Some(paths) = probe_asset_files(fs, base, options) {
        return Ok(Resolution::AssetFiles(paths));
    }
    if fs.is_dir(base) {
        dir_candidates.push(base.to_path_buf());
        if let Some(resolution) = probe_directory(fs, package_cache, base, options, &mut file_candidates)? {
            return Ok(resolution);
        }
    }

    Err(Error::FailedToResolvePath {
        origin: origin.to_path_buf(),
        specifier: original_specifier.to_string(),
        file_candidates,
        dir_candidates,
    })
}

fn resolve_bare<FS: FileSystemLookup>(
    fs: &FS,
    haste: &Haste,
    package_cache: &PackageCache<FS>,
    origin: &Utf8Path,
    original_specifier: &str,
    specifier: &str,
    options: &ResolverOptions<'_>,
) -> Result<Resolution, Error> {
    let (package_name, subpath) = split_bare_specifier(specifier);

    if options.use_haste {
        if subpath.is_empty() {
            if let Some(path) = haste.lookup_module(package_name) {
                if !is_blocked(path, options) {
                    return Ok(Resolution::SourceFile(path.to_path_buf()));
                }
            }
        }
        if let Some(package_dir) = haste.lookup_package(package_name).filter(|dir| !is_blocked(dir, options)) {
            let base = if subpath.is_empty() {
                package_dir.to_path_buf()
            } else {
                package_dir.join(subpath)
            };
            let mut unused = Vec::new();
            if let Some(path) = probe_source_file(fs, &base, options, &mut unused) {
                return Ok(Resolution::SourceFile(path));
            }
            if fs.is_dir(&base) {
                let mut unused_files = Vec::new();
                if let Some(resolution) = probe_directory(fs, package_cache, &base, options, &mut unused_files)? {
                    return Ok(resolution);
                }
            }
        }
    }

    let mut searched_dirs = Vec::new();
    if !options.disable_hierarchical_lookup {
        for node_modules_dir in ancestor_node_modules_dirs(origin) {
            searched_dirs.push(node_modules_dir.clone());
            let package_dir = node_modules_dir.join(package_name);
            if is_blocked(&package_dir, options) {
                continue;
            }
            if let Some(resolution) = try_node_modules_entry(fs, package_cache, &package_dir, subpath, options)? {
                return Ok(resolution);
            }
        }
    }

    let mut extra_paths = Vec::new();
    if let Some(extra) = options.extra_node_modules.get(package_name) {
        extra_paths.push(extra.clone());
        if !is_blocked(extra, options) {
            if let Some(resolution) = try_node_modules_entry(fs, package_cache, extra, subpath, options)? {
                return Ok(resolution);
            }
        }
    }
    for node_modules_dir in options.node_modules_paths {
        let package_dir = node_modules_dir.join(package_name);
        extra_paths.push(package_dir.clone());
        if is_blocked(&package_dir, options) {
            continue;
        }
        if let Some(resolution) = try_node_modules_entry(fs, package_cache, &package_dir, subpath, options)? {
            return Ok(resolution);
        }
    }

    Err(Error::FailedToResolveName {
        origin: origin.to_path_buf(),
        specifier: original_specifier.to_string(),
        searched_dirs,
        extra_paths,
    })
}

fn try_node_modules_entry<FS: FileSystemLookup>(
    fs: &FS,
    package_cache: &PackageCache<FS>,
    package_dir: &Utf8Path,
    subpath: &str,
    options: &ResolverOptions<'_>,
) -> Result<Option<Resolution>, Error> {
    if !fs.is_dir(package_dir) {
        return Ok(None);
    }
    let base = if subpath.is_empty() {
        package_dir.to_path_buf()
    } else {
        package_dir.join(subpath)
    };
    let mut unused = Vec::new();
    if let Some(path) = probe_source_file(fs, &base, options, &mut unused) {
        return Ok(Some(Resolution::SourceFile(path)));
    }
    if let Some(paths) = probe_asset_files(fs, &base, options) {
        return Ok(Some(Resolution::AssetFiles(paths)));
    }
    if fs.is_dir(&base) {
        let mut unused_files = Vec::new();
        return probe_directory(fs, package_cache, &base, options, &mut unused_files);
    }
    Ok(None)
}

fn ancestor_node_modules_dirs(origin: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut dirs = Vec::new();
    let mut current = origin.parent();
    while let Some(dir) = current {
        dirs.push(dir.join("node_modules"));
        current = dir.parent();
    }
    dirs
}

/// Builds the ordered list of extension suffixes to try, per spec §4.3 step 3:
/// `platformExts × sourceExts`, then `sourceExts`, with `.native.*` interposed when
/// `preferNativePlatform` is set.
fn platform_source_extensions(options: &ResolverOptions<'_>) -> Vec<String> {
    let mut list = Vec::with_capacity(options.source_exts.len() * 2);
    if let Some(platform) = options.platform {
        for ext in options.source_exts {
            list.push(format!("{}.{}", platform, ext));
        }
        if options.prefer_native_platform {
            for ext in options.source_exts {
                list.push(format!("native.{}", ext));
            }
        }
    }
    for ext in options.source_exts {
        list.push(ext.clone());
    }
    list
}

fn probe_source_file<FS: FileSystemLookup>(
    fs: &FS,
    base: &Utf8Path,
    options: &ResolverOptions<'_>,
    tried: &mut Vec<Utf8PathBuf>,
) -> Option<Utf8PathBuf> {
    if fs.exists(base) && !fs.is_dir(base) {
        return Some(base.to_path_buf());
    }
    for ext in platform_source_extensions(options) {
        let candidate = Utf8PathBuf::from(format!("{}.{}", base, ext));
        tried.push(candidate.clone());
        if fs.exists(&candidate) && !fs.is_dir(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Probes `assetExts × assetResolutions` (spec §4.3 step 3). All matching density
/// variants for the *first* extension with any match are returned together, since a
/// single asset specifier can legitimately resolve to several files (`@2x`, `@3x`, ...)
/// that the serializer later picks among.
fn probe_asset_files<FS: FileSystemLookup>(fs: &FS, base: &Utf8Path, options: &ResolverOptions<'_>) -> Option<Vec<Utf8PathBuf>> {
    for ext in options.asset_exts {
        let mut found = Vec::new();
        for resolution in options.asset_resolutions {
            let candidate = Utf8PathBuf::from(format!("{}{}.{}", base, resolution, ext));
            if fs.exists(&candidate) {
                found.push(candidate);
            }
        }
        let plain = Utf8PathBuf::from(format!("{}.{}", base, ext));
        if fs.exists(&plain) {
            found.push(plain);
        }
        if !found.is_empty() {
            found.sort();
            return Some(found);
        }
    }
    None
}

/// Directory probing via `package.json` (spec §4.3 step 4): `exports`, then
/// `resolverMainFields` in order, then `<dir>/index.*`.
fn probe_directory<FS: FileSystemLookup>(
    fs: &FS,
    package_cache: &PackageCache<FS>,
    dir: &Utf8Path,
    options: &ResolverOptions<'_>,
    tried: &mut Vec<Utf8PathBuf>,
) -> Result<Option<Resolution>, Error> {
    let package_json_path = dir.join("package.json");
    if !fs.exists(&package_json_path) {
        return Ok(probe_source_file(fs, &dir.join("index"), options, tried).map(Resolution::SourceFile));
    }
    let package = package_cache.get_package(&package_json_path)?;

    if options.use_exports {
        if let Some(target) = package.resolve_exports(".", options.conditions) {
            let candidate = dir.join(target.trim_start_matches("./"));
            if let Some(path) = probe_source_file(fs, &candidate, options, tried) {
                return Ok(Some(Resolution::SourceFile(path)));
            }
        }
    }

    for field in options.main_fields {
        let Some(value) = package.main_field(field) else { continue };
        if let Some(BrowserRemap::Empty) = package.remap_field(field, value) {
            return Ok(Some(Resolution::Empty));
        }
        let candidate = dir.join(value);
        if let Some(path) = probe_source_file(fs, &candidate, options, tried) {
            return Ok(Some(Resolution::SourceFile(path)));
        }
        if fs.is_dir(&candidate) {
            if let Some(path) = probe_source_file(fs, &candidate.join("index"), options, tried) {
                return Ok(Some(Resolution::SourceFile(path)));
            }
        }
    }

    Ok(probe_source_file(fs, &dir.join("index"), options, tried).map(Resolution::SourceFile))
}
