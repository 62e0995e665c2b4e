// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Specifier resolution (spec §4.3) and the `package.json` read-through cache that
//! backs it (spec §4.2).
//!
//! [`resolve`] is a pure function of its arguments plus whatever the injected
//! [`FileSystemLookup`] reports -- it performs no caching of its own beyond the
//! [`PackageCache`] a caller threads through it, mirroring the way `bundler-core`'s
//! `GraphDriver` keeps all I/O at the edges.

mod errors;
mod haste;
mod package_cache;
mod package_json;
mod resolver;
mod specifier;
#[cfg(test)]
mod unit_tests;

pub use errors::Error;
pub use haste::Haste;
pub use package_cache::{FileSystemLookup, PackageCache};
pub use package_json::PackageJson;
pub use resolver::{resolve, ResolveRequestHook, Resolution, ResolverOptions};
pub use specifier::{classify, SpecifierKind};

#[doc(no_inline)]
pub use camino::{Utf8Path, Utf8PathBuf};
