// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::module_id::{ModuleIdFactory, SequentialModuleIdFactory};
use crate::Utf8Path;

#[test]
fn repeated_lookups_of_a_live_path_return_the_same_id() {
    let mut ids = SequentialModuleIdFactory::new();
    let path = Utf8Path::new("/a.js");
    assert_eq!(ids.create_module_id(path), ids.create_module_id(path));
}

#[test]
fn release_then_recreate_allocates_a_new_id() {
    let mut ids = SequentialModuleIdFactory::new();
    let path = Utf8Path::new("/a.js");
    let before = ids.create_module_id(path);

    ids.release_module_id(path);
    let after = ids.create_module_id(path);

    assert_ne!(before, after);
}

#[test]
fn releasing_an_unknown_path_is_a_no_op() {
    let mut ids = SequentialModuleIdFactory::new();
    ids.release_module_id(Utf8Path::new("/never-assigned.js"));
    // Still allocates normally afterwards.
    let id = ids.create_module_id(Utf8Path::new("/a.js"));
    assert_eq!(id, ids.create_module_id(Utf8Path::new("/a.js")));
}
