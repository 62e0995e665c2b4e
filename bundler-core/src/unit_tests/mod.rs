// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod code_frame_tests;
mod fixtures;
mod module_id_tests;
