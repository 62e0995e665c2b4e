// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod fixtures;
