// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::module::{render_code_frame, SourceLocation};

#[test]
fn renders_the_target_line_with_a_caret_under_its_column() {
    let source = "const a = 1;\nimport './missing';\nconst b = 2;\n";
    let frame = render_code_frame(source, SourceLocation { line: 2, column: 7 }).expect("line 2 exists");
    assert_eq!(frame, "2 | import './missing';\n           ^");
}

#[test]
fn out_of_range_line_returns_none() {
    let source = "const a = 1;\n";
    assert_eq!(render_code_frame(source, SourceLocation { line: 99, column: 0 }), None);
}

#[test]
fn column_past_the_end_of_the_line_is_clamped() {
    let source = "short\n";
    let frame = render_code_frame(source, SourceLocation { line: 1, column: 100 }).expect("line 1 exists");
    assert_eq!(frame, "1 | short\n         ^");
}
