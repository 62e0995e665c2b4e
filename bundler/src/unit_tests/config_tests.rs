// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::config::{BundlerConfig, ResolverConfig};
use std::collections::HashMap;

#[test]
fn partial_json_config_falls_back_to_defaults() {
    let config: BundlerConfig = serde_json::from_str(r#"{"projectRoot": "/repo", "resetCache": true}"#).expect("parses");
    assert_eq!(config.project_root.as_str(), "/repo");
    assert!(config.reset_cache);
    assert_eq!(config.platforms, vec!["ios".to_string(), "android".to_string()], "unset fields keep their Default");
    assert!(config.resolver.use_haste, "nested configs keep their own Default too");
}

#[test]
fn compile_block_list_rejects_invalid_regex() {
    let mut resolver = ResolverConfig::default();
    resolver.block_list = vec!["(".to_string()];
    assert!(resolver.compile_block_list().is_err());
}

#[test]
fn conditions_for_platform_falls_back_to_condition_names() {
    let mut resolver = ResolverConfig::default();
    resolver.condition_names = vec!["require".to_string()];
    resolver.conditions_by_platform = HashMap::from([("ios".to_string(), vec!["react-native".to_string(), "require".to_string()])]);

    assert_eq!(resolver.conditions_for(Some("ios")), vec!["react-native".to_string(), "require".to_string()]);
    assert_eq!(resolver.conditions_for(Some("android")), vec!["require".to_string()]);
    assert_eq!(resolver.conditions_for(None), vec!["require".to_string()]);
}
