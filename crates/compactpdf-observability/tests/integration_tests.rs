// CompactPDF - Adaptive PDF Compression Engine
// Copyright (C) 2025 CompactPDF Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Integration tests for logging setup.
//!
//! Only `test_global_initialization_once` installs a subscriber, since the
//! global default can be set once per process.

#![allow(clippy::unwrap_used)]

use compactpdf_config::Config;
use compactpdf_observability::{
    init_tracing_with_config, LogConfig, LogError, LogFormat, LogOutput,
};

#[test]
fn test_config_builder_chaining() {
    let config = LogConfig::new()
        .with_format(LogFormat::Json)
        .with_level("debug")
        .with_timestamps(false)
        .with_color(false)
        .with_thread_ids(true)
        .with_targets(false)
        .with_output(LogOutput::Stdout);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, Some("debug".to_string()));
    assert!(!config.use_timestamps);
    assert!(!config.use_color);
    assert!(config.include_thread_ids);
    assert!(!config.include_targets);
    assert_eq!(config.output, LogOutput::Stdout);
}

#[test]
fn test_default_engine_config_builds_log_config() {
    let config = LogConfig::from_settings(&Config::default().observability).unwrap();
    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.level.as_deref(), Some("info"));
    assert!(config.use_color);
}

#[test]
fn test_global_initialization_once() {
    let config = LogConfig::new()
        .with_format(LogFormat::Compact)
        .with_level("warn")
        .with_color(false)
        .with_timestamps(false);

    assert!(init_tracing_with_config(&config).is_ok());
    tracing::warn!(component = "observability-test", "subscriber installed");

    let second = init_tracing_with_config(&config);
    assert!(matches!(second, Err(LogError::AlreadyInitialized(_))));
}
