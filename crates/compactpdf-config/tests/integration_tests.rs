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

#![allow(clippy::unwrap_used)]

use compactpdf_config::{
    CompressionPreset, CompressionConfig, Config, ConfigError, ConfigFormat, ConfigLoader,
    StrategyPreference, Validator,
};
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_load_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("compactpdf.toml");
    fs::write(
        &path,
        r#"
[cache]
capacity = 64
max_bytes = 1048576

[batch]
max_concurrency = 4

[compression]
quality_target = 70
quality_threshold = 0.8
strategy_preference = "content"
max_candidates = 2
ttl_secs = 120
strategy_allow_list = ["stream-recompress"]
"#,
    )
    .unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.cache.capacity, 64);
    assert_eq!(config.cache.max_bytes, 1_048_576);
    assert_eq!(config.batch.max_concurrency, 4);
    assert_eq!(config.compression.quality_target, 70);
    assert_eq!(config.compression.strategy_preference, StrategyPreference::Content);
    assert_eq!(config.compression.max_candidates, 2);
    assert!(config.compression.allows_strategy("stream-recompress"));
    assert!(!config.compression.allows_strategy("font-subset"));
}

#[tokio::test]
async fn test_load_missing_file() {
    let result = ConfigLoader::new().load_file("/nonexistent/compactpdf.toml").await;
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[tokio::test]
async fn test_load_or_default_without_file() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(dir.path().join("absent.yaml"))
        .await
        .unwrap();
    assert_eq!(config, Config::default());
}

#[tokio::test]
async fn test_load_and_merge_later_files_win() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("overlay.json");

    fs::write(
        &base,
        "cache:\n  capacity: 10\nobservability:\n  log_level: warn\n",
    )
    .unwrap();
    fs::write(
        &overlay,
        r#"{"compression": {"quality_threshold": 0.7}, "custom": {"team": "archive"}}"#,
    )
    .unwrap();

    let merged = ConfigLoader::new()
        .load_and_merge(&[&base, &overlay])
        .await
        .unwrap();

    assert_eq!(merged.cache.capacity, 10);
    assert_eq!(merged.observability.log_level, "warn");
    assert_eq!(merged.compression.quality_threshold, 0.7);
    assert_eq!(merged.custom["team"], "archive");
}

#[tokio::test]
async fn test_load_and_merge_requires_paths() {
    let paths: [&str; 0] = [];
    assert!(ConfigLoader::new().load_and_merge(&paths).await.is_err());
}

#[test]
fn test_toml_round_trip() {
    let mut config = Config::default();
    config.compression = CompressionConfig::preset(CompressionPreset::Aggressive)
        .with_allow_list(["jpeg-reencode", "font-subset"]);
    config.batch.max_concurrency = 2;

    let rendered = config.to_toml().unwrap();
    let parsed = ConfigLoader::new()
        .load_from_string(&rendered, ConfigFormat::Toml)
        .unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let loader = ConfigLoader::new();
    let yaml = "compression:\n  max_candidates: 0\n";
    let err = loader.load_from_string(yaml, ConfigFormat::Yaml).unwrap_err();
    assert!(err.is_invalid_value());

    let yaml = "observability:\n  log_format: xml\n";
    assert!(loader.load_from_string(yaml, ConfigFormat::Yaml).is_err());
}

#[test]
fn test_unknown_preference_rejected() {
    let loader = ConfigLoader::new();
    let json = r#"{"compression": {"strategy_preference": "video"}}"#;
    assert!(matches!(
        loader.load_from_string(json, ConfigFormat::Json),
        Err(ConfigError::JsonParseError(_))
    ));
}

#[test]
fn test_validator_on_sections() {
    let config = Config::default();
    assert!(config.compression.validate().is_ok());
    assert!(config.cache.validate().is_ok());
    assert!(config.observability.validate().is_ok());
}
