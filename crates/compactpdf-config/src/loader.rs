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

//! Configuration loading from files and the environment

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{CacheSettings, Config, CompressionConfig, ObservabilitySettings};
use crate::validation::Validator;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML document
    Toml,
    /// YAML document
    Yaml,
    /// JSON document
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).await?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        self.load_from_string(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_string(&self, content: &str, format: ConfigFormat) -> ConfigResult<Config> {
        let config: Config = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };

        debug!("Configuration loaded from {}", format.name());

        if self.validate {
            config.validate()?;
            info!("Configuration validated successfully");
        }

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub async fn load_with_overrides<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let mut config = self.load_file(path).await?;
        self.apply_env_overrides(&mut config)?;
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Merge multiple configuration files (later files take precedence)
    pub async fn load_and_merge<P: AsRef<Path>>(&self, paths: &[P]) -> ConfigResult<Config> {
        let Some((first, rest)) = paths.split_first() else {
            return Err(ConfigError::validation_error(
                "at least one configuration file must be provided",
            ));
        };

        let mut merged = self.load_file(first).await?;
        for path in rest {
            let overlay = self.load_file(path).await?;
            merge_configs(&mut merged, &overlay);
        }

        if self.validate {
            merged.validate()?;
        }

        Ok(merged)
    }

    /// Apply `COMPACTPDF_*` environment variable overrides
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        self.apply_overrides_from(config, |name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides_from<F>(&self, config: &mut Config, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Cache settings
        if let Some(value) = lookup("COMPACTPDF_CACHE_ENABLED") {
            config.cache.enabled = parse_bool("COMPACTPDF_CACHE_ENABLED", &value)?;
        }
        if let Some(value) = lookup("COMPACTPDF_CACHE_CAPACITY") {
            config.cache.capacity =
                parse_value("COMPACTPDF_CACHE_CAPACITY", &value, "expected valid integer")?;
        }
        if let Some(value) = lookup("COMPACTPDF_CACHE_MAX_BYTES") {
            config.cache.max_bytes =
                parse_value("COMPACTPDF_CACHE_MAX_BYTES", &value, "expected valid integer")?;
        }

        // Batch settings
        if let Some(value) = lookup("COMPACTPDF_MAX_CONCURRENCY") {
            config.batch.max_concurrency =
                parse_value("COMPACTPDF_MAX_CONCURRENCY", &value, "expected valid integer")?;
        }

        // Compression defaults
        if let Some(value) = lookup("COMPACTPDF_QUALITY_TARGET") {
            config.compression.quality_target =
                parse_value("COMPACTPDF_QUALITY_TARGET", &value, "expected integer 0-100")?;
        }
        if let Some(value) = lookup("COMPACTPDF_QUALITY_THRESHOLD") {
            config.compression.quality_threshold =
                parse_value("COMPACTPDF_QUALITY_THRESHOLD", &value, "expected number 0.0-1.0")?;
        }
        if let Some(value) = lookup("COMPACTPDF_STRATEGY_PREFERENCE") {
            config.compression.strategy_preference = parse_value(
                "COMPACTPDF_STRATEGY_PREFERENCE",
                &value,
                "expected auto, image, font or content",
            )?;
        }
        if let Some(value) = lookup("COMPACTPDF_CACHE_TTL_SECS") {
            config.compression.ttl_secs =
                parse_value("COMPACTPDF_CACHE_TTL_SECS", &value, "expected seconds")?;
        }
        if let Some(value) = lookup("COMPACTPDF_USE_CACHE") {
            config.compression.use_cache = parse_bool("COMPACTPDF_USE_CACHE", &value)?;
        }

        // Persistence
        if let Some(value) = lookup("COMPACTPDF_PERSISTENCE_PATH") {
            config.persistence.enabled = true;
            config.persistence.path = Some(value);
        }

        // Observability
        if let Some(value) = lookup("COMPACTPDF_LOG_LEVEL") {
            config.observability.log_level = value;
        }
        if let Some(value) = lookup("COMPACTPDF_LOG_FORMAT") {
            config.observability.log_format = value;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge `overlay` into `base`; sections left at their defaults do not override
fn merge_configs(base: &mut Config, overlay: &Config) {
    if overlay.cache != CacheSettings::default() {
        base.cache = overlay.cache.clone();
    }
    if overlay.batch != Config::default().batch {
        base.batch = overlay.batch.clone();
    }
    if overlay.compression != CompressionConfig::default() {
        base.compression = overlay.compression.clone();
    }
    if overlay.persistence.enabled {
        base.persistence = overlay.persistence.clone();
    }
    if overlay.observability != ObservabilitySettings::default() {
        base.observability = overlay.observability.clone();
    }

    for (key, value) in &overlay.custom {
        base.custom.insert(key.clone(), value.clone());
    }
}

fn parse_value<T: FromStr>(variable: &str, value: &str, reason: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_var_parsing_error(variable, value, reason))
}

/// Parse boolean from string (accepts: true, false, yes, no, 1, 0, on, off)
fn parse_bool(variable: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::env_var_parsing_error(
            variable,
            value,
            "expected 'true', 'false', 'yes', 'no', '1', '0', 'on', or 'off'",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::StrategyPreference;
    use std::collections::HashMap;

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_path("engine.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("engine.yaml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("engine.yml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("engine.json").unwrap(), ConfigFormat::Json);
    }

    #[test]
    fn test_format_detection_error() {
        assert!(ConfigFormat::from_path("engine.ini").is_err());
        assert!(ConfigFormat::from_path("engine").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "YES").unwrap());
        assert!(parse_bool("X", "on").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new();
        let toml = r#"
        [cache]
        capacity = 32

        [compression]
        quality_threshold = 0.75
        strategy_preference = "image"
        "#;
        let config = loader.load_from_string(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.cache.capacity, 32);
        assert_eq!(config.compression.quality_threshold, 0.75);
        assert_eq!(config.compression.strategy_preference, StrategyPreference::Image);
        assert_eq!(config.compression.max_candidates, 3);
    }

    #[test]
    fn test_parse_yaml() {
        let loader = ConfigLoader::new();
        let yaml = "batch:\n  max_concurrency: 2\nobservability:\n  log_level: debug\n";
        let config = loader.load_from_string(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.batch.max_concurrency, 2);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_parse_json_validation_failure() {
        let loader = ConfigLoader::new();
        let json = r#"{"compression": {"quality_threshold": 2.0}}"#;
        assert!(loader.load_from_string(json, ConfigFormat::Json).is_err());

        let loader = ConfigLoader::without_validation();
        assert!(loader.load_from_string(json, ConfigFormat::Json).is_ok());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("COMPACTPDF_CACHE_CAPACITY", "8"),
            ("COMPACTPDF_MAX_CONCURRENCY", "3"),
            ("COMPACTPDF_QUALITY_THRESHOLD", "0.6"),
            ("COMPACTPDF_STRATEGY_PREFERENCE", "font"),
            ("COMPACTPDF_USE_CACHE", "no"),
            ("COMPACTPDF_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        ConfigLoader::new()
            .apply_overrides_from(&mut config, |name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.batch.max_concurrency, 3);
        assert_eq!(config.compression.quality_threshold, 0.6);
        assert_eq!(config.compression.strategy_preference, StrategyPreference::Font);
        assert!(!config.compression.use_cache);
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_override_parse_error() {
        let mut config = Config::default();
        let result = ConfigLoader::new().apply_overrides_from(&mut config, |name| {
            (name == "COMPACTPDF_CACHE_CAPACITY").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ConfigError::EnvVarParsingError { .. })));
    }

    #[test]
    fn test_merge_keeps_base_for_default_sections() {
        let mut base = Config::default();
        base.cache.capacity = 16;

        let mut overlay = Config::default();
        overlay.compression.quality_threshold = 0.5;

        merge_configs(&mut base, &overlay);
        assert_eq!(base.cache.capacity, 16);
        assert_eq!(base.compression.quality_threshold, 0.5);
    }
}
