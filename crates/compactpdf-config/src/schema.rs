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

//! Configuration schema

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Fingerprint cache sizing
    pub cache: CacheSettings,

    /// Batch scheduling
    pub batch: BatchSettings,

    /// Default per-call compression options
    pub compression: CompressionConfig,

    /// Durable cache snapshots
    pub persistence: PersistenceSettings,

    /// Logging settings
    pub observability: ObservabilitySettings,

    /// Custom user-defined settings
    #[serde(default)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl Config {
    /// Load configuration from a file, falling back to defaults when absent
    pub async fn load_or_default(path: impl AsRef<std::path::Path>) -> crate::ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        crate::ConfigLoader::new().load_file(path).await
    }

    /// Render the configuration as pretty TOML
    pub fn to_toml(&self) -> crate::ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializationError(e.to_string()))
    }
}

/// Which family of strategies a caller prefers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreference {
    /// Every strategy family is admitted
    #[default]
    Auto,
    /// Only image re-encoding strategies
    Image,
    /// Only font optimization strategies
    Font,
    /// Only content/stream strategies
    Content,
}

impl StrategyPreference {
    /// Name used in configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyPreference::Auto => "auto",
            StrategyPreference::Image => "image",
            StrategyPreference::Font => "font",
            StrategyPreference::Content => "content",
        }
    }
}

impl fmt::Display for StrategyPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(StrategyPreference::Auto),
            "image" => Ok(StrategyPreference::Image),
            "font" => Ok(StrategyPreference::Font),
            "content" => Ok(StrategyPreference::Content),
            other => Err(ConfigError::invalid_value(
                "compression.strategy_preference",
                format!("unknown preference '{}', expected auto, image, font or content", other),
            )),
        }
    }
}

/// Named compression presets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionPreset {
    /// Light compression, near-lossless output
    Minimal,
    /// Size and quality balanced
    Balanced,
    /// Smallest output, noticeable quality loss allowed
    Aggressive,
}

impl FromStr for CompressionPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(CompressionPreset::Minimal),
            "balanced" => Ok(CompressionPreset::Balanced),
            "aggressive" => Ok(CompressionPreset::Aggressive),
            other => Err(ConfigError::invalid_value(
                "compression.preset",
                format!("unknown preset '{}'", other),
            )),
        }
    }
}

/// Options recognized by a single selection call
///
/// Every field participates in the cache fingerprint, so two calls share a
/// cached result only when their configurations are identical.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompressionConfig {
    /// Target quality handed to strategies (0-100)
    #[serde(default = "default_quality_target")]
    pub quality_target: u8,

    /// Strategy family filter
    #[serde(default)]
    pub strategy_preference: StrategyPreference,

    /// Minimum acceptable quality score (0.0-1.0)
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Upper bound on candidates tried per document
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Lifetime of cached results (in seconds)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Consult and populate the fingerprint cache
    #[serde(default = "default_true")]
    pub use_cache: bool,

    /// Strategy ids admitted (empty admits every registered strategy)
    #[serde(default)]
    pub strategy_allow_list: Vec<String>,

    /// Per-document time budget (in milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_timeout_ms: Option<u64>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self::preset(CompressionPreset::Balanced)
    }
}

impl CompressionConfig {
    /// Build a configuration from a named preset
    pub fn preset(preset: CompressionPreset) -> Self {
        let (quality_target, quality_threshold) = match preset {
            CompressionPreset::Minimal => (95, 0.95),
            CompressionPreset::Balanced => (85, 0.90),
            CompressionPreset::Aggressive => (70, 0.80),
        };
        CompressionConfig {
            quality_target,
            strategy_preference: StrategyPreference::Auto,
            quality_threshold,
            max_candidates: default_max_candidates(),
            ttl_secs: default_ttl_secs(),
            use_cache: true,
            strategy_allow_list: Vec::new(),
            document_timeout_ms: None,
        }
    }

    /// Cache lifetime as a duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Per-document timeout, if configured
    pub fn document_timeout(&self) -> Option<Duration> {
        self.document_timeout_ms.map(Duration::from_millis)
    }

    /// Whether `id` passes the allow-list
    pub fn allows_strategy(&self, id: &str) -> bool {
        self.strategy_allow_list.is_empty() || self.strategy_allow_list.iter().any(|s| s == id)
    }

    /// Set the quality target
    pub fn with_quality_target(mut self, target: u8) -> Self {
        self.quality_target = target;
        self
    }

    /// Set the quality threshold
    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    /// Set the strategy preference
    pub fn with_preference(mut self, preference: StrategyPreference) -> Self {
        self.strategy_preference = preference;
        self
    }

    /// Set the candidate limit
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    /// Set the cache lifetime (whole seconds)
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    /// Enable or disable the cache for this call
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Restrict candidates to the given strategy ids
    pub fn with_allow_list<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strategy_allow_list = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-document timeout
    ///
    /// Sub-millisecond timeouts round up to 1 ms; oversized ones saturate.
    pub fn with_document_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.document_timeout_ms = Some(millis.max(u64::from(!timeout.is_zero())));
        self
    }
}

/// Fingerprint cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    /// Enable the in-memory cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of cached results (0 disables storage)
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Maximum total bytes of cached output (0 = unlimited)
    #[serde(default)]
    pub max_bytes: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            enabled: true,
            capacity: default_cache_capacity(),
            max_bytes: 0,
        }
    }
}

impl CacheSettings {
    /// Capacity after applying the `enabled` switch
    pub fn effective_capacity(&self) -> usize {
        if self.enabled {
            self.capacity
        } else {
            0
        }
    }
}

/// Batch scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSettings {
    /// Maximum documents compressed concurrently
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings {
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Durable cache snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersistenceSettings {
    /// Persist the cache across restarts
    #[serde(default)]
    pub enabled: bool,

    /// Snapshot file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservabilitySettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        ObservabilitySettings {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_quality_target() -> u8 {
    85
}

fn default_quality_threshold() -> f64 {
    0.90
}

fn default_max_candidates() -> usize {
    3
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_cache_capacity() -> usize {
    256
}

fn default_max_concurrency() -> usize {
    num_cpus::get().max(1)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
