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

//! Configuration validation

use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    /// Check every field, returning the first violation
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.cache.validate()?;
        self.batch.validate()?;
        self.compression.validate()?;
        self.persistence.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

impl Validator for CompressionConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.quality_target > 100 {
            return Err(ConfigError::invalid_value(
                "compression.quality_target",
                format!("must be between 0 and 100, got {}", self.quality_target),
            ));
        }

        if !self.quality_threshold.is_finite() || !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err(ConfigError::invalid_value(
                "compression.quality_threshold",
                format!("must be between 0.0 and 1.0, got {}", self.quality_threshold),
            ));
        }

        if self.max_candidates == 0 {
            return Err(ConfigError::invalid_value(
                "compression.max_candidates",
                "at least one candidate must be allowed",
            ));
        }

        if self.strategy_allow_list.iter().any(|id| id.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "compression.strategy_allow_list",
                "strategy ids must not be empty",
            ));
        }

        if self.document_timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value(
                "compression.document_timeout_ms",
                "timeout must be greater than zero",
            ));
        }

        Ok(())
    }
}

impl Validator for CacheSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.enabled && self.max_bytes > 0 && self.capacity == 0 {
            return Err(ConfigError::invalid_value(
                "cache.capacity",
                "a byte budget requires a non-zero entry capacity",
            ));
        }
        Ok(())
    }
}

impl Validator for BatchSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid_value(
                "batch.max_concurrency",
                "must be at least 1",
            ));
        }

        if self.max_concurrency > 1024 {
            return Err(ConfigError::invalid_value(
                "batch.max_concurrency",
                format!("must not exceed 1024, got {}", self.max_concurrency),
            ));
        }

        Ok(())
    }
}

impl Validator for PersistenceSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.enabled && self.path.as_deref().map_or(true, |p| p.trim().is_empty()) {
            return Err(ConfigError::MissingRequired("persistence.path".to_string()));
        }
        Ok(())
    }
}

impl Validator for ObservabilitySettings {
    fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }
}
