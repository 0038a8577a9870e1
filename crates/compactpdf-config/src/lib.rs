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

//! Configuration management for the CompactPDF engine
//!
//! Provides the configuration schema shared by the engine crates, with
//! support for multiple formats (TOML, YAML, JSON), `COMPACTPDF_` environment
//! variable overrides, multi-file merging and validation.
//!
//! # Example
//!
//! ```no_run
//! use compactpdf_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = ConfigLoader::new();
//!     let config = loader.load_with_overrides("compactpdf.toml").await?;
//!
//!     println!("Cache capacity: {}", config.cache.capacity);
//!     println!("Quality threshold: {}", config.compression.quality_threshold);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader};
pub use schema::*;
pub use validation::Validator;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();
        assert!(config.cache.enabled);
        assert_eq!(config.compression.strategy_preference, StrategyPreference::Auto);
        assert!(config.batch.max_concurrency >= 1);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let mut config = Config::default();
        config
            .custom
            .insert("tenant".to_string(), serde_json::json!("archive-team"));

        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
