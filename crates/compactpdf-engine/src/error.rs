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

//! Engine error types

use compactpdf_config::ConfigError;
use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the compression engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input is not a PDF container
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A strategy failed to transform the document
    #[error("strategy '{strategy}' failed: {message}")]
    StrategyExecution {
        /// Strategy id
        strategy: String,
        /// Failure detail
        message: String,
    },

    /// A strategy id was registered twice
    #[error("strategy already registered: {0}")]
    DuplicateStrategy(String),

    /// Configuration rejected before use
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Cache snapshot could not be read or written
    #[error("persistence error: {0}")]
    Persistence(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for opaque error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// Create a malformed document error
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        EngineError::MalformedDocument(msg.into())
    }

    /// Create a strategy execution error
    pub fn strategy_failed<S: Into<String>, M: Into<String>>(strategy: S, message: M) -> Self {
        EngineError::StrategyExecution {
            strategy: strategy.into(),
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        EngineError::Persistence(msg.into())
    }

    /// Check if the document was rejected by analysis
    pub fn is_malformed(&self) -> bool {
        matches!(self, EngineError::MalformedDocument(_))
    }

    /// Check if this is a strategy execution error
    pub fn is_strategy_failure(&self) -> bool {
        matches!(self, EngineError::StrategyExecution { .. })
    }

    /// Check if this is a configuration error
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, EngineError::InvalidConfig(_))
    }
}
