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

//! CompactPDF Observability
//!
//! Structured logging for the compression engine.
//!
//! # Features
//!
//! - **Output formats**: pretty, compact and JSON
//! - **Filtering**: directives from configuration or `RUST_LOG`
//! - **Config integration**: build a [`LogConfig`] straight from the
//!   `observability` section of a `compactpdf_config::Config`
//!
//! # Example
//!
//! ```ignore
//! use compactpdf_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Pretty, None)?;
//! tracing::info!("engine started");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{init_from_settings, init_tracing, init_tracing_with_config};

/// Tracing re-exports for convenience
pub use tracing::{debug, error, info, span, trace, warn, Level};
