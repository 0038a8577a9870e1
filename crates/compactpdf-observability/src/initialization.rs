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

//! Subscriber installation.

use crate::config::{LogConfig, LogError, LogFormat, LogOutput};
use compactpdf_config::ObservabilitySettings;
use std::io;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Initialize tracing with the given format and optional level.
///
/// # Example
///
/// ```ignore
/// use compactpdf_observability::{init_tracing, LogFormat};
///
/// init_tracing(LogFormat::Compact, Some("compactpdf_engine=debug"))?;
/// tracing::info!("engine started");
/// ```
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let config = LogConfig::new()
        .with_format(format)
        .with_level(level.unwrap_or("info"));
    init_tracing_with_config(&config)
}

/// Initialize tracing from the `observability` config section
pub fn init_from_settings(settings: &ObservabilitySettings) -> Result<(), LogError> {
    init_tracing_with_config(&LogConfig::from_settings(settings)?)
}

/// Initialize tracing with a detailed configuration.
///
/// Fails with [`LogError::AlreadyInitialized`] when a global subscriber is
/// already set.
pub fn init_tracing_with_config(config: &LogConfig) -> Result<(), LogError> {
    let env_filter = build_env_filter(config)?;

    Registry::default()
        .with(env_filter)
        .with(format_layer(config))
        .try_init()
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))
}

fn format_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = fmt::layer()
        .with_writer(get_writer(config.output))
        .with_target(config.include_targets)
        .with_thread_ids(config.include_thread_ids);

    match (config.format, config.use_timestamps) {
        (LogFormat::Pretty, true) => base
            .with_ansi(config.use_color)
            .with_span_events(FmtSpan::ACTIVE)
            .pretty()
            .boxed(),
        (LogFormat::Pretty, false) => base
            .with_ansi(config.use_color)
            .with_span_events(FmtSpan::ACTIVE)
            .pretty()
            .without_time()
            .boxed(),
        (LogFormat::Compact, true) => base
            .with_ansi(config.use_color)
            .with_span_events(FmtSpan::CLOSE)
            .compact()
            .boxed(),
        (LogFormat::Compact, false) => base
            .with_ansi(config.use_color)
            .with_span_events(FmtSpan::CLOSE)
            .compact()
            .without_time()
            .boxed(),
        (LogFormat::Json, true) => base
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .boxed(),
        (LogFormat::Json, false) => base
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .without_time()
            .boxed(),
    }
}

fn get_writer(output: LogOutput) -> fn() -> Box<dyn io::Write + Send> {
    match output {
        LogOutput::Stderr => || Box::new(io::stderr()),
        LogOutput::Stdout => || Box::new(io::stdout()),
    }
}

fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let level_str = config.get_effective_level();

    EnvFilter::try_new(&level_str).map_err(|e| {
        LogError::ConfigError(format!("Failed to parse log filter '{}': {}", level_str, e))
    })
}
