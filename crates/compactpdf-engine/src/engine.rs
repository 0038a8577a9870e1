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

//! Engine facade wiring the registry, cache, selector and scheduler

use crate::analyzer::{ContentAnalyzer, FeatureSummary};
use crate::batch::{BatchScheduler, ProgressCallback};
use crate::cache::{CacheStats, FingerprintCache};
use crate::error::EngineResult;
use crate::persistence::{CachePersistence, FilePersistence};
use crate::quality::{QualityGate, QualityScorer};
use crate::registry::{CompressionStrategy, StrategyRegistry};
use crate::result::CompressionResult;
use crate::selector::AdaptiveSelector;
use crate::stats::EngineStats;
use bytes::Bytes;
use compactpdf_config::{CompressionConfig, Config, Validator};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Adaptive compression engine
///
/// Owns one strategy registry and one result cache, shared by single
/// selections and batches.
///
/// # Examples
///
/// ```no_run
/// use bytes::Bytes;
/// use compactpdf_config::Config;
/// use compactpdf_engine::CompressionEngine;
///
/// # async fn example() -> compactpdf_engine::EngineResult<()> {
/// let engine = CompressionEngine::new(Config::default())?;
/// let document = Bytes::from(std::fs::read("report.pdf")?);
///
/// let result = engine.compress(document).await?;
/// println!("{} -> {} bytes", result.original_size, result.final_size);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CompressionEngine {
    config: Config,
    analyzer: ContentAnalyzer,
    registry: Arc<StrategyRegistry>,
    cache: Arc<FingerprintCache>,
    selector: Arc<AdaptiveSelector>,
    scheduler: BatchScheduler,
    persistence: Option<Arc<dyn CachePersistence>>,
    stats: Mutex<EngineStats>,
}

impl CompressionEngine {
    /// Create an engine with no strategies registered
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig)
    /// if the configuration fails validation.
    pub fn new(config: Config) -> EngineResult<Self> {
        Self::builder(config).build()
    }

    /// Start building an engine
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a strategy
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateStrategy`](crate::EngineError::DuplicateStrategy)
    /// if the id is taken.
    pub fn register_strategy(&self, strategy: Arc<dyn CompressionStrategy>) -> EngineResult<()> {
        self.registry.register(strategy)
    }

    /// Registered strategy ids in registration order
    pub fn strategies(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// Extract the feature summary of a document
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedDocument`](crate::EngineError::MalformedDocument)
    /// if the document is not a PDF container.
    pub fn analyze(&self, data: &[u8]) -> EngineResult<FeatureSummary> {
        self.analyzer.analyze(data)
    }

    /// Compress one document with explicit options
    ///
    /// # Errors
    ///
    /// See [`AdaptiveSelector::select`].
    pub async fn select(
        &self,
        data: Bytes,
        config: &CompressionConfig,
    ) -> EngineResult<CompressionResult> {
        match self.selector.select(data, config).await {
            Ok(result) => {
                self.lock_stats().record(&result);
                Ok(result)
            }
            Err(e) => {
                if e.is_malformed() {
                    self.lock_stats().record_error();
                }
                Err(e)
            }
        }
    }

    /// Compress one document with the configured default options
    ///
    /// # Errors
    ///
    /// See [`AdaptiveSelector::select`].
    pub async fn compress(&self, data: Bytes) -> EngineResult<CompressionResult> {
        let config = self.config.compression.clone();
        self.select(data, &config).await
    }

    /// Compress many documents, returning results in input order
    ///
    /// # Errors
    ///
    /// See [`BatchScheduler::run`].
    pub async fn run_batch(
        &self,
        documents: Vec<Bytes>,
        config: &CompressionConfig,
    ) -> EngineResult<Vec<CompressionResult>> {
        self.run_batch_with(documents, config, &CancellationToken::new(), None)
            .await
    }

    /// [`run_batch`](Self::run_batch) with cancellation and progress reporting
    ///
    /// # Errors
    ///
    /// See [`BatchScheduler::run`].
    pub async fn run_batch_with(
        &self,
        documents: Vec<Bytes>,
        config: &CompressionConfig,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> EngineResult<Vec<CompressionResult>> {
        let results = self
            .scheduler
            .run_with(documents, config, cancel, progress)
            .await?;

        let mut stats = self.lock_stats();
        for result in &results {
            stats.record(result);
        }
        Ok(results)
    }

    /// Cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Totals over every result produced so far
    pub fn stats(&self) -> EngineStats {
        *self.lock_stats()
    }

    /// Zero the engine totals
    pub fn reset_stats(&self) {
        *self.lock_stats() = EngineStats::default();
    }

    /// Drop expired cache entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    /// Drop every cache entry
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Write the live cache entries to durable storage
    ///
    /// Returns the number of entries written, or 0 when persistence is not
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub async fn persist_cache(&self) -> EngineResult<usize> {
        let Some(persistence) = &self.persistence else {
            debug!("Cache persistence not configured, skipping save");
            return Ok(0);
        };

        let entries = self.cache.snapshot();
        persistence.save(&entries).await?;
        Ok(entries.len())
    }

    /// Load a snapshot into the cache
    ///
    /// Returns the number of entries stored, or 0 when persistence is not
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    pub async fn restore_cache(&self) -> EngineResult<usize> {
        let Some(persistence) = &self.persistence else {
            debug!("Cache persistence not configured, skipping restore");
            return Ok(0);
        };

        let entries = persistence.load().await?;
        let offered = entries.len();
        let stored = self.cache.restore(entries);
        info!(offered, stored, "Restored cache entries");
        Ok(stored)
    }

    fn lock_stats(&self) -> MutexGuard<'_, EngineStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for [`CompressionEngine`]
#[derive(Debug)]
pub struct EngineBuilder {
    config: Config,
    analyzer: ContentAnalyzer,
    scorer: Option<Arc<dyn QualityScorer>>,
    cache: Option<Arc<FingerprintCache>>,
    persistence: Option<Arc<dyn CachePersistence>>,
    strategies: Vec<Arc<dyn CompressionStrategy>>,
}

impl EngineBuilder {
    /// Start from a configuration
    pub fn new(config: Config) -> Self {
        EngineBuilder {
            config,
            analyzer: ContentAnalyzer::new(),
            scorer: None,
            cache: None,
            persistence: None,
            strategies: Vec::new(),
        }
    }

    /// Register a strategy at build time
    pub fn strategy(mut self, strategy: Arc<dyn CompressionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Use a custom quality scorer instead of the structural default
    pub fn scorer(mut self, scorer: Arc<dyn QualityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Use a custom analyzer
    pub fn analyzer(mut self, analyzer: ContentAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Share an existing cache instead of sizing one from configuration
    pub fn cache(mut self, cache: Arc<FingerprintCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use a custom snapshot store instead of the configured file
    pub fn persistence(mut self, persistence: Arc<dyn CachePersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Validate the configuration and assemble the engine
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig) if
    ///   the configuration fails validation
    /// - [`EngineError::DuplicateStrategy`](crate::EngineError::DuplicateStrategy)
    ///   if two strategies share an id
    pub fn build(self) -> EngineResult<CompressionEngine> {
        self.config.validate()?;

        let registry = Arc::new(StrategyRegistry::new());
        for strategy in self.strategies {
            registry.register(strategy)?;
        }

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(FingerprintCache::from_settings(&self.config.cache)));

        let gate = Arc::new(match self.scorer {
            Some(scorer) => QualityGate::new(scorer),
            None => QualityGate::default(),
        });

        let persistence = self.persistence.or_else(|| {
            let settings = &self.config.persistence;
            match (settings.enabled, settings.path.as_deref()) {
                (true, Some(path)) => {
                    Some(Arc::new(FilePersistence::new(path)) as Arc<dyn CachePersistence>)
                }
                _ => None,
            }
        });

        let selector = Arc::new(
            AdaptiveSelector::new(Arc::clone(&registry), Arc::clone(&cache), gate)
                .with_analyzer(self.analyzer),
        );
        let scheduler = BatchScheduler::from_settings(Arc::clone(&selector), &self.config.batch);

        info!(
            strategies = registry.len(),
            cache_capacity = cache.capacity(),
            max_concurrency = scheduler.max_concurrency(),
            persistence = persistence.is_some(),
            "Compression engine ready"
        );

        Ok(CompressionEngine {
            config: self.config,
            analyzer: self.analyzer,
            registry,
            cache,
            selector,
            scheduler,
            persistence,
            stats: Mutex::new(EngineStats::default()),
        })
    }
}
