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

//! Bounded-concurrency batch compression
//!
//! Documents are admitted in submission order through a fair semaphore, so
//! at most `max_concurrency` selections run at once. Results come back in
//! input order. A document that fails (malformed input, a crashed worker)
//! yields a failed result carrying its original bytes; the rest of the batch
//! is unaffected.
//!
//! Cancelling the token stops admission. Documents not yet admitted are
//! reported as `cancelled`; documents already running complete normally.

use crate::error::EngineResult;
use crate::result::{CompressionResult, FailureReason};
use crate::selector::AdaptiveSelector;
use bytes::Bytes;
use compactpdf_config::{BatchSettings, CompressionConfig, Validator};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Progress report, emitted after each processed document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Documents finished so far
    pub completed: usize,
    /// Documents in the batch
    pub total: usize,
}

impl BatchProgress {
    /// Completion as a percentage
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }
}

/// Callback invoked with progress updates, possibly from worker tasks
pub type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

/// Aggregate over a batch's results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Documents in the batch
    pub total: usize,
    /// Results that passed the quality gate (including pass-throughs)
    pub accepted: usize,
    /// Results where candidates ran but none was accepted
    pub fallbacks: usize,
    /// Documents that could not be processed (including cancelled ones)
    pub failures: usize,
    /// Documents never admitted because the batch was cancelled
    pub cancelled: usize,
    /// Results served from the cache
    pub cache_hits: usize,
    /// Input bytes
    pub bytes_in: u64,
    /// Output bytes
    pub bytes_out: u64,
}

impl BatchSummary {
    /// Summarize a batch's results
    pub fn from_results(results: &[CompressionResult]) -> Self {
        results.iter().fold(
            BatchSummary {
                total: results.len(),
                ..Default::default()
            },
            |mut summary, result| {
                if result.accepted {
                    summary.accepted += 1;
                }
                if result.is_fallback() {
                    summary.fallbacks += 1;
                }
                if result.is_failure() {
                    summary.failures += 1;
                }
                if result.failure_reason == Some(FailureReason::Cancelled) {
                    summary.cancelled += 1;
                }
                if result.cache_hit {
                    summary.cache_hits += 1;
                }
                summary.bytes_in += result.original_size;
                summary.bytes_out += result.final_size;
                summary
            },
        )
    }

    /// Bytes removed across the batch
    pub fn bytes_saved(&self) -> u64 {
        self.bytes_in.saturating_sub(self.bytes_out)
    }

    /// Output size relative to the input (1.0 for an empty batch)
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_in == 0 {
            return 1.0;
        }
        self.bytes_out as f64 / self.bytes_in as f64
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents: {} accepted, {} fallbacks, {} failed ({} cancelled), {} cached; {} -> {} bytes",
            self.total,
            self.accepted,
            self.fallbacks,
            self.failures,
            self.cancelled,
            self.cache_hits,
            self.bytes_in,
            self.bytes_out
        )
    }
}

enum Slot {
    Running {
        handle: JoinHandle<CompressionResult>,
        original: Bytes,
    },
    Skipped(Bytes),
}

/// Runs the selector over many documents with bounded concurrency
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    selector: Arc<AdaptiveSelector>,
    max_concurrency: usize,
}

impl BatchScheduler {
    /// Create a scheduler; a concurrency of 0 is treated as 1
    pub fn new(selector: Arc<AdaptiveSelector>, max_concurrency: usize) -> Self {
        BatchScheduler {
            selector,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Create a scheduler from configuration
    pub fn from_settings(selector: Arc<AdaptiveSelector>, settings: &BatchSettings) -> Self {
        Self::new(selector, settings.max_concurrency)
    }

    /// Maximum documents processed at once
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Compress every document, returning results in input order
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig)
    /// if `config` fails validation. Per-document problems never fail the batch.
    pub async fn run(
        &self,
        documents: Vec<Bytes>,
        config: &CompressionConfig,
    ) -> EngineResult<Vec<CompressionResult>> {
        self.run_with(documents, config, &CancellationToken::new(), None)
            .await
    }

    /// [`run`](Self::run) with cancellation and progress reporting
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_with(
        &self,
        documents: Vec<Bytes>,
        config: &CompressionConfig,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> EngineResult<Vec<CompressionResult>> {
        config.validate()?;

        let total = documents.len();
        let started = Instant::now();
        info!(documents = total, max_concurrency = self.max_concurrency, "Starting batch");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let completed = Arc::new(AtomicUsize::new(0));
        let config = Arc::new(config.clone());
        let mut slots = Vec::with_capacity(total);

        for (index, document) in documents.into_iter().enumerate() {
            let permit = if cancel.is_cancelled() {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
                }
            };

            let Some(permit) = permit else {
                debug!(index, "Batch cancelled, skipping document");
                slots.push(Slot::Skipped(document));
                continue;
            };

            let selector = Arc::clone(&self.selector);
            let config = Arc::clone(&config);
            let completed = Arc::clone(&completed);
            let progress = progress.clone();
            let input = document.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let document_started = Instant::now();

                let result = match selector.select(input.clone(), &config).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(index, error = %e, "Document failed");
                        let mut failed =
                            CompressionResult::failed(input, FailureReason::from_error(&e));
                        failed.elapsed = document_started.elapsed();
                        failed
                    }
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = progress {
                    progress(BatchProgress {
                        completed: done,
                        total,
                    });
                }
                result
            });

            slots.push(Slot::Running {
                handle,
                original: document,
            });
        }

        let mut results = Vec::with_capacity(total);
        for (index, slot) in slots.into_iter().enumerate() {
            let result = match slot {
                Slot::Skipped(original) => {
                    CompressionResult::failed(original, FailureReason::Cancelled)
                }
                Slot::Running { handle, original } => match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(index, error = %e, "Worker task failed");
                        CompressionResult::failed(original, FailureReason::WorkerFailed(e.to_string()))
                    }
                },
            };
            results.push(result);
        }

        let summary = BatchSummary::from_results(&results);
        info!(
            documents = summary.total,
            accepted = summary.accepted,
            fallbacks = summary.fallbacks,
            failures = summary.failures,
            cache_hits = summary.cache_hits,
            bytes_in = summary.bytes_in,
            bytes_out = summary.bytes_out,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch complete"
        );

        Ok(results)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::FingerprintCache;
    use crate::quality::QualityGate;
    use crate::registry::StrategyRegistry;
    use std::sync::Mutex;
    use std::time::Duration;

    fn document(tag: &str) -> Bytes {
        Bytes::from(format!(
            "%PDF-1.7\n1 0 obj\n<< /Type /Page /Tag ({}) >>\nendobj\n%%EOF\n",
            tag
        ))
    }

    fn scheduler(max_concurrency: usize) -> BatchScheduler {
        let selector = AdaptiveSelector::new(
            Arc::new(StrategyRegistry::new()),
            Arc::new(FingerprintCache::new(16)),
            Arc::new(QualityGate::default()),
        );
        BatchScheduler::new(Arc::new(selector), max_concurrency)
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let documents: Vec<_> = (0..6).map(|i| document(&i.to_string())).collect();
        let results = scheduler(2)
            .run(documents.clone(), &CompressionConfig::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 6);
        for (result, original) in results.iter().zip(&documents) {
            assert!(result.is_pass_through());
            assert_eq!(&result.output, original);
        }
    }

    #[tokio::test]
    async fn test_malformed_document_is_isolated() {
        let documents = vec![
            document("a"),
            Bytes::from_static(b"not a pdf"),
            document("c"),
        ];
        let results = scheduler(4)
            .run(documents, &CompressionConfig::default())
            .await
            .unwrap();

        assert!(results[0].accepted);
        assert!(matches!(
            results[1].failure_reason,
            Some(FailureReason::MalformedDocument(_))
        ));
        assert_eq!(results[1].output, Bytes::from_static(b"not a pdf"));
        assert!(results[2].accepted);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = scheduler(2)
            .run_with(
                vec![document("a"), document("b")],
                &CompressionConfig::default(),
                &cancel,
                None,
            )
            .await
            .unwrap();

        assert!(results
            .iter()
            .all(|r| r.failure_reason == Some(FailureReason::Cancelled)));
        assert_eq!(BatchSummary::from_results(&results).cancelled, 2);
    }

    #[tokio::test]
    async fn test_progress_reports_every_document() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress: ProgressCallback = Arc::new(move |p: BatchProgress| {
            sink.lock().unwrap().push(p);
        });

        scheduler(3)
            .run_with(
                (0..5).map(|i| document(&i.to_string())).collect(),
                &CompressionConfig::default(),
                &CancellationToken::new(),
                Some(progress),
            )
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        let mut completed: Vec<_> = seen.iter().map(|p| p.completed).collect();
        completed.sort_unstable();
        assert_eq!(completed, vec![1, 2, 3, 4, 5]);
        assert!(seen.iter().all(|p| p.total == 5));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = scheduler(1)
            .run(Vec::new(), &CompressionConfig::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_batch() {
        let config = CompressionConfig::default().with_max_candidates(0);
        let err = scheduler(1).run(vec![document("a")], &config).await.unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[test]
    fn test_summary() {
        let mut hit = CompressionResult::pass_through(Bytes::from(vec![0u8; 100]), Duration::ZERO);
        hit.cache_hit = true;
        hit.final_size = 40;
        let mut fallback = CompressionResult::pass_through(Bytes::from(vec![0u8; 50]), Duration::ZERO);
        fallback.accepted = false;
        fallback.failure_reason = Some(FailureReason::QualityThresholdNotMet);
        let failed = CompressionResult::failed(
            Bytes::from(vec![0u8; 10]),
            FailureReason::MalformedDocument("no page objects".into()),
        );

        let summary = BatchSummary::from_results(&[hit, fallback, failed]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.fallbacks, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.bytes_in, 160);
        assert_eq!(summary.bytes_out, 100);
        assert_eq!(summary.bytes_saved(), 60);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(BatchProgress { completed: 1, total: 4 }.percent(), 25.0);
        assert_eq!(BatchProgress { completed: 0, total: 0 }.percent(), 100.0);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        assert_eq!(scheduler(0).max_concurrency(), 1);
    }
}
