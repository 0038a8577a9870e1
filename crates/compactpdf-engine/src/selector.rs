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

//! Adaptive strategy selection for a single document
//!
//! A selection runs through these steps:
//!
//! 1. Fingerprint the document and configuration and consult the cache.
//! 2. On a miss, analyze the document and rank the applicable strategies.
//!    No candidates means the document passes through unchanged.
//! 3. Apply candidates one at a time in rank order on the blocking pool,
//!    scoring each output with the quality gate. The first accepted output
//!    wins; rejected outputs are dropped.
//! 4. If no candidate is accepted, fall back to the best-scoring output
//!    (ties go to the larger output) or to the original bytes when nothing
//!    smaller was produced.
//!
//! Strategy errors and panics count as failed candidates. A per-document
//! timeout is checked between candidates; timed-out results are returned
//! but never cached.

use crate::analyzer::ContentAnalyzer;
use crate::cache::{Computed, FingerprintCache, LookupSource};
use crate::error::EngineResult;
use crate::fingerprint::Fingerprint;
use crate::quality::QualityGate;
use crate::registry::{RankedCandidate, StrategyRegistry};
use crate::result::{AttemptOutcome, CandidateAttempt, CompressionResult, FailureReason};
use bytes::Bytes;
use compactpdf_config::{CompressionConfig, Validator};
use std::any::Any;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Output of a candidate that ran to completion
#[derive(Debug)]
struct ScoredOutput {
    strategy_id: String,
    output: Bytes,
    quality: f64,
}

/// Orchestrates analysis, ranking, caching and fallback for one document
#[derive(Debug)]
pub struct AdaptiveSelector {
    analyzer: ContentAnalyzer,
    registry: Arc<StrategyRegistry>,
    cache: Arc<FingerprintCache>,
    gate: Arc<QualityGate>,
}

impl AdaptiveSelector {
    /// Create a selector over shared collaborators
    pub fn new(
        registry: Arc<StrategyRegistry>,
        cache: Arc<FingerprintCache>,
        gate: Arc<QualityGate>,
    ) -> Self {
        AdaptiveSelector {
            analyzer: ContentAnalyzer::new(),
            registry,
            cache,
            gate,
        }
    }

    /// Replace the analyzer
    pub fn with_analyzer(mut self, analyzer: ContentAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Strategy registry
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Result cache
    pub fn cache(&self) -> &Arc<FingerprintCache> {
        &self.cache
    }

    /// Produce the final result for one document
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig) if
    ///   `config` fails validation
    /// - [`EngineError::MalformedDocument`](crate::EngineError::MalformedDocument)
    ///   if the document is not a PDF container
    pub async fn select(
        &self,
        data: Bytes,
        config: &CompressionConfig,
    ) -> EngineResult<CompressionResult> {
        config.validate()?;
        let started = Instant::now();

        if !config.use_cache {
            let computed = self.compute(data, config, None, started).await?;
            return Ok(computed.result);
        }

        let fingerprint = Fingerprint::compute(&data, config);
        debug!(fingerprint = %fingerprint.short(), size = data.len(), "Cache lookup");

        let lookup = self
            .cache
            .get_or_compute(fingerprint, config.ttl(), || {
                self.compute(data, config, Some(fingerprint), started)
            })
            .await?;

        let mut result = lookup.result;
        if lookup.source != LookupSource::Computed {
            result.cache_hit = true;
            result.elapsed = started.elapsed();
            debug!(
                fingerprint = %fingerprint.short(),
                shared = lookup.source == LookupSource::Shared,
                "Reusing cached result"
            );
        }
        Ok(result)
    }

    async fn compute(
        &self,
        data: Bytes,
        config: &CompressionConfig,
        fingerprint: Option<Fingerprint>,
        started: Instant,
    ) -> EngineResult<Computed> {
        let summary = self.analyzer.analyze(&data)?;
        let candidates = self.registry.rank(&summary, config);
        debug!(
            candidates = candidates.len(),
            profile = %summary.profile(),
            complexity = summary.complexity,
            "Ranked candidates"
        );

        if candidates.is_empty() {
            info!(size = data.len(), "No applicable strategy, passing document through");
            let mut result = CompressionResult::pass_through(data, started.elapsed());
            result.fingerprint = fingerprint;
            return Ok(Computed {
                result,
                cacheable: true,
            });
        }

        let deadline = config
            .document_timeout()
            .and_then(|timeout| started.checked_add(timeout));
        let mut attempts = Vec::new();
        let mut best: Option<ScoredOutput> = None;
        let mut last_error: Option<String> = None;
        let mut timed_out = false;

        for candidate in candidates.into_iter().take(config.max_candidates) {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(attempted = attempts.len(), "Document timeout reached, stopping");
                timed_out = true;
                break;
            }

            let strategy_id = candidate.strategy.id().to_string();
            debug!(strategy = %strategy_id, estimate = candidate.estimated_reduction, "Applying candidate");

            match self.run_candidate(&candidate, &data, config).await {
                Ok((output, quality)) => {
                    let output_size = Some(output.len() as u64);

                    if QualityGate::accepts(quality, config.quality_threshold) {
                        attempts.push(CandidateAttempt {
                            strategy_id: strategy_id.clone(),
                            outcome: AttemptOutcome::Accepted { quality },
                            output_size,
                        });
                        info!(
                            strategy = %strategy_id,
                            quality,
                            original_size = data.len(),
                            final_size = output.len(),
                            "Candidate accepted"
                        );

                        let result = CompressionResult {
                            original_size: data.len() as u64,
                            final_size: output.len() as u64,
                            strategy_chain: vec![strategy_id],
                            quality_score: quality,
                            accepted: true,
                            cache_hit: false,
                            elapsed: started.elapsed(),
                            failure_reason: None,
                            output,
                            fingerprint,
                            attempts,
                        };
                        return Ok(Computed {
                            result,
                            cacheable: true,
                        });
                    }

                    debug!(strategy = %strategy_id, quality, threshold = config.quality_threshold, "Candidate rejected");
                    attempts.push(CandidateAttempt {
                        strategy_id: strategy_id.clone(),
                        outcome: AttemptOutcome::Rejected { quality },
                        output_size,
                    });

                    let better = best.as_ref().map_or(true, |current| {
                        quality > current.quality
                            || (quality == current.quality && output.len() > current.output.len())
                    });
                    if better {
                        best = Some(ScoredOutput {
                            strategy_id,
                            output,
                            quality,
                        });
                    }
                }
                Err(reason) => {
                    warn!(strategy = %strategy_id, error = %reason, "Candidate failed");
                    attempts.push(CandidateAttempt {
                        strategy_id,
                        outcome: AttemptOutcome::Failed {
                            reason: reason.clone(),
                        },
                        output_size: None,
                    });
                    last_error = Some(reason);
                }
            }
        }

        let failure_reason = if timed_out {
            FailureReason::Timeout
        } else if best.is_none() {
            FailureReason::StrategyExecutionFailed(last_error.unwrap_or_default())
        } else {
            FailureReason::QualityThresholdNotMet
        };

        let (output, strategy_chain, quality_score) = match best {
            Some(scored) if scored.output.len() < data.len() => {
                (scored.output, vec![scored.strategy_id], scored.quality)
            }
            _ => (data.clone(), Vec::new(), 1.0),
        };

        warn!(
            reason = %failure_reason,
            fallback = strategy_chain.first().map_or("original", String::as_str),
            attempted = attempts.len(),
            "No candidate accepted, using best-effort result"
        );

        let result = CompressionResult {
            original_size: data.len() as u64,
            final_size: output.len() as u64,
            strategy_chain,
            quality_score,
            accepted: false,
            cache_hit: false,
            elapsed: started.elapsed(),
            failure_reason: Some(failure_reason),
            output,
            fingerprint,
            attempts,
        };

        Ok(Computed {
            result,
            cacheable: !timed_out,
        })
    }

    /// Apply and score one candidate on the blocking pool
    async fn run_candidate(
        &self,
        candidate: &RankedCandidate,
        data: &Bytes,
        config: &CompressionConfig,
    ) -> Result<(Bytes, f64), String> {
        let strategy = Arc::clone(&candidate.strategy);
        let gate = Arc::clone(&self.gate);
        let input = data.clone();
        let config = config.clone();

        let handle = tokio::task::spawn_blocking(move || -> EngineResult<(Vec<u8>, f64)> {
            let output = strategy.apply(&input, &config)?;
            let quality = gate.evaluate(&input, &output);
            Ok((output, quality))
        });

        match handle.await {
            Ok(Ok((output, quality))) => Ok((Bytes::from(output), quality)),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) if e.is_panic() => Err(format!(
                "strategy '{}' panicked: {}",
                candidate.strategy.id(),
                panic_message(e.into_panic())
            )),
            Err(e) => Err(e.to_string()),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
