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

//! Selection outcomes

use crate::error::EngineError;
use crate::fingerprint::Fingerprint;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why a result is not an accepted compression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Every tried candidate scored below the threshold
    QualityThresholdNotMet,
    /// Every tried candidate errored
    StrategyExecutionFailed(String),
    /// The per-document time budget ran out
    Timeout,
    /// The document is not a PDF container
    MalformedDocument(String),
    /// The batch was cancelled before the document was scheduled
    Cancelled,
    /// The worker processing the document failed
    WorkerFailed(String),
}

impl FailureReason {
    /// Stable identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::QualityThresholdNotMet => "quality_threshold_not_met",
            FailureReason::StrategyExecutionFailed(_) => "strategy_execution_failed",
            FailureReason::Timeout => "timeout",
            FailureReason::MalformedDocument(_) => "malformed_document",
            FailureReason::Cancelled => "cancelled",
            FailureReason::WorkerFailed(_) => "worker_failed",
        }
    }

    /// Map a selection error onto the reason reported for its document
    pub fn from_error(error: &EngineError) -> Self {
        match error {
            EngineError::MalformedDocument(detail) => FailureReason::MalformedDocument(detail.clone()),
            other => FailureReason::WorkerFailed(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::StrategyExecutionFailed(detail)
            | FailureReason::MalformedDocument(detail)
            | FailureReason::WorkerFailed(detail) => write!(f, "{}: {}", self.as_str(), detail),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// How one candidate fared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Passed the quality gate
    Accepted {
        /// Quality score
        quality: f64,
    },
    /// Scored below the threshold
    Rejected {
        /// Quality score
        quality: f64,
    },
    /// Errored or panicked
    Failed {
        /// Failure detail
        reason: String,
    },
}

/// One candidate tried during a selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAttempt {
    /// Strategy id
    pub strategy_id: String,
    /// Outcome
    pub outcome: AttemptOutcome,
    /// Size of the produced output, if any
    pub output_size: Option<u64>,
}

/// Final outcome of compressing one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    /// Input size in bytes
    pub original_size: u64,
    /// Output size in bytes
    pub final_size: u64,
    /// Strategies whose output is returned (empty for the original bytes)
    pub strategy_chain: Vec<String>,
    /// Quality of the returned output (0.0 to 1.0)
    pub quality_score: f64,
    /// Whether the returned output passed the quality gate
    pub accepted: bool,
    /// Served from the cache or shared from a concurrent computation
    pub cache_hit: bool,
    /// Wall time spent producing this result
    pub elapsed: Duration,
    /// Set when the result is not an accepted compression
    pub failure_reason: Option<FailureReason>,
    /// Returned document bytes
    pub output: Bytes,
    /// Cache key, when the cache was consulted
    pub fingerprint: Option<Fingerprint>,
    /// Candidates tried, in order
    pub attempts: Vec<CandidateAttempt>,
}

impl CompressionResult {
    /// No strategy applied; the document is returned unchanged and accepted
    pub fn pass_through(original: Bytes, elapsed: Duration) -> Self {
        let size = original.len() as u64;
        CompressionResult {
            original_size: size,
            final_size: size,
            strategy_chain: Vec::new(),
            quality_score: 1.0,
            accepted: true,
            cache_hit: false,
            elapsed,
            failure_reason: None,
            output: original,
            fingerprint: None,
            attempts: Vec::new(),
        }
    }

    /// A document that could not be processed; the original bytes are returned
    pub fn failed(original: Bytes, reason: FailureReason) -> Self {
        let size = original.len() as u64;
        CompressionResult {
            original_size: size,
            final_size: size,
            strategy_chain: Vec::new(),
            quality_score: 0.0,
            accepted: false,
            cache_hit: false,
            elapsed: Duration::ZERO,
            failure_reason: Some(reason),
            output: original,
            fingerprint: None,
            attempts: Vec::new(),
        }
    }

    /// Output size relative to the input (1.0 when the input is empty)
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 1.0;
        }
        self.final_size as f64 / self.original_size as f64
    }

    /// Bytes removed
    pub fn bytes_saved(&self) -> u64 {
        self.original_size.saturating_sub(self.final_size)
    }

    /// Bytes removed as a percentage of the input
    pub fn percent_saved(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        self.bytes_saved() as f64 * 100.0 / self.original_size as f64
    }

    /// No candidate was ranked and the original was returned as-is
    pub fn is_pass_through(&self) -> bool {
        self.accepted && self.strategy_chain.is_empty()
    }

    /// Candidates ran but none was accepted
    pub fn is_fallback(&self) -> bool {
        matches!(
            self.failure_reason,
            Some(FailureReason::QualityThresholdNotMet)
                | Some(FailureReason::StrategyExecutionFailed(_))
                | Some(FailureReason::Timeout)
        )
    }

    /// The document itself could not be processed
    pub fn is_failure(&self) -> bool {
        matches!(
            self.failure_reason,
            Some(FailureReason::MalformedDocument(_))
                | Some(FailureReason::Cancelled)
                | Some(FailureReason::WorkerFailed(_))
        )
    }
}
