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

//! Engine-level totals

use crate::result::{CompressionResult, FailureReason};
use serde::Serialize;
use std::time::Duration;

/// Totals accumulated over every result the engine produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Results produced
    pub selections: u64,
    /// Results that passed the quality gate, pass-throughs included
    pub accepted: u64,
    /// Results where candidates ran but none was accepted
    pub fallbacks: u64,
    /// Results where no strategy applied
    pub pass_throughs: u64,
    /// Results served from the cache
    pub cache_hits: u64,
    /// Documents that could not be processed, cancelled ones excluded
    pub failures: u64,
    /// Batch documents skipped by cancellation; not counted as results
    pub cancelled: u64,
    /// Input bytes
    pub bytes_in: u64,
    /// Output bytes
    pub bytes_out: u64,
    /// Wall time across all results
    pub total_time: Duration,
}

impl EngineStats {
    /// Create empty totals
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one result into the totals
    pub fn record(&mut self, result: &CompressionResult) {
        if result.failure_reason == Some(FailureReason::Cancelled) {
            self.cancelled += 1;
            return;
        }
        self.selections += 1;
        if result.accepted {
            self.accepted += 1;
        }
        if result.is_pass_through() {
            self.pass_throughs += 1;
        }
        if result.is_fallback() {
            self.fallbacks += 1;
        }
        if result.is_failure() {
            self.failures += 1;
        }
        if result.cache_hit {
            self.cache_hits += 1;
        }
        self.bytes_in += result.original_size;
        self.bytes_out += result.final_size;
        self.total_time += result.elapsed;
    }

    /// Count a document rejected before any result was produced
    pub fn record_error(&mut self) {
        self.selections += 1;
        self.failures += 1;
    }

    /// Bytes removed
    pub fn bytes_saved(&self) -> u64 {
        self.bytes_in.saturating_sub(self.bytes_out)
    }

    /// Output size relative to the input (1.0 before any input)
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_in == 0 {
            return 1.0;
        }
        self.bytes_out as f64 / self.bytes_in as f64
    }

    /// Fraction of results that passed the gate
    pub fn acceptance_rate(&self) -> f64 {
        if self.selections == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.selections as f64
    }

    /// Mean wall time per result
    pub fn average_time(&self) -> Duration {
        match u32::try_from(self.selections) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_time / n,
            Err(_) => Duration::from_secs_f64(self.total_time.as_secs_f64() / self.selections as f64),
        }
    }

    /// Export as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "results": {
                "selections": self.selections,
                "accepted": self.accepted,
                "fallbacks": self.fallbacks,
                "pass_throughs": self.pass_throughs,
                "cache_hits": self.cache_hits,
                "failures": self.failures,
                "cancelled": self.cancelled,
                "acceptance_rate": self.acceptance_rate()
            },
            "size": {
                "bytes_in": self.bytes_in,
                "bytes_out": self.bytes_out,
                "bytes_saved": self.bytes_saved(),
                "compression_ratio": self.compression_ratio()
            },
            "time": {
                "total_ms": self.total_time.as_millis() as u64,
                "average_ms": self.average_time().as_millis() as u64
            }
        })
    }

    /// Human-readable one-liner
    pub fn summary(&self) -> String {
        format!(
            "{} documents ({} accepted, {} fallbacks, {} failed, {} cached): {} -> {} bytes ({:.1}% saved)",
            self.selections,
            self.accepted,
            self.fallbacks,
            self.failures,
            self.cache_hits,
            self.bytes_in,
            self.bytes_out,
            (1.0 - self.compression_ratio()) * 100.0
        )
    }
}
