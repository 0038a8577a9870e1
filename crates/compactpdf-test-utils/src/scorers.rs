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

//! Deterministic quality scorers

use compactpdf_engine::QualityScorer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scores a candidate by its first byte
///
/// Pairs with [`StubBehavior::Marker`](crate::StubBehavior::Marker) to give
/// each stub strategy a fixed quality.
#[derive(Debug, Default)]
pub struct MarkerScorer {
    scores: HashMap<u8, f64>,
    default: f64,
    calls: AtomicUsize,
}

impl MarkerScorer {
    /// Every marker scores 0 until configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Score for candidates starting with `marker`
    pub fn with(mut self, marker: u8, score: f64) -> Self {
        self.scores.insert(marker, score);
        self
    }

    /// Score for unknown or empty candidates
    pub fn otherwise(mut self, score: f64) -> Self {
        self.default = score;
        self
    }

    /// Candidates scored so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QualityScorer for MarkerScorer {
    fn score(&self, _original: &[u8], candidate: &[u8]) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        candidate
            .first()
            .and_then(|marker| self.scores.get(marker))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Gives every candidate the same score
#[derive(Debug, Clone, Copy)]
pub struct ConstantScorer(pub f64);

impl QualityScorer for ConstantScorer {
    fn score(&self, _original: &[u8], _candidate: &[u8]) -> f64 {
        self.0
    }
}
