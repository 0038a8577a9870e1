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

//! Scriptable compression strategies

use compactpdf_config::CompressionConfig;
use compactpdf_engine::{
    CompressionStrategy, ContentProfile, EngineError, EngineResult, FeatureSummary, StrategyKind,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a [`StubStrategy`] does when applied
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Return `size` copies of `marker`
    Marker {
        /// Fill byte, usually read back by [`MarkerScorer`](crate::MarkerScorer)
        marker: u8,
        /// Output length
        size: usize,
    },
    /// Return these exact bytes
    Output(Vec<u8>),
    /// Return the input unchanged
    Identity,
    /// Return the input with every occurrence of `pattern` removed
    Strip(Vec<u8>),
    /// Return a strategy error
    Fail(String),
    /// Panic inside `apply`
    Panic,
    /// Block the calling thread, then behave as `then`
    Sleep {
        /// How long to block
        duration: Duration,
        /// Behavior after the delay
        then: Box<StubBehavior>,
    },
}

/// Which documents a [`StubStrategy`] claims
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// Every document
    Always,
    /// No document
    Never,
    /// Documents with this profile
    Profile(ContentProfile),
}

/// Strategy with fixed ranking and scripted output that counts its calls
#[derive(Debug)]
pub struct StubStrategy {
    id: String,
    kind: StrategyKind,
    estimate: f64,
    applicability: Applicability,
    behavior: StubBehavior,
    calls: AtomicUsize,
}

impl StubStrategy {
    /// A content strategy that returns its input unchanged
    pub fn new(id: &str) -> Self {
        StubStrategy {
            id: id.to_string(),
            kind: StrategyKind::Content,
            estimate: 0.1,
            applicability: Applicability::Always,
            behavior: StubBehavior::Identity,
            calls: AtomicUsize::new(0),
        }
    }

    /// Shorthand for a marker-emitting strategy with the given estimate
    pub fn marker(id: &str, marker: u8, size: usize, estimate: f64) -> Arc<Self> {
        StubStrategy::new(id)
            .estimate(estimate)
            .behavior(StubBehavior::Marker { marker, size })
            .shared()
    }

    /// Set the strategy family
    pub fn kind(mut self, kind: StrategyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the estimated reduction used for ranking
    pub fn estimate(mut self, estimate: f64) -> Self {
        self.estimate = estimate;
        self
    }

    /// Restrict the documents this strategy claims
    pub fn applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    /// Set what `apply` does
    pub fn behavior(mut self, behavior: StubBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Wrap in an `Arc`
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The same strategy as a trait object, for registration
    pub fn handle(self: &Arc<Self>) -> Arc<dyn CompressionStrategy> {
        Arc::clone(self) as Arc<dyn CompressionStrategy>
    }

    /// Times `apply` has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn run(&self, behavior: &StubBehavior, data: &[u8]) -> EngineResult<Vec<u8>> {
        match behavior {
            StubBehavior::Marker { marker, size } => Ok(vec![*marker; *size]),
            StubBehavior::Output(bytes) => Ok(bytes.clone()),
            StubBehavior::Identity => Ok(data.to_vec()),
            StubBehavior::Strip(pattern) => Ok(strip(data, pattern)),
            StubBehavior::Fail(message) => Err(EngineError::strategy_failed(&self.id, message.as_str())),
            StubBehavior::Panic => panic!("stub strategy '{}' panicked", self.id),
            StubBehavior::Sleep { duration, then } => {
                std::thread::sleep(*duration);
                self.run(then, data)
            }
        }
    }
}

impl CompressionStrategy for StubStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn can_handle(&self, summary: &FeatureSummary) -> bool {
        match self.applicability {
            Applicability::Always => true,
            Applicability::Never => false,
            Applicability::Profile(profile) => summary.profile() == profile,
        }
    }

    fn estimated_reduction(&self, _summary: &FeatureSummary) -> f64 {
        self.estimate
    }

    fn apply(&self, data: &[u8], _config: &CompressionConfig) -> EngineResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.run(&self.behavior, data)
    }
}

fn strip(data: &[u8], pattern: &[u8]) -> Vec<u8> {
    if pattern.is_empty() {
        return data.to_vec();
    }
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i..].starts_with(pattern) {
            i += pattern.len();
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}
