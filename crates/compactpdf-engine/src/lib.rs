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

//! Adaptive compression orchestration for CompactPDF
//!
//! This crate decides which compression strategies to run on a document,
//! in what order, whether an earlier result can be reused, and what to do
//! when a strategy produces unacceptable output:
//! - **Content analysis**: image ratio, fonts, redundancy and complexity
//! - **Strategy ranking**: pluggable strategies ordered by estimated reduction
//! - **Quality gate**: every candidate is scored before it is accepted
//! - **Fallback**: best-effort output when no candidate is good enough
//! - **Result cache**: fingerprint-keyed, LRU with TTL and a byte budget,
//!   at most one computation in flight per fingerprint
//! - **Batches**: bounded concurrency, ordered results, per-document failures
//!
//! The byte-level work (image re-encoding, font subsetting, stream
//! recompression) is supplied by [`CompressionStrategy`] implementations.
//!
//! # Quick Start
//!
//! ```rust
//! use bytes::Bytes;
//! use compactpdf_config::{CompressionConfig, Config};
//! use compactpdf_engine::{
//!     CompressionEngine, CompressionStrategy, EngineResult, FeatureSummary, StrategyKind,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Identity;
//!
//! impl CompressionStrategy for Identity {
//!     fn id(&self) -> &str {
//!         "identity"
//!     }
//!
//!     fn kind(&self) -> StrategyKind {
//!         StrategyKind::Content
//!     }
//!
//!     fn can_handle(&self, _summary: &FeatureSummary) -> bool {
//!         true
//!     }
//!
//!     fn estimated_reduction(&self, _summary: &FeatureSummary) -> f64 {
//!         0.0
//!     }
//!
//!     fn apply(&self, data: &[u8], _config: &CompressionConfig) -> EngineResult<Vec<u8>> {
//!         Ok(data.to_vec())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> EngineResult<()> {
//!     let engine = CompressionEngine::builder(Config::default())
//!         .strategy(Arc::new(Identity))
//!         .build()?;
//!
//!     let document = Bytes::from_static(b"%PDF-1.7\n1 0 obj\n<< /Type /Page >>\nendobj\n%%EOF\n");
//!     let result = engine.compress(document).await?;
//!
//!     assert!(result.accepted);
//!     assert_eq!(result.strategy_chain, vec!["identity"]);
//!     Ok(())
//! }
//! ```
//!
//! # Selection
//!
//! For each document the selector consults the cache, then analyzes the
//! document, ranks applicable strategies and applies them one at a time.
//! The first output that passes the quality gate wins. When none does, the
//! highest-scoring output is returned with `accepted = false`, or the
//! original bytes when nothing smaller was produced. Malformed documents
//! are reported as errors from single selections and as failed results
//! within batches.

pub mod analyzer;
pub mod batch;
pub mod cache;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod persistence;
pub mod quality;
pub mod registry;
pub mod result;
pub mod selector;
pub mod stats;

pub use analyzer::{ComplexityLevel, ContentAnalyzer, ContentProfile, FeatureSummary};
pub use batch::{BatchProgress, BatchScheduler, BatchSummary, ProgressCallback};
pub use cache::{CacheSnapshotEntry, CacheStats, Computed, FingerprintCache, Lookup, LookupSource};
pub use engine::{CompressionEngine, EngineBuilder};
pub use error::{EngineError, EngineResult};
pub use fingerprint::Fingerprint;
pub use persistence::{CachePersistence, FilePersistence, PersistedEntry};
pub use quality::{FnScorer, QualityGate, QualityLevel, QualityScorer, StructuralScorer};
pub use registry::{CompressionStrategy, RankedCandidate, StrategyKind, StrategyRegistry};
pub use result::{AttemptOutcome, CandidateAttempt, CompressionResult, FailureReason};
pub use selector::AdaptiveSelector;
pub use stats::EngineStats;

pub use tokio_util::sync::CancellationToken;
