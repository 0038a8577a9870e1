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

//! Compression strategies and their registry

use crate::analyzer::FeatureSummary;
use crate::error::{EngineError, EngineResult};
use compactpdf_config::{CompressionConfig, StrategyPreference};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::debug;

/// Family a strategy belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Image re-encoding and downsampling
    Image,
    /// Font subsetting and deduplication
    Font,
    /// Content stream and object recompression
    Content,
}

impl StrategyKind {
    /// Whether a caller preference admits this kind
    pub fn admitted_by(self, preference: StrategyPreference) -> bool {
        match preference {
            StrategyPreference::Auto => true,
            StrategyPreference::Image => self == StrategyKind::Image,
            StrategyPreference::Font => self == StrategyKind::Font,
            StrategyPreference::Content => self == StrategyKind::Content,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Image => "image",
            StrategyKind::Font => "font",
            StrategyKind::Content => "content",
        };
        f.write_str(name)
    }
}

/// A complete, self-contained document transformation
///
/// Implementations perform the byte-level work (re-encoding images,
/// subsetting fonts, recompressing streams). The engine decides when to run
/// them and whether their output is good enough.
///
/// `apply` is CPU-bound and runs on the blocking thread pool. A returned
/// error or a panic marks the candidate as failed without affecting other
/// candidates.
///
/// # Example
///
/// ```
/// use compactpdf_config::CompressionConfig;
/// use compactpdf_engine::{CompressionStrategy, EngineResult, FeatureSummary, StrategyKind};
///
/// #[derive(Debug)]
/// struct StripComments;
///
/// impl CompressionStrategy for StripComments {
///     fn id(&self) -> &str {
///         "strip-comments"
///     }
///
///     fn kind(&self) -> StrategyKind {
///         StrategyKind::Content
///     }
///
///     fn can_handle(&self, _summary: &FeatureSummary) -> bool {
///         true
///     }
///
///     fn estimated_reduction(&self, _summary: &FeatureSummary) -> f64 {
///         0.02
///     }
///
///     fn apply(&self, data: &[u8], _config: &CompressionConfig) -> EngineResult<Vec<u8>> {
///         Ok(data.to_vec())
///     }
/// }
/// ```
pub trait CompressionStrategy: Send + Sync + fmt::Debug {
    /// Unique identifier
    fn id(&self) -> &str;

    /// Strategy family
    fn kind(&self) -> StrategyKind;

    /// Whether this strategy applies to a document with these features
    fn can_handle(&self, summary: &FeatureSummary) -> bool;

    /// Expected fractional size reduction (higher ranks first)
    fn estimated_reduction(&self, summary: &FeatureSummary) -> f64;

    /// Transform the document
    fn apply(&self, data: &[u8], config: &CompressionConfig) -> EngineResult<Vec<u8>>;
}

/// A strategy selected for a document, in rank order
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// The strategy
    pub strategy: Arc<dyn CompressionStrategy>,
    /// Sanitized estimate used for ranking
    pub estimated_reduction: f64,
    /// Registration position, the tie-breaker
    pub position: usize,
}

/// Append-only set of registered strategies
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: RwLock<Vec<Arc<dyn CompressionStrategy>>>,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateStrategy`] if the id is taken.
    pub fn register(&self, strategy: Arc<dyn CompressionStrategy>) -> EngineResult<()> {
        let mut strategies = self
            .strategies
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if strategies.iter().any(|s| s.id() == strategy.id()) {
            return Err(EngineError::DuplicateStrategy(strategy.id().to_string()));
        }

        debug!(strategy = strategy.id(), kind = %strategy.kind(), "Registered strategy");
        strategies.push(strategy);
        Ok(())
    }

    /// Number of registered strategies
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> Vec<String> {
        self.read().iter().map(|s| s.id().to_string()).collect()
    }

    /// Look up a strategy by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn CompressionStrategy>> {
        self.read().iter().find(|s| s.id() == id).map(Arc::clone)
    }

    /// Candidates for a document, best estimate first
    ///
    /// Keeps strategies that can handle the document, match the preference
    /// and pass the allow-list. Equal estimates keep registration order;
    /// non-finite estimates rank as zero.
    pub fn rank(&self, summary: &FeatureSummary, config: &CompressionConfig) -> Vec<RankedCandidate> {
        // Snapshot so strategy callbacks run without the lock held
        let strategies: Vec<Arc<dyn CompressionStrategy>> = self.read().iter().map(Arc::clone).collect();

        let mut candidates: Vec<RankedCandidate> = strategies
            .into_iter()
            .enumerate()
            .filter(|(_, s)| s.kind().admitted_by(config.strategy_preference))
            .filter(|(_, s)| config.allows_strategy(s.id()))
            .filter(|(_, s)| s.can_handle(summary))
            .map(|(position, strategy)| {
                let estimate = strategy.estimated_reduction(summary);
                RankedCandidate {
                    // `+ 0.0` folds -0.0 into 0.0 so equal estimates tie
                    estimated_reduction: if estimate.is_finite() { estimate + 0.0 } else { 0.0 },
                    strategy,
                    position,
                }
            })
            .collect();

        // Stable: ties stay in registration order
        candidates.sort_by(|a, b| b.estimated_reduction.total_cmp(&a.estimated_reduction));
        candidates
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn CompressionStrategy>>> {
        self.strategies.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed {
        id: &'static str,
        kind: StrategyKind,
        estimate: f64,
        handles: bool,
    }

    impl Fixed {
        fn new(id: &'static str, kind: StrategyKind, estimate: f64) -> Arc<dyn CompressionStrategy> {
            Arc::new(Fixed {
                id,
                kind,
                estimate,
                handles: true,
            })
        }
    }

    impl CompressionStrategy for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn can_handle(&self, _summary: &FeatureSummary) -> bool {
            self.handles
        }

        fn estimated_reduction(&self, _summary: &FeatureSummary) -> f64 {
            self.estimate
        }

        fn apply(&self, data: &[u8], _config: &CompressionConfig) -> EngineResult<Vec<u8>> {
            Ok(data.to_vec())
        }
    }

    fn summary() -> FeatureSummary {
        FeatureSummary {
            byte_size: 1024,
            page_count: 1,
            image_count: 0,
            image_bytes: 0,
            image_ratio: 0.0,
            font_count: 1,
            redundancy: 0.1,
            entropy: 5.0,
            complexity: 0.05,
        }
    }

    fn ranked_ids(registry: &StrategyRegistry, config: &CompressionConfig) -> Vec<String> {
        registry
            .rank(&summary(), config)
            .into_iter()
            .map(|c| c.strategy.id().to_string())
            .collect()
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = StrategyRegistry::new();
        registry.register(Fixed::new("a", StrategyKind::Image, 0.2)).unwrap();
        let err = registry.register(Fixed::new("a", StrategyKind::Font, 0.5)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateStrategy(ref id) if id == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rank_descending_with_stable_ties() {
        let registry = StrategyRegistry::new();
        registry.register(Fixed::new("low", StrategyKind::Content, 0.1)).unwrap();
        registry.register(Fixed::new("tie-first", StrategyKind::Image, 0.3)).unwrap();
        registry.register(Fixed::new("high", StrategyKind::Font, 0.5)).unwrap();
        registry.register(Fixed::new("tie-second", StrategyKind::Content, 0.3)).unwrap();

        assert_eq!(
            ranked_ids(&registry, &CompressionConfig::default()),
            vec!["high", "tie-first", "tie-second", "low"]
        );
    }

    #[test]
    fn test_non_finite_estimates_rank_as_zero() {
        let registry = StrategyRegistry::new();
        registry.register(Fixed::new("nan", StrategyKind::Image, f64::NAN)).unwrap();
        registry.register(Fixed::new("small", StrategyKind::Image, 0.01)).unwrap();
        registry.register(Fixed::new("inf", StrategyKind::Image, f64::INFINITY)).unwrap();

        let ranked = registry.rank(&summary(), &CompressionConfig::default());
        let ids: Vec<_> = ranked.iter().map(|c| c.strategy.id()).collect();
        assert_eq!(ids, vec!["small", "nan", "inf"]);
        assert_eq!(ranked[1].estimated_reduction, 0.0);
    }

    #[test]
    fn test_preference_filters_kind() {
        let registry = StrategyRegistry::new();
        registry.register(Fixed::new("img", StrategyKind::Image, 0.4)).unwrap();
        registry.register(Fixed::new("fnt", StrategyKind::Font, 0.2)).unwrap();

        let config = CompressionConfig::default().with_preference(StrategyPreference::Font);
        assert_eq!(ranked_ids(&registry, &config), vec!["fnt"]);
    }

    #[test]
    fn test_allow_list_and_can_handle() {
        let registry = StrategyRegistry::new();
        registry.register(Fixed::new("img", StrategyKind::Image, 0.4)).unwrap();
        registry.register(Fixed::new("fnt", StrategyKind::Font, 0.2)).unwrap();
        registry
            .register(Arc::new(Fixed {
                id: "never",
                kind: StrategyKind::Content,
                estimate: 0.9,
                handles: false,
            }))
            .unwrap();

        assert_eq!(ranked_ids(&registry, &CompressionConfig::default()), vec!["img", "fnt"]);

        let config = CompressionConfig::default().with_allow_list(["fnt", "never"]);
        assert_eq!(ranked_ids(&registry, &config), vec!["fnt"]);
    }

    #[test]
    fn test_signed_zero_estimates_tie() {
        let registry = StrategyRegistry::new();
        registry.register(Fixed::new("negative", StrategyKind::Image, -0.0)).unwrap();
        registry.register(Fixed::new("positive", StrategyKind::Font, 0.0)).unwrap();

        let ranked = registry.rank(&summary(), &CompressionConfig::default());
        let ids: Vec<_> = ranked.iter().map(|c| c.strategy.id()).collect();
        assert_eq!(ids, vec!["negative", "positive"]);
        assert!(ranked[0].estimated_reduction.is_sign_positive());
    }

    /// Registers a follow-up strategy from inside `can_handle`
    #[derive(Debug)]
    struct SelfExtending {
        registry: std::sync::Weak<StrategyRegistry>,
    }

    impl CompressionStrategy for SelfExtending {
        fn id(&self) -> &str {
            "self-extending"
        }

        fn kind(&self) -> StrategyKind {
            StrategyKind::Content
        }

        fn can_handle(&self, _summary: &FeatureSummary) -> bool {
            if let Some(registry) = self.registry.upgrade() {
                let _ = registry.register(Fixed::new("late", StrategyKind::Content, 0.9));
            }
            true
        }

        fn estimated_reduction(&self, _summary: &FeatureSummary) -> f64 {
            0.1
        }

        fn apply(&self, data: &[u8], _config: &CompressionConfig) -> EngineResult<Vec<u8>> {
            Ok(data.to_vec())
        }
    }

    #[test]
    fn test_strategy_may_register_during_rank() {
        let registry = Arc::new(StrategyRegistry::new());
        registry
            .register(Arc::new(SelfExtending {
                registry: Arc::downgrade(&registry),
            }))
            .unwrap();

        let config = CompressionConfig::default();
        assert_eq!(ranked_ids(&registry, &config), vec!["self-extending"]);
        assert_eq!(ranked_ids(&registry, &config), vec!["late", "self-extending"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_empty_registry_ranks_nothing() {
        let registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.rank(&summary(), &CompressionConfig::default()).is_empty());
    }

    #[test]
    fn test_lookup() {
        let registry = StrategyRegistry::new();
        registry.register(Fixed::new("img", StrategyKind::Image, 0.4)).unwrap();
        assert!(registry.get("img").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.ids(), vec!["img"]);
    }
}
