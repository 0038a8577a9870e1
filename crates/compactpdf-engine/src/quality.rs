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

//! Quality assessment of candidate outputs

use crate::analyzer::ContentAnalyzer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Scores a candidate against the original document
///
/// Scores are expected in `[0, 1]`; the gate clamps anything outside that
/// range and treats non-finite scores as 0. Implementations must return the
/// same score for the same pair of inputs.
pub trait QualityScorer: Send + Sync + fmt::Debug {
    /// Score `candidate` as a replacement for `original`
    fn score(&self, original: &[u8], candidate: &[u8]) -> f64;
}

/// Adapts a closure into a [`QualityScorer`]
pub struct FnScorer<F> {
    f: F,
}

impl<F> FnScorer<F>
where
    F: Fn(&[u8], &[u8]) -> f64 + Send + Sync,
{
    /// Wrap a scoring closure
    pub fn new(f: F) -> Self {
        FnScorer { f }
    }
}

impl<F> fmt::Debug for FnScorer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnScorer").finish_non_exhaustive()
    }
}

impl<F> QualityScorer for FnScorer<F>
where
    F: Fn(&[u8], &[u8]) -> f64 + Send + Sync,
{
    fn score(&self, original: &[u8], candidate: &[u8]) -> f64 {
        (self.f)(original, candidate)
    }
}

/// Default scorer comparing document structure before and after
///
/// A candidate that is no longer a parseable container, or that changed the
/// page count, scores 0. Otherwise the score weighs font retention (35%),
/// image object retention (35%) and image payload retention (30%).
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralScorer {
    analyzer: ContentAnalyzer,
}

impl StructuralScorer {
    /// Create the scorer
    pub fn new() -> Self {
        Self::default()
    }
}

impl QualityScorer for StructuralScorer {
    fn score(&self, original: &[u8], candidate: &[u8]) -> f64 {
        let (Ok(before), Ok(after)) = (
            self.analyzer.analyze(original),
            self.analyzer.analyze(candidate),
        ) else {
            return 0.0;
        };

        if before.page_count != after.page_count {
            return 0.0;
        }

        let fonts = retention(u64::from(after.font_count), u64::from(before.font_count));
        let images = retention(u64::from(after.image_count), u64::from(before.image_count));
        let payload = retention(after.image_bytes, before.image_bytes).sqrt();

        0.35 * fonts + 0.35 * images + 0.3 * payload
    }
}

fn retention(after: u64, before: u64) -> f64 {
    if before == 0 {
        1.0
    } else {
        (after as f64 / before as f64).min(1.0)
    }
}

/// Qualitative bucket for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    /// At least 0.9
    Excellent,
    /// At least the acceptance threshold
    Good,
    /// At least 0.5
    Fair,
    /// Below everything else
    Poor,
}

/// Accept/reject decisions for candidate outputs
#[derive(Debug, Clone)]
pub struct QualityGate {
    scorer: Arc<dyn QualityScorer>,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(Arc::new(StructuralScorer::new()))
    }
}

impl QualityGate {
    /// Create a gate around a scorer
    pub fn new(scorer: Arc<dyn QualityScorer>) -> Self {
        QualityGate { scorer }
    }

    /// Score a candidate, normalized into `[0, 1]`
    pub fn evaluate(&self, original: &[u8], candidate: &[u8]) -> f64 {
        normalize(self.scorer.score(original, candidate))
    }

    /// Whether a score passes the threshold (inclusive)
    pub fn accepts(score: f64, threshold: f64) -> bool {
        score >= threshold
    }

    /// Bucket a score relative to the threshold
    pub fn level(score: f64, threshold: f64) -> QualityLevel {
        let score = normalize(score);
        if score >= 0.9 {
            QualityLevel::Excellent
        } else if score >= threshold {
            QualityLevel::Good
        } else if score >= 0.5 {
            QualityLevel::Fair
        } else {
            QualityLevel::Poor
        }
    }
}

fn normalize(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(pages: usize, fonts: usize, image_len: usize) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let mut n = 1;
        for _ in 0..pages {
            out.extend_from_slice(format!("{} 0 obj\n<< /Type /Page >>\nendobj\n", n).as_bytes());
            n += 1;
        }
        for _ in 0..fonts {
            out.extend_from_slice(format!("{} 0 obj\n<< /Type /Font >>\nendobj\n", n).as_bytes());
            n += 1;
        }
        if image_len > 0 {
            out.extend_from_slice(format!("{} 0 obj\n<< /Subtype /Image >>\nstream\n", n).as_bytes());
            out.extend_from_slice(&vec![b'x'; image_len]);
            out.extend_from_slice(b"\nendstream\nendobj\n");
        }
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    #[test]
    fn test_gate_clamps_and_sanitizes() {
        let gate = QualityGate::new(Arc::new(FnScorer::new(|_: &[u8], c: &[u8]| match c {
            b"nan" => f64::NAN,
            b"big" => 4.0,
            b"neg" => -1.0,
            _ => 0.5,
        })));

        assert_eq!(gate.evaluate(b"o", b"nan"), 0.0);
        assert_eq!(gate.evaluate(b"o", b"big"), 1.0);
        assert_eq!(gate.evaluate(b"o", b"neg"), 0.0);
        assert_eq!(gate.evaluate(b"o", b"mid"), 0.5);
    }

    #[test]
    fn test_accepts_is_inclusive() {
        assert!(QualityGate::accepts(0.8, 0.8));
        assert!(QualityGate::accepts(0.81, 0.8));
        assert!(!QualityGate::accepts(0.79, 0.8));
    }

    #[test]
    fn test_quality_levels() {
        assert_eq!(QualityGate::level(0.95, 0.8), QualityLevel::Excellent);
        assert_eq!(QualityGate::level(0.85, 0.8), QualityLevel::Good);
        assert_eq!(QualityGate::level(0.6, 0.8), QualityLevel::Fair);
        assert_eq!(QualityGate::level(0.2, 0.8), QualityLevel::Poor);
        assert_eq!(QualityGate::level(f64::NAN, 0.8), QualityLevel::Poor);
    }

    #[test]
    fn test_structural_identical_is_perfect() {
        let doc = pdf(2, 2, 100);
        assert!((StructuralScorer::new().score(&doc, &doc) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_structural_page_loss_is_zero() {
        assert_eq!(StructuralScorer::new().score(&pdf(3, 1, 0), &pdf(2, 1, 0)), 0.0);
    }

    #[test]
    fn test_structural_unparseable_candidate_is_zero() {
        assert_eq!(StructuralScorer::new().score(&pdf(1, 1, 0), b"garbage"), 0.0);
    }

    #[test]
    fn test_structural_penalizes_payload_loss() {
        let scorer = StructuralScorer::new();
        let original = pdf(1, 2, 400);
        let light = scorer.score(&original, &pdf(1, 2, 100));
        let heavy = scorer.score(&original, &pdf(1, 2, 4));
        assert!(light < 1.0);
        assert!(heavy < light);
        // 0.35 + 0.35 + 0.3 * sqrt(0.25)
        assert!((light - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_structural_font_loss() {
        let score = StructuralScorer::new().score(&pdf(1, 4, 0), &pdf(1, 2, 0));
        assert!((score - (0.35 * 0.5 + 0.35 + 0.3)).abs() < 1e-9);
    }
}
