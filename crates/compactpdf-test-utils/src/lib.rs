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

//! # CompactPDF Test Utilities
//!
//! Shared test utilities for CompactPDF crates providing:
//! - Synthetic PDF fixtures the analyzer recognizes
//! - Scriptable strategies that count their calls
//! - Deterministic quality scorers
//! - Assertions over compression results

pub mod assertions;
pub mod fixtures;
pub mod scorers;
pub mod strategies;

// Re-export commonly used items at crate root
pub use assertions::*;
pub use fixtures::{
    image_document, noise, not_a_pdf, numbered_document, pageless_document, text_document,
    PdfBuilder,
};
pub use scorers::{ConstantScorer, MarkerScorer};
pub use strategies::{Applicability, StubBehavior, StubStrategy};

use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary directory holding a snapshot path
///
/// The directory is removed when this value is dropped.
#[derive(Debug)]
pub struct TempSnapshot {
    dir: TempDir,
}

impl TempSnapshot {
    /// Create a fresh temporary directory
    pub fn new() -> std::io::Result<Self> {
        Ok(TempSnapshot {
            dir: TempDir::new()?,
        })
    }

    /// Snapshot file path inside the directory (not created)
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("cache.snapshot")
    }
}
