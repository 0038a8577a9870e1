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

//! Assertions over compression results

use bytes::Bytes;
use compactpdf_engine::{CompressionResult, FailureReason};

/// Assert the result passed the gate with exactly `chain`
pub fn assert_accepted(result: &CompressionResult, chain: &[&str]) {
    assert!(
        result.accepted,
        "expected an accepted result, got {:?}",
        result.failure_reason
    );
    assert_eq!(result.strategy_chain, chain, "unexpected strategy chain");
    assert!(result.failure_reason.is_none());
    assert_eq!(result.final_size, result.output.len() as u64);
}

/// Assert the result is a best-effort fallback carrying `reason`
pub fn assert_fallback(result: &CompressionResult, reason: &FailureReason) {
    assert!(!result.accepted, "expected a fallback, got an accepted result");
    assert_eq!(result.failure_reason.as_ref(), Some(reason));
    assert_eq!(result.final_size, result.output.len() as u64);
}

/// Assert the result returns the untouched original bytes
pub fn assert_original_returned(result: &CompressionResult, original: &Bytes) {
    assert_eq!(&result.output, original, "output differs from the original");
    assert!(result.strategy_chain.is_empty());
    assert_eq!(result.final_size, result.original_size);
}

/// Assert the result is a per-document failure of the given kind
pub fn assert_failed_with(result: &CompressionResult, kind: &str) {
    let reason = result
        .failure_reason
        .as_ref()
        .unwrap_or_else(|| panic!("expected a `{}` failure, got success", kind));
    assert!(result.is_failure(), "`{}` is not a document failure", reason);
    assert_eq!(reason.as_str(), kind);
}
