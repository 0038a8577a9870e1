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

//! Content analysis for strategy selection
//!
//! The analyzer performs a lexical scan of the PDF container. It never builds
//! an object model: indirect objects are delimited by their `endobj` keyword
//! and classified by the `/Type` and `/Subtype` names in their dictionaries.
//!
//! Measured features:
//! - page, image and font object counts
//! - image stream bytes relative to the document size
//! - byte entropy of the leading sample (Shannon, bits per byte)
//! - structural redundancy, combining duplicated stream payloads with entropy
//!
//! The resulting [`FeatureSummary`] is a pure function of the input bytes.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const HEADER_MARKER: &[u8] = b"%PDF-";
const TRAILER_MARKER: &[u8] = b"%%EOF";
const MARKER_WINDOW: usize = 1024;
const DEFAULT_ENTROPY_SAMPLE: usize = 4096;

/// Broad content classification of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentProfile {
    /// Image payload dominates the file
    ImageHeavy,
    /// Mostly text and fonts, little or no imagery
    TextHeavy,
    /// Neither dominates
    Mixed,
}

impl fmt::Display for ContentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentProfile::ImageHeavy => "image-heavy",
            ContentProfile::TextHeavy => "text-heavy",
            ContentProfile::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// Coarse complexity bucket derived from the complexity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    /// Score below 0.3
    Low,
    /// Score between 0.3 and 0.7
    Medium,
    /// Score above 0.7
    High,
}

impl ComplexityLevel {
    /// Classify a complexity score (0.0 to 1.0)
    pub fn classify(score: f64) -> Self {
        match score {
            s if s < 0.3 => ComplexityLevel::Low,
            s if s > 0.7 => ComplexityLevel::High,
            _ => ComplexityLevel::Medium,
        }
    }
}

/// Features extracted from one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    /// Document size in bytes
    pub byte_size: u64,
    /// Number of `/Type /Page` objects
    pub page_count: u32,
    /// Number of `/Subtype /Image` objects
    pub image_count: u32,
    /// Stream bytes held by image objects
    pub image_bytes: u64,
    /// Image stream bytes relative to the document size (0.0 to 1.0)
    pub image_ratio: f64,
    /// Number of `/Type /Font` objects
    pub font_count: u32,
    /// Estimated structural redundancy (0.0 to 1.0)
    pub redundancy: f64,
    /// Shannon entropy of the leading sample (bits per byte)
    pub entropy: f64,
    /// Weighted page, image and font complexity (0.0 to 1.0)
    pub complexity: f64,
}

impl FeatureSummary {
    /// Content classification
    pub fn profile(&self) -> ContentProfile {
        if self.image_count > 0 && self.image_ratio >= 0.5 {
            ContentProfile::ImageHeavy
        } else if self.font_count > 0 && self.image_ratio < 0.1 {
            ContentProfile::TextHeavy
        } else {
            ContentProfile::Mixed
        }
    }

    /// Complexity bucket
    pub fn complexity_level(&self) -> ComplexityLevel {
        ComplexityLevel::classify(self.complexity)
    }

    /// Human-readable tuning hints
    pub fn recommendations(&self) -> Vec<String> {
        let mut hints = Vec::new();

        match self.profile() {
            ContentProfile::ImageHeavy => {
                hints.push("Document is image-heavy - focus on image compression".to_string())
            }
            ContentProfile::TextHeavy => {
                hints.push("Document is text-heavy - prioritize font optimization".to_string())
            }
            ContentProfile::Mixed => {}
        }

        if self.image_count > 30 {
            hints.push("Many images detected - consider lower image quality settings".to_string());
        }
        if self.font_count > 15 {
            hints.push("Many fonts detected - font subsetting will be effective".to_string());
        }
        if self.page_count > 100 {
            hints.push("Large document - content optimization will provide significant benefits".to_string());
        }
        if self.complexity_level() == ComplexityLevel::High {
            hints.push("Complex document detected - use aggressive compression settings".to_string());
        }

        hints
    }
}

/// Produces a [`FeatureSummary`] from raw document bytes
#[derive(Debug, Clone, Copy)]
pub struct ContentAnalyzer {
    entropy_sample: usize,
}

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentAnalyzer {
    /// Create an analyzer with the default 4KB entropy sample
    pub fn new() -> Self {
        ContentAnalyzer {
            entropy_sample: DEFAULT_ENTROPY_SAMPLE,
        }
    }

    /// Create an analyzer with a custom entropy sample size
    pub fn with_entropy_sample(entropy_sample: usize) -> Self {
        ContentAnalyzer {
            entropy_sample: entropy_sample.max(1),
        }
    }

    /// Analyze a document
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedDocument`] when the bytes lack the PDF
    /// header or trailer marker, contain no indirect objects, or contain no
    /// page objects.
    pub fn analyze(&self, data: &[u8]) -> EngineResult<FeatureSummary> {
        let head = &data[..data.len().min(MARKER_WINDOW)];
        if find(head, HEADER_MARKER, 0).is_none() {
            return Err(EngineError::malformed("missing %PDF- header"));
        }

        let tail = &data[data.len().saturating_sub(MARKER_WINDOW)..];
        if find(tail, TRAILER_MARKER, 0).is_none() {
            return Err(EngineError::malformed("missing %%EOF trailer marker"));
        }

        let scan = scan_objects(data);
        if scan.objects == 0 {
            return Err(EngineError::malformed("no indirect objects"));
        }
        if scan.pages == 0 {
            return Err(EngineError::malformed("no page objects"));
        }

        let byte_size = data.len() as u64;
        let entropy = calculate_entropy(&data[..data.len().min(self.entropy_sample)]);

        let duplicate_ratio = if scan.stream_bytes == 0 {
            0.0
        } else {
            scan.duplicate_stream_bytes as f64 / scan.stream_bytes as f64
        };
        let redundancy = (0.6 * duplicate_ratio + 0.4 * (1.0 - entropy / 8.0)).clamp(0.0, 1.0);

        let image_ratio = if byte_size == 0 {
            0.0
        } else {
            (scan.image_bytes as f64 / byte_size as f64).min(1.0)
        };

        Ok(FeatureSummary {
            byte_size,
            page_count: scan.pages,
            image_count: scan.images,
            image_bytes: scan.image_bytes,
            image_ratio,
            font_count: scan.fonts,
            redundancy,
            entropy,
            complexity: complexity_score(scan.pages, scan.images, scan.fonts),
        })
    }
}

/// Weighted complexity: 30% pages (saturating at 10), 40% images (at 50),
/// 30% fonts (at 20)
pub fn complexity_score(pages: u32, images: u32, fonts: u32) -> f64 {
    0.3 * f64::from(pages.min(10)) / 10.0
        + 0.4 * f64::from(images.min(50)) / 50.0
        + 0.3 * f64::from(fonts.min(20)) / 20.0
}

/// Calculate Shannon entropy of data (bits per byte)
///
/// Returns a value between 0.0 (all same byte) and 8.0 (uniformly random).
pub fn calculate_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut frequencies = [0u32; 256];
    for &byte in data {
        frequencies[byte as usize] += 1;
    }

    let len = data.len() as f64;
    let mut entropy = 0.0;

    for &count in &frequencies {
        if count > 0 {
            let probability = f64::from(count) / len;
            entropy -= probability * probability.log2();
        }
    }

    entropy
}

#[derive(Debug, Default)]
struct ObjectScan {
    objects: u32,
    pages: u32,
    images: u32,
    fonts: u32,
    image_bytes: u64,
    stream_bytes: u64,
    duplicate_stream_bytes: u64,
}

fn scan_objects(data: &[u8]) -> ObjectScan {
    let mut scan = ObjectScan::default();
    let mut seen_streams = HashSet::new();
    let mut start = 0;

    while let Some(end) = find(data, b"endobj", start) {
        let segment = &data[start..end];
        start = end + b"endobj".len();

        let Some(obj_at) = find(segment, b"obj", 0) else {
            continue;
        };
        scan.objects += 1;

        let body = &segment[obj_at + b"obj".len()..];
        let (dictionary, stream) = split_stream(body);

        if has_name_entry(dictionary, b"/Type", b"/Page") {
            scan.pages += 1;
        }
        if has_name_entry(dictionary, b"/Type", b"/Font") {
            scan.fonts += 1;
        }
        let is_image = has_name_entry(dictionary, b"/Subtype", b"/Image");
        if is_image {
            scan.images += 1;
        }

        if let Some(payload) = stream {
            let len = payload.len() as u64;
            scan.stream_bytes += len;
            if is_image {
                scan.image_bytes += len;
            }
            if !payload.is_empty() && !seen_streams.insert(blake3::hash(payload)) {
                scan.duplicate_stream_bytes += len;
            }
        }
    }

    scan
}

/// Split an object body into its dictionary and optional stream payload
fn split_stream(body: &[u8]) -> (&[u8], Option<&[u8]>) {
    let Some(keyword) = find(body, b"stream", 0) else {
        return (body, None);
    };

    let dictionary = &body[..keyword];
    let mut payload_start = keyword + b"stream".len();
    if body.get(payload_start) == Some(&b'\r') {
        payload_start += 1;
    }
    if body.get(payload_start) == Some(&b'\n') {
        payload_start += 1;
    }

    let Some(payload_end) = find(body, b"endstream", payload_start) else {
        return (dictionary, Some(&body[payload_start.min(body.len())..]));
    };

    let mut payload = &body[payload_start..payload_end];
    if let Some(stripped) = payload.strip_suffix(b"\n") {
        payload = stripped.strip_suffix(b"\r").unwrap_or(stripped);
    }
    (dictionary, Some(payload))
}

/// True if `dictionary` maps `key` to the name `value`
fn has_name_entry(dictionary: &[u8], key: &[u8], value: &[u8]) -> bool {
    let mut from = 0;
    while let Some(at) = find(dictionary, key, from) {
        from = at + key.len();
        if !ends_token(dictionary, from) {
            continue;
        }

        let mut cursor = from;
        while dictionary.get(cursor).is_some_and(u8::is_ascii_whitespace) {
            cursor += 1;
        }

        if dictionary[cursor..].starts_with(value) && ends_token(dictionary, cursor + value.len()) {
            return true;
        }
    }
    false
}

/// True if the name token ends at `index`
fn ends_token(data: &[u8], index: usize) -> bool {
    match data.get(index) {
        None => true,
        Some(byte) => {
            byte.is_ascii_whitespace()
                || matches!(byte, b'/' | b'<' | b'>' | b'[' | b']' | b'(' | b')' | b'{' | b'}' | b'%')
        }
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}
