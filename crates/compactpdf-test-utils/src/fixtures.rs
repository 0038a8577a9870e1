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

//! Synthetic PDF documents
//!
//! The engine only scans the container lexically, so fixtures need the
//! header and trailer markers plus indirect objects tagged with the right
//! `/Type` and `/Subtype` names. [`PdfBuilder`] assembles such documents.

use bytes::Bytes;

/// Builder for minimal PDF containers
#[derive(Debug, Clone)]
pub struct PdfBuilder {
    version: String,
    objects: Vec<Vec<u8>>,
    header: bool,
    trailer: bool,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    /// Start an empty PDF 1.7 document
    pub fn new() -> Self {
        PdfBuilder {
            version: "1.7".to_string(),
            objects: Vec::new(),
            header: true,
            trailer: true,
        }
    }

    /// Set the header version
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Add one page object
    pub fn page(self) -> Self {
        self.object(b"<< /Type /Page /Parent 1 0 R >>")
    }

    /// Add `count` page objects
    pub fn pages(self, count: usize) -> Self {
        (0..count).fold(self, |builder, _| builder.page())
    }

    /// Add a font object
    pub fn font(self, base_font: &str) -> Self {
        let dictionary = format!("<< /Type /Font /Subtype /Type1 /BaseFont /{} >>", base_font);
        self.object(dictionary.as_bytes())
    }

    /// Add `count` distinct fonts
    pub fn fonts(self, count: usize) -> Self {
        (0..count).fold(self, |builder, i| builder.font(&format!("Font{}", i)))
    }

    /// Add an image XObject with the given payload
    pub fn image(self, payload: &[u8]) -> Self {
        self.stream(b"/Type /XObject /Subtype /Image", payload)
    }

    /// Add an image whose payload is `len` pseudo-random bytes seeded by `seed`
    pub fn noisy_image(self, len: usize, seed: u8) -> Self {
        let payload = noise(len, seed);
        self.image(&payload)
    }

    /// Add a page content stream
    pub fn content(self, payload: &[u8]) -> Self {
        self.stream(b"", payload)
    }

    /// Add a raw object body
    pub fn object(mut self, body: &[u8]) -> Self {
        self.objects.push(body.to_vec());
        self
    }

    /// Omit the `%PDF-` header
    pub fn without_header(mut self) -> Self {
        self.header = false;
        self
    }

    /// Omit the `%%EOF` trailer marker
    pub fn without_trailer(mut self) -> Self {
        self.trailer = false;
        self
    }

    /// Assemble the document
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.header {
            out.extend_from_slice(format!("%PDF-{}\n", self.version).as_bytes());
        }
        for (index, body) in self.objects.iter().enumerate() {
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        out.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n");
        if self.trailer {
            out.extend_from_slice(b"%%EOF\n");
        }
        out
    }

    /// Assemble the document as shared bytes
    pub fn bytes(&self) -> Bytes {
        Bytes::from(self.build())
    }

    fn stream(mut self, entries: &[u8], payload: &[u8]) -> Self {
        let mut body = format!("<< {} /Length {} >>\nstream\n", String::from_utf8_lossy(entries), payload.len())
            .into_bytes();
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\r\nendstream");
        self.objects.push(body);
        self
    }
}

/// Deterministic high-entropy bytes
pub fn noise(len: usize, seed: u8) -> Vec<u8> {
    let mut state = u32::from(seed).wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Single-page text document
pub fn text_document() -> Bytes {
    PdfBuilder::new()
        .page()
        .fonts(2)
        .content(b"BT /F1 12 Tf 72 712 Td (Quarterly report) Tj ET")
        .bytes()
}

/// Two-page document dominated by image payload
pub fn image_document() -> Bytes {
    PdfBuilder::new()
        .pages(2)
        .font("Helvetica")
        .noisy_image(4096, 7)
        .noisy_image(4096, 11)
        .bytes()
}

/// A distinct small document per index
pub fn numbered_document(index: usize) -> Bytes {
    PdfBuilder::new()
        .page()
        .content(format!("BT (document {}) Tj ET", index).as_bytes())
        .bytes()
}

/// Bytes that are not a PDF container at all
pub fn not_a_pdf() -> Bytes {
    Bytes::from_static(b"GIF89a this is not a document")
}

/// A container with header and trailer but no page objects
pub fn pageless_document() -> Bytes {
    PdfBuilder::new().font("Helvetica").bytes()
}
