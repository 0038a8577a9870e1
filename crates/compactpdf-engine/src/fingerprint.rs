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

//! Cache keys derived from document content and configuration

use crate::error::{EngineError, EngineResult};
use compactpdf_config::CompressionConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const FINGERPRINT_CONTEXT: &str = "compactpdf 2025-01 result fingerprint v1";

/// Deterministic key for a (document, configuration) pair
///
/// Identical bytes under an identical configuration always produce the same
/// fingerprint; changing any configuration field produces a different one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint a document under a configuration
    pub fn compute(data: &[u8], config: &CompressionConfig) -> Self {
        let content_hash = blake3::hash(data);

        let mut hasher = blake3::Hasher::new_derive_key(FINGERPRINT_CONTEXT);
        hasher.update(content_hash.as_bytes());
        encode_config(&mut hasher, config);

        Fingerprint(*hasher.finalize().as_bytes())
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string
    pub fn from_hex(s: &str) -> EngineResult<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| EngineError::persistence(format!("invalid fingerprint '{}': {}", s, e)))?;
        Ok(Fingerprint(bytes))
    }

    /// First eight hex characters, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

/// Feed every configuration field into the hasher with explicit framing
fn encode_config(hasher: &mut blake3::Hasher, config: &CompressionConfig) {
    hasher.update(&[config.quality_target]);
    hasher.update(config.strategy_preference.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(&config.quality_threshold.to_bits().to_le_bytes());
    hasher.update(&(config.max_candidates as u64).to_le_bytes());
    hasher.update(&config.ttl_secs.to_le_bytes());
    hasher.update(&[u8::from(config.use_cache)]);

    hasher.update(&(config.strategy_allow_list.len() as u64).to_le_bytes());
    for id in &config.strategy_allow_list {
        hasher.update(&(id.len() as u64).to_le_bytes());
        hasher.update(id.as_bytes());
    }

    match config.document_timeout_ms {
        Some(ms) => {
            hasher.update(&[1]);
            hasher.update(&ms.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl FromStr for Fingerprint {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fingerprint::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use compactpdf_config::StrategyPreference;
    use std::time::Duration;

    #[test]
    fn test_same_input_same_fingerprint() {
        let config = CompressionConfig::default();
        let a = Fingerprint::compute(b"%PDF-1.7 document", &config);
        let b = Fingerprint::compute(b"%PDF-1.7 document", &config.clone());
        assert_eq!(a, b);
    }

    #[test]
    fn test_content_change_changes_fingerprint() {
        let config = CompressionConfig::default();
        assert_ne!(
            Fingerprint::compute(b"document one", &config),
            Fingerprint::compute(b"document two", &config)
        );
    }

    #[test]
    fn test_every_config_field_participates() {
        let data = b"%PDF-1.7 fingerprint sensitivity";
        let base = CompressionConfig::default();
        let reference = Fingerprint::compute(data, &base);

        let variants = vec![
            base.clone().with_quality_target(60),
            base.clone().with_preference(StrategyPreference::Image),
            base.clone().with_quality_threshold(0.5),
            base.clone().with_max_candidates(7),
            base.clone().with_ttl(Duration::from_secs(5)),
            base.clone().with_cache(false),
            base.clone().with_allow_list(["font-subset"]),
            base.clone().with_document_timeout(Duration::from_millis(100)),
        ];

        for variant in variants {
            assert_ne!(reference, Fingerprint::compute(data, &variant), "{:?}", variant);
        }
    }

    #[test]
    fn test_allow_list_framing() {
        let data = b"framing";
        let a = CompressionConfig::default().with_allow_list(["ab", "c"]);
        let b = CompressionConfig::default().with_allow_list(["a", "bc"]);
        assert_ne!(Fingerprint::compute(data, &a), Fingerprint::compute(data, &b));
    }

    #[test]
    fn test_hex_round_trip() {
        let fp = Fingerprint::compute(b"hex", &CompressionConfig::default());
        let hex = fp.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex.parse::<Fingerprint>().unwrap(), fp);
        assert!(Fingerprint::from_hex("not-hex").is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let fp = Fingerprint::compute(b"serde", &CompressionConfig::default());
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{}\"", fp.to_hex()));
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }
}
