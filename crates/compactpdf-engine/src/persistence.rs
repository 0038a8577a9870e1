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

//! Durable cache snapshots
//!
//! The cache itself lives in memory and measures time with a monotonic
//! clock. A snapshot converts each entry's age and remaining TTL into
//! wall-clock timestamps so that a restarted process can restore entries
//! with whatever lifetime they have left. Entries that expired while the
//! process was down are dropped on load.
//!
//! [`FilePersistence`] stores the snapshot as zstd-compressed JSON, written
//! to a temporary file and renamed into place.

use crate::cache::CacheSnapshotEntry;
use crate::error::{EngineError, EngineResult};
use crate::fingerprint::Fingerprint;
use crate::result::CompressionResult;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Default zstd level for snapshots
pub const DEFAULT_SNAPSHOT_LEVEL: i32 = 3;

/// Durable storage for cache snapshots
#[async_trait]
pub trait CachePersistence: Send + Sync + Debug {
    /// Load entries that have not yet expired, least recently used first
    ///
    /// An absent snapshot loads as empty.
    async fn load(&self) -> EngineResult<Vec<CacheSnapshotEntry>>;

    /// Replace the stored snapshot
    async fn save(&self, entries: &[CacheSnapshotEntry]) -> EngineResult<()>;
}

/// One cache entry with wall-clock timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEntry {
    /// Cache key
    pub fingerprint: Fingerprint,
    /// Cached result
    pub result: CompressionResult,
    /// When the entry was inserted
    pub created_at: DateTime<Utc>,
    /// When the entry expires
    pub expires_at: DateTime<Utc>,
}

impl PersistedEntry {
    /// Anchor a live entry at `now`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] if a duration does not fit a timestamp.
    pub fn from_snapshot(entry: &CacheSnapshotEntry, now: DateTime<Utc>) -> EngineResult<Self> {
        let created_at = now
            .checked_sub_signed(to_delta(entry.age)?)
            .ok_or_else(|| EngineError::persistence("entry age out of range"))?;
        let expires_at = now
            .checked_add_signed(to_delta(entry.remaining_ttl)?)
            .ok_or_else(|| EngineError::persistence("entry expiry out of range"))?;

        Ok(PersistedEntry {
            fingerprint: entry.fingerprint,
            result: entry.result.clone(),
            created_at,
            expires_at,
        })
    }

    /// Convert back to a cache entry, or `None` if expired at `now`
    pub fn into_snapshot(self, now: DateTime<Utc>) -> Option<CacheSnapshotEntry> {
        let remaining_ttl = (self.expires_at - now).to_std().ok()?;
        if remaining_ttl.is_zero() {
            return None;
        }
        let age = (now - self.created_at).to_std().unwrap_or(Duration::ZERO);

        Some(CacheSnapshotEntry {
            fingerprint: self.fingerprint,
            result: self.result,
            age,
            remaining_ttl,
        })
    }

    /// Whether the entry has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

fn to_delta(duration: Duration) -> EngineResult<TimeDelta> {
    TimeDelta::from_std(duration).map_err(|e| EngineError::persistence(e.to_string()))
}

/// On-disk snapshot document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: Vec<PersistedEntry>,
}

/// Snapshot stored in a single zstd-compressed JSON file
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
    level: i32,
}

impl FilePersistence {
    /// Persist to `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FilePersistence {
            path: path.as_ref().to_path_buf(),
            level: DEFAULT_SNAPSHOT_LEVEL,
        }
    }

    /// Override the zstd level
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Snapshot location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self, entries: &[CacheSnapshotEntry]) -> EngineResult<Vec<u8>> {
        let now = Utc::now();
        let entries = entries
            .iter()
            .map(|entry| PersistedEntry::from_snapshot(entry, now))
            .collect::<EngineResult<Vec<_>>>()?;

        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            entries,
        };
        let json = serde_json::to_vec(&file)
            .map_err(|e| EngineError::persistence(format!("failed to serialize snapshot: {}", e)))?;
        Ok(zstd::encode_all(json.as_slice(), self.level)?)
    }

    fn decode(data: &[u8]) -> EngineResult<SnapshotFile> {
        let json = zstd::decode_all(data)
            .map_err(|e| EngineError::persistence(format!("failed to decompress snapshot: {}", e)))?;
        let file: SnapshotFile = serde_json::from_slice(&json)
            .map_err(|e| EngineError::persistence(format!("failed to parse snapshot: {}", e)))?;

        if file.version != SNAPSHOT_VERSION {
            return Err(EngineError::persistence(format!(
                "unsupported snapshot version {} (expected {})",
                file.version, SNAPSHOT_VERSION
            )));
        }
        Ok(file)
    }
}

#[async_trait]
impl CachePersistence for FilePersistence {
    async fn load(&self) -> EngineResult<Vec<CacheSnapshotEntry>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache snapshot found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file = Self::decode(&data)?;
        let stored = file.entries.len();
        let now = Utc::now();
        let entries: Vec<_> = file
            .entries
            .into_iter()
            .filter_map(|entry| entry.into_snapshot(now))
            .collect();

        info!(
            path = %self.path.display(),
            loaded = entries.len(),
            expired = stored - entries.len(),
            saved_at = %file.saved_at,
            "Loaded cache snapshot"
        );
        Ok(entries)
    }

    async fn save(&self, entries: &[CacheSnapshotEntry]) -> EngineResult<()> {
        let data = self.encode(entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.path).await?;

        info!(
            path = %self.path.display(),
            entries = entries.len(),
            bytes = data.len(),
            "Saved cache snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use compactpdf_config::CompressionConfig;
    use tempfile::TempDir;

    fn entry(name: &str, age: Duration, remaining: Duration) -> CacheSnapshotEntry {
        let document = Bytes::from(format!("%PDF-1.7 {}", name));
        let fingerprint = Fingerprint::compute(&document, &CompressionConfig::default());
        let mut result = CompressionResult::pass_through(document, Duration::from_millis(3));
        result.fingerprint = Some(fingerprint);
        CacheSnapshotEntry {
            fingerprint,
            result,
            age,
            remaining_ttl: remaining,
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let persistence = FilePersistence::new(dir.path().join("absent.snapshot"));
        assert!(persistence.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.snapshot");
        let persistence = FilePersistence::new(&path);

        let entries = vec![
            entry("a", Duration::from_secs(5), Duration::from_secs(3600)),
            entry("b", Duration::from_secs(1), Duration::from_secs(600)),
        ];
        persistence.save(&entries).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let loaded = persistence.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].fingerprint, entries[0].fingerprint);
        assert_eq!(loaded[0].result, entries[0].result);
        assert!(loaded[0].remaining_ttl <= Duration::from_secs(3600));
        assert!(loaded[0].remaining_ttl > Duration::from_secs(3500));
        assert_eq!(loaded[1].fingerprint, entries[1].fingerprint);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let now = Utc::now();
        let live = PersistedEntry::from_snapshot(
            &entry("live", Duration::ZERO, Duration::from_secs(60)),
            now,
        )
        .unwrap();
        let mut stale = live.clone();
        stale.expires_at = now - TimeDelta::seconds(1);

        assert!(stale.is_expired(now));
        assert!(stale.into_snapshot(now).is_none());
        assert!(live.into_snapshot(now).is_some());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.snapshot");
        fs::write(&path, b"definitely not zstd").await.unwrap();

        let err = FilePersistence::new(&path).load().await.unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_version_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.snapshot");
        let json = serde_json::json!({
            "version": 99,
            "saved_at": Utc::now(),
            "entries": [],
        });
        let data = zstd::encode_all(json.to_string().as_bytes(), 3).unwrap();
        fs::write(&path, data).await.unwrap();

        let err = FilePersistence::new(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version"));
    }
}
