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

//! Fingerprint-keyed result cache
//!
//! Provides a thread-safe cache of compression results with:
//! - Count-based eviction (least recently accessed first)
//! - Optional byte budget over cached output sizes
//! - Per-entry TTL with lazy expiry on lookup and an explicit sweep
//! - At most one computation in flight per fingerprint
//!
//! The lock is a plain mutex that is never held across an await point.
//! Concurrent callers of [`FingerprintCache::get_or_compute`] for the same
//! fingerprint share one computation: the first caller becomes the leader,
//! later callers subscribe to its result. A leader that fails or is dropped
//! closes the channel and a waiting caller takes over.
//!
//! # Examples
//!
//! ```
//! use bytes::Bytes;
//! use compactpdf_config::CompressionConfig;
//! use compactpdf_engine::{CompressionResult, FingerprintCache, Fingerprint};
//! use std::time::Duration;
//!
//! let cache = FingerprintCache::new(128);
//! let document = Bytes::from_static(b"%PDF-1.7 ...");
//! let fingerprint = Fingerprint::compute(&document, &CompressionConfig::default());
//!
//! let result = CompressionResult::pass_through(document, Duration::ZERO);
//! cache.put(fingerprint, result.clone(), Duration::from_secs(60));
//! assert_eq!(cache.get(&fingerprint), Some(result));
//! ```

use crate::error::{EngineError, EngineResult};
use crate::fingerprint::Fingerprint;
use crate::result::CompressionResult;
use compactpdf_config::CacheSettings;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Upper bound on entry lifetime
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A cached result with its bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cache key
    pub fingerprint: Fingerprint,
    /// Cached result
    pub result: CompressionResult,
    /// Insertion time
    pub created_at: Instant,
    /// Last successful lookup (or insertion)
    pub last_accessed_at: Instant,
    /// Fixed expiry deadline
    pub expires_at: Instant,
    /// Output bytes charged against the byte budget
    pub size_bytes: u64,
    access_order: u64,
}

impl CacheEntry {
    /// Whether the entry has reached its deadline
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry
    pub fn remaining_ttl(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Live entries
    pub size: usize,
    /// Maximum entries (0 disables storage)
    pub capacity: usize,
    /// Lookups served from storage
    pub hit_count: u64,
    /// Lookups that found nothing usable
    pub miss_count: u64,
    /// Entries removed to make room
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Output bytes held
    pub total_bytes: u64,
    /// Byte budget (0 = unlimited)
    pub max_bytes: u64,
    /// Callers that reused a concurrent computation
    pub shared_waits: u64,
    /// Computations currently running
    pub in_flight: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            return 0.0;
        }
        self.hit_count as f64 / total as f64
    }
}

/// Where a [`FingerprintCache::get_or_compute`] result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    /// Found in storage
    Hit,
    /// Produced by a concurrent caller with the same fingerprint
    Shared,
    /// Computed by this caller
    Computed,
}

/// Result of [`FingerprintCache::get_or_compute`]
#[derive(Debug, Clone)]
pub struct Lookup {
    /// The result
    pub result: CompressionResult,
    /// How it was obtained
    pub source: LookupSource,
}

/// Output of a computation run under [`FingerprintCache::get_or_compute`]
#[derive(Debug, Clone)]
pub struct Computed {
    /// The result, handed to waiting callers either way
    pub result: CompressionResult,
    /// Whether it may be stored
    pub cacheable: bool,
}

/// Entry exported for durable persistence
#[derive(Debug, Clone)]
pub struct CacheSnapshotEntry {
    /// Cache key
    pub fingerprint: Fingerprint,
    /// Cached result
    pub result: CompressionResult,
    /// Time since insertion
    pub age: Duration,
    /// Time left before expiry
    pub remaining_ttl: Duration,
}

#[derive(Debug)]
struct CacheInner {
    entries: HashMap<Fingerprint, CacheEntry>,
    /// Access order -> key, oldest first
    lru: BTreeMap<u64, Fingerprint>,
    access_counter: u64,
    total_bytes: u64,
    capacity: usize,
    max_bytes: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    shared_waits: u64,
    in_flight: HashMap<Fingerprint, watch::Sender<Option<CompressionResult>>>,
}

impl CacheInner {
    fn new(capacity: usize, max_bytes: u64) -> Self {
        CacheInner {
            entries: HashMap::new(),
            lru: BTreeMap::new(),
            access_counter: 0,
            total_bytes: 0,
            capacity,
            max_bytes,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            shared_waits: 0,
            in_flight: HashMap::new(),
        }
    }

    fn next_order(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    /// Live entry lookup; counts hits and expirations, not misses
    fn lookup(&mut self, fingerprint: &Fingerprint, now: Instant) -> Option<CompressionResult> {
        let expired = self.entries.get(fingerprint)?.is_expired(now);
        if expired {
            self.remove_entry(fingerprint);
            self.expirations += 1;
            trace!(fingerprint = %fingerprint.short(), "Cache entry expired");
            return None;
        }

        let order = self.next_order();
        let entry = self.entries.get_mut(fingerprint)?;
        self.lru.remove(&entry.access_order);
        entry.access_order = order;
        entry.last_accessed_at = now;
        self.lru.insert(order, *fingerprint);
        self.hits += 1;
        Some(entry.result.clone())
    }

    fn remove_entry(&mut self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let entry = self.entries.remove(fingerprint)?;
        self.lru.remove(&entry.access_order);
        self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<Fingerprint> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.fingerprint)
            .collect();

        for fingerprint in &expired {
            self.remove_entry(fingerprint);
        }
        self.expirations += expired.len() as u64;
        expired.len()
    }

    fn evict_lru(&mut self) -> bool {
        let Some((_, fingerprint)) = self.lru.pop_first() else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&fingerprint) {
            self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        }
        self.evictions += 1;
        debug!(fingerprint = %fingerprint.short(), "Evicted least recently used cache entry");
        true
    }

    fn needs_room(&self, incoming: u64) -> bool {
        self.entries.len() >= self.capacity
            || (self.max_bytes > 0 && self.total_bytes + incoming > self.max_bytes)
    }

    fn insert(
        &mut self,
        fingerprint: Fingerprint,
        result: CompressionResult,
        ttl: Duration,
        now: Instant,
    ) -> bool {
        if self.capacity == 0 || ttl.is_zero() {
            return false;
        }

        let size_bytes = result.output.len() as u64;
        if self.max_bytes > 0 && size_bytes > self.max_bytes {
            debug!(
                fingerprint = %fingerprint.short(),
                size_bytes,
                max_bytes = self.max_bytes,
                "Result larger than cache byte budget, not cached"
            );
            return false;
        }

        self.remove_entry(&fingerprint);

        if self.needs_room(size_bytes) {
            self.purge_expired(now);
        }
        while self.needs_room(size_bytes) {
            if !self.evict_lru() {
                break;
            }
        }

        let order = self.next_order();
        self.entries.insert(
            fingerprint,
            CacheEntry {
                fingerprint,
                result,
                created_at: now,
                last_accessed_at: now,
                expires_at: now + ttl.min(MAX_TTL),
                size_bytes,
                access_order: order,
            },
        );
        self.lru.insert(order, fingerprint);
        self.total_bytes += size_bytes;
        true
    }
}

enum Claim {
    Hit(Box<CompressionResult>),
    Follow(watch::Receiver<Option<CompressionResult>>),
    Lead,
}

/// Removes the in-flight marker if the leader exits without completing
struct InFlightGuard<'a> {
    cache: &'a FingerprintCache,
    fingerprint: Fingerprint,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.cache.lock();
        if inner.in_flight.remove(&self.fingerprint).is_some() {
            debug!(fingerprint = %self.fingerprint.short(), "In-flight computation abandoned");
        }
    }
}

/// Result cache keyed by [`Fingerprint`]
#[derive(Debug)]
pub struct FingerprintCache {
    inner: Mutex<CacheInner>,
}

impl FingerprintCache {
    /// Create a cache holding up to `capacity` entries (0 disables storage)
    pub fn new(capacity: usize) -> Self {
        Self::with_byte_limit(capacity, 0)
    }

    /// Create a cache with both an entry and a byte limit (0 bytes = unlimited)
    pub fn with_byte_limit(capacity: usize, max_bytes: u64) -> Self {
        FingerprintCache {
            inner: Mutex::new(CacheInner::new(capacity, max_bytes)),
        }
    }

    /// Create a cache from configuration
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::with_byte_limit(settings.effective_capacity(), settings.max_bytes)
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a live result, refreshing its recency
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CompressionResult> {
        let mut inner = self.lock();
        let found = inner.lookup(fingerprint, Instant::now());
        if found.is_none() {
            inner.misses += 1;
        }
        found
    }

    /// Whether a live entry exists (does not touch recency or statistics)
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        let now = Instant::now();
        self.lock()
            .entries
            .get(fingerprint)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Store a result, evicting as needed; returns whether it was stored
    pub fn put(&self, fingerprint: Fingerprint, result: CompressionResult, ttl: Duration) -> bool {
        self.lock().insert(fingerprint, result, ttl, Instant::now())
    }

    /// Remove an entry
    pub fn remove(&self, fingerprint: &Fingerprint) -> Option<CompressionResult> {
        self.lock().remove_entry(fingerprint).map(|entry| entry.result)
    }

    /// Remove every entry
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.lru.clear();
        inner.total_bytes = 0;
    }

    /// Remove every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let removed = self.lock().purge_expired(Instant::now());
        if removed > 0 {
            debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Maximum entries
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            size: inner.entries.len(),
            capacity: inner.capacity,
            hit_count: inner.hits,
            miss_count: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
            total_bytes: inner.total_bytes,
            max_bytes: inner.max_bytes,
            shared_waits: inner.shared_waits,
            in_flight: inner.in_flight.len(),
        }
    }

    /// Live entries, least recently used first
    pub fn snapshot(&self) -> Vec<CacheSnapshotEntry> {
        let inner = self.lock();
        let now = Instant::now();
        inner
            .lru
            .values()
            .filter_map(|fingerprint| inner.entries.get(fingerprint))
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| CacheSnapshotEntry {
                fingerprint: entry.fingerprint,
                result: entry.result.clone(),
                age: now.saturating_duration_since(entry.created_at),
                remaining_ttl: entry.remaining_ttl(now),
            })
            .collect()
    }

    /// Insert exported entries in order, each with its remaining TTL
    ///
    /// Returns the number of entries stored.
    pub fn restore(&self, entries: Vec<CacheSnapshotEntry>) -> usize {
        let mut inner = self.lock();
        let now = Instant::now();
        let mut stored = 0;
        for entry in entries {
            if inner.insert(entry.fingerprint, entry.result, entry.remaining_ttl, now) {
                stored += 1;
            }
        }
        stored
    }

    fn claim(&self, fingerprint: Fingerprint) -> Claim {
        let mut inner = self.lock();

        if let Some(result) = inner.lookup(&fingerprint, Instant::now()) {
            return Claim::Hit(Box::new(result));
        }

        if let Some(sender) = inner.in_flight.get(&fingerprint) {
            return Claim::Follow(sender.subscribe());
        }

        inner.misses += 1;
        let (sender, _) = watch::channel(None);
        inner.in_flight.insert(fingerprint, sender);
        Claim::Lead
    }

    fn complete(&self, fingerprint: Fingerprint, computed: &Computed, ttl: Duration) {
        let mut inner = self.lock();
        if computed.cacheable {
            inner.insert(fingerprint, computed.result.clone(), ttl, Instant::now());
        }
        if let Some(sender) = inner.in_flight.remove(&fingerprint) {
            sender.send_replace(Some(computed.result.clone()));
        }
    }

    /// Return the cached result or compute it, at most once per fingerprint
    ///
    /// Concurrent callers with the same fingerprint wait for the first
    /// caller's computation and share its result, even when that result is
    /// not cacheable. If the computing caller fails or is cancelled, one
    /// waiter retries as the new leader.
    ///
    /// # Errors
    ///
    /// Propagates the error of this caller's own computation.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: Fingerprint,
        ttl: Duration,
        compute: F,
    ) -> EngineResult<Lookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = EngineResult<Computed>>,
    {
        let mut compute = Some(compute);

        loop {
            match self.claim(fingerprint) {
                Claim::Hit(result) => {
                    trace!(fingerprint = %fingerprint.short(), "Cache hit");
                    return Ok(Lookup {
                        result: *result,
                        source: LookupSource::Hit,
                    });
                }
                Claim::Follow(mut receiver) => {
                    trace!(fingerprint = %fingerprint.short(), "Waiting for in-flight computation");
                    let shared = match receiver.wait_for(Option::is_some).await {
                        Ok(value) => (*value).clone(),
                        Err(_) => None,
                    };

                    if let Some(result) = shared {
                        self.lock().shared_waits += 1;
                        return Ok(Lookup {
                            result,
                            source: LookupSource::Shared,
                        });
                    }
                    debug!(fingerprint = %fingerprint.short(), "Leader gave up, retrying");
                }
                Claim::Lead => {
                    let mut guard = InFlightGuard {
                        cache: self,
                        fingerprint,
                        armed: true,
                    };
                    let compute = compute.take().ok_or_else(|| {
                        EngineError::Other(anyhow::anyhow!("computation for {} already consumed", fingerprint))
                    })?;

                    let computed = compute().await?;
                    self.complete(fingerprint, &computed, ttl);
                    // The marker is gone; a later leader may own the slot now
                    guard.armed = false;

                    return Ok(Lookup {
                        result: computed.result,
                        source: LookupSource::Computed,
                    });
                }
            }
        }
    }
}
