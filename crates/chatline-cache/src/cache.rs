// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded FIFO response cache.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::key::CacheKey;

/// Point-in-time counters for the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheInner {
    entries: HashMap<CacheKey, String>,
    /// Live keys with their insertion sequence, oldest first. Holds exactly
    /// the keys of `entries`.
    order: VecDeque<(u64, CacheKey)>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Shared response cache with strict FIFO eviction.
///
/// Reads never promote an entry and entries never expire. Every operation
/// runs inside one short critical section, so the cache is safe to share
/// across request tasks behind an `Arc`.
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                next_seq: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // A panic while holding the lock cannot leave the map and queue
        // disagreeing about live keys, so a poisoned cache is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let mut inner = self.lock();
        let value = inner.entries.get(key).cloned();
        if value.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        value
    }

    /// Insert or overwrite. Overwriting keeps the original insertion order.
    pub fn put(&self, key: CacheKey, value: String) {
        let mut inner = self.lock();

        if let Some(existing) = inner.entries.get_mut(&key) {
            *existing = value;
            return;
        }

        if inner.entries.len() >= self.capacity {
            if let Some((seq, oldest)) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
                inner.evictions += 1;
                debug!(key = %oldest, seq, "evicted oldest cache entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.push_back((seq, key.clone()));
        inner.entries.insert(key, value);
    }

    /// Drop every entry. Counters other than `entries` are kept.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }
}
