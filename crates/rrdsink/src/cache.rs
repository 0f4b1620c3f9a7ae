// Copyright 2025 rrdsink developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-file accumulator cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   insert    ┌──────────────┐   enqueue    ┌──────────────┐
//! │   producers  │ ──────────► │    Cache     │ ───────────► │DispatchQueue │
//! │  (host write)│             │ (per-file    │  (age / flush│  (FIFO)      │
//! └──────────────┘             │  buffers)    │   policies)  └──────────────┘
//!                              └──────────────┘
//! ```
//!
//! One mutex protects the whole map and every entry in it. An entry buffers
//! update tokens in arrival order; once the buffered span exceeds the cache
//! timeout, the filename is handed to the dispatch queue and the entry is
//! marked queued so it cannot be queued twice. The write worker later steals
//! the buffer under the same mutex, which is the only queued-to-idle
//! transition.
//!
//! Entries survive the steal empty, so their `last_value` keeps enforcing
//! timestamp monotonicity across batches. The sweep removes entries that
//! have been empty and idle past the flush period — the only running-state
//! code path that deletes an entry.
//!
//! Lock order: the cache mutex is always acquired before the queue mutex.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, warn};

use crate::{
    Result, SinkConfig,
    dispatch::{DispatchQueue, Position},
    encode,
    error::{NotFoundSnafu, OutOfOrderSnafu},
};

/// Buffered state for one target file.
#[derive(Debug, Default)]
pub(crate) struct CacheEntry {
    /// Pending update tokens, insertion order = timestamp order.
    values:      Vec<String>,
    /// Timestamp of the first token of the current batch. Stale (from the
    /// previous batch) while `values` is empty; the age checks rely on
    /// that to find long-silent files.
    first_value: i64,
    /// Timestamp of the most recent accepted insertion; 0 before any.
    last_value:  i64,
    /// Whether the filename currently sits in the dispatch queue.
    queued:      bool,
    /// Jitter added to the cache timeout for this batch's age check.
    jitter:      i64,
}

#[cfg(test)]
impl CacheEntry {
    fn pending(&self) -> usize { self.values.len() }

    const fn is_queued(&self) -> bool { self.queued }

    const fn last_value(&self) -> i64 { self.last_value }
}

#[derive(Debug)]
struct CacheInner {
    entries:    BTreeMap<String, CacheEntry>,
    /// When the in-line sweep last ran.
    flush_last: i64,
}

/// Timestamp-ordered per-file accumulator, shared between producers and
/// the write worker.
#[derive(Debug)]
pub(crate) struct Cache {
    inner:  Mutex<CacheInner>,
    config: Arc<SinkConfig>,
}

impl Cache {
    pub(crate) fn new(config: Arc<SinkConfig>, now: i64) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries:    BTreeMap::new(),
                flush_last: now,
            }),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an update token to the entry for `filename`, creating the
    /// entry on first sight.
    ///
    /// Once the buffered span reaches the (jittered) cache timeout the
    /// filename is enqueued at the back of the dispatch queue. When the
    /// flush period has elapsed since the last sweep, the in-line sweep
    /// runs before the cache mutex is released.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfOrder`](crate::Error::OutOfOrder) if `time` is
    /// not strictly newer than the entry's last accepted timestamp; the
    /// entry is left unchanged.
    pub(crate) fn insert(
        &self,
        queue: &DispatchQueue,
        filename: &str,
        token: String,
        time: i64,
        now: i64,
    ) -> Result<()> {
        let mut inner = self.lock();

        let entry = inner.entries.entry(filename.to_owned()).or_default();
        if time <= entry.last_value {
            warn!(
                filename,
                time,
                last_value = entry.last_value,
                "dropping out-of-order sample"
            );
            return OutOfOrderSnafu {
                filename,
                time,
                last_value: entry.last_value,
            }
            .fail();
        }

        if entry.values.is_empty() {
            entry.first_value = time;
            entry.jitter = self.draw_jitter();
        }
        entry.values.push(token);
        entry.last_value = time;

        if !entry.queued
            && entry.last_value - entry.first_value
                >= self.config.cache_timeout + entry.jitter
        {
            entry.queued = true;
            debug!(filename, pending = entry.values.len(), "enqueueing aged file");
            queue.enqueue(filename, Position::Back);
        }

        if self.config.cache_timeout > 0
            && now - inner.flush_last > self.config.cache_flush_timeout
        {
            Self::sweep_locked(&mut inner, queue, self.config.cache_flush_timeout, now);
        }

        Ok(())
    }

    /// Run the sweep under the cache mutex. A negative `threshold` forces
    /// every non-queued non-empty entry into the queue (shutdown drain).
    pub(crate) fn sweep(&self, queue: &DispatchQueue, threshold: i64, now: i64) {
        let mut inner = self.lock();
        Self::sweep_locked(&mut inner, queue, threshold, now);
    }

    /// Sweep body; assumes the cache mutex is held.
    ///
    /// Entries older than `threshold` are enqueued at the back when they
    /// hold tokens and removed when they are empty (long-silent files).
    fn sweep_locked(
        inner: &mut CacheInner,
        queue: &DispatchQueue,
        threshold: i64,
        now: i64,
    ) {
        let mut expired = Vec::new();

        for (filename, entry) in &mut inner.entries {
            if entry.queued {
                continue;
            }
            if now - entry.first_value < threshold {
                continue;
            }
            if entry.values.is_empty() {
                expired.push(filename.clone());
            } else {
                entry.queued = true;
                queue.enqueue(filename, Position::Back);
            }
        }

        for filename in expired {
            debug!(filename, "removing long-silent cache entry");
            inner.entries.remove(&filename);
        }

        inner.flush_last = now;
    }

    /// Targeted flush for one identifier (relative path below the data
    /// directory).
    ///
    /// An already-queued file is promoted to the queue head. An unqueued
    /// file younger than `threshold`, or with nothing buffered, is left
    /// alone. Anything else is enqueued at the front for priority handling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when no cache
    /// entry exists for the identifier.
    pub(crate) fn flush_identifier(
        &self,
        queue: &DispatchQueue,
        threshold: i64,
        identifier: &str,
        now: i64,
    ) -> Result<()> {
        let filename = encode::identifier_filename(&self.config.data_dir, identifier);
        let mut inner = self.lock();

        let Some(entry) = inner.entries.get_mut(&filename) else {
            return NotFoundSnafu { identifier }.fail();
        };

        if entry.queued {
            queue.promote(&filename);
            return Ok(());
        }
        if now - entry.first_value < threshold || entry.values.is_empty() {
            return Ok(());
        }

        entry.queued = true;
        debug!(filename, pending = entry.values.len(), "priority flush");
        queue.enqueue(&filename, Position::Front);
        Ok(())
    }

    /// Steal the buffered tokens for a dequeued filename.
    ///
    /// Takes the value vector, resets the queued flag, and retains the
    /// entry so its `last_value` keeps enforcing monotonicity across
    /// batches. Called only by the write worker.
    pub(crate) fn steal(&self, filename: &str) -> Option<Vec<String>> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(filename)?;
        entry.queued = false;
        Some(std::mem::take(&mut entry.values))
    }

    /// Drop every entry. Called after the writer has drained and exited.
    pub(crate) fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
    }

    fn draw_jitter(&self) -> i64 {
        if self.config.random_timeout <= 0 {
            return 0;
        }
        use rand::Rng;
        rand::rng().random_range(-self.config.random_timeout..=self.config.random_timeout)
    }

    #[cfg(test)]
    fn with_entry<T>(&self, filename: &str, f: impl FnOnce(&CacheEntry) -> T) -> Option<T> {
        let inner = self.lock();
        inner.entries.get(filename).map(f)
    }

    #[cfg(test)]
    fn len(&self) -> usize { self.lock().entries.len() }
}
