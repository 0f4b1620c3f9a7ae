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

//! Background write worker draining the dispatch queue.
//!
//! ## Architecture
//!
//! The worker runs on a dedicated thread and is the only caller of the RRD
//! update path, so updates for any given file happen strictly serially.
//!
//! ```text
//! ┌──────────────┐   dequeue    ┌──────────────┐   update    ┌──────────────┐
//! │DispatchQueue │ ───────────► │ WriteWorker  │ ──────────► │  RrdBackend  │
//! │   (FIFO)     │              │ (bg thread)  │             │  (.rrd file) │
//! └──────────────┘              └──────┬───────┘             └──────────────┘
//!                                      │ steal (cache mutex)
//!                               ┌──────▼───────┐
//!                               │    Cache     │
//!                               └──────────────┘
//! ```
//!
//! The worker never holds the cache and queue mutexes at the same time: it
//! blocks on the queue condvar while idle, takes the cache mutex only for
//! the steal, and calls the backend with no lock of its own held.
//!
//! A failed update drops its batch with a warning instead of re-enqueueing:
//! failed RRD updates usually indicate a structural problem retries will
//! not fix, and a retry loop would starve the queue.

use std::{sync::Arc, thread, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    SinkConfig,
    cache::Cache,
    dispatch::{Dequeued, DispatchQueue},
    rrd::RrdBackend,
};

/// Background worker that pops filenames off the dispatch queue, steals
/// their buffered tokens, and pushes them to the RRD backend.
pub(crate) struct WriteWorker {
    /// Queue of filenames awaiting write.
    queue:    Arc<DispatchQueue>,
    /// Shared accumulator cache to steal batches from.
    cache:    Arc<Cache>,
    /// RRD update collaborator.
    backend:  Arc<dyn RrdBackend>,
    /// Pause after each successful update when a write rate cap is set.
    throttle: Option<Duration>,
}

impl WriteWorker {
    pub(crate) fn new(
        queue: Arc<DispatchQueue>,
        cache: Arc<Cache>,
        backend: Arc<dyn RrdBackend>,
        config: &SinkConfig,
    ) -> Self {
        let throttle = (config.writes_per_second > 0.0)
            .then(|| Duration::from_secs_f64(1.0 / config.writes_per_second));
        Self {
            queue,
            cache,
            backend,
            throttle,
        }
    }

    /// Main run loop: dequeue, steal, update, until the shutdown sentinel.
    pub(crate) fn run(&self) {
        info!("write worker starting");

        loop {
            match self.queue.dequeue_blocking() {
                Dequeued::File(filename) => self.write_one(&filename),
                Dequeued::Shutdown => break,
            }
        }

        info!("write worker stopped");
    }

    fn write_one(&self, filename: &str) {
        let Some(tokens) = self.cache.steal(filename) else {
            // Unreachable while the queued-flag discipline holds.
            warn!(filename, "dequeued file has no cache entry");
            return;
        };
        if tokens.is_empty() {
            return;
        }

        match self.backend.update(filename, &tokens) {
            Ok(()) => {
                debug!(filename, tokens = tokens.len(), "wrote batch");
                if let Some(pause) = self.throttle {
                    thread::sleep(pause);
                }
            }
            Err(e) => {
                warn!(
                    filename,
                    tokens = tokens.len(),
                    error = %e,
                    "rrd update failed, dropping batch"
                );
            }
        }
    }
}
