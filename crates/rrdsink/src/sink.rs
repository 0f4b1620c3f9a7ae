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

//! Sink lifecycle and the host-facing write/flush/shutdown contract.
//!
//! The [`RrdSink`] owns the accumulator cache, the dispatch queue, and the
//! background write worker. The surrounding host holds one sink per
//! process and funnels every sample, flush request, and the final
//! shutdown through it.
//!
//! ## Usage
//!
//! ```ignore
//! let sink = RrdSinkBuilder::new(backend, creator)
//!     .data_dir("/var/lib/rrd")
//!     .cache_timeout(120)
//!     .build()?;
//!
//! sink.write(&schema, &sample)?;
//!
//! // Push everything older than 60 seconds for one identifier.
//! sink.flush(60, Some("h/cpu-0/cpu-idle"))?;
//!
//! // Drain and stop.
//! sink.shutdown()?;
//! ```

use std::{fs, io, sync::Arc, thread::JoinHandle};

use chrono::Utc;
use snafu::{ResultExt, ensure};
use tracing::info;

use crate::{
    Result, SinkConfig,
    cache::Cache,
    dispatch::DispatchQueue,
    encode,
    error::{InternalSnafu, NotRegularFileSnafu, SpawnSnafu, StatSnafu},
    rrd::{FileCreator, RrdBackend},
    sample::{Sample, TypeSchema},
    writer::WriteWorker,
};

/// Write-coalescing sink in front of a round-robin-database library.
///
/// Thread-safe: any number of producer threads may call
/// [`write`](RrdSink::write) and [`flush`](RrdSink::flush) concurrently. A single
/// background worker issues the actual RRD updates, so writes to any given
/// file are strictly serial.
pub struct RrdSink {
    /// Normalized configuration, read-only after init.
    config:        Arc<SinkConfig>,
    /// Per-file accumulator shared with the write worker.
    cache:         Arc<Cache>,
    /// FIFO handoff between the cache and the write worker.
    queue:         Arc<DispatchQueue>,
    /// File-creation collaborator for first-seen filenames.
    creator:       Arc<dyn FileCreator>,
    /// Handle to the background writer thread.
    writer_handle: Option<JoinHandle<()>>,
}

impl RrdSink {
    /// Create the cache and queue and spawn the writer thread.
    pub(crate) fn new(
        config: SinkConfig,
        backend: Arc<dyn RrdBackend>,
        creator: Arc<dyn FileCreator>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let now = Utc::now().timestamp();

        let cache = Arc::new(Cache::new(config.clone(), now));
        let queue = Arc::new(DispatchQueue::new());

        let worker = WriteWorker::new(queue.clone(), cache.clone(), backend, &config);
        let writer_handle = std::thread::Builder::new()
            .name("rrd-writer".into())
            .spawn(move || worker.run())
            .context(SpawnSnafu)?;

        info!(
            data_dir = %config.data_dir,
            cache_timeout = config.cache_timeout,
            cache_flush_timeout = config.cache_flush_timeout,
            "rrd sink initialized"
        );

        Ok(Self {
            config,
            cache,
            queue,
            creator,
            writer_handle: Some(writer_handle),
        })
    }

    /// Buffer one sample.
    ///
    /// Encodes the filename and update token, materializes the target file
    /// on first sight via the creation collaborator, and appends the token
    /// to the file's cache entry.
    ///
    /// # Errors
    ///
    /// Encoding errors, creation failures, a target that exists but is not
    /// a regular file, and out-of-order timestamps are all reported to the
    /// caller; none leave a partial insert behind.
    pub fn write(&self, schema: &TypeSchema, sample: &Sample) -> Result<()> {
        let filename = encode::encode_filename(&self.config.data_dir, sample)?;
        let token = encode::encode_update(schema, sample)?;

        match fs::metadata(&filename) {
            Ok(meta) => {
                ensure!(meta.is_file(), NotRegularFileSnafu { path: filename });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(filename = filename.as_str(), "creating rrd file");
                self.creator
                    .create(&filename, schema, sample, &self.config.create)?;
            }
            Err(e) => {
                return Err(e).context(StatSnafu {
                    path: filename.as_str(),
                });
            }
        }

        let now = Utc::now().timestamp();
        self.cache
            .insert(&self.queue, &filename, token, sample.time, now)
    }

    /// Flush buffered data older than `timeout` seconds.
    ///
    /// With no identifier, sweeps the whole cache (a negative `timeout`
    /// forces everything out, regardless of age). With an identifier,
    /// promotes or priority-enqueues that single file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) for an
    /// identifier with no cache entry.
    pub fn flush(&self, timeout: i64, identifier: Option<&str>) -> Result<()> {
        let now = Utc::now().timestamp();
        match identifier {
            None => {
                self.cache.sweep(&self.queue, timeout, now);
                Ok(())
            }
            Some(identifier) => {
                self.cache
                    .flush_identifier(&self.queue, timeout, identifier, now)
            }
        }
    }

    /// Two-phase drain: force every non-empty entry into the queue, then
    /// signal the writer and wait for it to finish the backlog.
    ///
    /// There is no timeout; shutdown returns only after every buffered
    /// batch has been handed to the backend. Consumes `self` to prevent
    /// further use.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer thread panicked.
    pub fn shutdown(mut self) -> Result<()> {
        info!("shutting down rrd sink");

        let now = Utc::now().timestamp();
        self.cache.sweep(&self.queue, -1, now);
        self.queue.shutdown();

        if let Some(handle) = self.writer_handle.take() {
            handle.join().map_err(|_| {
                InternalSnafu {
                    message: "writer thread panicked",
                }
                .build()
            })?;
        }

        self.cache.clear();

        info!("rrd sink shutdown complete");
        Ok(())
    }

    /// The normalized sink configuration.
    #[must_use]
    pub fn config(&self) -> &SinkConfig { &self.config }
}

impl Drop for RrdSink {
    fn drop(&mut self) {
        if self.writer_handle.is_some() {
            self.queue.shutdown();
        }
    }
}
