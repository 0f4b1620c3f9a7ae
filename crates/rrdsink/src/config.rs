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

use tracing::{info, warn};

/// Configuration for the sink.
///
/// The surrounding host parses its own option format and hands the typed
/// values to [`RrdSinkBuilder`](crate::RrdSinkBuilder) before init; after
/// normalization the config is read-only.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Root directory prepended to every filename. Trailing slashes are
    /// stripped during normalization; empty means relative filenames.
    pub data_dir: String,
    /// Max age in seconds a sample may sit in the cache before its file is
    /// enqueued. Values below 2 disable time-based queueing entirely.
    pub cache_timeout: i64,
    /// Period of the in-line sweep. Raised to `10 * cache_timeout` when
    /// configured smaller.
    pub cache_flush_timeout: i64,
    /// Per-batch jitter bound added to `cache_timeout` in the insert-path
    /// age check, spreading enqueues of files that fill at the same rate.
    /// 0 disables jitter.
    pub random_timeout: i64,
    /// Cap on sustained RRD updates per second. 0 disables throttling.
    pub writes_per_second: f64,
    /// Options passed through to the file-creation collaborator.
    pub create: CreateConfig,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            cache_timeout: 0,
            cache_flush_timeout: 0,
            random_timeout: 0,
            writes_per_second: 0.0,
            create: CreateConfig::default(),
        }
    }
}

impl SinkConfig {
    /// Apply the derived-timeout rules. Called once at build time.
    ///
    /// - trailing slashes are stripped from `data_dir`;
    /// - `cache_timeout < 2` disables caching: both timeouts and the
    ///   jitter bound are forced to zero;
    /// - otherwise `cache_flush_timeout` is raised to ten times
    ///   `cache_timeout` when smaller, and `random_timeout` is clamped
    ///   into `[0, cache_timeout]`.
    pub(crate) fn normalized(mut self) -> Self {
        let stripped = self.data_dir.trim_end_matches('/');
        if stripped.len() != self.data_dir.len() {
            self.data_dir.truncate(stripped.len());
        }

        if self.cache_timeout < 2 {
            if self.cache_timeout != 0 {
                info!(
                    cache_timeout = self.cache_timeout,
                    "cache timeout below 2 seconds, disabling caching"
                );
            }
            self.cache_timeout = 0;
            self.cache_flush_timeout = 0;
            self.random_timeout = 0;
        } else {
            if self.cache_flush_timeout < 10 * self.cache_timeout {
                self.cache_flush_timeout = 10 * self.cache_timeout;
                info!(
                    cache_flush_timeout = self.cache_flush_timeout,
                    "raising cache flush period to ten times the cache timeout"
                );
            }
            if self.random_timeout < 0 {
                self.random_timeout = 0;
            } else if self.random_timeout > self.cache_timeout {
                warn!(
                    random_timeout = self.random_timeout,
                    cache_timeout = self.cache_timeout,
                    "clamping random timeout to the cache timeout"
                );
                self.random_timeout = self.cache_timeout;
            }
        }

        if self.writes_per_second < 0.0 {
            self.writes_per_second = 0.0;
        }

        self
    }
}

/// Options forwarded verbatim to the file-creation collaborator when a
/// sample arrives for a file that does not exist yet.
#[derive(Debug, Clone)]
pub struct CreateConfig {
    /// RRD step size in seconds; 0 derives it from the sample interval.
    pub step_size:     u64,
    /// Data source heartbeat in seconds; 0 derives it from the step size.
    pub heartbeat:     u64,
    /// Rows per round-robin archive.
    pub rra_rows:      u32,
    /// Timespans (seconds) to cover with archives; empty uses the
    /// collaborator's defaults.
    pub rra_timespans: Vec<u64>,
    /// Archive consolidation xfiles factor.
    pub xff:           f64,
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            step_size:     0,
            heartbeat:     0,
            rra_rows:      1200,
            rra_timespans: Vec::new(),
            xff:           0.1,
        }
    }
}
