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

use std::sync::Arc;

use crate::{
    CreateConfig, Result, SinkConfig,
    rrd::{FileCreator, RrdBackend},
    sink::RrdSink,
};

/// Builder for [`RrdSink`].
///
/// The two collaborators are mandatory; every config knob has the
/// defaults of [`SinkConfig`]. Timeout normalization (the `< 2` disable
/// rule, the tenfold flush period, data dir stripping) happens in
/// [`build`](Self::build).
pub struct RrdSinkBuilder {
    config:  SinkConfig,
    backend: Arc<dyn RrdBackend>,
    creator: Arc<dyn FileCreator>,
}

impl RrdSinkBuilder {
    pub fn new(backend: Arc<dyn RrdBackend>, creator: Arc<dyn FileCreator>) -> Self {
        Self {
            config: SinkConfig::default(),
            backend,
            creator,
        }
    }

    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn cache_timeout(mut self, seconds: i64) -> Self {
        self.config.cache_timeout = seconds;
        self
    }

    #[must_use]
    pub fn cache_flush_timeout(mut self, seconds: i64) -> Self {
        self.config.cache_flush_timeout = seconds;
        self
    }

    #[must_use]
    pub fn random_timeout(mut self, seconds: i64) -> Self {
        self.config.random_timeout = seconds;
        self
    }

    #[must_use]
    pub fn writes_per_second(mut self, rate: f64) -> Self {
        self.config.writes_per_second = rate;
        self
    }

    #[must_use]
    pub fn create_config(mut self, create: CreateConfig) -> Self {
        self.config.create = create;
        self
    }

    /// Normalize the configuration and spawn the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer thread cannot be spawned.
    pub fn build(self) -> Result<RrdSink> {
        RrdSink::new(self.config.normalized(), self.backend, self.creator)
    }
}
