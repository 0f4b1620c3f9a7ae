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

//! Write-coalescing sample cache with a serialized RRD flusher.
//!
//! Features:
//! - Per-file accumulation of update tokens in strict timestamp order
//! - Age-based handoff to a FIFO dispatch queue drained by one worker
//! - Priority flushes that promote a file to the head of the queue
//! - In-line sweep that ages out idle buffers and garbage-collects
//!   long-silent files
//! - Clean two-phase shutdown that drains every buffered batch
//!
//! The cache is volatile by design: it absorbs high-rate sample arrival
//! and batches disk writes, it does not provide crash durability.

mod cache;
mod dispatch;
mod writer;

pub mod builder;
pub mod config;
pub mod encode;
pub mod error;
pub mod rrd;
pub mod sample;
pub mod sink;

pub use builder::RrdSinkBuilder;
pub use config::{CreateConfig, SinkConfig};
pub use encode::{MAX_FILENAME_LEN, MAX_UPDATE_LEN, encode_filename, encode_update};
pub use error::{Error, Result};
pub use rrd::{FileCreator, RrdBackend, RrdtoolBackend, SerializedUpdate};
pub use sample::{DataSource, Sample, TypeSchema, Value, ValueKind};
pub use sink::RrdSink;
