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

//! External collaborator seams: the RRD update path and file creation.
//!
//! The sink treats the RRD library as an opaque collaborator. Only the
//! write worker calls [`RrdBackend::update`], so updates are serial per
//! process; backends wrapping a library that is not even safe for that can
//! use [`SerializedUpdate`].

use std::{
    process::Command,
    sync::{Mutex, PoisonError},
};

use snafu::ensure;

use crate::{
    CreateConfig, Result,
    error::WriteFailedSnafu,
    sample::{Sample, TypeSchema},
};

/// RRD update collaborator.
///
/// Implementations receive the target filename and the pending update
/// tokens (`time:v0:v1:…`) in timestamp order, exactly as accepted by the
/// write path.
pub trait RrdBackend: Send + Sync {
    /// Apply a batch of update tokens to `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`](crate::Error::WriteFailed) when the
    /// library rejects the update. The caller drops the batch; it is never
    /// retried.
    fn update(&self, filename: &str, tokens: &[String]) -> Result<()>;
}

/// File-creation collaborator, invoked on the first sample for a filename
/// that does not exist on disk yet.
pub trait FileCreator: Send + Sync {
    /// Materialize `filename` for the given schema and first sample.
    fn create(
        &self,
        filename: &str,
        schema: &TypeSchema,
        sample: &Sample,
        config: &CreateConfig,
    ) -> Result<()>;
}

/// Backend that shells out to the `rrdtool` binary.
///
/// `rrdtool update` is safe to invoke as a subprocess from any thread, so
/// no extra serialization is needed beyond the single write worker.
#[derive(Debug, Clone)]
pub struct RrdtoolBackend {
    binary: String,
}

impl RrdtoolBackend {
    #[must_use]
    pub fn new() -> Self { Self::with_binary("rrdtool") }

    /// Use a specific `rrdtool` executable instead of resolving via `PATH`.
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for RrdtoolBackend {
    fn default() -> Self { Self::new() }
}

impl RrdBackend for RrdtoolBackend {
    fn update(&self, filename: &str, tokens: &[String]) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("update")
            .arg(filename)
            .args(tokens)
            .output()
            .map_err(|e| {
                WriteFailedSnafu {
                    filename,
                    message: format!("failed to run {}: {e}", self.binary),
                }
                .build()
            })?;

        ensure!(
            output.status.success(),
            WriteFailedSnafu {
                filename,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
        );

        Ok(())
    }
}

/// Adapter for RRD libraries whose update entry point is not reentrant.
///
/// Rebuilds the argv as `["update", filename, tokens…]` — the shape such
/// libraries expect from their command-line dispatcher — and holds a
/// dedicated mutex around the call. Observationally equivalent to a
/// reentrant backend since the write worker already serializes updates.
pub struct SerializedUpdate<F> {
    update: F,
    lock:   Mutex<()>,
}

impl<F> SerializedUpdate<F>
where
    F: Fn(&[String]) -> Result<()> + Send + Sync,
{
    pub fn new(update: F) -> Self {
        Self {
            update,
            lock: Mutex::new(()),
        }
    }
}

impl<F> RrdBackend for SerializedUpdate<F>
where
    F: Fn(&[String]) -> Result<()> + Send + Sync,
{
    fn update(&self, filename: &str, tokens: &[String]) -> Result<()> {
        let mut argv = Vec::with_capacity(tokens.len() + 2);
        argv.push("update".to_owned());
        argv.push(filename.to_owned());
        argv.extend_from_slice(tokens);

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        (self.update)(&argv)
    }
}
