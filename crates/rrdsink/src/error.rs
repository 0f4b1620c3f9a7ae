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

use snafu::Snafu;

use crate::sample::ValueKind;

/// Errors produced by the sink and its collaborators.
///
/// None of these are retried internally: the write worker logs a failed
/// update and moves on, and every other error is reported straight back to
/// the caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A filename or update token would exceed its bounded buffer.
    #[snafu(display("{what} for {target} exceeds {limit} bytes (got {len})"))]
    EncodeOverflow {
        what:   &'static str,
        target: String,
        limit:  usize,
        len:    usize,
    },

    /// The schema declares a data source kind the encoder cannot render.
    #[snafu(display("data source {name} has unsupported kind {kind:?}"))]
    UnsupportedType { name: String, kind: ValueKind },

    /// The sample disagrees with its type schema.
    #[snafu(display("sample does not match schema: expected {expected}, got {got}"))]
    SchemaMismatch { expected: String, got: String },

    /// The sample is not newer than the last accepted one for its file.
    #[snafu(display(
        "sample for {filename} at {time} is not newer than {last_value}"
    ))]
    OutOfOrder {
        filename:   String,
        time:       i64,
        last_value: i64,
    },

    /// A targeted flush named an identifier with no cache entry.
    #[snafu(display("no cache entry for identifier {identifier}"))]
    NotFound { identifier: String },

    /// The target path exists but is not a regular file.
    #[snafu(display("{path} exists but is not a regular file"))]
    NotRegularFile { path: String },

    /// Stat on the target path failed for a reason other than absence.
    #[snafu(display("failed to stat {path}: {source}"))]
    Stat {
        path:   String,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// The RRD library rejected an update; the batch has been dropped.
    #[snafu(display("rrd update for {filename} failed: {message}"))]
    WriteFailed { filename: String, message: String },

    /// The writer thread could not be spawned.
    #[snafu(display("failed to spawn writer thread: {source}"))]
    Spawn {
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Unexpected internal failure.
    #[snafu(display("internal error: {message}"))]
    Internal { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
