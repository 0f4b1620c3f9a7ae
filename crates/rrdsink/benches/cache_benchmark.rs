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

//! Benchmarks for the write path.
//!
//! Measures:
//! - Filename and update token encoding
//! - Buffered insert latency (large cache timeout, no queue traffic)
//! - Write-through latency (caching disabled, every insert dispatched)

use std::{fs, hint::black_box, path::Path, sync::Arc};

use criterion::{Criterion, criterion_group, criterion_main};
use rrdsink::{
    CreateConfig, DataSource, FileCreator, Result, RrdBackend, RrdSink,
    RrdSinkBuilder, Sample, TypeSchema, Value, ValueKind, encode_filename,
    encode_update,
};
use tempfile::TempDir;

struct NullBackend;

impl RrdBackend for NullBackend {
    fn update(&self, _filename: &str, _tokens: &[String]) -> Result<()> { Ok(()) }
}

struct TouchCreator;

impl FileCreator for TouchCreator {
    fn create(
        &self,
        filename: &str,
        _schema: &TypeSchema,
        _sample: &Sample,
        _config: &CreateConfig,
    ) -> Result<()> {
        if let Some(parent) = Path::new(filename).parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::File::create(filename).unwrap();
        Ok(())
    }
}

fn schema() -> TypeSchema {
    TypeSchema::new("gauge", vec![DataSource::new("value", ValueKind::Gauge)])
}

fn sample(time: i64) -> Sample {
    Sample {
        time,
        host: "bench-host".to_string(),
        plugin: "cpu".to_string(),
        plugin_instance: "0".to_string(),
        type_name: "gauge".to_string(),
        type_instance: "user".to_string(),
        values: vec![Value::Gauge(42.5)],
    }
}

fn create_sink(temp_dir: &TempDir, cache_timeout: i64) -> RrdSink {
    RrdSinkBuilder::new(Arc::new(NullBackend), Arc::new(TouchCreator))
        .data_dir(temp_dir.path().to_str().unwrap())
        .cache_timeout(cache_timeout)
        .build()
        .expect("Failed to create sink")
}

fn bench_encode_filename(c: &mut Criterion) {
    let s = sample(100);
    c.bench_function("encode_filename", |b| {
        b.iter(|| encode_filename(black_box("/var/lib/rrd"), black_box(&s)).unwrap());
    });
}

fn bench_encode_update(c: &mut Criterion) {
    let schema = schema();
    let s = sample(100);
    c.bench_function("encode_update", |b| {
        b.iter(|| encode_update(black_box(&schema), black_box(&s)).unwrap());
    });
}

fn bench_buffered_write(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let sink = create_sink(&temp_dir, 3600);
    let schema = schema();

    // Stepping a tenth of the cache timeout coalesces roughly ten tokens
    // per batch, so the buffer stays bounded across iterations.
    let mut time = 0i64;
    c.bench_function("buffered_write", |b| {
        b.iter(|| {
            time += 360;
            sink.write(black_box(&schema), black_box(&sample(time))).unwrap();
        });
    });

    sink.shutdown().unwrap();
}

fn bench_write_through(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    // Caching disabled: every insert goes straight to the dispatch queue.
    let sink = create_sink(&temp_dir, 0);
    let schema = schema();

    let mut time = 0i64;
    c.bench_function("write_through", |b| {
        b.iter(|| {
            time += 1;
            sink.write(black_box(&schema), black_box(&sample(time))).unwrap();
        });
    });

    sink.shutdown().unwrap();
}

criterion_group!(
    benches,
    bench_encode_filename,
    bench_encode_update,
    bench_buffered_write,
    bench_write_through
);
criterion_main!(benches);
