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

//! Encoding of samples into filename keys and RRD update tokens.
//!
//! Both encoders are pure functions over a sample (plus schema / data
//! directory) and are bounded: a result that would not fit the 512-byte
//! limit of the surrounding ecosystem is rejected instead of truncated.
//!
//! The filename is the identity of a file across the whole system — every
//! cache and queue lookup uses the exact string produced here.

use snafu::ensure;

use crate::{
    Result,
    error::{EncodeOverflowSnafu, SchemaMismatchSnafu, UnsupportedTypeSnafu},
    sample::{Sample, TypeSchema, Value, ValueKind},
};

/// Upper bound for an encoded filename, including the `.rrd` suffix.
pub const MAX_FILENAME_LEN: usize = 512;

/// Upper bound for an encoded update token.
pub const MAX_UPDATE_LEN: usize = 512;

/// Derive the canonical filename for a sample:
/// `{data_dir/}host/plugin[-plugin_instance]/type[-type_instance].rrd`.
///
/// `data_dir` must already be stripped of trailing slashes (the config
/// layer does this); an empty `data_dir` omits the prefix entirely. Empty
/// instance strings suppress the `-instance` suffix.
///
/// # Errors
///
/// Returns [`Error::EncodeOverflow`](crate::Error::EncodeOverflow) if the
/// result would exceed [`MAX_FILENAME_LEN`].
pub fn encode_filename(data_dir: &str, sample: &Sample) -> Result<String> {
    let mut name = String::with_capacity(64);

    if !data_dir.is_empty() {
        name.push_str(data_dir);
        name.push('/');
    }
    name.push_str(&sample.host);
    name.push('/');
    name.push_str(&sample.plugin);
    if !sample.plugin_instance.is_empty() {
        name.push('-');
        name.push_str(&sample.plugin_instance);
    }
    name.push('/');
    name.push_str(&sample.type_name);
    if !sample.type_instance.is_empty() {
        name.push('-');
        name.push_str(&sample.type_instance);
    }
    name.push_str(".rrd");

    ensure!(
        name.len() < MAX_FILENAME_LEN,
        EncodeOverflowSnafu {
            what: "filename",
            target: format!("{}/{}", sample.host, sample.plugin),
            limit: MAX_FILENAME_LEN,
            len: name.len(),
        }
    );

    Ok(name)
}

/// Reconstruct the filename for a host-supplied relative identifier, using
/// the same `{data_dir/}{identifier}.rrd` rule as [`encode_filename`].
pub(crate) fn identifier_filename(data_dir: &str, identifier: &str) -> String {
    if data_dir.is_empty() {
        format!("{identifier}.rrd")
    } else {
        format!("{data_dir}/{identifier}.rrd")
    }
}

/// Encode a sample into the `time:v0:v1:…` update token consumed by the
/// RRD library.
///
/// Counters and absolutes render as unsigned decimal, derives as signed
/// decimal, gauges in default floating-point form with NaN mapped to the
/// RRD unknown marker `U`.
///
/// # Errors
///
/// - [`Error::SchemaMismatch`](crate::Error::SchemaMismatch) if the
///   sample's type name, value count, or a value's kind disagrees with the
///   schema.
/// - [`Error::UnsupportedType`](crate::Error::UnsupportedType) if the
///   schema declares a kind other than counter or gauge.
/// - [`Error::EncodeOverflow`](crate::Error::EncodeOverflow) if the token
///   would exceed [`MAX_UPDATE_LEN`].
pub fn encode_update(schema: &TypeSchema, sample: &Sample) -> Result<String> {
    ensure!(
        schema.name == sample.type_name,
        SchemaMismatchSnafu {
            expected: schema.name.clone(),
            got: sample.type_name.clone(),
        }
    );
    ensure!(
        schema.sources.len() == sample.values.len(),
        SchemaMismatchSnafu {
            expected: format!("{} values", schema.sources.len()),
            got: format!("{} values", sample.values.len()),
        }
    );

    let mut token = sample.time.to_string();

    for (source, value) in schema.sources.iter().zip(&sample.values) {
        ensure!(
            matches!(source.kind, ValueKind::Counter | ValueKind::Gauge),
            UnsupportedTypeSnafu {
                name: source.name.clone(),
                kind: source.kind,
            }
        );
        ensure!(
            value.kind() == source.kind,
            SchemaMismatchSnafu {
                expected: format!("{:?} for {}", source.kind, source.name),
                got: format!("{:?}", value.kind()),
            }
        );

        token.push(':');
        match value {
            Value::Counter(v) => token.push_str(&v.to_string()),
            Value::Gauge(v) if v.is_nan() => token.push('U'),
            Value::Gauge(v) => token.push_str(&v.to_string()),
            // Unreachable: the kind checks above only admit counter/gauge.
            Value::Derive(v) => token.push_str(&v.to_string()),
            Value::Absolute(v) => token.push_str(&v.to_string()),
        }
    }

    ensure!(
        token.len() < MAX_UPDATE_LEN,
        EncodeOverflowSnafu {
            what: "update token",
            target: format!("{}/{}", sample.host, sample.plugin),
            limit: MAX_UPDATE_LEN,
            len: token.len(),
        }
    );

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, sample::DataSource};

    fn gauge_schema() -> TypeSchema {
        TypeSchema::new("cpu", vec![DataSource::new("value", ValueKind::Gauge)])
    }

    fn sample(time: i64, values: Vec<Value>) -> Sample {
        Sample {
            time,
            host: "h".to_string(),
            plugin: "cpu".to_string(),
            plugin_instance: String::new(),
            type_name: "cpu".to_string(),
            type_instance: String::new(),
            values,
        }
    }

    #[test]
    fn test_filename_without_instances() {
        let s = sample(100, vec![Value::Gauge(1.0)]);
        let name = encode_filename("/var/lib/rrd", &s).unwrap();
        assert_eq!(name, "/var/lib/rrd/h/cpu/cpu.rrd");
    }

    #[test]
    fn test_filename_with_instances() {
        let mut s = sample(100, vec![Value::Gauge(1.0)]);
        s.plugin_instance = "0".to_string();
        s.type_instance = "idle".to_string();
        let name = encode_filename("/var/lib/rrd", &s).unwrap();
        assert_eq!(name, "/var/lib/rrd/h/cpu-0/cpu-idle.rrd");
    }

    #[test]
    fn test_filename_empty_data_dir() {
        let s = sample(100, vec![Value::Gauge(1.0)]);
        let name = encode_filename("", &s).unwrap();
        assert_eq!(name, "h/cpu/cpu.rrd");
    }

    #[test]
    fn test_filename_is_deterministic() {
        let s = sample(100, vec![Value::Gauge(1.0)]);
        let a = encode_filename("/data", &s).unwrap();
        let b = encode_filename("/data", &s.clone()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_filename_overflow() {
        let mut s = sample(100, vec![Value::Gauge(1.0)]);
        s.host = "h".repeat(600);
        let err = encode_filename("/var/lib/rrd", &s).unwrap_err();
        assert!(matches!(err, Error::EncodeOverflow { .. }));
    }

    #[test]
    fn test_identifier_filename() {
        assert_eq!(
            identifier_filename("/var/lib/rrd", "h/cpu/cpu"),
            "/var/lib/rrd/h/cpu/cpu.rrd"
        );
        assert_eq!(identifier_filename("", "h/cpu/cpu"), "h/cpu/cpu.rrd");
    }

    #[test]
    fn test_update_gauge() {
        let token = encode_update(&gauge_schema(), &sample(100, vec![Value::Gauge(0.5)]))
            .unwrap();
        assert_eq!(token, "100:0.5");
    }

    #[test]
    fn test_update_gauge_whole_number() {
        let token = encode_update(&gauge_schema(), &sample(100, vec![Value::Gauge(42.0)]))
            .unwrap();
        assert_eq!(token, "100:42");
    }

    #[test]
    fn test_update_gauge_nan_renders_unknown() {
        let token =
            encode_update(&gauge_schema(), &sample(100, vec![Value::Gauge(f64::NAN)]))
                .unwrap();
        assert_eq!(token, "100:U");
    }

    #[test]
    fn test_update_multiple_counters() {
        let schema = TypeSchema::new(
            "if_octets",
            vec![
                DataSource::new("rx", ValueKind::Counter),
                DataSource::new("tx", ValueKind::Counter),
            ],
        );
        let mut s = sample(200, vec![Value::Counter(10), Value::Counter(u64::MAX)]);
        s.type_name = "if_octets".to_string();
        let token = encode_update(&schema, &s).unwrap();
        assert_eq!(token, format!("200:10:{}", u64::MAX));
    }

    #[test]
    fn test_update_round_trips() {
        let schema = TypeSchema::new(
            "mixed",
            vec![
                DataSource::new("c", ValueKind::Counter),
                DataSource::new("g", ValueKind::Gauge),
            ],
        );
        let mut s = sample(
            300,
            vec![Value::Counter(18_446_744_073_709_551_615), Value::Gauge(0.1)],
        );
        s.type_name = "mixed".to_string();

        let token = encode_update(&schema, &s).unwrap();
        let parts: Vec<&str> = token.split(':').collect();
        assert_eq!(parts[0].parse::<i64>().unwrap(), 300);
        assert_eq!(parts[1].parse::<u64>().unwrap(), 18_446_744_073_709_551_615);
        // Rust's default float formatting is shortest-round-trip, so the
        // gauge parses back bit-exactly.
        assert_eq!(parts[2].parse::<f64>().unwrap().to_bits(), 0.1f64.to_bits());
    }

    #[test]
    fn test_update_rejects_wrong_type_name() {
        let mut s = sample(100, vec![Value::Gauge(1.0)]);
        s.type_name = "memory".to_string();
        let err = encode_update(&gauge_schema(), &s).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_update_rejects_arity_mismatch() {
        let s = sample(100, vec![Value::Gauge(1.0), Value::Gauge(2.0)]);
        let err = encode_update(&gauge_schema(), &s).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_update_rejects_kind_mismatch() {
        let s = sample(100, vec![Value::Counter(1)]);
        let err = encode_update(&gauge_schema(), &s).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_update_rejects_unsupported_kind() {
        let schema =
            TypeSchema::new("cpu", vec![DataSource::new("value", ValueKind::Derive)]);
        let s = sample(100, vec![Value::Derive(5)]);
        let err = encode_update(&schema, &s).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { .. }));
    }

    #[test]
    fn test_update_overflow() {
        let sources = (0..100)
            .map(|i| DataSource::new(format!("v{i}"), ValueKind::Counter))
            .collect();
        let schema = TypeSchema::new("cpu", sources);
        let s = sample(100, vec![Value::Counter(u64::MAX); 100]);
        let err = encode_update(&schema, &s).unwrap_err();
        assert!(matches!(err, Error::EncodeOverflow { .. }));
    }
}
