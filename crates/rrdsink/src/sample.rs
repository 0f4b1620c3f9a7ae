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

//! Sample and type schema definitions.
//!
//! A [`Sample`] is a single time-stamped observation for one metric
//! identity (host, plugin, type, instances). Its values are interpreted
//! against a [`TypeSchema`] that names each value slot and fixes its kind.
//! The write path rejects samples whose type name or value layout disagrees
//! with the schema.

/// A single metric value.
///
/// Only counters and gauges can be rendered into RRD update tokens; the
/// other kinds exist so schemas from the wider ecosystem can be represented
/// and rejected with a precise error instead of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Monotonically increasing unsigned counter.
    Counter(u64),
    /// Instantaneous reading.
    Gauge(f64),
    /// Signed rate-of-change counter.
    Derive(i64),
    /// Counter that resets on every read.
    Absolute(u64),
}

impl Value {
    /// The kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Counter(_) => ValueKind::Counter,
            Self::Gauge(_) => ValueKind::Gauge,
            Self::Derive(_) => ValueKind::Derive,
            Self::Absolute(_) => ValueKind::Absolute,
        }
    }
}

/// The kind of a value slot, as declared by a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Counter,
    Gauge,
    Derive,
    Absolute,
}

/// One named value slot of a type schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    /// Slot name, e.g. `value` or `rx`.
    pub name: String,
    /// Declared kind; samples must carry a matching value in this slot.
    pub kind: ValueKind,
}

impl DataSource {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A type schema: the named, ordered value slots of one metric type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    /// Type name; must equal the `type_name` of every sample encoded
    /// against this schema.
    pub name:    String,
    /// Ordered value slots.
    pub sources: Vec<DataSource>,
}

impl TypeSchema {
    pub fn new(name: impl Into<String>, sources: Vec<DataSource>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }
}

/// A time-stamped observation for one metric identity.
///
/// Empty `plugin_instance` / `type_instance` strings mean "no instance" and
/// suppress the `-instance` filename suffix entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Wall-clock timestamp in unix seconds.
    pub time:            i64,
    /// Originating host.
    pub host:            String,
    /// Plugin that produced the sample.
    pub plugin:          String,
    /// Optional plugin instance ("" for none).
    pub plugin_instance: String,
    /// Type name, resolved against a [`TypeSchema`].
    pub type_name:       String,
    /// Optional type instance ("" for none).
    pub type_instance:   String,
    /// Ordered values, one per schema data source.
    pub values:          Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind() {
        assert_eq!(Value::Counter(1).kind(), ValueKind::Counter);
        assert_eq!(Value::Gauge(1.5).kind(), ValueKind::Gauge);
        assert_eq!(Value::Derive(-3).kind(), ValueKind::Derive);
        assert_eq!(Value::Absolute(7).kind(), ValueKind::Absolute);
    }

    #[test]
    fn test_schema_construction() {
        let schema = TypeSchema::new(
            "if_octets",
            vec![
                DataSource::new("rx", ValueKind::Counter),
                DataSource::new("tx", ValueKind::Counter),
            ],
        );
        assert_eq!(schema.name, "if_octets");
        assert_eq!(schema.sources.len(), 2);
        assert_eq!(schema.sources[0].name, "rx");
    }
}
