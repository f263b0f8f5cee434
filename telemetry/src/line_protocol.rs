//! Line protocol rendering.
//!
//! A line is `measurement[,tag=value...] field=value[,field=value...] timestamp`.
//! Tags and fields keep insertion order so output is stable for a given record.

use indexmap::IndexMap;
use std::fmt;

/// A typed field value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{i}i"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    if matches!(c, '"' | '\\') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
            FieldValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// One measurement line.
///
/// A line needs at least one field and float fields must be finite, otherwise
/// it renders to something the upstream rejects. Both are checked in debug
/// builds.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementLine {
    measurement: String,
    tags: IndexMap<String, String>,
    fields: IndexMap<String, FieldValue>,
    timestamp: i64,
}

impl MeasurementLine {
    pub fn new(measurement: impl Into<String>, timestamp: i64) -> Self {
        Self {
            measurement: measurement.into(),
            tags: IndexMap::new(),
            fields: IndexMap::new(),
            timestamp,
        }
    }

    /// Adds a tag, replacing any earlier value for the same key.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds a field, replacing any earlier value for the same key.
    pub fn field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        debug_assert!(
            !matches!(value, FieldValue::Float(v) if !v.is_finite()),
            "line protocol floats must be finite"
        );
        self.fields.insert(key.into(), value);
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn get_field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl fmt::Display for MeasurementLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_assert!(!self.fields.is_empty(), "line has no fields");
        write_escaped(f, &self.measurement, &[',', ' '])?;

        for (key, value) in &self.tags {
            f.write_str(",")?;
            write_escaped(f, key, &[',', '=', ' '])?;
            f.write_str("=")?;
            write_escaped(f, value, &[',', '=', ' '])?;
        }

        let mut separator = " ";
        for (key, value) in &self.fields {
            f.write_str(separator)?;
            write_escaped(f, key, &[',', '=', ' '])?;
            write!(f, "={value}")?;
            separator = ",";
        }

        write!(f, " {}", self.timestamp)
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str, special: &[char]) -> fmt::Result {
    for c in s.chars() {
        if special.contains(&c) {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

/// Joins lines into an upstream request body, one line per row.
pub fn to_payload(lines: &[MeasurementLine]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
