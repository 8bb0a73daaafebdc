//! Decoded register and advertisement values.
//!
//! A [`Record`] is an ordered name → value mapping produced by decoding a
//! payload against a schema. Scaled fields keep their raw integer and
//! divisor instead of collapsing to a binary float, so `27.93` really is
//! `2793 / 100` and round-trips exactly.

use std::fmt;

/// An exact fixed-point quantity: a raw integer and its decimal divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaled {
    pub raw: i64,
    /// One of 10, 100 or 1000.
    pub divisor: u32,
}

impl Scaled {
    /// Approximate value for callers that want a plain float.
    pub fn to_f64(self) -> f64 {
        self.raw as f64 / f64::from(self.divisor)
    }
}

impl fmt::Display for Scaled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.divisor.ilog10() as usize;
        let divisor = u64::from(self.divisor);
        let magnitude = self.raw.unsigned_abs();
        let sign = if self.raw < 0 { "-" } else { "" };
        write!(
            f,
            "{sign}{}.{:0digits$}",
            magnitude / divisor,
            magnitude % divisor,
        )
    }
}

/// A single decoded field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Unscaled field (divisor 1).
    Int(i64),
    /// Scaled field, exact decimal.
    Scaled(Scaled),
}

impl Value {
    /// The raw wire integer, before any scaling.
    pub fn raw(&self) -> i64 {
        match self {
            Value::Int(v) => *v,
            Value::Scaled(s) => s.raw,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Int(v) => *v as f64,
            Value::Scaled(s) => s.to_f64(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Scaled(s) => write!(f, "{s}"),
        }
    }
}

/// An ordered mapping from field name to decoded value.
///
/// Field order follows the schema the record was decoded with. Reserved
/// padding never appears here.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: &'static str,
    fields: Vec<(&'static str, Value)>,
}

impl Record {
    pub(crate) fn new(schema: &'static str) -> Self {
        Record {
            schema,
            fields: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: &'static str, value: Value) {
        self.fields.push((name, value));
    }

    /// Name of the schema this record was decoded with.
    pub fn schema(&self) -> &'static str {
        self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Raw wire integer of a field, before scaling.
    pub fn raw(&self, name: &str) -> Option<i64> {
        self.get(name).map(Value::raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge `other` into this record, field-name union.
    ///
    /// Fields present in both (the `type` and `seq` headers of split
    /// advertisement halves) take the value from `other`; fields only in
    /// `other` are appended in order. The schema label of `other` wins,
    /// marking the merged cycle.
    pub(crate) fn merge(&mut self, other: Record) {
        self.schema = other.schema;
        for (name, value) in other.fields {
            match self.fields.iter_mut().find(|(field, _)| *field == name) {
                Some((_, slot)) => *slot = value,
                None => self.fields.push((name, value)),
            }
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema)?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, ")")
    }
}

/// Identification strings from the device information register (0x180a).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: String,
    pub serial_number: String,
    pub firmware_revision: String,
    pub hardware_revision: String,
    pub manufacturer: String,
}
