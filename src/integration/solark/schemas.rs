//! Raw plant data payload wrapper.
use serde_json::{Map, Value};

/// A single raw plant data object as returned by the cloud API.
///
/// Field names and numeric encodings vary between firmware generations,
/// so accessors tolerate both numbers and numeric strings.
#[derive(Debug, Clone, Default)]
pub struct RawReading(Map<String, Value>);

impl RawReading {
    pub fn new(map: Map<String, Value>) -> Self {
        RawReading(map)
    }

    /// Wrap a JSON value when it is an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned().map(RawReading)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Read a numeric field, accepting numbers and numeric strings.
    pub fn f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// First present numeric value among alias keys.
    pub fn first_f64(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|key| self.f64(key))
    }
}
