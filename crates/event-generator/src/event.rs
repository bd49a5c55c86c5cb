//! The structured event produced by every generator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field injected into events when hotkey mitigation is enabled.
pub const HOTKEY_FIELD: &str = "hotkeyId";

/// Inclusive range of the injected hotkey id.
pub const HOTKEY_RANGE: std::ops::RangeInclusive<i64> = 1..=50;

/// One generated event: a JSON object keyed by schema field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build an event from any serializable record.
    ///
    /// Returns `None` when the record does not serialize to a JSON object.
    pub fn from_record<T: Serialize>(record: &T) -> Option<Self> {
        match serde_json::to_value(record).ok()? {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Look up a top-level field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Look up a nested field by a dotted path such as `State.Amount`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// The injected hotkey id, if present.
    pub fn hotkey_id(&self) -> Option<i64> {
        self.0.get(HOTKEY_FIELD).and_then(Value::as_i64)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.0)
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
