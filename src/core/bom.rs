//! Bill of Materials records as returned by the model
//!
//! Records are kept as generic JSON objects. The model is only asked (not
//! forced) to follow the `id`/`part_name`/`quantity`/`description` shape, so
//! partial or over-complete records must survive untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields the prompt asks the model to produce, in display order
pub const EXPECTED_FIELDS: &[&str] = &["id", "part_name", "quantity", "description"];

/// One extracted BOM line item
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartRecord {
    fields: Map<String, Value>,
}

impl PartRecord {
    /// Build a record from any JSON element of the reply array.
    ///
    /// Objects are taken as-is; anything else lands under a `value` key so
    /// it still shows up in the table.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            other => {
                let mut fields = Map::new();
                fields.insert("value".to_string(), other);
                Self { fields }
            }
        }
    }

    /// Callout identifier from the diagram
    pub fn id(&self) -> Option<String> {
        self.fields.get("id").and_then(scalar_text)
    }

    pub fn part_name(&self) -> Option<&str> {
        self.fields.get("part_name").and_then(Value::as_str)
    }

    /// Part count, accepting integral floats and numeric strings
    pub fn quantity(&self) -> Option<i64> {
        match self.fields.get("quantity")? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.fields.get("description").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Keys in the order the model emitted them
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Render a scalar JSON value as text (strings unquoted)
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Ordered parts list from one extraction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BomResult {
    parts: Vec<PartRecord>,
}

impl BomResult {
    pub fn parts(&self) -> &[PartRecord] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// An empty result is a valid "no parts found" outcome, not an error
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Sum of all parseable quantities; `None` if the sum overflows
    pub fn total_quantity(&self) -> Option<i64> {
        self.parts
            .iter()
            .filter_map(PartRecord::quantity)
            .try_fold(0i64, i64::checked_add)
    }
}

impl FromIterator<PartRecord> for BomResult {
    fn from_iter<I: IntoIterator<Item = PartRecord>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}
