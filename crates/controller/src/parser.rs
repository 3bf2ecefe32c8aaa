//! Parser module for stage outputs.
//!
//! Converts the model's JSON into typed stage records, tolerating the small
//! deviations models commonly make (numeric ids, missing optional fields).

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize a stage output, reporting the first shape mismatch.
pub fn parse_output<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    if !value.is_object() {
        return Err("expected a JSON object".to_string());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Turn numeric `id` fields of every item in `value[field]` into strings.
pub fn stringify_ids(value: &mut Value, field: &str) {
    let Some(items) = value.get_mut(field).and_then(Value::as_array_mut) else {
        return;
    };
    for item in items {
        if let Some(id) = item.get_mut("id") {
            if let Value::Number(n) = id {
                *id = Value::String(n.to_string());
            }
        }
    }
}
