//! Shuttle values between a flat settings object, keyed by whole path
//! strings (`{"cookie.name": "x"}`), and nested form state
//! (`{"cookie": {"name": "x"}}`).

use crate::error::PathError;
use crate::form;
use serde_json::{Map, Value};

/// Build nested form state from the `fields` present in `settings`.
pub fn to_form_state(settings: &Value, fields: &[&str]) -> Result<Value, PathError> {
    let mut state = Value::Object(Map::new());
    for field in fields {
        if let Some(value) = settings.get(*field) {
            form::set_value(&mut state, field, value.clone())?;
        }
    }
    Ok(state)
}

/// Flatten `fields` out of nested form state. Absent and `null` fields are
/// left out of the result.
pub fn from_form_state(state: &Value, fields: &[&str]) -> Result<Value, PathError> {
    let mut settings = Map::new();
    for field in fields {
        match form::get_value(state, field)? {
            None | Some(Value::Null) => {}
            Some(value) => {
                settings.insert(field.to_string(), value.clone());
            }
        }
    }
    Ok(Value::Object(settings))
}
