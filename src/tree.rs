use crate::path::Key;
use serde_json::{Map, Value};
use tracing::trace;

/// The two container shapes a path can walk through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Mapping,
    Sequence,
}

impl ContainerKind {
    /// The container a key selects into: indices need a sequence, names a
    /// mapping.
    pub fn for_key(key: &Key) -> Self {
        match key {
            Key::Index(_) => ContainerKind::Sequence,
            Key::Name(_) => ContainerKind::Mapping,
        }
    }

    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Object(_) => Some(ContainerKind::Mapping),
            Value::Array(_) => Some(ContainerKind::Sequence),
            _ => None,
        }
    }

    pub fn empty(self) -> Value {
        match self {
            ContainerKind::Mapping => Value::Object(Map::new()),
            ContainerKind::Sequence => Value::Array(Vec::new()),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ContainerKind::Mapping => "object",
            ContainerKind::Sequence => "array",
        }
    }
}

/// Short name of a value's JSON type, for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Replace `slot` with an empty container of `kind` unless it already is one.
/// Whatever was there before is discarded.
pub fn coerce(slot: &mut Value, kind: ContainerKind) {
    if ContainerKind::of(slot) != Some(kind) {
        if !slot.is_null() {
            trace!(
                "replacing {} with empty {}",
                type_name(slot),
                kind.describe()
            );
        }
        *slot = kind.empty();
    }
}

/// Get or create the mapping at `slot`.
pub fn ensure_object(slot: &mut Value) -> &mut Map<String, Value> {
    coerce(slot, ContainerKind::Mapping);
    match slot {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Get or create the sequence at `slot`.
pub fn ensure_array(slot: &mut Value) -> &mut Vec<Value> {
    coerce(slot, ContainerKind::Sequence);
    match slot {
        Value::Array(items) => items,
        _ => unreachable!(),
    }
}

/// Writes must land fewer than this many slots past the end of an array.
pub const MAX_ARRAY_GAP: usize = 1 << 16;

/// Slot `idx` of `items`, padding with `null` up to it.
///
/// `None` when reaching `idx` would pad past [`MAX_ARRAY_GAP`] or the
/// padding cannot be allocated; `items` is left as it was.
pub fn array_slot(items: &mut Vec<Value>, idx: usize) -> Option<&mut Value> {
    if items.len() <= idx {
        let gap = idx - items.len();
        if gap >= MAX_ARRAY_GAP {
            return None;
        }
        items.try_reserve(gap + 1).ok()?;
        items.resize(idx + 1, Value::Null);
    }
    items.get_mut(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_slot_pads_with_null() {
        let mut items = vec![json!(1)];
        *array_slot(&mut items, 3).unwrap() = json!(4);
        assert_eq!(items, vec![json!(1), Value::Null, Value::Null, json!(4)]);
        assert_eq!(array_slot(&mut items, 0), Some(&mut json!(1)));
    }

    #[test]
    fn array_slot_refuses_far_indices() {
        let mut items = vec![json!(1)];
        assert!(array_slot(&mut items, MAX_ARRAY_GAP + 1).is_none());
        assert!(array_slot(&mut items, usize::MAX).is_none());
        assert_eq!(items, vec![json!(1)]);
        assert!(array_slot(&mut items, MAX_ARRAY_GAP).is_some());
        assert_eq!(items.len(), MAX_ARRAY_GAP + 1);
    }
}
