//! Deep assign, in two independent forms: along a dotted path, and by
//! merging whole source objects into a target.

use crate::error::PathError;
use crate::tree::{array_slot, ensure_object, type_name};
use serde_json::{Map, Value};
use tracing::debug;

/// Signature of an object-form merge, so callers can be handed one.
pub type DeepAssign = for<'t> fn(&'t mut Value, &[&Value]) -> Result<&'t mut Value, PathError>;

/// Assign `value` at a dotted `path` inside `target`.
///
/// Every segment is a mapping key, numeric or not; non-mapping values on the
/// way are replaced with `{}`. An empty segment ends the walk and the slot
/// reached so far takes `value`, so `""` replaces `target` outright.
pub fn deep_assign_path(target: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    if target.is_null() {
        return Err(PathError::type_mismatch(
            path,
            "cannot assign a path into a null target".to_string(),
        ));
    }

    let mut segments = path.split('.').peekable();
    if segments.peek().map_or(false, |s| !s.is_empty()) && !target.is_object() {
        return Err(PathError::type_mismatch(
            path,
            format!("cannot assign a path into a {} target", type_name(target)),
        ));
    }

    let mut slot = target;
    for segment in segments {
        if segment.is_empty() {
            break;
        }
        slot = ensure_object(slot)
            .entry(segment)
            .or_insert(Value::Null);
    }
    *slot = value;
    Ok(())
}

/// Merge `sources` into `target`, left to right.
///
/// For each entry of a source: when the target and source values are both
/// objects they are merged key by key; otherwise the source value replaces
/// the target's outright (arrays included). `null` and scalar sources add
/// nothing. A scalar target becomes `{}` first; a `null` target is an error.
/// On an array target, mapping keys further past the end than
/// [`MAX_ARRAY_GAP`](crate::tree::MAX_ARRAY_GAP) are skipped.
pub fn deep_assign<'t>(target: &'t mut Value, sources: &[&Value]) -> Result<&'t mut Value, PathError> {
    if target.is_null() {
        return Err(PathError::type_mismatch(
            "",
            "cannot merge into a null target".to_string(),
        ));
    }
    if !target.is_object() && !target.is_array() {
        debug!("merge target is a {}, starting from an empty object", type_name(target));
        *target = Value::Object(Map::new());
    }

    for source in sources {
        assign_entries(target, source);
    }
    Ok(target)
}

fn assign_entries(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(into), Value::Object(from)) => {
            for (key, value) in from {
                merge_slot(into.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (Value::Object(into), Value::Array(from)) => {
            for (idx, value) in from.iter().enumerate() {
                merge_slot(into.entry(idx.to_string()).or_insert(Value::Null), value);
            }
        }
        (Value::Array(into), Value::Array(from)) => {
            for (idx, value) in from.iter().enumerate() {
                if let Some(slot) = array_slot(into, idx) {
                    merge_slot(slot, value);
                }
            }
        }
        // Only index-like keys have a place on an array.
        (Value::Array(into), Value::Object(from)) => {
            for (key, value) in from {
                let Some(idx) = canonical_index(key) else {
                    continue;
                };
                match array_slot(into, idx) {
                    Some(slot) => merge_slot(slot, value),
                    None => debug!("merge key {} is too far past the end of the array, skipped", key),
                }
            }
        }
        _ => {}
    }
}

fn merge_slot(slot: &mut Value, value: &Value) {
    if slot.is_object() && value.is_object() {
        assign_entries(slot, value);
    } else {
        *slot = value.clone();
    }
}

/// `"3"` is an index, `"03"` and `"-1"` are not.
fn canonical_index(key: &str) -> Option<usize> {
    let idx = key.parse::<usize>().ok()?;
    (idx.to_string() == key).then_some(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_form_creates_mappings() {
        let mut target = json!({});
        deep_assign_path(&mut target, "a.b.c", json!(1)).unwrap();
        assert_eq!(target, json!({ "a": { "b": { "c": 1 } } }));
    }

    #[test]
    fn path_form_numeric_segments_are_keys() {
        let mut target = json!({});
        deep_assign_path(&mut target, "a.0.b", json!(1)).unwrap();
        assert_eq!(target, json!({ "a": { "0": { "b": 1 } } }));
    }

    #[test]
    fn path_form_keeps_existing_siblings() {
        let mut target = json!({ "a": { "x": 1 }, "y": 2 });
        deep_assign_path(&mut target, "a.z", json!(3)).unwrap();
        assert_eq!(target, json!({ "a": { "x": 1, "z": 3 }, "y": 2 }));
    }

    #[test]
    fn path_form_replaces_scalars_on_the_way() {
        let mut target = json!({ "a": 5 });
        deep_assign_path(&mut target, "a.b", json!(1)).unwrap();
        assert_eq!(target, json!({ "a": { "b": 1 } }));
    }

    #[test]
    fn path_form_empty_segment_is_terminal() {
        let mut target = json!({ "a": 1 });
        deep_assign_path(&mut target, "", json!("all")).unwrap();
        assert_eq!(target, json!("all"));

        let mut target = json!({});
        deep_assign_path(&mut target, "a..b", json!(1)).unwrap();
        assert_eq!(target, json!({ "a": 1 }));
    }

    #[test]
    fn path_form_null_target_fails() {
        let mut target = Value::Null;
        assert!(deep_assign_path(&mut target, "a", json!(1)).is_err());
        let mut target = json!(3);
        assert!(deep_assign_path(&mut target, "a", json!(1)).is_err());
    }

    #[test]
    fn merge_keeps_siblings() {
        let mut target = json!({ "a": "a", "b": "b" });
        deep_assign(&mut target, &[&json!({ "c": "c" })]).unwrap();
        assert_eq!(target, json!({ "a": "a", "b": "b", "c": "c" }));
    }

    #[test]
    fn merge_recurses_into_objects() {
        let mut target = json!({ "a": { "b": { "c": 3 } }, "e": 5 });
        deep_assign(&mut target, &[&json!({ "a": { "b": { "d": 4 } } })]).unwrap();
        assert_eq!(target, json!({ "a": { "b": { "c": 3, "d": 4 } }, "e": 5 }));
    }

    #[test]
    fn merge_replaces_arrays() {
        let mut target = json!({ "list": [1, 2, 3] });
        deep_assign(&mut target, &[&json!({ "list": [9] })]).unwrap();
        assert_eq!(target, json!({ "list": [9] }));
    }

    #[test]
    fn merge_kind_change_replaces() {
        let mut target = json!({ "a": { "x": 1 } });
        deep_assign(&mut target, &[&json!({ "a": [1] })]).unwrap();
        assert_eq!(target, json!({ "a": [1] }));
        deep_assign(&mut target, &[&json!({ "a": { "y": 2 } })]).unwrap();
        assert_eq!(target, json!({ "a": { "y": 2 } }));
    }

    #[test]
    fn merge_sources_apply_left_to_right() {
        let mut target = json!({});
        let first = json!({ "a": 1, "b": { "c": 1 } });
        let second = json!({ "a": 2, "b": { "d": 2 } });
        deep_assign(&mut target, &[&first, &second]).unwrap();
        assert_eq!(target, json!({ "a": 2, "b": { "c": 1, "d": 2 } }));
    }

    #[test]
    fn merge_is_idempotent() {
        let a = json!({ "x": { "y": [1, { "z": 2 }] }, "w": "s" });
        let mut target = json!({});
        deep_assign(&mut target, &[&a, &a]).unwrap();
        assert_eq!(target, a);
    }

    #[test]
    fn merge_does_not_alias_sources() {
        let source = json!({ "a": { "b": 1 } });
        let mut target = json!({});
        deep_assign(&mut target, &[&source]).unwrap();
        target["a"]["b"] = json!(2);
        assert_eq!(source, json!({ "a": { "b": 1 } }));
    }

    #[test]
    fn merge_null_target_fails() {
        let mut target = Value::Null;
        let err = deep_assign(&mut target, &[&json!({ "a": 1 })]).unwrap_err();
        assert_eq!(err.code(), "path-type-mismatch");
    }

    #[test]
    fn merge_scalar_target_becomes_object() {
        let mut target = json!(true);
        deep_assign(&mut target, &[&json!({ "a": 1 })]).unwrap();
        assert_eq!(target, json!({ "a": 1 }));
    }

    #[test]
    fn merge_null_and_scalar_sources_add_nothing() {
        let mut target = json!({ "a": 1 });
        deep_assign(&mut target, &[&Value::Null, &json!(4), &json!("str")]).unwrap();
        assert_eq!(target, json!({ "a": 1 }));
    }

    #[test]
    fn merge_array_target_index_wise() {
        let mut target = json!([1, { "a": 1 }]);
        deep_assign(&mut target, &[&json!([null, { "b": 2 }, 3])]).unwrap();
        assert_eq!(target, json!([null, { "a": 1, "b": 2 }, 3]));

        let mut target = json!([1]);
        deep_assign(&mut target, &[&json!({ "2": "x", "02": "no", "name": "no" })]).unwrap();
        assert_eq!(target, json!([1, null, "x"]));
    }

    #[test]
    fn merge_as_injected_fn() {
        let merge: DeepAssign = deep_assign;
        let mut target = json!({});
        merge(&mut target, &[&json!({ "k": 1 })]).unwrap();
        assert_eq!(target, json!({ "k": 1 }));
    }
}
