//! Set, delete and push at the end of a path, on top of [`navigate`].
//!
//! Roots are taken and returned by value. `None` stands for an undefined
//! root, which is what deleting the empty path leaves behind. Intermediate
//! data that is in the way is coerced, never reported.

use crate::error::PathError;
use crate::navigator::{navigate, Leaf};
use crate::path::{Key, Path};
use crate::tree::{array_slot, ensure_array, ensure_object};
use serde_json::Value;
use tracing::debug;

/// Assign a copy of `value` at `path`. The empty path replaces the root.
pub fn set_value(root: Option<Value>, path: &Path, value: &Value) -> Option<Value> {
    let mut root = root.unwrap_or(Value::Null);
    match navigate(&mut root, path) {
        Some(Leaf::Root(slot)) => *slot = value.clone(),
        Some(Leaf::Entry { parent, key }) => {
            if let Some(slot) = child_slot(parent, key) {
                *slot = value.clone();
            }
        }
        None => {}
    }
    Some(root)
}

/// Remove the leaf at `path`.
///
/// In an array the element is spliced out and later elements shift left; a
/// negative index counts from the end and is clamped to 0. In an object the
/// key is removed. The empty path deletes the whole value.
pub fn delete_path(root: Option<Value>, path: &Path) -> Option<Value> {
    let mut root = root.unwrap_or(Value::Null);
    match navigate(&mut root, path) {
        Some(Leaf::Root(_)) => return None,
        Some(Leaf::Entry { parent, key }) => match key {
            Key::Index(idx) => {
                let items = ensure_array(parent);
                let idx = normalize_index(*idx, items.len());
                if idx < items.len() {
                    items.remove(idx);
                }
            }
            Key::Name(name) => {
                ensure_object(parent).remove(name);
            }
        },
        None => {}
    }
    Some(root)
}

/// Make the leaf at `path` an array (coercing whatever is there) and append
/// one `null` placeholder.
pub fn push_undefined_path(root: Option<Value>, path: &Path) -> Option<Value> {
    let mut root = root.unwrap_or(Value::Null);
    let slot = match navigate(&mut root, path) {
        Some(Leaf::Root(slot)) => Some(slot),
        Some(Leaf::Entry { parent, key }) => child_slot(parent, key),
        None => None,
    };
    if let Some(slot) = slot {
        ensure_array(slot).push(Value::Null);
    }
    Some(root)
}

/// `idx + len` for negative positions, never below 0.
pub fn normalize_index(idx: i64, len: usize) -> usize {
    if idx >= 0 {
        return usize::try_from(idx).unwrap_or(usize::MAX);
    }
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    usize::try_from(idx.saturating_add(len)).unwrap_or(0)
}

/// The slot `key` names inside an already-coerced `parent`.
fn child_slot<'a>(parent: &'a mut Value, key: &Key) -> Option<&'a mut Value> {
    match key {
        Key::Name(name) => Some(
            ensure_object(parent)
                .entry(name.clone())
                .or_insert(Value::Null),
        ),
        Key::Index(idx) => match usize::try_from(*idx) {
            Ok(idx) => {
                let slot = array_slot(ensure_array(parent), idx);
                if slot.is_none() {
                    debug!("index {} is too far past the end of the array, write discarded", idx);
                }
                slot
            }
            Err(_) => {
                debug!("negative index {} at leaf, write discarded", idx);
                None
            }
        },
    }
}

/// A leaf operation bound to its argument, applied to string paths.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafOp {
    Set(Value),
    Delete,
    PushUndefined,
}

impl LeafOp {
    /// Parse `path` (dot or bracket form) and apply the operation.
    pub fn apply(&self, root: Option<Value>, path: &str) -> Result<Option<Value>, PathError> {
        let path = Path::parse(path)?;
        Ok(self.apply_path(root, &path))
    }

    pub fn apply_path(&self, root: Option<Value>, path: &Path) -> Option<Value> {
        match self {
            LeafOp::Set(value) => set_value(root, path, value),
            LeafOp::Delete => delete_path(root, path),
            LeafOp::PushUndefined => push_undefined_path(root, path),
        }
    }
}
