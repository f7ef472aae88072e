use crate::path::{Key, Path};
use crate::tree::{array_slot, coerce, ensure_array, ensure_object, ContainerKind};
use serde_json::Value;
use tracing::debug;

/// Where a path ends up: the slot holding the whole value (empty path), or a
/// key inside a parent container.
#[derive(Debug)]
pub enum Leaf<'a> {
    Root(&'a mut Value),
    /// `parent` is already the container kind that `key` selects into.
    Entry { parent: &'a mut Value, key: &'a Key },
}

/// Walk every key of `path` but the last, creating containers as needed, and
/// return the leaf.
///
/// Each slot on the way is coerced to the container kind the next key needs
/// (array for an index, object for a name). A slot holding anything else is
/// replaced with an empty container, so a write along a path that conflicts
/// with existing data silently discards that data at the conflict point.
///
/// Returns `None` when an intermediate key is a negative index, or an index
/// further past the end of its array than
/// [`MAX_ARRAY_GAP`](crate::tree::MAX_ARRAY_GAP) allows: there is no slot
/// for it, and nothing below it is created.
pub fn navigate<'a>(root: &'a mut Value, path: &'a Path) -> Option<Leaf<'a>> {
    let (last, init) = match path.split_last() {
        Some(split) => split,
        None => return Some(Leaf::Root(root)),
    };

    let mut current = root;
    for key in init {
        current = descend(current, key)?;
    }

    coerce(current, ContainerKind::for_key(last));
    Some(Leaf::Entry {
        parent: current,
        key: last,
    })
}

/// Coerce `slot` for `key` and step into the child, creating it as `null`.
fn descend<'a>(slot: &'a mut Value, key: &Key) -> Option<&'a mut Value> {
    match key {
        Key::Name(name) => Some(
            ensure_object(slot)
                .entry(name.clone())
                .or_insert(Value::Null),
        ),
        Key::Index(idx) => {
            let items = ensure_array(slot);
            match usize::try_from(*idx) {
                Ok(idx) => {
                    let slot = array_slot(items, idx);
                    if slot.is_none() {
                        debug!("index {} is too far past the end of the array, write discarded", idx);
                    }
                    slot
                }
                Err(_) => {
                    debug!("negative index {} on the way to a leaf, write discarded", idx);
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::resolve_dotted;
    use serde_json::json;

    fn parent_of(root: &mut Value, path: &str) -> Value {
        let path = resolve_dotted(path);
        match navigate(root, &path) {
            Some(Leaf::Entry { parent, .. }) => parent.clone(),
            other => panic!("expected an entry leaf, got {:?}", other),
        }
    }

    #[test]
    fn creates_mappings_for_names() {
        let mut root = json!({});
        assert_eq!(parent_of(&mut root, "a.b.c"), json!({}));
        assert_eq!(root, json!({ "a": { "b": {} } }));
    }

    #[test]
    fn creates_sequences_for_indices() {
        let mut root = json!({});
        parent_of(&mut root, "a.1.b");
        assert_eq!(root, json!({ "a": [null, {}] }));
    }

    #[test]
    fn leaf_parent_is_coerced_to_key_kind() {
        let mut root = json!({ "a": "scalar" });
        assert_eq!(parent_of(&mut root, "a.0"), json!([]));
        assert_eq!(root, json!({ "a": [] }));
    }

    #[test]
    fn wrong_kind_container_is_replaced() {
        let mut root = json!({ "a": [1, 2], "keep": true });
        parent_of(&mut root, "a.x.y");
        assert_eq!(root, json!({ "a": { "x": {} }, "keep": true }));
    }

    #[test]
    fn root_is_coerced_too() {
        let mut root = json!(7);
        parent_of(&mut root, "0");
        assert_eq!(root, json!([]));
    }

    #[test]
    fn empty_path_is_root_leaf() {
        let mut root = json!({ "a": 1 });
        let path = Path::root();
        assert!(matches!(navigate(&mut root, &path), Some(Leaf::Root(_))));
    }

    #[test]
    fn negative_intermediate_index_discards() {
        let mut root = json!({ "a": [1] });
        let path = resolve_dotted("a.-1.b");
        assert!(navigate(&mut root, &path).is_none());
        assert_eq!(root, json!({ "a": [1] }));
    }

    #[test]
    fn far_intermediate_index_discards() {
        let mut root = json!({ "a": [1] });
        let path = resolve_dotted("a.9223372036854775807.b");
        assert!(navigate(&mut root, &path).is_none());
        assert_eq!(root, json!({ "a": [1] }));
    }
}
