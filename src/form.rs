//! Get/set-by-path for form state.
//!
//! One recursive-descent walk over the bracket grammar (`a[0].b`) drives a
//! [`PathRules`] implementation as it consumes the path text; reading and
//! writing differ only in their rules. Unlike the leaf operations, this
//! engine never coerces: a value of the wrong kind in the way is an error.

use crate::error::PathError;
use crate::parser::Parser;
use crate::tree::{array_slot, type_name, MAX_ARRAY_GAP};
use serde_json::{Map, Value};

/// Where in the path a rule is being applied, for error messages.
#[derive(Debug, Clone, Copy)]
pub struct Site<'p> {
    pub path: &'p str,
    /// Path text up to and including the current key.
    pub at: &'p str,
}

impl Site<'_> {
    pub fn mismatch(&self, expected: &str, found: &Value) -> PathError {
        PathError::type_mismatch(
            self.path,
            format!("expected {} at '{}', found {}", expected, self.at, type_name(found)),
        )
    }

    fn index_too_far(&self, index: usize) -> PathError {
        PathError::type_mismatch(
            self.path,
            format!(
                "array index {} at '{}' is too far past the end (limit {})",
                index, self.at, MAX_ARRAY_GAP
            ),
        )
    }

    fn negative_index(&self, index: i64) -> PathError {
        PathError::type_mismatch(
            self.path,
            format!("negative array index {} at '{}'", index, self.at),
        )
    }
}

/// The callbacks the walk threads through. `Slot` is what each step hands
/// to the next (a container, or the place a container should be).
pub trait PathRules<'a> {
    type Slot;
    type Output;

    /// Step from `slot` into its property `key`.
    fn on_object_property(
        &mut self,
        slot: Self::Slot,
        key: &str,
        site: Site<'_>,
    ) -> Result<Self::Slot, PathError>;

    /// Step from `slot` into its element `index`.
    fn on_array_property(
        &mut self,
        slot: Self::Slot,
        index: i64,
        site: Site<'_>,
    ) -> Result<Self::Slot, PathError>;

    /// The path is exhausted; `slot` is the leaf.
    fn on_final_value(&mut self, slot: Self::Slot) -> Result<Self::Output, PathError>;
}

/// Read-only rules. Absent or `null` steps read as `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GetRules;

impl<'a> PathRules<'a> for GetRules {
    type Slot = Option<&'a Value>;
    type Output = Option<&'a Value>;

    fn on_object_property(
        &mut self,
        slot: Self::Slot,
        key: &str,
        site: Site<'_>,
    ) -> Result<Self::Slot, PathError> {
        match slot {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(map.get(key)),
            Some(other) => Err(site.mismatch("an object", other)),
        }
    }

    fn on_array_property(
        &mut self,
        slot: Self::Slot,
        index: i64,
        site: Site<'_>,
    ) -> Result<Self::Slot, PathError> {
        let index = usize::try_from(index).map_err(|_| site.negative_index(index))?;
        match slot {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(items.get(index)),
            Some(other) => Err(site.mismatch("an array", other)),
        }
    }

    fn on_final_value(&mut self, slot: Self::Slot) -> Result<Self::Output, PathError> {
        Ok(slot)
    }
}

/// Rules that create missing containers and hand back the leaf slot,
/// leaving whatever is already there.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnsureRules;

impl<'a> PathRules<'a> for EnsureRules {
    type Slot = &'a mut Value;
    type Output = &'a mut Value;

    fn on_object_property(
        &mut self,
        slot: Self::Slot,
        key: &str,
        site: Site<'_>,
    ) -> Result<Self::Slot, PathError> {
        object_entry(slot, key, site)
    }

    fn on_array_property(
        &mut self,
        slot: Self::Slot,
        index: i64,
        site: Site<'_>,
    ) -> Result<Self::Slot, PathError> {
        array_entry(slot, index, site)
    }

    fn on_final_value(&mut self, slot: Self::Slot) -> Result<Self::Output, PathError> {
        Ok(slot)
    }
}

/// Rules that create missing containers and store a value at the leaf.
#[derive(Debug, Clone)]
pub struct SetRules {
    value: Option<Value>,
}

impl SetRules {
    pub fn new(value: Value) -> Self {
        SetRules { value: Some(value) }
    }
}

impl<'a> PathRules<'a> for SetRules {
    type Slot = &'a mut Value;
    type Output = ();

    fn on_object_property(
        &mut self,
        slot: Self::Slot,
        key: &str,
        site: Site<'_>,
    ) -> Result<Self::Slot, PathError> {
        object_entry(slot, key, site)
    }

    fn on_array_property(
        &mut self,
        slot: Self::Slot,
        index: i64,
        site: Site<'_>,
    ) -> Result<Self::Slot, PathError> {
        array_entry(slot, index, site)
    }

    fn on_final_value(&mut self, slot: Self::Slot) -> Result<Self::Output, PathError> {
        *slot = self.value.take().unwrap_or(Value::Null);
        Ok(())
    }
}

fn object_entry<'a>(slot: &'a mut Value, key: &str, site: Site<'_>) -> Result<&'a mut Value, PathError> {
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => Ok(map.entry(key).or_insert(Value::Null)),
        other => Err(site.mismatch("an object", other)),
    }
}

fn array_entry<'a>(slot: &'a mut Value, index: i64, site: Site<'_>) -> Result<&'a mut Value, PathError> {
    let index = usize::try_from(index).map_err(|_| site.negative_index(index))?;
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => array_slot(items, index).ok_or_else(|| site.index_too_far(index)),
        other => Err(site.mismatch("an array", other)),
    }
}

// ── Walk ────────────────────────────────────────────────────────────

/// Drive `rules` along `path`, starting from `root`. The empty path goes
/// straight to `on_final_value`.
pub fn walk<'a, R: PathRules<'a>>(
    path: &str,
    rules: &mut R,
    root: R::Slot,
) -> Result<R::Output, PathError> {
    let mut parser = Parser::new(path);
    if parser.at_end() {
        return rules.on_final_value(root);
    }
    walk_name(&mut parser, rules, root)
}

fn site<'p>(parser: &Parser<'p>) -> Site<'p> {
    Site {
        path: parser.input(),
        at: parser.consumed(),
    }
}

fn walk_name<'a, R: PathRules<'a>>(
    parser: &mut Parser<'_>,
    rules: &mut R,
    slot: R::Slot,
) -> Result<R::Output, PathError> {
    let id = parser.parse_identifier()?;
    let child = rules.on_object_property(slot, &id, site(parser))?;
    walk_name_tail(parser, rules, child)
}

fn walk_name_tail<'a, R: PathRules<'a>>(
    parser: &mut Parser<'_>,
    rules: &mut R,
    slot: R::Slot,
) -> Result<R::Output, PathError> {
    match parser.peek_char() {
        Some('[') => {
            parser.expect_char('[')?;
            let index = parser.parse_index()?;
            parser.expect_char(']')?;
            let child = rules.on_array_property(slot, index, site(parser))?;
            walk_name_tail(parser, rules, child)
        }
        Some('.') => {
            parser.expect_char('.')?;
            walk_name(parser, rules, slot)
        }
        None => rules.on_final_value(slot),
        Some(_) => Err(parser.unexpected("'[', '.' or end of path")),
    }
}

// ── Operations ──────────────────────────────────────────────────────

/// Read the value at `path`. `Ok(None)` when any step is absent.
pub fn get_value<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>, PathError> {
    walk(path, &mut GetRules, Some(root))
}

/// Store `value` at `path`, creating containers through `null` or absent
/// slots. The empty path replaces `root`.
pub fn set_value(root: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    walk(path, &mut SetRules::new(value), root)
}

/// Create the containers along `path` and return the leaf slot (`null` if
/// it did not exist).
pub fn ensure_path<'a>(root: &'a mut Value, path: &str) -> Result<&'a mut Value, PathError> {
    walk(path, &mut EnsureRules, root)
}
