//! The update-variable action: clear selected paths of a stored value, merge
//! new data over it and write it back to the variable store.

use crate::error::ActionError;
use crate::leaf::LeafOp;
use crate::merge::{deep_assign, DeepAssign};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::map::Entry;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::{debug, trace};

/// Values by data-element identifier. Owned by the host; the action only
/// reads and replaces the entry it is asked about.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableStore {
    values: Map<String, Value>,
}

/// The handle an action holds on its store. Actions on one store are
/// assumed never to run concurrently, so there is no lock.
pub type SharedStore = Rc<RefCell<VariableStore>>;

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.values.get_mut(id)
    }

    /// Store `value` under `id` and return the stored value.
    pub fn put(&mut self, id: &str, value: Value) -> &mut Value {
        match self.values.entry(id) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(value);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(value),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Value> {
        self.values.remove(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl From<Map<String, Value>> for VariableStore {
    fn from(values: Map<String, Value>) -> Self {
        VariableStore { values }
    }
}

/// What to do to a path before the merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub clear: bool,
}

/// Hook run on the freshly stored value, with the triggering event.
pub type CustomCode = Box<dyn Fn(&mut Value, &Value)>;

/// The action's settings payload, as saved by the extension view.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVariableSettings {
    #[serde(default)]
    pub data: Value,
    pub data_element_id: String,
    /// In payload order.
    #[serde(default, deserialize_with = "ordered_transforms")]
    pub transforms: Vec<(String, Transform)>,
    #[serde(skip)]
    pub custom_code: Option<CustomCode>,
}

impl UpdateVariableSettings {
    pub fn new(data_element_id: impl Into<String>) -> Self {
        UpdateVariableSettings {
            data_element_id: data_element_id.into(),
            ..Default::default()
        }
    }

    pub fn from_json(payload: &str) -> Result<Self, ActionError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_transform(mut self, path: impl Into<String>, clear: bool) -> Self {
        self.transforms.push((path.into(), Transform { clear }));
        self
    }

    pub fn with_custom_code(mut self, hook: impl Fn(&mut Value, &Value) + 'static) -> Self {
        self.custom_code = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for UpdateVariableSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateVariableSettings")
            .field("data", &self.data)
            .field("data_element_id", &self.data_element_id)
            .field("transforms", &self.transforms)
            .field("custom_code", &self.custom_code.is_some())
            .finish()
    }
}

fn ordered_transforms<'de, D>(deserializer: D) -> Result<Vec<(String, Transform)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TransformsVisitor;

    impl<'de> Visitor<'de> for TransformsVisitor {
        type Value = Vec<(String, Transform)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map from path to transform")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut transforms = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, Transform>()? {
                transforms.push(entry);
            }
            Ok(transforms)
        }
    }

    deserializer.deserialize_any(TransformsVisitor)
}

/// The update-variable action bound to a store.
pub struct UpdateVariable {
    store: SharedStore,
    deep_assign: DeepAssign,
}

impl UpdateVariable {
    pub fn new(store: SharedStore) -> Self {
        UpdateVariable {
            store,
            deep_assign,
        }
    }

    /// Use a different object-form merge.
    pub fn with_deep_assign(mut self, deep_assign: DeepAssign) -> Self {
        self.deep_assign = deep_assign;
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Apply `settings` to the store.
    ///
    /// The previous value (or `{}`) has every `clear` transform applied in
    /// order, then `data` is merged over it into a fresh object and the
    /// result is stored. The custom-code hook then runs on the stored value
    /// itself and may change it; it must not touch the store. A bad
    /// transform path fails the call before anything is written.
    pub fn run(&self, settings: &UpdateVariableSettings, event: &Value) -> Result<(), ActionError> {
        let id = settings.data_element_id.as_str();
        let previous = self
            .store
            .borrow()
            .get(id)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let mut existing = Some(previous);
        for (path, transform) in &settings.transforms {
            if !transform.clear {
                continue;
            }
            debug!(data_element = id, path = path.as_str(), "clearing before merge");
            existing = LeafOp::Delete.apply(existing, path)?;
        }

        let mut next = Value::Object(Map::new());
        let mut sources: Vec<&Value> = Vec::with_capacity(2);
        if let Some(existing) = &existing {
            sources.push(existing);
        }
        sources.push(&settings.data);
        (self.deep_assign)(&mut next, &sources)?;

        let mut store = self.store.borrow_mut();
        let stored = store.put(id, next);
        if let Some(hook) = &settings.custom_code {
            trace!(data_element = id, "running custom code");
            hook(&mut *stored, event);
        }
        rename_legacy_audience_manager(stored);
        Ok(())
    }

    /// [`run`](Self::run) in the host's promise shape. The future is already
    /// complete when returned; nothing the hook starts is awaited.
    pub fn invoke(
        &self,
        settings: &UpdateVariableSettings,
        event: &Value,
    ) -> Ready<Result<(), ActionError>> {
        ready(self.run(settings, event))
    }
}

/// Downstream readers expect `__adobe.audiencemanager`; older payloads
/// wrote `audienceManager`.
fn rename_legacy_audience_manager(value: &mut Value) {
    let Some(adobe) = value.get_mut("__adobe").and_then(Value::as_object_mut) else {
        return;
    };
    if let Some(audience_manager) = adobe.remove("audienceManager") {
        debug!("renaming __adobe.audienceManager to __adobe.audiencemanager");
        adobe.insert("audiencemanager".to_string(), audience_manager);
    }
}
