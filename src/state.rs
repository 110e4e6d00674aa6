//! The per-instance attribute store handed to resource operations.

use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Attribute values of one resource instance plus its identifier.
///
/// Built from the state or configuration sent by the host before an operation
/// and turned back into state afterwards. An empty identifier after an
/// operation means the remote object no longer exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: String,
    values: Map<String, Value>,
}

impl ResourceData {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON object. `null` yields an empty store.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        let mut values = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProviderError::InvalidRequest(format!(
                    "expected state object, got {}",
                    other
                )))
            },
        };
        let id = match values.remove("id") {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Ok(Self { id, values })
    }

    /// Build a store for an imported object.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Map::new(),
        }
    }

    /// The remote identifier, empty when unset.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the remote identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Forget the identifier, signalling that the object is gone.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Whether the store still refers to a remote object.
    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }

    /// Raw value of an attribute. `null` counts as unset.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Store a raw value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Convert into the state returned to the host, `null` when the object is gone.
    pub fn into_state(self) -> Value {
        if self.id.is_empty() {
            return Value::Null;
        }
        let mut values = self.values;
        values.insert("id".to_string(), Value::String(self.id));
        Value::Object(values)
    }
}
