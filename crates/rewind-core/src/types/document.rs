//! Versioned document type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Payload;

/// A persisted entity whose mutations are tracked.
///
/// `is_new` is in-memory state only: it is true until the first successful
/// save and false for documents loaded from a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Entity identifier.
    pub id: String,
    /// Entity fields.
    #[serde(default)]
    pub fields: Payload,
    #[serde(skip)]
    is_new: bool,
}

impl Document {
    /// Create a new, unsaved document with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Payload::new(),
            is_new: true,
        }
    }

    /// Create a new, unsaved document with a random UUID id.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Rebuild a document that already exists in a store.
    pub fn loaded(id: impl Into<String>, fields: Payload) -> Self {
        Self {
            id: id.into(),
            fields,
            is_new: false,
        }
    }

    /// Builder: set a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Get a field value.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// Get a field value as a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    /// Set a field value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Remove a field.
    pub fn unset(&mut self, key: &str) -> Option<serde_json::Value> {
        self.fields.remove(key)
    }

    /// Overwrite fields with the values in `payload`, one field at a time.
    ///
    /// Fields not named in the payload keep their current value.
    pub fn apply_payload(&mut self, payload: &Payload) {
        for (key, value) in payload {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Whether the document has never been saved.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Record that the document now exists in its store.
    pub fn mark_persisted(&mut self) {
        self.is_new = false;
    }
}
