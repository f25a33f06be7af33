//! Snapshot payload projection.
//!
//! A projection decides which part of a document ends up in a snapshot.
//! Field names may be dotted paths (`address.city`) reaching into nested
//! objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Document, Payload};

/// Renders the payload stored in a snapshot.
pub trait Projector: Send + Sync {
    /// Project a document into a snapshot payload.
    fn project(&self, document: &Document) -> Payload;
}

impl<F> Projector for F
where
    F: Fn(&Document) -> Payload + Send + Sync,
{
    fn project(&self, document: &Document) -> Payload {
        self(document)
    }
}

/// Built-in projection modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", content = "fields", rename_all = "snake_case")]
pub enum Projection {
    /// Copy every field.
    #[default]
    Full,
    /// Copy only the listed fields.
    Include(Vec<String>),
    /// Copy everything except the listed fields.
    Exclude(Vec<String>),
}

impl Projection {
    /// Project a field map.
    pub fn apply(&self, fields: &Payload) -> Payload {
        match self {
            Projection::Full => fields.clone(),
            Projection::Include(paths) => {
                let mut out = Payload::new();
                for path in paths {
                    let parts: Vec<&str> = path.split('.').collect();
                    if let Some(value) = lookup(fields, &parts) {
                        insert_at(&mut out, &parts, value.clone());
                    }
                }
                out
            }
            Projection::Exclude(paths) => {
                let mut out = fields.clone();
                for path in paths {
                    let parts: Vec<&str> = path.split('.').collect();
                    remove_at(&mut out, &parts);
                }
                out
            }
        }
    }
}

impl Projector for Projection {
    fn project(&self, document: &Document) -> Payload {
        self.apply(&document.fields)
    }
}

fn lookup<'a>(map: &'a Payload, parts: &[&str]) -> Option<&'a Value> {
    let (first, rest) = parts.split_first()?;
    let value = map.get(*first)?;
    if rest.is_empty() {
        return Some(value);
    }
    match value {
        Value::Object(inner) => lookup(inner, rest),
        _ => None,
    }
}

fn insert_at(map: &mut Payload, parts: &[&str], value: Value) {
    let Some((first, rest)) = parts.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(first.to_string(), value);
        return;
    }
    let entry = map
        .entry(first.to_string())
        .or_insert_with(|| Value::Object(Payload::new()));
    if !entry.is_object() {
        *entry = Value::Object(Payload::new());
    }
    if let Value::Object(inner) = entry {
        insert_at(inner, rest, value);
    }
}

fn remove_at(map: &mut Payload, parts: &[&str]) {
    let Some((first, rest)) = parts.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.remove(*first);
        return;
    }
    if let Some(Value::Object(inner)) = map.get_mut(*first) {
        remove_at(inner, rest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        Document::new("d1")
            .with_field("name", "Alice")
            .with_field("password", "secret")
            .with_field("address", json!({"city": "Oslo", "zip": "0150"}))
    }

    #[test]
    fn test_full_copies_everything() {
        let doc = sample();
        assert_eq!(Projection::Full.project(&doc), doc.fields);
    }

    #[test]
    fn test_include_keeps_listed_paths() {
        let projection = Projection::Include(vec!["name".into(), "address.city".into(), "missing".into()]);
        let out = projection.project(&sample());

        assert_eq!(
            Value::Object(out),
            json!({"name": "Alice", "address": {"city": "Oslo"}})
        );
    }

    #[test]
    fn test_exclude_drops_listed_paths() {
        let projection = Projection::Exclude(vec!["password".into(), "address.zip".into()]);
        let out = projection.project(&sample());

        assert_eq!(
            Value::Object(out),
            json!({"name": "Alice", "address": {"city": "Oslo"}})
        );
    }

    #[test]
    fn test_closure_projector() {
        let projector = |doc: &Document| {
            let mut out = Payload::new();
            out.insert("id_len".to_string(), json!(doc.id.len()));
            out
        };
        let out = Projector::project(&projector, &sample());
        assert_eq!(out.get("id_len"), Some(&json!(2)));
    }

    #[test]
    fn test_projection_serde_shape() {
        let projection: Projection =
            serde_json::from_value(json!({"mode": "exclude", "fields": ["password"]})).unwrap();
        assert_eq!(projection, Projection::Exclude(vec!["password".to_string()]));

        let full: Projection = serde_json::from_value(json!({"mode": "full"})).unwrap();
        assert_eq!(full, Projection::Full);
    }
}
