//! Attribute trees: provider state values, possibly carrying references.

use serde_json::Value as JsonValue;

use crate::path::AttributePath;
use crate::reference::Reference;

/// A node in a resource's attribute tree.
///
/// Built from provider state JSON. The dependency resolver swaps literal
/// values for [`Value::Reference`] and expands JSON-encoded strings into
/// [`Value::Document`] so the emitter can write them structurally.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    /// Object with keys in source order.
    Object(Vec<(String, Value)>),
    /// A rendered Terraform expression.
    Reference(Reference),
    /// An embedded JSON document (policy etc.) that was a string in state.
    Document(Box<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Looks up a key of an object value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Looks up a nested value by path. Numeric segments index lists.
    pub fn get_path(&self, path: &AttributePath) -> Option<&Value> {
        let mut current = self;
        for segment in path.segments() {
            current = match current {
                Value::Object(_) => current.get(segment)?,
                Value::List(items) => items.get(segment.parse::<usize>().ok()?)?,
                Value::Document(inner) => match inner.as_ref() {
                    Value::List(items) => items.get(segment.parse::<usize>().ok()?)?,
                    other => other.get(segment)?,
                },
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns true if this is a list whose elements are all objects.
    pub fn is_object_list(&self) -> bool {
        match self {
            Value::List(items) => {
                !items.is_empty() && items.iter().all(|i| matches!(i, Value::Object(_)))
            }
            _ => false,
        }
    }

    /// Converts back to plain JSON. References become their expression text.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Reference(r) => JsonValue::String(r.expression()),
            Value::Document(inner) => inner.to_json(),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

/// Parses a string that holds a JSON object or array.
///
/// Returns `None` for anything else, including JSON scalars, so plain
/// strings such as `"true"` or `"42"` are never mistaken for documents.
pub fn json_document(text: &str) -> Option<JsonValue> {
    let first = text.trim_start().chars().next()?;
    if first != '{' && first != '[' {
        return None;
    }
    match serde_json::from_str::<JsonValue>(text) {
        Ok(doc @ (JsonValue::Object(_) | JsonValue::Array(_))) => Some(doc),
        _ => None,
    }
}
