//! The template `Mappings` section as a `locals` block.
//!
//! `Fn::FindInMap` renders to a traversal of `local.mappings`, so the
//! section is written verbatim as one nested object.


use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::text::{format_number, object_key, quote};

/// Writes `locals { mappings = { ... } }`.
pub struct MappingSectionEmitter<'a> {
    mappings: &'a JsonMap<String, JsonValue>,
}

impl<'a> MappingSectionEmitter<'a> {
    pub fn new(mappings: &'a JsonMap<String, JsonValue>) -> Self {
        MappingSectionEmitter { mappings }
    }

    /// The block text, or an empty string when there are no mappings.
    pub fn emit(&self) -> String {
        if self.mappings.is_empty() {
            return String::new();
        }
        let mut w = String::from("locals {\n  mappings = ");
        write_object(&mut w, self.mappings, 1);
        w.push_str("\n}\n\n");
        w
    }
}

fn write_value(w: &mut String, value: &JsonValue, level: usize) {
    match value {
        JsonValue::Null => w.push_str("null"),
        JsonValue::Bool(b) => w.push_str(&b.to_string()),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => w.push_str(&format_number(f)),
            _ => w.push_str(&n.to_string()),
        },
        JsonValue::String(s) => w.push_str(&quote(s)),
        JsonValue::Array(items) => {
            if items.is_empty() {
                w.push_str("[]");
                return;
            }
            w.push_str("[\n");
            for item in items {
                w.push_str(&"  ".repeat(level + 1));
                write_value(w, item, level + 1);
                w.push_str(",\n");
            }
            w.push_str(&"  ".repeat(level));
            w.push(']');
        }
        JsonValue::Object(map) => write_object(w, map, level),
    }
}

fn write_object(w: &mut String, map: &JsonMap<String, JsonValue>, level: usize) {
    if map.is_empty() {
        w.push_str("{}");
        return;
    }
    w.push_str("{\n");
    for (key, value) in map {
        w.push_str(&format!("{}{} = ", "  ".repeat(level + 1), object_key(key)));
        write_value(w, value, level + 1);
        w.push('\n');
    }
    w.push_str(&"  ".repeat(level));
    w.push('}');
}
