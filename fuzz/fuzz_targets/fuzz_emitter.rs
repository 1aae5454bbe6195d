//! Fuzz target: state serializer and HCL emitter
//!
//! Builds resource attributes from structured input, serializes them into
//! an event stream and emits HCL from it.
//!
//! Targets:
//! - Unbalanced begin/end events
//! - Panics on odd keys (empty, quotes, multi-byte UTF-8)
//! - Invalid HCL produced from valid attributes

#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Map, Value as JsonValue};

use cfn2tf_core::emitter::emit_resource;
use cfn2tf_core::schema::ProviderSchema;
use cfn2tf_core::serializer::serialize_resource;
use cfn2tf_core::traits::TraitRegistry;
use cfn2tf_core::value::Value;

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null,
    Bool(bool),
    Number(i64),
    Str(String),
    List(Vec<FuzzValue>),
    Object(Vec<(String, FuzzValue)>),
}

impl FuzzValue {
    fn to_json(&self, depth: usize) -> JsonValue {
        if depth > 8 {
            return JsonValue::Null;
        }
        match self {
            FuzzValue::Null => JsonValue::Null,
            FuzzValue::Bool(b) => json!(b),
            FuzzValue::Number(n) => json!(n),
            FuzzValue::Str(s) => json!(s),
            FuzzValue::List(items) => items.iter().take(32).map(|v| v.to_json(depth + 1)).collect(),
            FuzzValue::Object(fields) => {
                let map: Map<String, JsonValue> =
                    fields.iter().take(32).map(|(k, v)| (k.clone(), v.to_json(depth + 1))).collect();
                JsonValue::Object(map)
            }
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    resource_type: u8,
    attributes: Vec<(String, FuzzValue)>,
}

const TYPES: &[&str] = &["aws_s3_bucket", "aws_security_group", "aws_dynamodb_table", "aws_iam_role"];

fuzz_target!(|input: FuzzInput| {
    let Ok(registry) = TraitRegistry::builtin() else {
        return;
    };
    let resource_type = TYPES[input.resource_type as usize % TYPES.len()];
    let traits = registry.get_traits(resource_type);
    let schema = ProviderSchema::default().resource_schema(resource_type);

    let map: Map<String, JsonValue> = input
        .attributes
        .iter()
        .take(64)
        .map(|(k, v)| (k.clone(), v.to_json(0)))
        .collect();
    let value = Value::from(JsonValue::Object(map));

    let events = serialize_resource(resource_type, "Fuzz", &value, &traits, &schema);
    if let Ok(text) = emit_resource(&traits, events) {
        assert!(text.starts_with("resource \""));
    }
});
