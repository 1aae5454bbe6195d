//! Attribute tree to event stream.
//!
//! Each key of a resource's attribute tree is classified into an
//! [`AttributeShape`] from the trait table and the provider schema, which
//! decides whether it is written as `key = value` or as one or more
//! blocks. Embedded JSON documents are expanded into their own events so
//! they come out as `jsonencode({...})` rather than an escaped string.
//!
//! The serializer makes no emission decisions; suppression, defaults and
//! conflict handling happen in the emitter, which can see the whole value.

use crate::events::{AttributeShape, BalanceError, HclEvent, MappingKey, Scalar};
use crate::path::AttributePath;
use crate::queue::QueueError;
use crate::schema::{ProviderSchema, ResourceSchema};
use crate::state::StateFile;
use crate::traits::{ResourceTraits, TraitRegistry};
use crate::value::{json_document, Value};

/// Failure turning a resource's events into text.
///
/// Every variant names the resource it happened in; the rest of the
/// batch is unaffected.
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("{address}: expected {expected}, got {got}")]
    UnexpectedEvent {
        address: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("{address}: {source}")]
    Unbalanced {
        address: String,
        source: BalanceError,
    },
    #[error("{address}: {source}")]
    Queue {
        address: String,
        source: QueueError,
    },
}

impl SerializerError {
    pub fn address(&self) -> &str {
        match self {
            SerializerError::UnexpectedEvent { address, .. }
            | SerializerError::Unbalanced { address, .. }
            | SerializerError::Queue { address, .. } => address,
        }
    }
}

/// Walks one resource's attribute tree.
pub struct AttributeSerializer<'a> {
    traits: &'a ResourceTraits,
    schema: &'a ResourceSchema,
    events: Vec<HclEvent>,
}

impl<'a> AttributeSerializer<'a> {
    pub fn new(traits: &'a ResourceTraits, schema: &'a ResourceSchema) -> Self {
        AttributeSerializer {
            traits,
            schema,
            events: Vec::new(),
        }
    }

    /// Produces the events for `resource "{resource_type}" "{name}"`.
    pub fn serialize(mut self, resource_type: &str, name: &str, attributes: &Value) -> Vec<HclEvent> {
        self.events.push(HclEvent::ResourceStart {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
        });
        match attributes {
            Value::Object(entries) => self.object_body(&AttributePath::root(), entries),
            Value::Null => self.object_body(&AttributePath::root(), &[]),
            _ => log::warn!(
                "{}.{}: attributes are not an object, writing an empty body",
                resource_type,
                name
            ),
        }
        self.events.push(HclEvent::ResourceEnd);
        self.events
    }

    /// Writes the keys of a resource or block body, then any required
    /// keys the body lacks with a null value.
    fn object_body(&mut self, path: &AttributePath, entries: &[(String, Value)]) {
        for (key, value) in entries {
            self.attribute(&path.child(key), key, value);
        }
        for name in self.missing_required(path, entries) {
            let child = path.child(&name);
            let mut key = self.mapping_key(&name, &child, AttributeShape::Value);
            key.required = true;
            self.events.push(HclEvent::MappingKey(key));
            self.events.push(HclEvent::ScalarValue(Scalar::Null));
        }
    }

    fn missing_required(&self, path: &AttributePath, entries: &[(String, Value)]) -> Vec<String> {
        let mut missing = Vec::new();
        for pattern in &self.traits.required_attributes {
            let required = AttributePath::parse(pattern);
            if required.depth() != path.depth() + 1 || required.name().contains('*') {
                continue;
            }
            let parent = required.segments()[..path.depth()].join(".");
            let name = required.name();
            if path.is_like(&parent)
                && !entries.iter().any(|(k, _)| k == name)
                && !missing.iter().any(|m| m == name)
            {
                missing.push(name.to_string());
            }
        }
        missing
    }

    fn mapping_key(&self, name: &str, path: &AttributePath, shape: AttributeShape) -> MappingKey {
        let schema = self.schema.attribute_by_path(path);
        MappingKey {
            name: name.to_string(),
            path: path.clone(),
            shape,
            computed_only: schema.is_computed_only(),
            required: schema.required,
            conflicts_with: schema.conflicts_with,
        }
    }

    /// Decides how the value at `path` is written.
    pub fn classify(&self, path: &AttributePath, value: &Value) -> AttributeShape {
        let schema = self.schema.attribute_by_path(path);
        match value {
            Value::List(items) => {
                if self.traits.is_non_block_type(path) {
                    AttributeShape::Sequence
                } else if self.traits.is_repeated_block(path) {
                    AttributeShape::BlockList
                } else if schema.is_block() && items.iter().all(|i| matches!(i, Value::Object(_))) {
                    AttributeShape::BlockList
                } else if schema.missing && value.is_object_list() {
                    AttributeShape::BlockList
                } else {
                    AttributeShape::Sequence
                }
            }
            Value::Object(_) => {
                if self.traits.is_non_block_type(path) || schema.is_map() {
                    AttributeShape::Mapping
                } else if self.traits.is_block_object(path) || schema.is_block() {
                    AttributeShape::BlockObject
                } else {
                    AttributeShape::Mapping
                }
            }
            _ => AttributeShape::Value,
        }
    }

    fn attribute(&mut self, path: &AttributePath, name: &str, value: &Value) {
        let shape = self.classify(path, value);
        let key = self.mapping_key(name, path, shape);
        self.events.push(HclEvent::MappingKey(key));

        match (shape, value) {
            (AttributeShape::BlockList, Value::List(items)) => {
                self.events.push(HclEvent::SequenceStart);
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(entries) => {
                            self.events.push(HclEvent::BlockStart {
                                name: name.to_string(),
                            });
                            self.object_body(&path.index(i), entries);
                            self.events.push(HclEvent::BlockEnd);
                        }
                        other => {
                            log::warn!("{}[{}]: block element is not an object, skipped", path, i);
                            self.events.push(HclEvent::Comment(format!(
                                "{}[{}] skipped: {}",
                                name,
                                i,
                                other.to_json()
                            )));
                        }
                    }
                }
                self.events.push(HclEvent::SequenceEnd);
            }
            (AttributeShape::BlockObject, Value::Object(entries)) => {
                self.events.push(HclEvent::BlockStart {
                    name: name.to_string(),
                });
                self.object_body(path, entries);
                self.events.push(HclEvent::BlockEnd);
            }
            _ => self.value(path, value),
        }
    }

    /// Writes a value in attribute position.
    fn value(&mut self, path: &AttributePath, value: &Value) {
        match value {
            Value::Null => self.events.push(HclEvent::ScalarValue(Scalar::Null)),
            Value::Bool(b) => self.events.push(HclEvent::ScalarValue(Scalar::Bool(*b))),
            Value::Number(n) => self.events.push(HclEvent::ScalarValue(Scalar::Number(n.clone()))),
            Value::Reference(r) => self.events.push(HclEvent::ScalarValue(Scalar::Reference(r.clone()))),
            Value::String(s) => match json_document(s) {
                Some(doc) => self.document(path, &Value::from(doc)),
                None => self.events.push(HclEvent::ScalarValue(Scalar::String(s.clone()))),
            },
            Value::Document(inner) => self.document(path, inner),
            Value::List(items) => {
                self.events.push(HclEvent::SequenceStart);
                for (i, item) in items.iter().enumerate() {
                    self.value(&path.index(i), item);
                }
                self.events.push(HclEvent::SequenceEnd);
            }
            Value::Object(entries) => {
                self.events.push(HclEvent::MappingStart);
                for (key, item) in entries {
                    let child = path.child(key);
                    let shape = match item {
                        Value::List(_) => AttributeShape::Sequence,
                        Value::Object(_) => AttributeShape::Mapping,
                        _ => AttributeShape::Value,
                    };
                    let mut mapping_key = self.mapping_key(key, &child, shape);
                    // Map keys are data, not attributes.
                    mapping_key.computed_only = false;
                    self.events.push(HclEvent::MappingKey(mapping_key));
                    self.value(&child, item);
                }
                self.events.push(HclEvent::MappingEnd);
            }
        }
    }

    fn document(&mut self, path: &AttributePath, doc: &Value) {
        self.events.push(HclEvent::JsonStart);
        self.json_value(path, doc);
        self.events.push(HclEvent::JsonEnd);
    }

    /// Writes a JSON document value. Nothing inside is classified against
    /// the schema and strings are never re-parsed.
    fn json_value(&mut self, path: &AttributePath, value: &Value) {
        match value {
            Value::List(items) => {
                self.events.push(HclEvent::SequenceStart);
                for (i, item) in items.iter().enumerate() {
                    self.json_value(&path.index(i), item);
                }
                self.events.push(HclEvent::SequenceEnd);
            }
            Value::Object(entries) => {
                self.events.push(HclEvent::MappingStart);
                for (key, item) in entries {
                    let shape = match item {
                        Value::List(_) => AttributeShape::Sequence,
                        Value::Object(_) => AttributeShape::Mapping,
                        _ => AttributeShape::Value,
                    };
                    let child = path.child(key);
                    self.events
                        .push(HclEvent::MappingKey(MappingKey::new(key.as_str(), child.clone(), shape)));
                    self.json_value(&child, item);
                }
                self.events.push(HclEvent::MappingEnd);
            }
            Value::Document(inner) => self.json_value(path, inner),
            Value::String(s) => self.events.push(HclEvent::ScalarValue(Scalar::String(s.clone()))),
            other => self.value(path, other),
        }
    }
}

/// Serializes one resource.
pub fn serialize_resource(
    resource_type: &str,
    name: &str,
    attributes: &Value,
    traits: &ResourceTraits,
    schema: &ResourceSchema,
) -> Vec<HclEvent> {
    log::debug!("serializing {}.{}", resource_type, name);
    AttributeSerializer::new(traits, schema).serialize(resource_type, name, attributes)
}

/// Serializes every managed resource of `module` in a state file, as one
/// stream. Attribute values are taken literally.
pub fn serialize_state(
    state: &StateFile,
    module: Option<&str>,
    registry: &TraitRegistry,
    schemas: &ProviderSchema,
) -> Vec<HclEvent> {
    let mut events = Vec::new();
    for resource in state.filtered_resources(module) {
        let traits = registry.get_traits(&resource.resource_type);
        let schema = schemas.resource_schema(&resource.resource_type);
        let attributes = resource
            .attributes()
            .cloned()
            .map(Value::from)
            .unwrap_or(Value::Null);
        events.extend(serialize_resource(
            &resource.resource_type,
            &resource.name,
            &attributes,
            &traits,
            &schema,
        ));
    }
    events
}
