//! Terraform provider schema.
//!
//! Loaded from the output of `terraform providers schema -json`. The
//! emitter uses it to decide block versus attribute syntax; when no
//! schema is available (or a path is not found in it) every attribute
//! gets [`ValueSchema::missing`] and the emitter falls back to the shape
//! of the value.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value as JsonValue;

use crate::path::AttributePath;

/// Error loading a provider schema document.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid provider schema JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("provider schema has no '{0}' section")]
    MissingSection(&'static str),
}

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
    Set,
    Object,
    JsonData,
}

/// How an attribute is written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigMode {
    #[default]
    Auto,
    Attr,
    Block,
}

/// Element schema of a collection attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Elem {
    /// Elements are nested blocks.
    Nested(ResourceSchema),
    /// Elements are plain values.
    Value(Box<ValueSchema>),
}

/// Schema of a single attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSchema {
    pub computed: bool,
    pub optional: bool,
    pub required: bool,
    pub sensitive: bool,
    pub config_mode: ConfigMode,
    pub schema_type: SchemaType,
    pub elem: Option<Elem>,
    pub conflicts_with: Vec<String>,
    /// True when this schema stands in for a path the provider schema does not know.
    pub missing: bool,
}

impl ValueSchema {
    /// Permissive schema for paths with no schema information.
    pub fn missing() -> Self {
        Self {
            computed: false,
            optional: true,
            required: false,
            sensitive: false,
            config_mode: ConfigMode::Auto,
            schema_type: SchemaType::String,
            elem: None,
            conflicts_with: Vec::new(),
            missing: true,
        }
    }

    fn scalar(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            optional: false,
            missing: false,
            ..Self::missing()
        }
    }

    /// True if the attribute is written as a nested block.
    pub fn is_block(&self) -> bool {
        if self.computed && !self.optional {
            return false;
        }
        if self.config_mode == ConfigMode::Auto {
            return matches!(self.elem, Some(Elem::Nested(_)));
        }
        if self.optional && self.computed && self.config_mode == ConfigMode::Attr {
            return true;
        }
        self.config_mode == ConfigMode::Block
    }

    /// True if the provider computes the value and it cannot be set.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !(self.optional || self.required)
    }

    pub fn is_list_or_set(&self) -> bool {
        matches!(self.schema_type, SchemaType::List | SchemaType::Set)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self.schema_type,
            SchemaType::Bool | SchemaType::String | SchemaType::Float | SchemaType::Int
        )
    }

    pub fn is_map(&self) -> bool {
        self.schema_type == SchemaType::Map
    }
}

/// Schema of a resource type or nested block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSchema {
    pub attributes: BTreeMap<String, ValueSchema>,
}

impl ResourceSchema {
    /// Finds the schema for an attribute path.
    ///
    /// Numeric segments step into list elements. A segment that does not
    /// exist in the schema yields [`ValueSchema::missing`].
    pub fn attribute_by_path(&self, path: &AttributePath) -> ValueSchema {
        let mut resource = self;
        let mut current: Option<&ValueSchema> = None;

        for segment in path.segments() {
            if let Some(schema) = current {
                let is_index = segment.chars().all(|c| c.is_ascii_digit());
                match &schema.elem {
                    Some(Elem::Nested(nested)) if !is_index => resource = nested,
                    Some(Elem::Nested(_)) => continue,
                    Some(Elem::Value(value)) if is_index || schema.is_map() => {
                        current = Some(value.as_ref());
                        continue;
                    }
                    _ => return ValueSchema::missing(),
                }
            }
            match resource.attributes.get(segment) {
                Some(schema) => current = Some(schema),
                None => return ValueSchema::missing(),
            }
        }

        current.cloned().unwrap_or_else(ValueSchema::missing)
    }

    /// Parses a `block` object from provider schema JSON.
    fn from_block(block: &JsonValue) -> Self {
        let mut attributes = BTreeMap::new();

        if let Some(attrs) = block.get("attributes").and_then(JsonValue::as_object) {
            for (name, attr) in attrs {
                let type_spec = attr.get("type").unwrap_or(&JsonValue::Null);
                let mut schema = value_schema_from_type(type_spec);
                schema.computed = flag(attr, "computed");
                schema.optional = flag(attr, "optional");
                schema.required = flag(attr, "required");
                schema.sensitive = flag(attr, "sensitive");
                attributes.insert(name.clone(), schema);
            }
        }

        if let Some(blocks) = block.get("block_types").and_then(JsonValue::as_object) {
            for (name, block_type) in blocks {
                let nested = block_type
                    .get("block")
                    .map(ResourceSchema::from_block)
                    .unwrap_or_default();
                let schema_type = match block_type.get("nesting_mode").and_then(JsonValue::as_str)
                {
                    Some("set") => SchemaType::Set,
                    Some("single") | Some("group") => SchemaType::Object,
                    Some("map") => SchemaType::Map,
                    _ => SchemaType::List,
                };
                let min_items = block_type
                    .get("min_items")
                    .and_then(JsonValue::as_u64)
                    .unwrap_or(0);
                attributes.insert(
                    name.clone(),
                    ValueSchema {
                        computed: false,
                        optional: min_items == 0,
                        required: min_items > 0,
                        sensitive: false,
                        config_mode: ConfigMode::Block,
                        schema_type,
                        elem: Some(Elem::Nested(nested)),
                        conflicts_with: Vec::new(),
                        missing: false,
                    },
                );
            }
        }

        Self { attributes }
    }
}

fn flag(attr: &JsonValue, name: &str) -> bool {
    attr.get(name).and_then(JsonValue::as_bool).unwrap_or(false)
}

/// Converts a cty type specification (`"string"`, `["list", "string"]`, ...).
fn value_schema_from_type(spec: &JsonValue) -> ValueSchema {
    match spec {
        JsonValue::String(s) => ValueSchema::scalar(match s.as_str() {
            "bool" => SchemaType::Bool,
            "number" => SchemaType::Float,
            "dynamic" => SchemaType::JsonData,
            _ => SchemaType::String,
        }),
        JsonValue::Array(parts) => {
            let kind = parts.first().and_then(JsonValue::as_str).unwrap_or("");
            let inner = parts.get(1).unwrap_or(&JsonValue::Null);
            let schema_type = match kind {
                "list" => SchemaType::List,
                "set" => SchemaType::Set,
                "map" => SchemaType::Map,
                _ => SchemaType::Object,
            };
            let elem = match kind {
                "list" | "set" | "map" => Some(Elem::Value(Box::new(value_schema_from_type(inner)))),
                _ => None,
            };
            ValueSchema {
                schema_type,
                elem,
                ..ValueSchema::scalar(schema_type)
            }
        }
        _ => ValueSchema::missing(),
    }
}

/// Resource schemas of one or more providers, keyed by resource type.
#[derive(Debug, Clone, Default)]
pub struct ProviderSchema {
    resources: HashMap<String, ResourceSchema>,
}

impl ProviderSchema {
    /// Parses `terraform providers schema -json` output.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let doc: JsonValue = serde_json::from_str(text)?;
        let providers = doc
            .get("provider_schemas")
            .and_then(JsonValue::as_object)
            .ok_or(SchemaError::MissingSection("provider_schemas"))?;

        let mut resources = HashMap::new();
        for provider in providers.values() {
            let Some(schemas) = provider.get("resource_schemas").and_then(JsonValue::as_object)
            else {
                continue;
            };
            for (resource_type, schema) in schemas {
                let block = schema.get("block").unwrap_or(&JsonValue::Null);
                resources.insert(resource_type.clone(), ResourceSchema::from_block(block));
            }
        }

        Ok(Self { resources })
    }

    /// Adds or replaces the schema of one resource type.
    pub fn insert(&mut self, resource_type: impl Into<String>, schema: ResourceSchema) {
        self.resources.insert(resource_type.into(), schema);
    }

    /// Returns the schema for a resource type, empty if unknown.
    pub fn resource_schema(&self, resource_type: &str) -> ResourceSchema {
        self.resources.get(resource_type).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
