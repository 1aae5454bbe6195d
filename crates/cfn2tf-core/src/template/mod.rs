//! Source template model.
//!
//! Templates are read from JSON or YAML. YAML short-form tags (`!Ref`,
//! `!GetAtt`, `!Sub`, ...) are rewritten to their long JSON form before
//! the expression tree is built, so both syntaxes produce the same
//! [`Template`].

pub mod evaluate;
pub mod expr;
pub mod graph;

use std::collections::HashMap;

use serde_json::{Map as JsonMap, Value as JsonValue};

pub use evaluate::{EvalContext, LiveResource, PseudoValues};
pub use expr::{sub_parts, Expr, Intrinsic, SubPart};
pub use graph::{DependencyEdge, DependencyKind};

/// Error reading a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid template YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("template {0} must be a mapping")]
    NotAMapping(&'static str),
    #[error("resource '{0}' has no Type")]
    MissingType(String),
    #[error("invalid {tag}: {detail}")]
    InvalidIntrinsic { tag: String, detail: String },
}

/// A template parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub param_type: String,
    pub default: Option<String>,
    pub description: Option<String>,
    pub no_echo: bool,
    /// Value the deployed stack was created with, when known.
    pub current_value: Option<String>,
}

impl Parameter {
    /// The live value, falling back to the default.
    pub fn value(&self) -> Option<&str> {
        self.current_value.as_deref().or(self.default.as_deref())
    }

    /// True for `CommaDelimitedList` and `List<...>` parameters.
    pub fn is_list(&self) -> bool {
        self.param_type == "CommaDelimitedList" || self.param_type.starts_with("List<")
    }

    /// True for parameters backed by the SSM parameter store.
    pub fn is_ssm_value(&self) -> bool {
        self.param_type.starts_with("AWS::SSM::Parameter::Value<")
    }
}

/// A template resource.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateResource {
    pub logical_id: String,
    pub resource_type: String,
    /// Always an [`Expr::Object`], possibly empty.
    pub properties: Expr,
    pub depends_on: Vec<String>,
    pub condition: Option<String>,
}

/// A template output.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub value: Expr,
    pub description: Option<String>,
}

/// A parsed template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    /// The `Mappings` section as a JSON object.
    pub mappings: JsonMap<String, JsonValue>,
    pub conditions: Vec<String>,
    pub resources: Vec<TemplateResource>,
    pub outputs: Vec<Output>,
}

impl Template {
    /// Parses a template, detecting JSON or YAML from the first character.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        if source.trim_start().starts_with('{') {
            Self::from_json_str(source)
        } else {
            Self::from_yaml_str(source)
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, TemplateError> {
        let json: JsonValue = serde_json::from_str(source)?;
        Self::from_value(&json)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, TemplateError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(source)?;
        Self::from_value(&yaml_to_json(&yaml))
    }

    /// Builds a template from its long-form JSON document.
    pub fn from_value(json: &JsonValue) -> Result<Self, TemplateError> {
        let root = json.as_object().ok_or(TemplateError::NotAMapping("root"))?;
        let mut template = Template {
            description: root
                .get("Description")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
            ..Template::default()
        };

        if let Some(params) = section(root, "Parameters")? {
            for (name, decl) in params {
                template.parameters.push(parse_parameter(name, decl));
            }
        }

        if let Some(mappings) = section(root, "Mappings")? {
            template.mappings = mappings.clone();
        }

        if let Some(conditions) = section(root, "Conditions")? {
            template.conditions = conditions.keys().cloned().collect();
        }

        if let Some(resources) = section(root, "Resources")? {
            for (logical_id, decl) in resources {
                template.resources.push(parse_resource(logical_id, decl)?);
            }
        }

        if let Some(outputs) = section(root, "Outputs")? {
            for (name, decl) in outputs {
                let value = decl.get("Value").cloned().unwrap_or(JsonValue::Null);
                template.outputs.push(Output {
                    name: name.clone(),
                    value: Expr::from_json(&value)?,
                    description: decl
                        .get("Description")
                        .and_then(JsonValue::as_str)
                        .map(str::to_string),
                });
            }
        }

        Ok(template)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&TemplateResource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    /// Records the values the stack was deployed with.
    pub fn set_parameter_values(&mut self, values: &HashMap<String, String>) {
        for param in &mut self.parameters {
            if let Some(value) = values.get(&param.name) {
                param.current_value = Some(value.clone());
            }
        }
    }
}

fn section<'a>(
    root: &'a JsonMap<String, JsonValue>,
    name: &'static str,
) -> Result<Option<&'a JsonMap<String, JsonValue>>, TemplateError> {
    match root.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Object(map)) => Ok(Some(map)),
        Some(_) => Err(TemplateError::NotAMapping(name)),
    }
}

fn parse_parameter(name: &str, decl: &JsonValue) -> Parameter {
    let text = |key: &str| decl.get(key).and_then(JsonValue::as_str).map(str::to_string);
    Parameter {
        name: name.to_string(),
        param_type: text("Type").unwrap_or_else(|| "String".to_string()),
        default: decl.get("Default").and_then(scalar_text),
        description: text("Description"),
        no_echo: match decl.get("NoEcho") {
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        },
        current_value: None,
    }
}

/// Parameter values are strings; list defaults are comma joined.
fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

fn parse_resource(logical_id: &str, decl: &JsonValue) -> Result<TemplateResource, TemplateError> {
    let resource_type = decl
        .get("Type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| TemplateError::MissingType(logical_id.to_string()))?;

    let properties = match decl.get("Properties") {
        Some(props @ JsonValue::Object(_)) => Expr::from_json(props)?,
        _ => Expr::Object(Vec::new()),
    };

    let depends_on = match decl.get("DependsOn") {
        Some(JsonValue::String(s)) => vec![s.clone()],
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(JsonValue::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Ok(TemplateResource {
        logical_id: logical_id.to_string(),
        resource_type: resource_type.to_string(),
        properties,
        depends_on,
        condition: decl
            .get("Condition")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
    })
}

// ─── YAML short form ─────────────────────────────────────────

/// Converts YAML to JSON, expanding short-form intrinsic tags.
fn yaml_to_json(yaml: &serde_yaml::Value) -> JsonValue {
    match yaml {
        serde_yaml::Value::Null => JsonValue::Null,
        serde_yaml::Value::Bool(b) => JsonValue::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
        serde_yaml::Value::String(s) => JsonValue::String(s.clone()),
        serde_yaml::Value::Sequence(items) => {
            JsonValue::Array(items.iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let mut object = JsonMap::new();
            for (key, value) in map {
                object.insert(yaml_key(key), yaml_to_json(value));
            }
            JsonValue::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = tag.trim_start_matches('!');
            let value = yaml_to_json(&tagged.value);
            let value = match (name, value) {
                ("GetAtt", JsonValue::String(s)) => match s.split_once('.') {
                    Some((id, attr)) => JsonValue::Array(vec![id.into(), attr.into()]),
                    None => JsonValue::String(s),
                },
                (_, value) => value,
            };
            let key = match name {
                "Ref" | "Condition" => name.to_string(),
                other => format!("Fn::{}", other),
            };
            let mut object = JsonMap::new();
            object.insert(key, value);
            JsonValue::Object(object)
        }
    }
}

fn yaml_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
