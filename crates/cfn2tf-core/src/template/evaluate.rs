//! Evaluation of template expressions against a deployed stack.
//!
//! The dependency resolver evaluates every intrinsic in a resource's
//! properties and looks for the result among the resource's live
//! attributes. Evaluation is partial: anything that cannot be computed
//! from what is known returns `None`.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use super::expr::{sub_parts, Expr, Intrinsic, SubPart};
use super::Template;
use crate::path::AttributePath;
use crate::traits::TraitRegistry;
use crate::value::Value;

/// Values of the `AWS::*` pseudo parameters for one stack.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoValues {
    pub region: String,
    pub account_id: String,
    pub partition: String,
    pub url_suffix: String,
    pub stack_name: String,
    pub stack_id: Option<String>,
}

impl PseudoValues {
    /// Derives partition and URL suffix from the region.
    pub fn new(
        region: impl Into<String>,
        account_id: impl Into<String>,
        stack_name: impl Into<String>,
    ) -> Self {
        let region = region.into();
        let (partition, url_suffix) = if region.starts_with("cn-") {
            ("aws-cn", "amazonaws.com.cn")
        } else if region.starts_with("us-gov-") {
            ("aws-us-gov", "amazonaws.com")
        } else {
            ("aws", "amazonaws.com")
        };
        PseudoValues {
            region,
            account_id: account_id.into(),
            partition: partition.to_string(),
            url_suffix: url_suffix.to_string(),
            stack_name: stack_name.into(),
            stack_id: None,
        }
    }

    /// Value of a pseudo parameter, e.g. `AWS::Region`.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "AWS::Region" => Some(&self.region),
            "AWS::AccountId" => Some(&self.account_id),
            "AWS::Partition" => Some(&self.partition),
            "AWS::URLSuffix" => Some(&self.url_suffix),
            "AWS::StackName" => Some(&self.stack_name),
            "AWS::StackId" => self.stack_id.as_deref(),
            _ => None,
        }
    }
}

/// What is known about one deployed resource.
#[derive(Debug, Clone, Copy)]
pub struct LiveResource<'a> {
    pub terraform_type: &'a str,
    pub physical_id: &'a str,
    pub attributes: Option<&'a Value>,
}

/// Inputs for [`EvalContext::evaluate`].
pub struct EvalContext<'a> {
    template: &'a Template,
    pseudo: &'a PseudoValues,
    traits: &'a TraitRegistry,
    resources: HashMap<&'a str, LiveResource<'a>>,
    exports: HashMap<String, String>,
}

impl<'a> EvalContext<'a> {
    pub fn new(template: &'a Template, pseudo: &'a PseudoValues, traits: &'a TraitRegistry) -> Self {
        EvalContext {
            template,
            pseudo,
            traits,
            resources: HashMap::new(),
            exports: HashMap::new(),
        }
    }

    pub fn add_resource(&mut self, logical_id: &'a str, resource: LiveResource<'a>) {
        self.resources.insert(logical_id, resource);
    }

    /// Stack exports available to `Fn::ImportValue`.
    pub fn set_exports(&mut self, exports: HashMap<String, String>) {
        self.exports = exports;
    }

    pub fn template(&self) -> &'a Template {
        self.template
    }

    pub fn pseudo(&self) -> &'a PseudoValues {
        self.pseudo
    }

    /// Evaluates an expression. Returns `None` when any part is unknown.
    pub fn evaluate(&self, expr: &Expr) -> Option<JsonValue> {
        match expr {
            Expr::Null => Some(JsonValue::Null),
            Expr::Bool(b) => Some(JsonValue::Bool(*b)),
            Expr::Number(n) => Some(number(*n)),
            Expr::String(s) => Some(JsonValue::String(s.clone())),
            Expr::List(items) => items
                .iter()
                .map(|i| self.evaluate(i))
                .collect::<Option<Vec<_>>>()
                .map(JsonValue::Array),
            Expr::Object(entries) => entries
                .iter()
                .map(|(k, v)| Some((k.clone(), self.evaluate(v)?)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(JsonValue::Object),
            Expr::Intrinsic(intrinsic) => self.evaluate_intrinsic(intrinsic),
        }
    }

    /// Evaluates an expression that must produce a string.
    pub fn evaluate_string(&self, expr: &Expr) -> Option<String> {
        self.evaluate(expr).and_then(|v| text(&v))
    }

    fn evaluate_intrinsic(&self, intrinsic: &Intrinsic) -> Option<JsonValue> {
        match intrinsic {
            Intrinsic::Ref(name) => self.evaluate_ref(name),
            Intrinsic::GetAtt {
                logical_id,
                attribute,
            } => {
                let attribute = self.evaluate_string(attribute)?;
                self.evaluate_get_att(logical_id, &attribute)
            }
            Intrinsic::Sub {
                template,
                variables,
            } => {
                let mut result = String::new();
                for part in sub_parts(template) {
                    match part {
                        SubPart::Literal(s) => result.push_str(&s),
                        SubPart::Placeholder(name) => {
                            let value = match variables.iter().find(|(v, _)| *v == name) {
                                Some((_, expr)) => self.evaluate(expr)?,
                                None => match name.split_once('.') {
                                    Some((id, attr)) if !name.starts_with("AWS::") => {
                                        self.evaluate_get_att(id, attr)?
                                    }
                                    _ => self.evaluate_ref(&name)?,
                                },
                            };
                            result.push_str(&text(&value)?);
                        }
                    }
                }
                Some(JsonValue::String(result))
            }
            Intrinsic::Join { delimiter, items } => {
                let JsonValue::Array(items) = self.evaluate(items)? else {
                    return None;
                };
                let parts = items.iter().map(text).collect::<Option<Vec<_>>>()?;
                Some(JsonValue::String(parts.join(delimiter)))
            }
            Intrinsic::Select { index, items } => {
                let index: usize = match self.evaluate(index)? {
                    JsonValue::Number(n) => usize::try_from(n.as_u64()?).ok()?,
                    JsonValue::String(s) => s.trim().parse().ok()?,
                    _ => return None,
                };
                match self.evaluate(items)? {
                    JsonValue::Array(items) => items.into_iter().nth(index),
                    _ => None,
                }
            }
            Intrinsic::Split { delimiter, source } => {
                let source = self.evaluate_string(source)?;
                Some(JsonValue::Array(
                    source
                        .split(delimiter.as_str())
                        .map(|s| JsonValue::String(s.to_string()))
                        .collect(),
                ))
            }
            Intrinsic::FindInMap {
                map_name,
                top_level_key,
                second_level_key,
            } => {
                let map = self.evaluate_string(map_name)?;
                let top = self.evaluate_string(top_level_key)?;
                let second = self.evaluate_string(second_level_key)?;
                self.template.mappings.get(&map)?.get(&top)?.get(&second).cloned()
            }
            Intrinsic::ImportValue(name) => {
                let name = self.evaluate_string(name)?;
                self.exports.get(&name).cloned().map(JsonValue::String)
            }
            Intrinsic::Base64(_)
            | Intrinsic::Cidr { .. }
            | Intrinsic::GetAZs(_)
            | Intrinsic::Unsupported { .. } => None,
        }
    }

    fn evaluate_ref(&self, name: &str) -> Option<JsonValue> {
        if name.starts_with("AWS::") {
            return self.pseudo.get(name).map(|v| JsonValue::String(v.to_string()));
        }
        if let Some(param) = self.template.parameter(name) {
            let value = param.value()?;
            if param.is_list() {
                return Some(JsonValue::Array(
                    value
                        .split(',')
                        .map(|s| JsonValue::String(s.trim().to_string()))
                        .collect(),
                ));
            }
            return Some(JsonValue::String(value.to_string()));
        }
        self.resources
            .get(name)
            .map(|r| JsonValue::String(r.physical_id.to_string()))
    }

    fn evaluate_get_att(&self, logical_id: &str, attribute: &str) -> Option<JsonValue> {
        let resource = self.resources.get(logical_id)?;
        let name = self
            .traits
            .get_traits(resource.terraform_type)
            .map_attribute_name(attribute);
        if name == "id" {
            return Some(JsonValue::String(resource.physical_id.to_string()));
        }
        resource
            .attributes?
            .get_path(&AttributePath::parse(&name))
            .map(Value::to_json)
    }
}

fn number(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

/// String form of a scalar; `None` for collections and null.
fn text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
