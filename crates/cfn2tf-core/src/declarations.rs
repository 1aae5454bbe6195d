//! Input variables and data sources collected during translation.
//!
//! Template parameters are registered up front; pseudo parameters,
//! `Fn::GetAZs` and `Fn::ImportValue` register their data sources the
//! first time the renderer meets them. Registration is first-writer-wins
//! by address, so rendering the same lookup twice yields one declaration.

use std::collections::BTreeMap;

use crate::template::{Parameter, Template};
use crate::text::{format_number, object_key, quote};

/// Terraform type of an input variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    String,
    StringList,
    Number,
    NumberList,
}

impl VariableType {
    /// Maps a template parameter type. SSM-backed parameters are not
    /// variables and never reach this.
    pub fn from_parameter_type(param_type: &str) -> VariableType {
        match param_type {
            "Number" => VariableType::Number,
            "List<Number>" => VariableType::NumberList,
            "CommaDelimitedList" => VariableType::StringList,
            t if t.starts_with("List<") => VariableType::StringList,
            _ => VariableType::String,
        }
    }

    pub fn hcl_type(self) -> &'static str {
        match self {
            VariableType::String => "string",
            VariableType::StringList => "list(string)",
            VariableType::Number => "number",
            VariableType::NumberList => "list(number)",
        }
    }

    pub fn is_list(self) -> bool {
        matches!(self, VariableType::StringList | VariableType::NumberList)
    }

    /// Writes a value given as template text (lists comma-separated).
    fn value_hcl(self, value: &str, indent: &str) -> String {
        match self {
            VariableType::String => quote(value),
            VariableType::Number => item_hcl(value, true),
            VariableType::StringList | VariableType::NumberList => {
                let numeric = self == VariableType::NumberList;
                let items: Vec<&str> = value.split(',').filter(|s| !s.trim().is_empty()).collect();
                if items.is_empty() {
                    return "[]".to_string();
                }
                let mut out = String::from("[\n");
                for item in items {
                    out.push_str(&format!("{}  {},\n", indent, item_hcl(item, numeric)));
                }
                out.push_str(&format!("{}]", indent));
                out
            }
        }
    }
}

/// A `variable` block standing in for a template parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub variable_type: VariableType,
    pub description: Option<String>,
    pub default: Option<String>,
    /// Value of the deployed stack, written to the tfvars file.
    pub current_value: Option<String>,
    pub sensitive: bool,
}

impl Variable {
    pub fn address(&self) -> String {
        format!("var.{}", self.name)
    }

    pub fn to_hcl(&self) -> String {
        let mut w = String::new();
        w.push_str(&format!("variable {} {{\n", quote(&self.name)));
        w.push_str(&format!("  type        = {}\n", self.variable_type.hcl_type()));
        if let Some(description) = &self.description {
            w.push_str(&format!("  description = {}\n", quote(description)));
        }
        if self.sensitive {
            w.push_str("  sensitive   = true\n");
        }
        if let Some(default) = &self.default {
            w.push_str(&format!("  default     = {}\n", self.variable_type.value_hcl(default, "  ")));
        }
        w.push_str("}\n");
        w
    }
}

/// A `data` block.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub data_type: String,
    pub name: String,
    pub arguments: BTreeMap<String, String>,
}

impl DataSource {
    pub fn new(data_type: impl Into<String>, name: impl Into<String>) -> Self {
        DataSource {
            data_type: data_type.into(),
            name: name.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn address(&self) -> String {
        format!("data.{}.{}", self.data_type, self.name)
    }

    pub fn to_hcl(&self) -> String {
        let mut w = String::new();
        w.push_str(&format!("data {} {} ", quote(&self.data_type), quote(&self.name)));
        if self.arguments.is_empty() {
            w.push_str("{}\n");
            return w;
        }
        w.push_str("{\n");
        for (key, value) in &self.arguments {
            w.push_str(&format!("  {} = {}\n", object_key(key), quote(value)));
        }
        w.push_str("}\n");
        w
    }
}

/// One accumulated declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum InputVariable {
    Variable(Variable),
    DataSource(DataSource),
}

impl InputVariable {
    /// Declaration for a template parameter: a variable, or an
    /// `aws_ssm_parameter` lookup for parameter-store backed types.
    pub fn from_parameter(param: &Parameter) -> InputVariable {
        if param.is_ssm_value() {
            return InputVariable::DataSource(
                DataSource::new("aws_ssm_parameter", param.name.as_str())
                    .with_argument("name", param.default.clone().unwrap_or_default()),
            );
        }
        InputVariable::Variable(Variable {
            name: param.name.clone(),
            variable_type: VariableType::from_parameter_type(&param.param_type),
            description: param.description.clone(),
            default: param.default.clone(),
            current_value: param.current_value.clone(),
            sensitive: param.no_echo,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            InputVariable::Variable(v) => &v.name,
            InputVariable::DataSource(d) => &d.name,
        }
    }

    pub fn address(&self) -> String {
        match self {
            InputVariable::Variable(v) => v.address(),
            InputVariable::DataSource(d) => d.address(),
        }
    }

    pub fn to_hcl(&self) -> String {
        match self {
            InputVariable::Variable(v) => v.to_hcl(),
            InputVariable::DataSource(d) => d.to_hcl(),
        }
    }
}

/// The declarations accumulator.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    inputs: Vec<InputVariable>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every parameter of a template.
    pub fn from_template(template: &Template) -> Self {
        let mut declarations = Self::new();
        for param in &template.parameters {
            declarations.register(InputVariable::from_parameter(param));
        }
        declarations
    }

    /// Adds a declaration unless one with the same address exists.
    /// Returns true if it was added.
    pub fn register(&mut self, input: InputVariable) -> bool {
        let address = input.address();
        if self.contains(&address) {
            return false;
        }
        log::debug!("declaring {}", address);
        self.inputs.push(input);
        true
    }

    pub fn contains(&self, address: &str) -> bool {
        self.inputs.iter().any(|i| i.address() == address)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.inputs.iter().filter_map(|i| match i {
            InputVariable::Variable(v) => Some(v),
            InputVariable::DataSource(_) => None,
        })
    }

    pub fn data_sources(&self) -> impl Iterator<Item = &DataSource> {
        self.inputs.iter().filter_map(|i| match i {
            InputVariable::DataSource(d) => Some(d),
            InputVariable::Variable(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Variables, then data sources, each sorted by name.
    pub fn to_hcl(&self) -> String {
        let mut variables: Vec<&Variable> = self.variables().collect();
        variables.sort_by(|a, b| a.name.cmp(&b.name));
        let mut data_sources: Vec<&DataSource> = self.data_sources().collect();
        data_sources.sort_by(|a, b| (&a.name, &a.data_type).cmp(&(&b.name, &b.data_type)));

        let mut w = String::new();
        for variable in variables {
            w.push_str(&variable.to_hcl());
            w.push('\n');
        }
        for data_source in data_sources {
            w.push_str(&data_source.to_hcl());
            w.push('\n');
        }
        w
    }

    /// The `terraform.tfvars` text: one assignment per variable with a
    /// deployed value.
    pub fn to_tfvars(&self, stack_name: &str) -> String {
        let rule = "#".repeat(67);
        let mut w = String::new();
        w.push_str(&format!("{}\n", rule));
        w.push_str("#\n");
        w.push_str(&format!("# Variable values as per current state of stack \"{}\"\n", stack_name));
        w.push_str("#\n");
        w.push_str(&format!("{}\n", rule));
        w.push('\n');

        let mut variables: Vec<&Variable> = self.variables().collect();
        variables.sort_by(|a, b| a.name.cmp(&b.name));
        for variable in variables {
            let Some(value) = &variable.current_value else {
                continue;
            };
            w.push_str(&format!("{} = {}\n", variable.name, tfvars_value(variable.variable_type, value)));
            w.push('\n');
        }
        w
    }
}

/// A list element or scalar given as template text. Numbers that do not
/// parse are kept as strings.
fn item_hcl(item: &str, numeric: bool) -> String {
    let item = item.trim();
    match item.parse::<f64>() {
        Ok(n) if numeric => format_number(n),
        _ => quote(item),
    }
}

fn tfvars_value(variable_type: VariableType, value: &str) -> String {
    if !variable_type.is_list() {
        return variable_type.value_hcl(value, "");
    }
    let numeric = variable_type == VariableType::NumberList;
    let items: Vec<String> = value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|item| item_hcl(item, numeric))
        .collect();
    if items.is_empty() {
        "[]".to_string()
    } else {
        format!("[ {} ]", items.join(", "))
    }
}
