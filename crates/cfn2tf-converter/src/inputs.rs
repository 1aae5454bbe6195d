//! Loading of the files that describe a deployed stack.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use cfn2tf_core::mapping::{parse_mappings, NestedModule, ResourceMapping};
use cfn2tf_core::schema::ProviderSchema;
use cfn2tf_core::state::StateFile;
use cfn2tf_core::template::Template;
use cfn2tf_core::traits::TraitRegistry;

use crate::ConvertError;

/// Paths of the input files.
#[derive(Debug, Clone, Default)]
pub struct StackFiles {
    pub template: PathBuf,
    pub state: PathBuf,
    pub mappings: PathBuf,
    /// JSON object of parameter values of the deployed stack.
    pub parameters: Option<PathBuf>,
    /// Output of `terraform providers schema -json`.
    pub schema: Option<PathBuf>,
    /// Replacement for the built-in trait table.
    pub traits: Option<PathBuf>,
}

/// Everything loaded from [`StackFiles`].
#[derive(Debug)]
pub struct Stack {
    pub template: Template,
    pub state: StateFile,
    pub mappings: Vec<ResourceMapping>,
    pub modules: Vec<NestedModule>,
    pub schemas: ProviderSchema,
    pub registry: TraitRegistry,
}

impl StackFiles {
    pub fn load(&self) -> Result<Stack, ConvertError> {
        let mut template = Template::parse(&read(&self.template)?).map_err(|source| ConvertError::Template {
            path: self.template.clone(),
            source,
        })?;
        if let Some(path) = &self.parameters {
            let values = parameter_values(&read(path)?).map_err(|source| ConvertError::Json {
                path: path.clone(),
                source,
            })?;
            log::debug!("{} parameter value(s) loaded", values.len());
            template.set_parameter_values(&values);
        }

        let state = StateFile::from_json(&read(&self.state)?).map_err(|source| ConvertError::Json {
            path: self.state.clone(),
            source,
        })?;
        let mapping_file = parse_mappings(&read(&self.mappings)?).map_err(|source| ConvertError::Json {
            path: self.mappings.clone(),
            source,
        })?;

        let schemas = match &self.schema {
            Some(path) => ProviderSchema::from_json(&read(path)?)?,
            None => ProviderSchema::default(),
        };
        let registry = match &self.traits {
            Some(path) => TraitRegistry::from_yaml(&read(path)?)?,
            None => TraitRegistry::builtin()?,
        };

        log::info!(
            "loaded {} resource(s) from {} and {} mapping(s)",
            template.resources.len(),
            self.template.display(),
            mapping_file.resources.len()
        );
        Ok(Stack {
            template,
            state,
            mappings: mapping_file.resources,
            modules: mapping_file.modules,
            schemas,
            registry,
        })
    }
}

fn read(path: &Path) -> Result<String, ConvertError> {
    fs::read_to_string(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parameter values as the stack stores them: lists comma-joined,
/// numbers and booleans as text.
pub fn parameter_values(text: &str) -> Result<HashMap<String, String>, serde_json::Error> {
    let values: HashMap<String, JsonValue> = serde_json::from_str(text)?;
    Ok(values
        .into_iter()
        .filter_map(|(name, value)| scalar_text(&value).map(|text| (name, text)))
        .collect())
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Array(items) => {
            let items: Option<Vec<String>> = items.iter().map(scalar_text).collect();
            items.map(|items| items.join(","))
        }
        JsonValue::Null | JsonValue::Object(_) => None,
    }
}
