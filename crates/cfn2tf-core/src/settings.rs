//! Settings for one export run.

use std::path::PathBuf;

use serde::Deserialize;

use crate::template::PseudoValues;

/// Default number of validate-and-fix rounds.
pub const DEFAULT_REPAIR_ROUNDS: usize = 3;

fn default_repair_rounds() -> usize {
    DEFAULT_REPAIR_ROUNDS
}

/// What is being exported and where.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub stack_name: String,
    pub region: String,
    pub account_id: String,
    /// Overrides the partition derived from the region.
    #[serde(default)]
    pub partition: Option<String>,
    /// Adds a `terraform:stack_name` default tag to the provider.
    #[serde(default)]
    pub add_default_tag: bool,
    #[serde(default = "default_repair_rounds")]
    pub max_repair_rounds: usize,
    /// State module the resources live in; root module when unset.
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub workspace: PathBuf,
}

impl ExportSettings {
    pub fn new(stack_name: impl Into<String>, region: impl Into<String>, account_id: impl Into<String>) -> Self {
        ExportSettings {
            stack_name: stack_name.into(),
            region: region.into(),
            account_id: account_id.into(),
            partition: None,
            add_default_tag: false,
            max_repair_rounds: DEFAULT_REPAIR_ROUNDS,
            module: None,
            workspace: PathBuf::from("."),
        }
    }

    /// Pseudo parameter values of the exported stack.
    pub fn pseudo_values(&self) -> PseudoValues {
        let mut pseudo = PseudoValues::new(self.region.as_str(), self.account_id.as_str(), self.stack_name.as_str());
        if let Some(partition) = &self.partition {
            pseudo.partition = partition.clone();
        }
        pseudo
    }
}
