pub mod inputs;
pub mod terraform;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cfn2tf_core::diag::Diagnostics;
use cfn2tf_core::provider::ConfigError;
use cfn2tf_core::repair::{CompileError, RepairLoop, TrialCompiler};
use cfn2tf_core::schema::SchemaError;
use cfn2tf_core::settings::ExportSettings;
use cfn2tf_core::template::TemplateError;
use cfn2tf_core::traits::TraitError;
use cfn2tf_core::writer::{HclWriter, StackInputs, MAIN_SCRIPT_FILE, VARS_FILE};

use inputs::Stack;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{}: {source}", path.display())]
    Template { path: PathBuf, source: TemplateError },
    #[error("{}: {source}", path.display())]
    Json { path: PathBuf, source: serde_json::Error },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Traits(#[from] TraitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Compile(CompileError),
    #[error("terraform could not be started ({0}); is it installed and on PATH?")]
    TerraformNotFound(String),
}

/// Result of exporting one stack.
#[derive(Debug, Clone, Default)]
pub struct ConvertResult {
    pub main: String,
    pub tfvars: String,
    pub diagnostics: Diagnostics,
    /// Repair rounds run; zero when the document was not validated.
    pub repair_rounds: usize,
    pub fixes_applied: usize,
}

/// Exports stacks with fixed settings.
pub struct Converter {
    settings: ExportSettings,
}

impl Converter {
    pub fn new(settings: ExportSettings) -> Self {
        Converter { settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Generates the documents for a loaded stack.
    pub fn convert(&self, stack: &Stack) -> Result<ConvertResult, ConvertError> {
        let documents = HclWriter::new(&stack.registry, &stack.schemas, &self.settings).write(StackInputs {
            template: &stack.template,
            state: &stack.state,
            mappings: &stack.mappings,
            modules: &stack.modules,
        })?;
        Ok(ConvertResult {
            main: documents.main,
            tfvars: documents.tfvars,
            diagnostics: documents.diagnostics,
            repair_rounds: 0,
            fixes_applied: 0,
        })
    }

    /// Runs the repair loop over `result.main`. Diagnostics still reported
    /// after the last round are added to the result.
    pub fn repair(&self, result: &mut ConvertResult, compiler: &mut dyn TrialCompiler) -> Result<(), ConvertError> {
        log::info!("validating {}", MAIN_SCRIPT_FILE);
        let outcome = RepairLoop::new(self.settings.max_repair_rounds)
            .run(compiler, result.main.clone())
            .map_err(|err| match err {
                CompileError::Spawn { source, .. } => ConvertError::TerraformNotFound(source.to_string()),
                other => ConvertError::Compile(other),
            })?;
        result.diagnostics.extend(outcome.diagnostics());
        result.repair_rounds = outcome.rounds;
        result.fixes_applied = outcome.fixed;
        result.main = outcome.document;
        Ok(())
    }
}

/// Writes `main.tf` and `terraform.tfvars` into `dir`.
pub fn write_outputs(result: &ConvertResult, dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    fs::create_dir_all(dir).map_err(|source| ConvertError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::new();
    for (name, text) in [(MAIN_SCRIPT_FILE, &result.main), (VARS_FILE, &result.tfvars)] {
        let path = dir.join(name);
        fs::write(&path, text).map_err(|source| ConvertError::Write {
            path: path.clone(),
            source,
        })?;
        log::info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
