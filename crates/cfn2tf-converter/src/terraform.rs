//! Trial compile against a real `terraform` executable.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use cfn2tf_core::repair::{CompileError, PlanErrorCollection, TrialCompiler};
use cfn2tf_core::writer::MAIN_SCRIPT_FILE;

/// Writes the document into a workspace directory and runs
/// `terraform validate -json` there. `terraform init -backend=false` runs
/// once, before the first validation.
#[derive(Debug, Clone)]
pub struct TerraformRunner {
    program: PathBuf,
    workspace: PathBuf,
    initialized: bool,
}

impl TerraformRunner {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        TerraformRunner {
            program: PathBuf::from("terraform"),
            workspace: workspace.into(),
            initialized: false,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    fn run(&self, args: &[&str]) -> Result<Output, CompileError> {
        log::debug!("running {} {}", self.program.display(), args.join(" "));
        Command::new(&self.program)
            .args(args)
            .current_dir(&self.workspace)
            .output()
            .map_err(|source| CompileError::Spawn {
                program: self.program.display().to_string(),
                source,
            })
    }
}

impl TrialCompiler for TerraformRunner {
    fn compile(&mut self, document: &str) -> Result<PlanErrorCollection, CompileError> {
        fs::create_dir_all(&self.workspace)?;
        fs::write(self.workspace.join(MAIN_SCRIPT_FILE), document)?;

        if !self.initialized {
            log::info!("initializing terraform in {}", self.workspace.display());
            let output = self.run(&["init", "-backend=false", "-input=false", "-no-color"])?;
            if !output.status.success() {
                return Err(CompileError::Failed(stderr_text(&output)));
            }
            self.initialized = true;
        }

        // Exits non-zero when the configuration is invalid; the JSON
        // document on stdout is still complete.
        let output = self.run(&["validate", "-json", "-no-color"])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(CompileError::Failed(stderr_text(&output)));
        }
        Ok(PlanErrorCollection::from_validate_json(&stdout)?)
    }
}

fn stderr_text(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if text.is_empty() {
        format!("terraform exited with {}", output.status)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = TerraformRunner::new(dir.path()).with_program("/nonexistent/terraform");
        match runner.compile("a = 1\n") {
            Err(CompileError::Spawn { program, source }) => {
                assert_eq!(program, "/nonexistent/terraform");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(fs::read_to_string(dir.path().join(MAIN_SCRIPT_FILE)).unwrap(), "a = 1\n");
    }

    #[test]
    fn test_unwritable_workspace_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain-file");
        fs::write(&file, "").unwrap();
        let mut runner = TerraformRunner::new(file.join("work")).with_program("/nonexistent/terraform");
        match runner.compile("a = 1\n") {
            Err(CompileError::Io(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
