use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use cfn2tf_converter::inputs::StackFiles;
use cfn2tf_converter::terraform::TerraformRunner;
use cfn2tf_converter::{write_outputs, ConvertError, Converter};
use cfn2tf_core::settings::{ExportSettings, DEFAULT_REPAIR_ROUNDS};

#[derive(Parser)]
#[command(name = "cfn2tf", version)]
#[command(about = "Export a deployed CloudFormation stack as Terraform configuration", long_about = None)]
struct Cli {
    /// CloudFormation template (JSON or YAML)
    #[arg(long)]
    template: PathBuf,

    /// Terraform state holding the imported resources
    #[arg(long)]
    state: PathBuf,

    /// Resource mapping file: logical id, AWS type, Terraform type, physical id
    #[arg(long)]
    mappings: PathBuf,

    /// JSON object of the stack's current parameter values
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// Output of `terraform providers schema -json`
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Trait table replacing the built-in one (YAML)
    #[arg(long)]
    traits: Option<PathBuf>,

    /// Directory main.tf and terraform.tfvars are written to
    #[arg(long, short, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long)]
    stack_name: String,

    #[arg(long)]
    region: String,

    #[arg(long)]
    account_id: String,

    /// Partition, when not derivable from the region
    #[arg(long)]
    partition: Option<String>,

    /// State module the stack's resources were imported into
    #[arg(long)]
    module: Option<String>,

    /// Tag every resource with terraform:stack_name through the provider
    #[arg(long)]
    add_default_tag: bool,

    #[arg(long, default_value_t = DEFAULT_REPAIR_ROUNDS)]
    max_repair_rounds: usize,

    /// Skip `terraform validate` and the repair loop
    #[arg(long)]
    no_validate: bool,

    /// Terraform executable
    #[arg(long, default_value = "terraform")]
    terraform: PathBuf,
}

impl Cli {
    fn settings(&self) -> ExportSettings {
        let mut settings = ExportSettings::new(&self.stack_name, &self.region, &self.account_id);
        settings.partition = self.partition.clone();
        settings.add_default_tag = self.add_default_tag;
        settings.max_repair_rounds = self.max_repair_rounds;
        settings.module = self.module.clone();
        settings.workspace = self.out_dir.clone();
        settings
    }

    fn files(&self) -> StackFiles {
        StackFiles {
            template: self.template.clone(),
            state: self.state.clone(),
            mappings: self.mappings.clone(),
            parameters: self.parameters.clone(),
            schema: self.schema.clone(),
            traits: self.traits.clone(),
        }
    }
}

fn run(cli: &Cli) -> Result<bool, ConvertError> {
    let stack = cli.files().load()?;
    let converter = Converter::new(cli.settings());
    let mut result = converter.convert(&stack)?;

    if !cli.no_validate {
        let mut runner = TerraformRunner::new(&converter.settings().workspace).with_program(&cli.terraform);
        converter.repair(&mut result, &mut runner)?;
        info!(
            "{} fix(es) applied in {} repair round(s)",
            result.fixes_applied, result.repair_rounds
        );
    }
    write_outputs(&result, &cli.out_dir)?;

    for diag in result.diagnostics.iter() {
        eprintln!("{}", diag);
    }
    let errors = result.diagnostics.error_count();
    eprintln!(
        "{} diagnostic(s), {} error(s)",
        result.diagnostics.len(),
        errors
    );
    Ok(errors == 0)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
