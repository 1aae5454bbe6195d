use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;

use cfn2tf_converter::inputs::StackFiles;
use cfn2tf_converter::terraform::TerraformRunner;
use cfn2tf_converter::{write_outputs, ConvertError, Converter};
use cfn2tf_core::repair::{CompileError, SyntaxCheck};
use cfn2tf_core::settings::ExportSettings;

const TEMPLATE: &str = r#"
AWSTemplateFormatVersion: '2010-09-09'
Parameters:
  Env:
    Type: String
    Default: dev
  Retention:
    Type: Number
    Default: 7
Resources:
  Logs:
    Type: AWS::Logs::LogGroup
    Properties:
      LogGroupName: !Sub '/app/${Env}'
      RetentionInDays: !Ref Retention
  Topic:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !Sub '${Env}-alerts'
      DisplayName: !Sub 'Alerts in ${AWS::Region}'
Outputs:
  TopicArn:
    Description: Alert topic
    Value: !Ref Topic
"#;

const STATE: &str = r#"{
  "version": 4,
  "terraform_version": "1.5.7",
  "resources": [
    {
      "mode": "managed",
      "type": "aws_cloudwatch_log_group",
      "name": "Logs",
      "provider": "provider[\"registry.terraform.io/hashicorp/aws\"]",
      "instances": [ { "schema_version": 0, "attributes": {
        "arn": "arn:aws:logs:eu-west-1:123456789012:log-group:/app/prod",
        "id": "/app/prod",
        "name": "/app/prod",
        "name_prefix": "",
        "retention_in_days": 30,
        "kms_key_id": "",
        "tags": null,
        "tags_all": {}
      } } ]
    },
    {
      "mode": "managed",
      "type": "aws_sns_topic",
      "name": "Topic",
      "provider": "provider[\"registry.terraform.io/hashicorp/aws\"]",
      "instances": [ { "schema_version": 0, "attributes": {
        "arn": "arn:aws:sns:eu-west-1:123456789012:prod-alerts",
        "id": "arn:aws:sns:eu-west-1:123456789012:prod-alerts",
        "name": "prod-alerts",
        "display_name": "Alerts in eu-west-1",
        "owner": "123456789012",
        "tags_all": {}
      } } ]
    },
    {
      "mode": "data",
      "type": "aws_region",
      "name": "current",
      "instances": [ { "schema_version": 0, "attributes": { "name": "eu-west-1" } } ]
    }
  ]
}"#;

const MAPPINGS: &str = r#"[
  {
    "logical_id": "Logs",
    "aws_type": "AWS::Logs::LogGroup",
    "terraform_type": "aws_cloudwatch_log_group",
    "physical_id": "/app/prod"
  },
  {
    "logical_id": "Topic",
    "aws_type": "AWS::SNS::Topic",
    "terraform_type": "aws_sns_topic",
    "physical_id": "arn:aws:sns:eu-west-1:123456789012:prod-alerts"
  }
]"#;

fn stack_files(dir: &Path) -> StackFiles {
    fs::write(dir.join("template.yaml"), TEMPLATE).unwrap();
    fs::write(dir.join("terraform.tfstate"), STATE).unwrap();
    fs::write(dir.join("mappings.json"), MAPPINGS).unwrap();
    fs::write(dir.join("parameters.json"), r#"{ "Env": "prod", "Retention": 30 }"#).unwrap();
    StackFiles {
        template: dir.join("template.yaml"),
        state: dir.join("terraform.tfstate"),
        mappings: dir.join("mappings.json"),
        parameters: Some(dir.join("parameters.json")),
        schema: None,
        traits: None,
    }
}

fn converter() -> Converter {
    Converter::new(ExportSettings::new("app-stack", "eu-west-1", "123456789012"))
}

#[test]
fn test_convert_stack() {
    let dir = tempfile::tempdir().unwrap();
    let stack = stack_files(dir.path()).load().unwrap();
    let result = converter().convert(&stack).unwrap();

    assert!(!result.diagnostics.has_errors(), "{}", result.diagnostics);
    let main = &result.main;
    assert!(main.contains("resource \"aws_cloudwatch_log_group\" \"Logs\" {\n"));
    assert!(main.contains("  name = \"/app/${var.Env}\"\n"));
    assert!(main.contains("  retention_in_days = var.Retention\n"));
    assert!(main.contains("  name = \"${var.Env}-alerts\"\n"));
    assert!(main.contains("  display_name = \"Alerts in ${data.aws_region.current.name}\"\n"));
    assert!(main.contains("data \"aws_region\" \"current\" {}"));
    assert!(main.contains("output \"TopicArn\" {\n"));
    assert!(main.contains("  value = aws_sns_topic.Topic.arn\n"));
    assert!(!main.contains("tags_all"));
    assert!(!main.contains("owner"));
    assert!(!main.contains("\"prod-alerts\""));
    assert!(hcl::parse(main).is_ok());

    assert!(result.tfvars.contains("Env = \"prod\"\n"));
    assert!(result.tfvars.contains("Retention = 30\n"));
}

#[test]
fn test_repair_and_write_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let stack = stack_files(dir.path()).load().unwrap();
    let converter = converter();
    let mut result = converter.convert(&stack).unwrap();
    let generated = result.main.clone();

    converter.repair(&mut result, &mut SyntaxCheck).unwrap();
    assert_eq!(result.main, generated);
    assert_eq!(result.repair_rounds, 0);
    assert_eq!(result.fixes_applied, 0);

    let out = dir.path().join("out");
    let written = write_outputs(&result, &out).unwrap();
    assert_eq!(written, vec![out.join("main.tf"), out.join("terraform.tfvars")]);
    assert_eq!(fs::read_to_string(out.join("main.tf")).unwrap(), result.main);
    assert_eq!(fs::read_to_string(out.join("terraform.tfvars")).unwrap(), result.tfvars);
}

#[test]
fn test_missing_terraform() {
    let dir = tempfile::tempdir().unwrap();
    let stack = stack_files(dir.path()).load().unwrap();
    let converter = converter();
    let mut result = converter.convert(&stack).unwrap();
    let mut runner = TerraformRunner::new(dir.path().join("work")).with_program(dir.path().join("no-terraform"));

    let err = converter.repair(&mut result, &mut runner).unwrap_err();
    assert!(matches!(err, ConvertError::TerraformNotFound(_)));
    assert!(!result.main.is_empty());
}

#[test]
fn test_workspace_write_failure_is_not_missing_terraform() {
    let dir = tempfile::tempdir().unwrap();
    let stack = stack_files(dir.path()).load().unwrap();
    let converter = converter();
    let mut result = converter.convert(&stack).unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let mut runner = TerraformRunner::new(blocker.join("work")).with_program(dir.path().join("no-terraform"));

    let err = converter.repair(&mut result, &mut runner).unwrap_err();
    assert!(matches!(err, ConvertError::Compile(CompileError::Io(_))), "unexpected error: {:?}", err);
}

#[test]
fn test_bad_mapping_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = stack_files(dir.path());
    fs::write(dir.path().join("bad.json"), "{ \"resources\": 3 }").unwrap();
    files.mappings = dir.path().join("bad.json");

    let err = files.load().unwrap_err();
    assert!(matches!(err, ConvertError::Json { .. }));
    assert!(err.to_string().contains("bad.json"));
}
