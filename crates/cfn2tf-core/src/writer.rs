//! Assembly of `main.tf` and `terraform.tfvars`.
//!
//! `main.tf` is written in a fixed order: provider configuration,
//! declarations, mapping locals, resources, outputs. Each resource is
//! serialized and emitted on its own; a resource that fails is reported
//! and left out, and the rest of the document is still produced.

use crate::declarations::Declarations;
use crate::diag::Diagnostics;
use crate::emitter::HclEmitter;
use crate::mapping::{NestedModule, ResourceMapping};
use crate::mappings::MappingSectionEmitter;
use crate::outputs::resolve_outputs;
use crate::provider::{ConfigError, ConfigurationBlockBuilder};
use crate::render::RenderContext;
use crate::repair::HclScript;
use crate::resolver::DependencyResolver;
use crate::schema::ProviderSchema;
use crate::serializer::serialize_resource;
use crate::settings::ExportSettings;
use crate::state::{StateFile, StateResource};
use crate::template::{EvalContext, LiveResource, Template};
use crate::traits::TraitRegistry;
use crate::value::Value;

pub const MAIN_SCRIPT_FILE: &str = "main.tf";
pub const VARS_FILE: &str = "terraform.tfvars";

/// The generated documents.
#[derive(Debug, Clone, Default)]
pub struct Documents {
    pub main: String,
    pub tfvars: String,
    pub diagnostics: Diagnostics,
}

/// Inputs describing the deployed stack.
#[derive(Clone, Copy)]
pub struct StackInputs<'a> {
    pub template: &'a Template,
    pub state: &'a StateFile,
    pub mappings: &'a [ResourceMapping],
    pub modules: &'a [NestedModule],
}

/// Writes the documents for one stack.
pub struct HclWriter<'a> {
    registry: &'a TraitRegistry,
    schemas: &'a ProviderSchema,
    settings: &'a ExportSettings,
}

/// A state resource with its mapping and literal attributes.
struct Entry<'s> {
    resource: &'s StateResource,
    mapping: Option<&'s ResourceMapping>,
    attributes: Value,
}

impl<'a> HclWriter<'a> {
    pub fn new(registry: &'a TraitRegistry, schemas: &'a ProviderSchema, settings: &'a ExportSettings) -> Self {
        HclWriter {
            registry,
            schemas,
            settings,
        }
    }

    pub fn write(&self, inputs: StackInputs<'_>) -> Result<Documents, ConfigError> {
        log::info!("writing {}", MAIN_SCRIPT_FILE);
        let providers = ConfigurationBlockBuilder::new()
            .with_region(self.settings.region.as_str())
            .with_default_tag(self.settings.add_default_tag.then(|| self.settings.stack_name.clone()))
            .build()?;

        let mut diags = Diagnostics::new();
        let mut decls = Declarations::from_template(inputs.template);
        let entries = self.entries(inputs, &mut diags);

        let pseudo = self.settings.pseudo_values();
        let mut eval = EvalContext::new(inputs.template, &pseudo, self.registry);
        for entry in &entries {
            if let Some(mapping) = entry.mapping {
                eval.add_resource(
                    &mapping.logical_id,
                    LiveResource {
                        terraform_type: &mapping.terraform_type,
                        physical_id: &mapping.physical_id,
                        attributes: Some(&entry.attributes),
                    },
                );
            }
        }

        log::info!("resolving dependencies between resources");
        let render = RenderContext::new(inputs.template, inputs.mappings, self.registry).with_modules(inputs.modules);
        let resolver = DependencyResolver::new(render, &eval);

        let mut emitter = HclEmitter::new(self.registry);
        for entry in &entries {
            let resource = entry.resource;
            let traits = self.registry.get_traits(&resource.resource_type);
            let schema = self.schemas.resource_schema(&resource.resource_type);
            let mut attributes = entry.attributes.clone();
            if let Some(mapping) = entry.mapping {
                resolver.resolve(mapping, &traits, &mut attributes, &mut decls, &mut diags);
            }
            let events = serialize_resource(&resource.resource_type, &resource.name, &attributes, &traits, &schema);
            diags.extend(emitter.emit_all(events));
        }
        let written = emitter.output().to_string();
        let resources = match emitter.finish() {
            Ok(text) => text,
            Err(err) => {
                diags.error(Some(err.address().to_string()), "resource could not be written", err.to_string());
                written
            }
        };

        let mut main = providers;
        main.push_str(&decls.to_hcl());
        main.push_str(&MappingSectionEmitter::new(&inputs.template.mappings).emit());
        main.push_str(&resources);
        for output in resolve_outputs(inputs.template, inputs.mappings, &eval) {
            main.push_str(&output.to_hcl());
            main.push('\n');
        }

        let mut script = HclScript::new(&main);
        let replaced = script.fix_up_variable_references(decls.variables());
        if replaced > 0 {
            log::debug!("{} literal(s) replaced with variable references", replaced);
            main = script.to_string();
        }

        log::info!("writing {}", VARS_FILE);
        Ok(Documents {
            main,
            tfvars: decls.to_tfvars(&self.settings.stack_name),
            diagnostics: diags,
        })
    }

    /// State resources of the exported module, dependencies first.
    fn entries<'s>(&self, inputs: StackInputs<'s>, diags: &mut Diagnostics) -> Vec<Entry<'s>> {
        let mut entries: Vec<Entry<'s>> = inputs
            .state
            .filtered_resources(self.settings.module.as_deref())
            .into_iter()
            .map(|resource| Entry {
                resource,
                mapping: inputs
                    .mappings
                    .iter()
                    .find(|m| m.terraform_type == resource.resource_type && m.name() == resource.name),
                attributes: resource.attributes().cloned().map(Value::from).unwrap_or(Value::Null),
            })
            .collect();

        for mapping in inputs.mappings {
            if !entries.iter().any(|e| e.mapping == Some(mapping)) {
                log::warn!("{}: not found in state", mapping.address());
                diags.warning(
                    Some(mapping.address()),
                    "resource not found in state",
                    format!("{} ({}) was not imported", mapping.logical_id, mapping.aws_type),
                );
            }
        }

        let order = inputs.template.resource_order();
        let rank = |entry: &Entry<'_>| {
            entry
                .mapping
                .and_then(|m| order.iter().position(|id| *id == m.logical_id))
                .unwrap_or(order.len())
        };
        entries.sort_by_key(|e| rank(e));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = r#"
Parameters:
  Env:
    Type: String
    Default: dev
Resources:
  Policy:
    Type: AWS::S3::BucketPolicy
    Properties:
      Bucket: !Ref Bucket
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !Sub '${Env}-data'
Outputs:
  BucketName:
    Value: !Ref Bucket
"#;

    const STATE: &str = r#"{
        "version": 4,
        "terraform_version": "1.5.0",
        "resources": [
            {
                "mode": "managed",
                "type": "aws_s3_bucket_policy",
                "name": "Policy",
                "provider": "provider[\"registry.terraform.io/hashicorp/aws\"]",
                "instances": [ { "schema_version": 0, "attributes": {
                    "id": "dev-data",
                    "bucket": "dev-data",
                    "policy": "{\"Version\":\"2012-10-17\",\"Statement\":[]}"
                } } ]
            },
            {
                "mode": "managed",
                "type": "aws_s3_bucket",
                "name": "Bucket",
                "provider": "provider[\"registry.terraform.io/hashicorp/aws\"]",
                "instances": [ { "schema_version": 0, "attributes": {
                    "id": "dev-data",
                    "arn": "arn:aws:s3:::dev-data",
                    "bucket": "dev-data",
                    "acl": null,
                    "tags_all": {}
                } } ]
            }
        ]
    }"#;

    #[test]
    fn test_write_documents() {
        let template = Template::parse(TEMPLATE).unwrap();
        let state = StateFile::from_json(STATE).unwrap();
        let mappings = vec![
            ResourceMapping::new("Policy", "AWS::S3::BucketPolicy", "aws_s3_bucket_policy", "dev-data"),
            ResourceMapping::new("Bucket", "AWS::S3::Bucket", "aws_s3_bucket", "dev-data"),
        ];
        let registry = TraitRegistry::builtin().unwrap();
        let schemas = ProviderSchema::default();
        let mut settings = ExportSettings::new("demo", "us-east-1", "123456789012");
        settings.add_default_tag = true;

        let docs = HclWriter::new(&registry, &schemas, &settings)
            .write(StackInputs {
                template: &template,
                state: &state,
                mappings: &mappings,
                modules: &[],
            })
            .unwrap();

        assert!(docs.diagnostics.is_empty(), "{}", docs.diagnostics);
        let main = &docs.main;
        let provider = main.find("provider \"aws\"").unwrap();
        let variable = main.find("variable \"Env\"").unwrap();
        let bucket = main.find("resource \"aws_s3_bucket\" \"Bucket\"").unwrap();
        let policy = main.find("resource \"aws_s3_bucket_policy\" \"Policy\"").unwrap();
        let output = main.find("output \"BucketName\"").unwrap();
        assert!(provider < variable && variable < bucket && bucket < policy && policy < output);

        assert!(main.contains("  bucket = \"${var.Env}-data\"\n"));
        assert!(main.contains("  acl = \"private\"\n"));
        assert!(main.contains("  bucket = aws_s3_bucket.Bucket.id\n"));
        assert!(main.contains("  value = aws_s3_bucket.Bucket.id\n"));
        assert!(!main.contains("tags_all"));
        assert!(!main.contains("arn:aws:s3:::dev-data"));
        assert!(hcl::parse(main).is_ok());

        assert!(docs.tfvars.contains("stack \"demo\""));
    }

    #[test]
    fn test_missing_region() {
        let template = Template::default();
        let state = StateFile::default();
        let registry = TraitRegistry::builtin().unwrap();
        let schemas = ProviderSchema::default();
        let settings = ExportSettings::new("demo", "", "1");
        let err = HclWriter::new(&registry, &schemas, &settings)
            .write(StackInputs {
                template: &template,
                state: &state,
                mappings: &[],
                modules: &[],
            })
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingRegion);
    }

    #[test]
    fn test_missing_state_resource_is_warning() {
        let template = Template::parse(TEMPLATE).unwrap();
        let state = StateFile::default();
        let mappings = vec![ResourceMapping::new("Bucket", "AWS::S3::Bucket", "aws_s3_bucket", "dev-data")];
        let registry = TraitRegistry::builtin().unwrap();
        let schemas = ProviderSchema::default();
        let settings = ExportSettings::new("demo", "us-east-1", "1");
        let docs = HclWriter::new(&registry, &schemas, &settings)
            .write(StackInputs {
                template: &template,
                state: &state,
                mappings: &mappings,
                modules: &[],
            })
            .unwrap();
        assert!(docs.diagnostics.has_warnings());
        assert!(!docs.diagnostics.has_errors());
    }
}
