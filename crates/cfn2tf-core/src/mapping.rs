//! Resource address mapping: template resources to Terraform addresses.

use serde::Deserialize;

use crate::text::sanitize_label;

/// One translated resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceMapping {
    pub logical_id: String,
    pub aws_type: String,
    pub terraform_type: String,
    pub physical_id: String,
    /// Module the resource lives in, when not the root module.
    #[serde(default)]
    pub module: Option<String>,
}

impl ResourceMapping {
    pub fn new(
        logical_id: impl Into<String>,
        aws_type: impl Into<String>,
        terraform_type: impl Into<String>,
        physical_id: impl Into<String>,
    ) -> Self {
        ResourceMapping {
            logical_id: logical_id.into(),
            aws_type: aws_type.into(),
            terraform_type: terraform_type.into(),
            physical_id: physical_id.into(),
            module: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Terraform local name.
    pub fn name(&self) -> String {
        sanitize_label(&self.logical_id)
    }

    /// Address within its module: `{type}.{name}`.
    pub fn address(&self) -> String {
        format!("{}.{}", self.terraform_type, self.name())
    }

    /// Address from the root module, as `terraform import` wants it.
    pub fn import_address(&self) -> String {
        match &self.module {
            Some(module) => format!("module.{}.{}", module, self.address()),
            None => self.address(),
        }
    }
}

/// A nested stack that was translated into a child module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NestedModule {
    /// Logical id of the nested stack resource in the parent template.
    pub logical_id: String,
    /// Module name used in `module "{name}"`.
    pub name: String,
    #[serde(default)]
    pub outputs: Vec<String>,
}

/// Finds the mapping for a logical id.
pub fn find_mapping<'a>(mappings: &'a [ResourceMapping], logical_id: &str) -> Option<&'a ResourceMapping> {
    mappings.iter().find(|m| m.logical_id == logical_id)
}

/// Contents of a mapping file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingFile {
    pub resources: Vec<ResourceMapping>,
    pub modules: Vec<NestedModule>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMappingFile {
    List(Vec<ResourceMapping>),
    Full {
        resources: Vec<ResourceMapping>,
        #[serde(default)]
        modules: Vec<NestedModule>,
    },
}

/// Parses a mapping file: either a JSON list of resource mappings, or an
/// object with `resources` and `modules` lists.
pub fn parse_mappings(text: &str) -> Result<MappingFile, serde_json::Error> {
    Ok(match serde_json::from_str(text)? {
        RawMappingFile::List(resources) => MappingFile {
            resources,
            modules: Vec::new(),
        },
        RawMappingFile::Full { resources, modules } => MappingFile { resources, modules },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses() {
        let mapping = ResourceMapping::new("MyBucket", "AWS::S3::Bucket", "aws_s3_bucket", "b-1");
        assert_eq!(mapping.address(), "aws_s3_bucket.MyBucket");
        assert_eq!(mapping.import_address(), "aws_s3_bucket.MyBucket");

        let nested = mapping.with_module("storage");
        assert_eq!(nested.import_address(), "module.storage.aws_s3_bucket.MyBucket");
    }

    #[test]
    fn test_parse_mappings() {
        let file = parse_mappings(
            r#"[{
                "logical_id": "Queue",
                "aws_type": "AWS::SQS::Queue",
                "terraform_type": "aws_sqs_queue",
                "physical_id": "https://sqs.us-east-1.amazonaws.com/1/q"
            }]"#,
        )
        .unwrap();
        let mappings = file.resources;
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].module, None);
        assert!(file.modules.is_empty());
        assert!(find_mapping(&mappings, "Queue").is_some());
        assert!(find_mapping(&mappings, "Other").is_none());
    }

    #[test]
    fn test_parse_mappings_with_modules() {
        let file = parse_mappings(
            r#"{
                "resources": [
                    {
                        "logical_id": "Network",
                        "aws_type": "AWS::CloudFormation::Stack",
                        "terraform_type": "aws_cloudformation_stack",
                        "physical_id": "arn:aws:cloudformation:us-east-1:1:stack/net/1"
                    }
                ],
                "modules": [ { "logical_id": "Network", "name": "network", "outputs": ["VpcId"] } ]
            }"#,
        )
        .unwrap();
        assert_eq!(file.resources.len(), 1);
        assert_eq!(file.modules[0].name, "network");
        assert_eq!(file.modules[0].outputs, vec!["VpcId".to_string()]);
    }
}
