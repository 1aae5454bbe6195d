//! Terraform state file model.
//!
//! Only the parts the translator reads are modeled; unknown fields are
//! ignored.

use serde::Deserialize;

/// A `terraform.tfstate` document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StateFile {
    pub version: u32,
    pub terraform_version: String,
    pub resources: Vec<StateResource>,
}

/// One resource entry in the state.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StateResource {
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub module: Option<String>,
    pub provider: String,
    pub instances: Vec<StateInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StateInstance {
    pub schema_version: u32,
    pub attributes: serde_json::Value,
}

impl StateFile {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Managed resources in `module`, or in the root module when `None`.
    ///
    /// State names modules `module.{name}`; both that form and the bare
    /// name are accepted.
    pub fn filtered_resources(&self, module: Option<&str>) -> Vec<&StateResource> {
        self.resources
            .iter()
            .filter(|r| {
                r.mode == "managed"
                    && match (module, r.module.as_deref()) {
                        (None, None) => true,
                        (Some(wanted), Some(actual)) => {
                            actual == wanted || actual.strip_prefix("module.") == Some(wanted)
                        }
                        _ => false,
                    }
            })
            .collect()
    }
}

impl StateResource {
    /// Address within its module.
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    /// Attributes of the first instance.
    pub fn attributes(&self) -> Option<&serde_json::Value> {
        self.instances.first().map(|i| &i.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STATE: &str = r#"{
        "version": 4,
        "terraform_version": "1.6.0",
        "resources": [
            {
                "mode": "managed", "type": "aws_s3_bucket", "name": "Bucket",
                "provider": "provider[\"registry.terraform.io/hashicorp/aws\"]",
                "instances": [ { "schema_version": 0, "attributes": { "bucket": "b" } } ]
            },
            {
                "mode": "data", "type": "aws_region", "name": "current",
                "instances": [ { "attributes": { "name": "us-east-1" } } ]
            },
            {
                "module": "module.storage",
                "mode": "managed", "type": "aws_sqs_queue", "name": "Queue",
                "instances": []
            }
        ]
    }"#;

    #[test]
    fn test_parse_state() {
        let state = StateFile::from_json(STATE).unwrap();
        assert_eq!(state.version, 4);
        assert_eq!(state.resources.len(), 3);
        assert_eq!(state.resources[0].address(), "aws_s3_bucket.Bucket");
        assert_eq!(
            state.resources[0].attributes().and_then(|a| a.get("bucket")),
            Some(&serde_json::json!("b"))
        );
        assert!(state.resources[2].attributes().is_none());
    }

    #[test]
    fn test_filtered_resources() {
        let state = StateFile::from_json(STATE).unwrap();
        let root: Vec<_> = state.filtered_resources(None).into_iter().map(|r| r.name.as_str()).collect();
        assert_eq!(root, vec!["Bucket"]);
        let nested: Vec<_> = state
            .filtered_resources(Some("storage"))
            .into_iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(nested, vec!["Queue"]);
    }
}
