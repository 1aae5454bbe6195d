//! The `terraform` and `provider "aws"` blocks.


use crate::text::quote;

/// Error building the provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("an AWS region must be set for the provider block")]
    MissingRegion,
}

/// Builder for the configuration preamble of `main.tf`.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationBlockBuilder {
    region: Option<String>,
    stack_name_tag: Option<String>,
}

impl ConfigurationBlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Tags every resource with the stack it came from via `default_tags`.
    pub fn with_default_tag(mut self, stack_name: Option<String>) -> Self {
        self.stack_name_tag = stack_name;
        self
    }

    pub fn build(&self) -> Result<String, ConfigError> {
        let region = self
            .region
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or(ConfigError::MissingRegion)?;

        let mut w = String::new();
        w.push_str("terraform {\n");
        w.push_str("  required_providers {\n");
        w.push_str("    aws = {\n");
        w.push_str("      source = \"hashicorp/aws\"\n");
        w.push_str("    }\n");
        w.push_str("  }\n");
        w.push_str("}\n\n");
        w.push_str("provider \"aws\" {\n");
        w.push_str(&format!("  region = {}\n", quote(region)));
        if let Some(stack_name) = &self.stack_name_tag {
            w.push_str("  default_tags {\n");
            w.push_str("    tags = {\n");
            w.push_str(&format!("      \"terraform:stack_name\" = {}\n", quote(stack_name)));
            w.push_str("    }\n");
            w.push_str("  }\n");
        }
        w.push_str("}\n\n");
        Ok(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_region_required() {
        assert_eq!(
            ConfigurationBlockBuilder::new().build(),
            Err(ConfigError::MissingRegion)
        );
        assert_eq!(
            ConfigurationBlockBuilder::new().with_region("").build(),
            Err(ConfigError::MissingRegion)
        );
    }

    #[test]
    fn test_default_tags() {
        let text = ConfigurationBlockBuilder::new()
            .with_region("eu-west-1")
            .with_default_tag(Some("demo".into()))
            .build()
            .unwrap();
        assert!(text.contains("  region = \"eu-west-1\"\n"));
        assert!(text.contains("      \"terraform:stack_name\" = \"demo\"\n"));
        let body = hcl::parse(&text).unwrap();
        assert_eq!(body.blocks().count(), 2);
    }

    #[test]
    fn test_without_tags() {
        let text = ConfigurationBlockBuilder::new()
            .with_region("us-east-1")
            .build()
            .unwrap();
        assert!(!text.contains("default_tags"));
        assert!(text.ends_with("provider \"aws\" {\n  region = \"us-east-1\"\n}\n\n"));
    }
}
