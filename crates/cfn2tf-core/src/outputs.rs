//! Template outputs as `output` blocks.


use crate::mapping::{find_mapping, ResourceMapping};
use crate::template::{EvalContext, Expr, Intrinsic, Template};
use crate::text::quote;

/// One `output` block.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputValue {
    pub name: String,
    /// Expression text, e.g. `aws_s3_bucket.Bucket.id`.
    pub reference: String,
    pub description: Option<String>,
}

impl OutputValue {
    pub fn to_hcl(&self) -> String {
        let mut w = String::new();
        w.push_str(&format!("output {} {{\n", quote(&self.name)));
        w.push_str(&format!("  value = {}\n", self.reference));
        if let Some(description) = &self.description {
            w.push_str(&format!("  description = {}\n", quote(description)));
        }
        w.push_str("}\n");
        w
    }
}

/// Outputs whose value is a `Ref` to a translated resource. A reference
/// that evaluates to an ARN points at the `arn` attribute, anything else
/// at `id`. Other outputs are skipped.
pub fn resolve_outputs(template: &Template, mappings: &[ResourceMapping], eval: &EvalContext<'_>) -> Vec<OutputValue> {
    let mut outputs = Vec::new();
    for output in &template.outputs {
        let Expr::Intrinsic(Intrinsic::Ref(name)) = &output.value else {
            log::debug!("output {} is not a resource reference, skipped", output.name);
            continue;
        };
        let Some(mapping) = find_mapping(mappings, name) else {
            continue;
        };
        let is_arn = eval
            .evaluate_string(&output.value)
            .is_some_and(|v| v.starts_with("arn:"));
        let attribute = if is_arn { "arn" } else { "id" };
        outputs.push(OutputValue {
            name: output.name.clone(),
            reference: format!("{}.{}", mapping.address(), attribute),
            description: output.description.clone().filter(|d| !d.is_empty()),
        });
    }
    outputs
}
