//! Rendered Terraform expressions standing in for template intrinsics.

use std::fmt;

use crate::text::{escape_string, format_number};

/// A resolved Terraform expression.
///
/// Every variant has exactly one textual form, returned by
/// [`Reference::expression`]. Expressions are emitted unquoted.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// Link to a resource by its address; renders `{address}.id`.
    Direct(String),
    /// Link to a resource attribute; carries `address.attribute`.
    Indirect(String),
    /// Input variable, optionally indexed: `var.name[index]`.
    InputVariable { name: String, index: Option<usize> },
    /// Attribute of a data source: `data.{type}.{name}.{attribute}`.
    DataSource {
        data_type: String,
        name: String,
        attribute: String,
        /// True when the data source stands in for a template parameter.
        is_parameter: bool,
    },
    /// Output of a child module; carries `name.output`.
    Module(String),
    /// Function call: `name(args...)[index]`.
    Function {
        name: String,
        args: Vec<FunctionArg>,
        index: Option<usize>,
    },
    /// Interpolated string. Carries the template body without the
    /// surrounding quotes; `${...}` sequences are live.
    Interpolation(String),
    /// Lookup into `local.mappings`; carries the full traversal.
    Map(String),
}

/// An argument to a [`Reference::Function`].
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    String(String),
    Number(f64),
    Bool(bool),
    Reference(Reference),
    List(Vec<FunctionArg>),
}

impl Reference {
    /// Creates a function reference without an index.
    pub fn function(name: impl Into<String>, args: Vec<FunctionArg>) -> Self {
        Reference::Function {
            name: name.into(),
            args,
            index: None,
        }
    }

    /// Creates a data source attribute reference.
    pub fn data_source(
        data_type: impl Into<String>,
        name: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Reference::DataSource {
            data_type: data_type.into(),
            name: name.into(),
            attribute: attribute.into(),
            is_parameter: false,
        }
    }

    /// The Terraform expression text.
    pub fn expression(&self) -> String {
        match self {
            Reference::Direct(address) => format!("{}.id", address),
            Reference::Indirect(attr) => attr.clone(),
            Reference::InputVariable { name, index } => match index {
                Some(i) => format!("var.{}[{}]", name, i),
                None => format!("var.{}", name),
            },
            Reference::DataSource {
                data_type,
                name,
                attribute,
                ..
            } => format!("data.{}.{}.{}", data_type, name, attribute),
            Reference::Module(path) => format!("module.{}", path),
            Reference::Function { name, args, index } => {
                let args: Vec<String> = args.iter().map(FunctionArg::expression).collect();
                let mut expr = format!("{}({})", name, args.join(", "));
                if let Some(i) = index {
                    expr.push_str(&format!("[{}]", i));
                }
                expr
            }
            Reference::Interpolation(body) => format!("\"{}\"", body),
            Reference::Map(path) => path.clone(),
        }
    }

    /// Returns this reference indexed into, as a `Select` needs.
    ///
    /// Variables and function calls take the index directly; anything
    /// else is wrapped in `element()`.
    pub fn with_index(self, index: usize) -> Reference {
        match self {
            Reference::InputVariable { name, .. } => Reference::InputVariable {
                name,
                index: Some(index),
            },
            Reference::Function { name, args, .. } => Reference::Function {
                name,
                args,
                index: Some(index),
            },
            Reference::Map(path) => Reference::Map(format!("{}[{}]", path, index)),
            other => Reference::function(
                "element",
                vec![
                    FunctionArg::Reference(other),
                    FunctionArg::Number(index as f64),
                ],
            ),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

impl FunctionArg {
    /// The argument as it appears inside a call.
    pub fn expression(&self) -> String {
        match self {
            FunctionArg::String(s) => format!("\"{}\"", escape_string(s)),
            FunctionArg::Number(n) => format_number(*n),
            FunctionArg::Bool(b) => b.to_string(),
            FunctionArg::Reference(r) => r.expression(),
            FunctionArg::List(items) => {
                let items: Vec<String> = items.iter().map(FunctionArg::expression).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_direct_and_indirect() {
        assert_eq!(
            Reference::Direct("aws_s3_bucket.Logs".into()).expression(),
            "aws_s3_bucket.Logs.id"
        );
        assert_eq!(
            Reference::Indirect("aws_iam_role.Role.arn".into()).expression(),
            "aws_iam_role.Role.arn"
        );
    }

    #[test]
    fn test_input_variable() {
        let plain = Reference::InputVariable {
            name: "env".into(),
            index: None,
        };
        assert_eq!(plain.expression(), "var.env");
        assert_eq!(plain.with_index(2).expression(), "var.env[2]");
    }

    #[test]
    fn test_data_source() {
        let r = Reference::data_source("aws_region", "current", "name");
        assert_eq!(r.expression(), "data.aws_region.current.name");
    }

    #[test]
    fn test_module() {
        assert_eq!(
            Reference::Module("network.vpc_id".into()).expression(),
            "module.network.vpc_id"
        );
    }

    #[test]
    fn test_function_args() {
        let r = Reference::function(
            "join",
            vec![
                FunctionArg::String(",".into()),
                FunctionArg::List(vec![
                    FunctionArg::String("a".into()),
                    FunctionArg::Reference(Reference::Direct("aws_sqs_queue.Q".into())),
                ]),
            ],
        );
        assert_eq!(r.expression(), "join(\",\", [\"a\", aws_sqs_queue.Q.id])");
    }

    #[test]
    fn test_function_list_valued_reference_is_bare() {
        let r = Reference::function(
            "join",
            vec![
                FunctionArg::String(",".into()),
                FunctionArg::Reference(Reference::InputVariable {
                    name: "subnets".into(),
                    index: None,
                }),
            ],
        );
        assert_eq!(r.expression(), "join(\",\", var.subnets)");
        let single = FunctionArg::List(vec![FunctionArg::Reference(Reference::Direct(
            "aws_sqs_queue.Q".into(),
        ))]);
        assert_eq!(single.expression(), "[aws_sqs_queue.Q.id]");
    }

    #[test]
    fn test_function_index_and_scalars() {
        let r = Reference::function(
            "cidrsubnets",
            vec![
                FunctionArg::String("10.0.0.0/16".into()),
                FunctionArg::Number(8.0),
                FunctionArg::Number(8.0),
            ],
        )
        .with_index(1);
        assert_eq!(r.expression(), "cidrsubnets(\"10.0.0.0/16\", 8, 8)[1]");
        assert_eq!(FunctionArg::Bool(true).expression(), "true");
    }

    #[test]
    fn test_interpolation_is_quoted_once() {
        let r = Reference::Interpolation("${var.env}-logs".into());
        assert_eq!(r.expression(), "\"${var.env}-logs\"");
    }

    #[test]
    fn test_with_index_wraps_attribute() {
        let r = Reference::Indirect("aws_vpc.Vpc.cidr_block_associations".into()).with_index(0);
        assert_eq!(
            r.expression(),
            "element(aws_vpc.Vpc.cidr_block_associations, 0)"
        );
    }
}
