//! Template intrinsics to Terraform expressions.
//!
//! [`render`] is total over [`Intrinsic`]: every variant has an arm, and
//! the catch-all `Unsupported` variant is refused by name. The only side
//! effect is on the [`Declarations`] accumulator, which gains the data
//! sources that pseudo parameters, `Fn::GetAZs` and `Fn::ImportValue`
//! need.

use crate::declarations::{DataSource, Declarations, InputVariable};
use crate::mapping::{find_mapping, NestedModule, ResourceMapping};
use crate::reference::{FunctionArg, Reference};
use crate::template::{sub_parts, Expr, Intrinsic, SubPart, Template};
use crate::text::{escape_string, is_valid_identifier, quote, sanitize_label};
use crate::traits::TraitRegistry;

/// Prefix of a `Fn::GetAtt` attribute naming a nested stack output.
const STACK_OUTPUT_QUALIFIER: &str = "Outputs.";

/// Failure rendering an intrinsic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("no renderer for '{0}'")]
    NoRendererFor(String),
    #[error("reference \"{0}\" cannot be resolved")]
    UnresolvedReference(String),
    #[error("pseudo parameter \"{0}\" cannot be referenced by terraform")]
    UnsupportedPseudoParameter(String),
    #[error("invalid Fn::FindInMap key: {0}")]
    InvalidFindInMapKey(String),
    #[error("invalid {tag}: {detail}")]
    InvalidIntrinsic { tag: String, detail: String },
}

fn invalid(tag: &str, detail: impl Into<String>) -> RenderError {
    RenderError::InvalidIntrinsic {
        tag: tag.to_string(),
        detail: detail.into(),
    }
}

/// Read-only inputs shared by every render call of a run.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub template: &'a Template,
    pub mappings: &'a [ResourceMapping],
    pub traits: &'a TraitRegistry,
    /// Nested stacks that were translated into child modules.
    pub modules: &'a [NestedModule],
}

impl<'a> RenderContext<'a> {
    pub fn new(template: &'a Template, mappings: &'a [ResourceMapping], traits: &'a TraitRegistry) -> Self {
        RenderContext {
            template,
            mappings,
            traits,
            modules: &[],
        }
    }

    pub fn with_modules(mut self, modules: &'a [NestedModule]) -> Self {
        self.modules = modules;
        self
    }
}

/// The data source a pseudo parameter maps to: `(type, name, attribute)`.
pub fn pseudo_parameter(name: &str) -> Option<(&'static str, &'static str, &'static str)> {
    match name {
        "AWS::Region" => Some(("aws_region", "current", "name")),
        "AWS::AccountId" => Some(("aws_caller_identity", "current", "account_id")),
        "AWS::Partition" => Some(("aws_partition", "partition", "partition")),
        "AWS::URLSuffix" => Some(("aws_partition", "url_suffix", "dns_suffix")),
        _ => None,
    }
}

/// Renders an intrinsic, optionally indexed into (as `Fn::Select` does).
pub fn render(
    intrinsic: &Intrinsic,
    ctx: &RenderContext<'_>,
    decls: &mut Declarations,
    index: Option<usize>,
) -> Result<Reference, RenderError> {
    let reference = match intrinsic {
        Intrinsic::Ref(name) => return render_ref(name, ctx, decls, index),
        Intrinsic::GetAtt {
            logical_id,
            attribute,
        } => render_get_att(logical_id, attribute, ctx)?,
        Intrinsic::Sub {
            template,
            variables,
        } => render_sub(template, variables, ctx, decls)?,
        Intrinsic::Join { delimiter, items } => {
            let list = match items.as_ref() {
                Expr::List(items) => FunctionArg::List(
                    items
                        .iter()
                        .map(|item| join_item(item, ctx, decls))
                        .collect::<Result<_, _>>()?,
                ),
                Expr::Intrinsic(inner) => FunctionArg::Reference(render(inner, ctx, decls, None)?),
                _ => return Err(invalid("Fn::Join", "items must be a list")),
            };
            Reference::function("join", vec![FunctionArg::String(delimiter.clone()), list])
        }
        Intrinsic::Select { index: selector, items } => {
            let selected = selector
                .as_index()
                .ok_or_else(|| invalid("Fn::Select", "index must be a literal number"))?;
            return match items.as_ref() {
                Expr::Intrinsic(inner) => render(inner, ctx, decls, Some(selected)),
                Expr::List(list) => match list.get(selected) {
                    Some(Expr::Intrinsic(inner)) => render(inner, ctx, decls, index),
                    Some(_) => Err(invalid("Fn::Select", "selected item is a literal")),
                    None => Err(invalid(
                        "Fn::Select",
                        format!("index {} out of range for {} items", selected, list.len()),
                    )),
                },
                _ => Err(invalid("Fn::Select", "items must be a list")),
            };
        }
        Intrinsic::Split { delimiter, source } => Reference::function(
            "split",
            vec![
                FunctionArg::String(delimiter.clone()),
                function_arg("Fn::Split", source, ctx, decls)?,
            ],
        ),
        Intrinsic::Base64(value) => {
            Reference::function("base64encode", vec![function_arg("Fn::Base64", value, ctx, decls)?])
        }
        Intrinsic::Cidr {
            ip_block,
            count,
            cidr_bits,
        } => {
            let count = count
                .as_index()
                .ok_or_else(|| invalid("Fn::Cidr", "count must be a literal number"))?;
            let cidr_bits = cidr_bits
                .as_index()
                .ok_or_else(|| invalid("Fn::Cidr", "cidr bits must be a literal number"))?;
            let newbits = match ip_block.as_str() {
                Some(block) => subnet_newbits(block, cidr_bits)
                    .ok_or_else(|| invalid("Fn::Cidr", format!("'{}' is not a CIDR block", block)))?,
                None => {
                    log::warn!("Fn::Cidr over a computed block: using {} as the subnet bits", cidr_bits);
                    cidr_bits
                }
            };
            let mut args = vec![function_arg("Fn::Cidr", ip_block, ctx, decls)?];
            args.extend((0..count).map(|_| FunctionArg::Number(newbits as f64)));
            Reference::Function {
                name: "cidrsubnets".to_string(),
                args,
                index,
            }
        }
        Intrinsic::FindInMap {
            map_name,
            top_level_key,
            second_level_key,
        } => {
            let mut path = String::from("local.mappings");
            for key in [map_name, top_level_key, second_level_key] {
                path.push_str(&map_key(key, ctx, decls)?);
            }
            if let Some(i) = index {
                path.push_str(&format!("[{}]", i));
            }
            return Ok(Reference::Map(path));
        }
        Intrinsic::GetAZs(_) => {
            decls.register(InputVariable::DataSource(
                DataSource::new("aws_availability_zones", "available").with_argument("state", "available"),
            ));
            let attribute = match index {
                Some(i) => format!("names[{}]", i),
                None => "names".to_string(),
            };
            return Ok(Reference::data_source("aws_availability_zones", "available", attribute));
        }
        Intrinsic::ImportValue(name) => {
            let export = static_text(name, ctx.template)
                .ok_or_else(|| invalid("Fn::ImportValue", "export name must be known before deployment"))?;
            let label = sanitize_label(&export);
            decls.register(InputVariable::DataSource(
                DataSource::new("aws_cloudformation_export", label.as_str()).with_argument("name", export),
            ));
            Reference::data_source("aws_cloudformation_export", label, "value")
        }
        Intrinsic::Unsupported { tag } => return Err(RenderError::NoRendererFor(tag.clone())),
    };

    Ok(match index {
        Some(i) => reference.with_index(i),
        None => reference,
    })
}

fn render_ref(
    name: &str,
    ctx: &RenderContext<'_>,
    decls: &mut Declarations,
    index: Option<usize>,
) -> Result<Reference, RenderError> {
    if name.starts_with("AWS::") {
        let (data_type, data_name, attribute) =
            pseudo_parameter(name).ok_or_else(|| RenderError::UnsupportedPseudoParameter(name.to_string()))?;
        decls.register(InputVariable::DataSource(DataSource::new(data_type, data_name)));
        return Ok(Reference::DataSource {
            data_type: data_type.to_string(),
            name: data_name.to_string(),
            attribute: attribute.to_string(),
            is_parameter: true,
        });
    }

    if let Some(param) = ctx.template.parameter(name) {
        let declaration = InputVariable::from_parameter(param);
        let is_ssm = matches!(declaration, InputVariable::DataSource(_));
        decls.register(declaration);
        if is_ssm {
            return Ok(Reference::DataSource {
                data_type: "aws_ssm_parameter".to_string(),
                name: name.to_string(),
                attribute: "value".to_string(),
                is_parameter: true,
            });
        }
        return Ok(Reference::InputVariable {
            name: name.to_string(),
            index,
        });
    }

    let mapping = find_mapping(ctx.mappings, name)
        .filter(|_| ctx.template.resource(name).is_some())
        .ok_or_else(|| RenderError::UnresolvedReference(name.to_string()))?;
    let reference = Reference::Direct(mapping.address());
    Ok(match index {
        Some(i) => reference.with_index(i),
        None => reference,
    })
}

fn render_get_att(logical_id: &str, attribute: &Expr, ctx: &RenderContext<'_>) -> Result<Reference, RenderError> {
    let attribute = match attribute {
        Expr::String(s) => s.clone(),
        Expr::Intrinsic(Intrinsic::Ref(param)) => ctx
            .template
            .parameter(param)
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| RenderError::UnresolvedReference(param.clone()))?,
        _ => return Err(invalid("Fn::GetAtt", "attribute name must be a string or a Ref")),
    };

    if let Some(output) = attribute.strip_prefix(STACK_OUTPUT_QUALIFIER) {
        if let Some(module) = ctx
            .modules
            .iter()
            .find(|m| m.logical_id == logical_id && m.outputs.iter().any(|o| o == output))
        {
            return Ok(Reference::Module(format!("{}.{}", module.name, output)));
        }
    }

    let mapping = find_mapping(ctx.mappings, logical_id)
        .filter(|_| ctx.template.resource(logical_id).is_some())
        .ok_or_else(|| RenderError::UnresolvedReference(logical_id.to_string()))?;

    let attribute = match attribute.strip_prefix(STACK_OUTPUT_QUALIFIER) {
        // Not translated to a module: the stack stays an aws_cloudformation_stack.
        Some(output) => format!("outputs.{}", output),
        None => ctx
            .traits
            .get_traits(&mapping.terraform_type)
            .map_attribute_name(&attribute),
    };
    Ok(Reference::Indirect(format!("{}.{}", mapping.address(), attribute)))
}

/// Builds an interpolated string. Any placeholder that fails to render
/// fails the whole string.
fn render_sub(
    template: &str,
    variables: &[(String, Expr)],
    ctx: &RenderContext<'_>,
    decls: &mut Declarations,
) -> Result<Reference, RenderError> {
    let mut body = String::new();
    for part in sub_parts(template) {
        match part {
            SubPart::Literal(text) => body.push_str(&escape_string(&text)),
            SubPart::Placeholder(name) => {
                if let Some((_, value)) = variables.iter().find(|(v, _)| *v == name) {
                    match value {
                        Expr::Intrinsic(inner) => {
                            let reference = render(inner, ctx, decls, None)?;
                            body.push_str(&interpolate(&reference));
                        }
                        other => body.push_str(&escape_string(&literal_text(other).ok_or_else(|| {
                            invalid("Fn::Sub", format!("variable '{}' is not a scalar", name))
                        })?)),
                    }
                    continue;
                }
                let reference = match name.split_once('.') {
                    Some((id, attr)) if !name.starts_with("AWS::") => render_get_att(id, &Expr::String(attr.to_string()), ctx)?,
                    _ => render_ref(&name, ctx, decls, None)?,
                };
                body.push_str(&interpolate(&reference));
            }
        }
    }
    Ok(Reference::Interpolation(body))
}

/// A reference inside an interpolated string. Nested interpolations are
/// spliced in rather than wrapped.
fn interpolate(reference: &Reference) -> String {
    match reference {
        Reference::Interpolation(body) => body.clone(),
        other => format!("${{{}}}", other.expression()),
    }
}

fn join_item(item: &Expr, ctx: &RenderContext<'_>, decls: &mut Declarations) -> Result<FunctionArg, RenderError> {
    match item {
        Expr::Intrinsic(inner) => Ok(FunctionArg::Reference(render(inner, ctx, decls, None)?)),
        // join() takes strings.
        other => literal_text(other)
            .map(FunctionArg::String)
            .ok_or_else(|| invalid("Fn::Join", "items must be scalars")),
    }
}

fn function_arg(
    tag: &str,
    expr: &Expr,
    ctx: &RenderContext<'_>,
    decls: &mut Declarations,
) -> Result<FunctionArg, RenderError> {
    Ok(match expr {
        Expr::Intrinsic(inner) => FunctionArg::Reference(render(inner, ctx, decls, None)?),
        Expr::String(s) => FunctionArg::String(s.clone()),
        Expr::Number(n) => FunctionArg::Number(*n),
        Expr::Bool(b) => FunctionArg::Bool(*b),
        Expr::Null => FunctionArg::String(String::new()),
        Expr::List(items) => FunctionArg::List(
            items
                .iter()
                .map(|i| function_arg(tag, i, ctx, decls))
                .collect::<Result<_, _>>()?,
        ),
        Expr::Object(_) => return Err(invalid(tag, "objects cannot be function arguments")),
    })
}

/// One traversal step into `local.mappings`.
fn map_key(key: &Expr, ctx: &RenderContext<'_>, decls: &mut Declarations) -> Result<String, RenderError> {
    match key {
        Expr::String(s) if is_valid_identifier(s) => Ok(format!(".{}", s)),
        Expr::String(s) => Ok(format!("[{}]", quote(s))),
        Expr::Intrinsic(inner @ Intrinsic::Ref(_)) => {
            Ok(format!("[{}]", render(inner, ctx, decls, None)?.expression()))
        }
        Expr::Intrinsic(inner) => Err(RenderError::InvalidFindInMapKey(format!(
            "intrinsic \"{}\" cannot be resolved",
            inner.tag()
        ))),
        other => Err(RenderError::InvalidFindInMapKey(format!("{:?} is not a key", other))),
    }
}

fn literal_text(expr: &Expr) -> Option<String> {
    match expr {
        Expr::String(s) => Some(s.clone()),
        Expr::Number(n) => Some(crate::text::format_number(*n)),
        Expr::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text of an expression that only depends on parameter values.
fn static_text(expr: &Expr, template: &Template) -> Option<String> {
    match expr {
        Expr::Intrinsic(Intrinsic::Ref(name)) => template.parameter(name)?.value().map(str::to_string),
        Expr::Intrinsic(Intrinsic::Sub {
            template: text,
            variables,
        }) => {
            let mut result = String::new();
            for part in sub_parts(text) {
                match part {
                    SubPart::Literal(s) => result.push_str(&s),
                    SubPart::Placeholder(name) => {
                        let value = match variables.iter().find(|(v, _)| *v == name) {
                            Some((_, value)) => static_text(value, template)?,
                            None => template.parameter(&name)?.value()?.to_string(),
                        };
                        result.push_str(&value);
                    }
                }
            }
            Some(result)
        }
        other => literal_text(other),
    }
}

/// Converts the per-subnet host bit count of `Fn::Cidr` into the extra
/// prefix bits `cidrsubnets` expects.
fn subnet_newbits(block: &str, cidr_bits: usize) -> Option<usize> {
    let (address, prefix) = block.split_once('/')?;
    let prefix: usize = prefix.trim().parse().ok()?;
    let width: usize = if address.contains(':') { 128 } else { 32 };
    width.checked_sub(cidr_bits)?.checked_sub(prefix)
}
