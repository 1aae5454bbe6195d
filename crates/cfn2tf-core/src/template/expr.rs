use serde_json::Value as JsonValue;

use super::TemplateError;

/// A template value: a literal or an intrinsic function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Expr>),
    /// Object with keys in source order.
    Object(Vec<(String, Expr)>),
    Intrinsic(Intrinsic),
}

/// The closed set of template intrinsic functions.
///
/// One variant per function; anything else lands in `Unsupported` so the
/// renderer can refuse it by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Intrinsic {
    /// `Ref` to a parameter, pseudo parameter or resource.
    Ref(String),
    /// `Fn::GetAtt`. The attribute name may itself be a `Ref`.
    GetAtt {
        logical_id: String,
        attribute: Box<Expr>,
    },
    /// `Fn::Sub` with optional explicit variables.
    Sub {
        template: String,
        variables: Vec<(String, Expr)>,
    },
    /// `Fn::Join`. `items` is a list literal or a list-valued intrinsic.
    Join {
        delimiter: String,
        items: Box<Expr>,
    },
    /// `Fn::Select`.
    Select { index: Box<Expr>, items: Box<Expr> },
    /// `Fn::Split`.
    Split { delimiter: String, source: Box<Expr> },
    /// `Fn::Base64`.
    Base64(Box<Expr>),
    /// `Fn::Cidr`.
    Cidr {
        ip_block: Box<Expr>,
        count: Box<Expr>,
        cidr_bits: Box<Expr>,
    },
    /// `Fn::FindInMap`.
    FindInMap {
        map_name: Box<Expr>,
        top_level_key: Box<Expr>,
        second_level_key: Box<Expr>,
    },
    /// `Fn::GetAZs`.
    GetAZs(Box<Expr>),
    /// `Fn::ImportValue`.
    ImportValue(Box<Expr>),
    /// Any other `Fn::*` function.
    Unsupported { tag: String },
}

impl Intrinsic {
    /// The template tag (`Ref`, `Fn::GetAtt`, ...).
    pub fn tag(&self) -> &str {
        match self {
            Intrinsic::Ref(_) => "Ref",
            Intrinsic::GetAtt { .. } => "Fn::GetAtt",
            Intrinsic::Sub { .. } => "Fn::Sub",
            Intrinsic::Join { .. } => "Fn::Join",
            Intrinsic::Select { .. } => "Fn::Select",
            Intrinsic::Split { .. } => "Fn::Split",
            Intrinsic::Base64(_) => "Fn::Base64",
            Intrinsic::Cidr { .. } => "Fn::Cidr",
            Intrinsic::FindInMap { .. } => "Fn::FindInMap",
            Intrinsic::GetAZs(_) => "Fn::GetAZs",
            Intrinsic::ImportValue(_) => "Fn::ImportValue",
            Intrinsic::Unsupported { tag } => tag,
        }
    }
}

impl Expr {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_intrinsic(&self) -> Option<&Intrinsic> {
        match self {
            Expr::Intrinsic(i) => Some(i),
            _ => None,
        }
    }

    /// Literal index value: a number or a numeric string.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Expr::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
            Expr::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Collects the outermost intrinsics in this expression, depth first.
    ///
    /// Arguments of an intrinsic are not searched; the intrinsic is
    /// rendered as a whole.
    pub fn intrinsics(&self) -> Vec<&Intrinsic> {
        let mut found = Vec::new();
        self.collect_intrinsics(&mut found);
        found
    }

    fn collect_intrinsics<'a>(&'a self, found: &mut Vec<&'a Intrinsic>) {
        match self {
            Expr::Intrinsic(i) => found.push(i),
            Expr::List(items) => items.iter().for_each(|i| i.collect_intrinsics(found)),
            Expr::Object(entries) => entries
                .iter()
                .for_each(|(_, v)| v.collect_intrinsics(found)),
            _ => {}
        }
    }

    /// Parses a JSON value into an expression.
    pub fn from_json(json: &JsonValue) -> Result<Expr, TemplateError> {
        Ok(match json {
            JsonValue::Null => Expr::Null,
            JsonValue::Bool(b) => Expr::Bool(*b),
            JsonValue::Number(n) => Expr::Number(n.as_f64().unwrap_or_default()),
            JsonValue::String(s) => Expr::String(s.clone()),
            JsonValue::Array(items) => Expr::List(
                items
                    .iter()
                    .map(Expr::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            JsonValue::Object(map) => {
                if map.len() == 1 {
                    if let Some((key, value)) = map.iter().next() {
                        if key == "Ref" || key.starts_with("Fn::") {
                            return Ok(Expr::Intrinsic(parse_intrinsic(key, value)?));
                        }
                    }
                }
                Expr::Object(
                    map.iter()
                        .map(|(k, v)| Ok((k.clone(), Expr::from_json(v)?)))
                        .collect::<Result<_, TemplateError>>()?,
                )
            }
        })
    }
}

fn invalid(tag: &str, detail: impl Into<String>) -> TemplateError {
    TemplateError::InvalidIntrinsic {
        tag: tag.to_string(),
        detail: detail.into(),
    }
}

/// Splits an intrinsic's argument list, checking its arity.
fn args<'a>(tag: &str, value: &'a JsonValue, min: usize, max: usize) -> Result<&'a [JsonValue], TemplateError> {
    match value {
        JsonValue::Array(items) if (min..=max).contains(&items.len()) => Ok(items),
        JsonValue::Array(items) => Err(invalid(
            tag,
            format!("expected {} to {} arguments, got {}", min, max, items.len()),
        )),
        _ => Err(invalid(tag, "expected a list of arguments")),
    }
}

fn string_arg(tag: &str, value: &JsonValue) -> Result<String, TemplateError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(tag, "expected a string argument"))
}

fn boxed(value: &JsonValue) -> Result<Box<Expr>, TemplateError> {
    Ok(Box::new(Expr::from_json(value)?))
}

fn parse_intrinsic(tag: &str, value: &JsonValue) -> Result<Intrinsic, TemplateError> {
    Ok(match tag {
        "Ref" => Intrinsic::Ref(string_arg(tag, value)?),
        "Fn::GetAtt" => match value {
            JsonValue::String(s) => {
                let (logical_id, attribute) = s
                    .split_once('.')
                    .ok_or_else(|| invalid(tag, format!("'{}' is not Resource.Attribute", s)))?;
                Intrinsic::GetAtt {
                    logical_id: logical_id.to_string(),
                    attribute: Box::new(Expr::String(attribute.to_string())),
                }
            }
            _ => {
                let a = args(tag, value, 2, 2)?;
                Intrinsic::GetAtt {
                    logical_id: string_arg(tag, &a[0])?,
                    attribute: boxed(&a[1])?,
                }
            }
        },
        "Fn::Sub" => match value {
            JsonValue::String(s) => Intrinsic::Sub {
                template: s.clone(),
                variables: Vec::new(),
            },
            _ => {
                let a = args(tag, value, 1, 2)?;
                let variables = match a.get(1) {
                    Some(JsonValue::Object(vars)) => vars
                        .iter()
                        .map(|(k, v)| Ok((k.clone(), Expr::from_json(v)?)))
                        .collect::<Result<_, TemplateError>>()?,
                    Some(_) => return Err(invalid(tag, "variables must be a map")),
                    None => Vec::new(),
                };
                Intrinsic::Sub {
                    template: string_arg(tag, &a[0])?,
                    variables,
                }
            }
        },
        "Fn::Join" => {
            let a = args(tag, value, 2, 2)?;
            Intrinsic::Join {
                delimiter: string_arg(tag, &a[0])?,
                items: boxed(&a[1])?,
            }
        }
        "Fn::Select" => {
            let a = args(tag, value, 2, 2)?;
            Intrinsic::Select {
                index: boxed(&a[0])?,
                items: boxed(&a[1])?,
            }
        }
        "Fn::Split" => {
            let a = args(tag, value, 2, 2)?;
            Intrinsic::Split {
                delimiter: string_arg(tag, &a[0])?,
                source: boxed(&a[1])?,
            }
        }
        "Fn::Base64" => Intrinsic::Base64(boxed(value)?),
        "Fn::Cidr" => {
            let a = args(tag, value, 3, 3)?;
            Intrinsic::Cidr {
                ip_block: boxed(&a[0])?,
                count: boxed(&a[1])?,
                cidr_bits: boxed(&a[2])?,
            }
        }
        "Fn::FindInMap" => {
            let a = args(tag, value, 3, 4)?;
            Intrinsic::FindInMap {
                map_name: boxed(&a[0])?,
                top_level_key: boxed(&a[1])?,
                second_level_key: boxed(&a[2])?,
            }
        }
        "Fn::GetAZs" => Intrinsic::GetAZs(boxed(value)?),
        "Fn::ImportValue" => Intrinsic::ImportValue(boxed(value)?),
        other => Intrinsic::Unsupported {
            tag: other.to_string(),
        },
    })
}

/// A piece of an `Fn::Sub` template.
#[derive(Debug, Clone, PartialEq)]
pub enum SubPart {
    Literal(String),
    /// `${Name}` or `${Resource.Attribute}`.
    Placeholder(String),
}

/// Splits an `Fn::Sub` template into literal text and placeholders.
///
/// `${!Literal}` is an escaped placeholder and comes back as the literal
/// text `${Literal}`.
pub fn sub_parts(template: &str) -> Vec<SubPart> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        literal.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            literal.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = &after[..end];
        if let Some(escaped) = name.strip_prefix('!') {
            literal.push_str("${");
            literal.push_str(escaped);
            literal.push('}');
        } else {
            if !literal.is_empty() {
                parts.push(SubPart::Literal(std::mem::take(&mut literal)));
            }
            parts.push(SubPart::Placeholder(name.trim().to_string()));
        }
        rest = &after[end + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(SubPart::Literal(literal));
    }
    parts
}
