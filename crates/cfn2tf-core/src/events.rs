//! Emission events: the token stream between attribute traversal and text.
//!
//! The serializer produces a flat, well-nested stream of [`HclEvent`]s per
//! resource. Every start event has a matching end event and the nesting
//! depth never drops below zero; [`check_balance`] verifies both.

use serde_json::Value as JsonValue;

use crate::path::AttributePath;
use crate::reference::Reference;
use crate::text::{format_number, quote};
use crate::traits::AttributeContent;

/// A scalar value.
///
/// References are a variant of their own and are never quoted.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Reference(Reference),
}

impl Scalar {
    /// Converts a JSON scalar. Returns `None` for arrays and objects.
    pub fn from_json(json: &JsonValue) -> Option<Scalar> {
        match json {
            JsonValue::Null => Some(Scalar::Null),
            JsonValue::Bool(b) => Some(Scalar::Bool(*b)),
            JsonValue::Number(n) => Some(Scalar::Number(n.clone())),
            JsonValue::String(s) => Some(Scalar::String(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    /// True if the HCL form is a quoted string.
    pub fn is_quoted(&self) -> bool {
        matches!(self, Scalar::String(_))
    }

    /// The HCL text of this value.
    pub fn to_hcl(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => match n.as_f64() {
                Some(f) if n.is_f64() => format_number(f),
                _ => n.to_string(),
            },
            Scalar::String(s) => quote(s),
            Scalar::Reference(r) => r.expression(),
        }
    }

    /// Plain JSON form, used to compare against trait values.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Null => JsonValue::Null,
            Scalar::Bool(b) => JsonValue::Bool(*b),
            Scalar::Number(n) => JsonValue::Number(n.clone()),
            Scalar::String(s) => JsonValue::String(s.clone()),
            Scalar::Reference(r) => JsonValue::String(r.expression()),
        }
    }

    /// Classifies the scalar for emission decisions.
    pub fn content(&self) -> AttributeContent {
        match self {
            Scalar::Null => AttributeContent::Null,
            Scalar::String(s) if s.is_empty() => AttributeContent::EmptyString,
            Scalar::Bool(false) => AttributeContent::BooleanFalse,
            _ => AttributeContent::Value,
        }
    }
}

/// How an attribute's value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeShape {
    /// `key = scalar`
    Value,
    /// One `key { ... }` block per list element.
    BlockList,
    /// A single `key { ... }` block.
    BlockObject,
    /// `key = [ ... ]`
    Sequence,
    /// `key = { ... }`
    Mapping,
    /// Nothing known about the value.
    None,
}

impl AttributeShape {
    /// Blocks are written without `=`.
    pub fn is_block(self) -> bool {
        matches!(self, AttributeShape::BlockList | AttributeShape::BlockObject)
    }
}

/// An attribute name together with what the schema says about it.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingKey {
    pub name: String,
    pub path: AttributePath,
    pub shape: AttributeShape,
    /// Provider-computed and not settable.
    pub computed_only: bool,
    pub required: bool,
    /// Attribute names the provider schema declares as conflicting.
    pub conflicts_with: Vec<String>,
}

impl MappingKey {
    pub fn new(name: impl Into<String>, path: AttributePath, shape: AttributeShape) -> Self {
        MappingKey {
            name: name.into(),
            path,
            shape,
            computed_only: false,
            required: false,
            conflicts_with: Vec::new(),
        }
    }
}

/// One emission event.
///
/// `MappingKey` and `ScalarValue` are the scalar events; every other
/// variant opens or closes a nesting level, or is a comment.
#[derive(Debug, Clone, PartialEq)]
pub enum HclEvent {
    Comment(String),
    ResourceStart { resource_type: String, name: String },
    ResourceEnd,
    MappingKey(MappingKey),
    ScalarValue(Scalar),
    SequenceStart,
    SequenceEnd,
    MappingStart,
    MappingEnd,
    BlockStart { name: String },
    BlockEnd,
    /// Start of an embedded JSON document written with `jsonencode`.
    JsonStart,
    JsonEnd,
}

impl HclEvent {
    /// Change in nesting depth: +1, 0 or -1.
    pub fn nesting_increase(&self) -> i32 {
        match self {
            HclEvent::ResourceStart { .. }
            | HclEvent::SequenceStart
            | HclEvent::MappingStart
            | HclEvent::BlockStart { .. }
            | HclEvent::JsonStart => 1,
            HclEvent::ResourceEnd
            | HclEvent::SequenceEnd
            | HclEvent::MappingEnd
            | HclEvent::BlockEnd
            | HclEvent::JsonEnd => -1,
            HclEvent::Comment(_) | HclEvent::MappingKey(_) | HclEvent::ScalarValue(_) => 0,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, HclEvent::MappingKey(_) | HclEvent::ScalarValue(_))
    }

    pub fn is_mapping_key(&self) -> bool {
        matches!(self, HclEvent::MappingKey(_))
    }

    /// The end event that closes this start event.
    pub fn closer(&self) -> Option<HclEvent> {
        match self {
            HclEvent::ResourceStart { .. } => Some(HclEvent::ResourceEnd),
            HclEvent::SequenceStart => Some(HclEvent::SequenceEnd),
            HclEvent::MappingStart => Some(HclEvent::MappingEnd),
            HclEvent::BlockStart { .. } => Some(HclEvent::BlockEnd),
            HclEvent::JsonStart => Some(HclEvent::JsonEnd),
            _ => None,
        }
    }

    /// Short name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            HclEvent::Comment(_) => "Comment",
            HclEvent::ResourceStart { .. } => "ResourceStart",
            HclEvent::ResourceEnd => "ResourceEnd",
            HclEvent::MappingKey(_) => "MappingKey",
            HclEvent::ScalarValue(_) => "ScalarValue",
            HclEvent::SequenceStart => "SequenceStart",
            HclEvent::SequenceEnd => "SequenceEnd",
            HclEvent::MappingStart => "MappingStart",
            HclEvent::MappingEnd => "MappingEnd",
            HclEvent::BlockStart { .. } => "BlockStart",
            HclEvent::BlockEnd => "BlockEnd",
            HclEvent::JsonStart => "JsonStart",
            HclEvent::JsonEnd => "JsonEnd",
        }
    }
}

/// A structural violation in an event stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unbalanced event stream at event {index}: {detail}")]
pub struct BalanceError {
    pub index: usize,
    pub detail: String,
}

/// Checks that every start has a matching end of the same kind and the
/// stream ends at depth zero.
pub fn check_balance<'a>(events: impl IntoIterator<Item = &'a HclEvent>) -> Result<(), BalanceError> {
    let mut open: Vec<HclEvent> = Vec::new();
    let mut index = 0;
    for event in events {
        if let Some(closer) = event.closer() {
            open.push(closer);
        } else if event.nesting_increase() < 0 {
            match open.pop() {
                Some(expected) if expected == *event => {}
                Some(expected) => {
                    return Err(BalanceError {
                        index,
                        detail: format!("expected {}, got {}", expected.kind(), event.kind()),
                    })
                }
                None => {
                    return Err(BalanceError {
                        index,
                        detail: format!("{} at depth 0", event.kind()),
                    })
                }
            }
        }
        index += 1;
    }
    match open.last() {
        Some(expected) => Err(BalanceError {
            index,
            detail: format!("stream ended before {}", expected.kind()),
        }),
        None => Ok(()),
    }
}

/// Tracks nesting across one compound value.
///
/// Fed the events following a mapping key, [`advance`](Self::advance)
/// returns true on the event that completes the value: the scalar
/// itself, or the end event matching the first start.
#[derive(Debug, Default)]
pub struct CompoundAttributeGatherer {
    depth: i32,
    started: bool,
}

impl CompoundAttributeGatherer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, event: &HclEvent) -> bool {
        if matches!(event, HclEvent::Comment(_)) {
            return false;
        }
        self.started = true;
        self.depth += event.nesting_increase();
        self.depth <= 0
    }

    pub fn is_complete(&self) -> bool {
        self.started && self.depth <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn key(name: &str) -> HclEvent {
        HclEvent::MappingKey(MappingKey::new(name, AttributePath::parse(name), AttributeShape::Value))
    }

    #[test]
    fn test_scalar_to_hcl() {
        assert_eq!(Scalar::Null.to_hcl(), "null");
        assert_eq!(Scalar::Bool(true).to_hcl(), "true");
        assert_eq!(Scalar::from_json(&json!(3)).unwrap().to_hcl(), "3");
        assert_eq!(Scalar::from_json(&json!(2.0)).unwrap().to_hcl(), "2");
        assert_eq!(Scalar::from_json(&json!(2.5)).unwrap().to_hcl(), "2.5");
        assert_eq!(Scalar::String("a\"b".into()).to_hcl(), "\"a\\\"b\"");
    }

    #[test]
    fn test_reference_scalar_is_unquoted() {
        let scalar = Scalar::Reference(Reference::Indirect("aws_iam_role.R.arn".into()));
        assert!(!scalar.is_quoted());
        assert_eq!(scalar.to_hcl(), "aws_iam_role.R.arn");
    }

    #[test]
    fn test_scalar_content() {
        assert_eq!(Scalar::Null.content(), AttributeContent::Null);
        assert_eq!(Scalar::String(String::new()).content(), AttributeContent::EmptyString);
        assert_eq!(Scalar::Bool(false).content(), AttributeContent::BooleanFalse);
        assert_eq!(Scalar::Bool(true).content(), AttributeContent::Value);
        assert!(Scalar::from_json(&json!([])).is_none());
    }

    #[test]
    fn test_nesting_increase() {
        assert_eq!(HclEvent::SequenceStart.nesting_increase(), 1);
        assert_eq!(HclEvent::BlockEnd.nesting_increase(), -1);
        assert_eq!(key("a").nesting_increase(), 0);
        assert!(key("a").is_scalar());
    }

    #[test]
    fn test_check_balance_ok() {
        let events = vec![
            HclEvent::ResourceStart {
                resource_type: "t".into(),
                name: "n".into(),
            },
            key("a"),
            HclEvent::SequenceStart,
            HclEvent::ScalarValue(Scalar::Bool(true)),
            HclEvent::SequenceEnd,
            HclEvent::ResourceEnd,
        ];
        assert_eq!(check_balance(&events), Ok(()));
    }

    #[test]
    fn test_check_balance_mismatched_kind() {
        let events = vec![HclEvent::MappingStart, HclEvent::SequenceEnd];
        let err = check_balance(&events).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.detail, "expected MappingEnd, got SequenceEnd");
    }

    #[test]
    fn test_check_balance_negative_depth_and_unclosed() {
        assert!(check_balance(&[HclEvent::BlockEnd]).is_err());
        let err = check_balance(&[HclEvent::JsonStart]).unwrap_err();
        assert_eq!(err.detail, "stream ended before JsonEnd");
    }

    #[test]
    fn test_gatherer_scalar_and_compound() {
        let mut gatherer = CompoundAttributeGatherer::new();
        assert!(gatherer.advance(&HclEvent::ScalarValue(Scalar::Null)));

        let mut gatherer = CompoundAttributeGatherer::new();
        assert!(!gatherer.advance(&HclEvent::MappingStart));
        assert!(!gatherer.advance(&key("x")));
        assert!(!gatherer.advance(&HclEvent::SequenceStart));
        assert!(!gatherer.advance(&HclEvent::SequenceEnd));
        assert!(gatherer.advance(&HclEvent::MappingEnd));
        assert!(gatherer.is_complete());
    }
}
