//! Event stream to HCL text.
//!
//! [`HclEmitter`] buffers each resource's events in an
//! [`EmitterEventQueue`] until its `ResourceEnd` arrives, then writes the
//! whole resource at once. Working on a complete resource lets every
//! decision look ahead: a key's value is inspected before the key is
//! written, so empty values and empty blocks never leave a dangling key
//! behind.
//!
//! A resource that fails (unbalanced events, a value in key position) is
//! dropped whole. Text is only appended once a resource has been written
//! successfully.

use std::collections::HashSet;

use crate::diag::Diagnostics;
use crate::events::{check_balance, AttributeShape, HclEvent, MappingKey, Scalar};
use crate::path::AttributePath;
use crate::queue::{EmitterEventQueue, QueueError};
use crate::serializer::SerializerError;
use crate::text::{object_key, quote};
use crate::traits::{AttributeContent, ResourceTraits, TraitRegistry};

/// Address used for errors outside any resource.
const STREAM: &str = "<stream>";

/// Streaming emitter for a batch of resources.
pub struct HclEmitter<'a> {
    registry: &'a TraitRegistry,
    queue: EmitterEventQueue,
    depth: i32,
    out: String,
}

impl<'a> HclEmitter<'a> {
    pub fn new(registry: &'a TraitRegistry) -> Self {
        HclEmitter {
            registry,
            queue: EmitterEventQueue::new(),
            depth: 0,
            out: String::new(),
        }
    }

    /// Accepts one event. The resource is written when its end arrives.
    ///
    /// A `ResourceStart` while another resource is still open drops the
    /// open one and starts the new one; the error names the dropped
    /// resource.
    pub fn emit(&mut self, event: HclEvent) -> Result<(), SerializerError> {
        if self.depth > 0 && matches!(event, HclEvent::ResourceStart { .. }) {
            let err = self.open_resource_error("ResourceStart");
            self.reset();
            self.accept(event)?;
            return Err(err);
        }
        self.accept(event)
    }

    fn accept(&mut self, event: HclEvent) -> Result<(), SerializerError> {
        if self.depth == 0 {
            match &event {
                HclEvent::Comment(text) => {
                    self.out.push_str(&format!("# {}\n", text));
                    return Ok(());
                }
                HclEvent::ResourceStart { .. } => {}
                other => {
                    return Err(SerializerError::UnexpectedEvent {
                        address: STREAM.to_string(),
                        expected: "ResourceStart",
                        got: other.kind(),
                    })
                }
            }
        }

        self.depth += event.nesting_increase();
        self.queue.push_back(event);
        if self.depth == 0 {
            self.flush()
        } else {
            Ok(())
        }
    }

    /// Emits a whole stream. A failed resource is reported and skipped;
    /// the rest of the stream is still written.
    pub fn emit_all(&mut self, events: impl IntoIterator<Item = HclEvent>) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let mut skipping = false;
        for event in events {
            let starts_resource = matches!(event, HclEvent::ResourceStart { .. });
            if skipping {
                if !starts_resource {
                    continue;
                }
                skipping = false;
            }
            if let Err(err) = self.emit(event) {
                diags.error(
                    Some(err.address().to_string()),
                    "resource could not be written",
                    err.to_string(),
                );
                // An interrupted resource has already been replaced by the
                // one just started.
                if !starts_resource {
                    self.reset();
                    skipping = true;
                }
            }
        }
        diags
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    /// Returns the text, failing if a resource was left open. Resources
    /// written before the open one are in [`HclEmitter::output`].
    pub fn finish(self) -> Result<String, SerializerError> {
        if self.depth > 0 {
            return Err(self.open_resource_error("end of stream"));
        }
        Ok(self.out)
    }

    fn open_resource_error(&self, got: &'static str) -> SerializerError {
        let address = match self.queue.peek_front() {
            Ok(HclEvent::ResourceStart {
                resource_type,
                name,
            }) => format!("{}.{}", resource_type, name),
            _ => STREAM.to_string(),
        };
        SerializerError::UnexpectedEvent {
            address,
            expected: "ResourceEnd",
            got,
        }
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.depth = 0;
    }

    fn flush(&mut self) -> Result<(), SerializerError> {
        let queue = std::mem::take(&mut self.queue);
        let traits = match queue.peek_front() {
            Ok(HclEvent::ResourceStart { resource_type, .. }) => self.registry.get_traits(resource_type),
            _ => ResourceTraits::default(),
        };
        let text = ResourceWriter::new(&traits, queue).write()?;
        self.out.push_str(&text);
        Ok(())
    }
}

/// Writes one resource's events with the given traits.
pub fn emit_resource(traits: &ResourceTraits, events: Vec<HclEvent>) -> Result<String, SerializerError> {
    let mut queue = EmitterEventQueue::new();
    for event in events {
        queue.push_back(event);
    }
    ResourceWriter::new(traits, queue).write()
}

// ─── Resource writer ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Resource,
    Block,
    /// The sequence wrapping a run of repeated blocks; writes nothing.
    BlockList,
    Sequence,
    /// `filtered` maps are objects inside attribute lists, whose keys are
    /// attributes. Other maps hold data and are written as is.
    Mapping { filtered: bool },
    Json,
}

impl Frame {
    fn indents(self) -> bool {
        !matches!(self, Frame::BlockList | Frame::Json)
    }
}

struct ResourceWriter<'a> {
    address: String,
    traits: &'a ResourceTraits,
    queue: EmitterEventQueue,
    populated: HashSet<AttributePath>,
    frames: Vec<Frame>,
    /// Block shape of the key just written, until its value starts.
    pending: Option<AttributeShape>,
    /// True when the cursor sits after `key = `.
    inline: bool,
    out: String,
}

impl<'a> ResourceWriter<'a> {
    fn new(traits: &'a ResourceTraits, queue: EmitterEventQueue) -> Self {
        let address = match queue.peek_front() {
            Ok(HclEvent::ResourceStart {
                resource_type,
                name,
            }) => format!("{}.{}", resource_type, name),
            _ => STREAM.to_string(),
        };
        ResourceWriter {
            address,
            traits,
            queue,
            populated: HashSet::new(),
            frames: Vec::new(),
            pending: None,
            inline: false,
            out: String::new(),
        }
    }

    fn write(mut self) -> Result<String, SerializerError> {
        check_balance(self.queue.iter()).map_err(|source| SerializerError::Unbalanced {
            address: self.address.clone(),
            source,
        })?;
        self.populated = self.populated_paths()?;

        while let Ok(front) = self.queue.peek_front() {
            if front.is_mapping_key() {
                self.mapping_key()?;
                continue;
            }
            let event = self.queue.pop_front().map_err(|e| self.queue_error(e))?;
            self.event(event)?;
        }
        Ok(self.out)
    }

    fn queue_error(&self, source: QueueError) -> SerializerError {
        SerializerError::Queue {
            address: self.address.clone(),
            source,
        }
    }

    fn unexpected(&self, expected: &'static str, got: &'static str) -> SerializerError {
        SerializerError::UnexpectedEvent {
            address: self.address.clone(),
            expected,
            got,
        }
    }

    // ─── Lookahead ───────────────────────────────────────────

    /// Paths of every key whose value has content.
    fn populated_paths(&self) -> Result<HashSet<AttributePath>, SerializerError> {
        let mut populated = HashSet::new();
        for (index, event) in self.queue.iter().enumerate() {
            if let HclEvent::MappingKey(key) = event {
                if !self.content_at(index, key)?.is_empty() {
                    populated.insert(key.path.clone());
                }
            }
        }
        Ok(populated)
    }

    /// Classifies the value following the key at `index`.
    fn content_at(&self, index: usize, key: &MappingKey) -> Result<AttributeContent, SerializerError> {
        let value = self.queue.peek_value(index).map_err(|e| self.queue_error(e))?;
        let empty = value.len() == 2;
        Ok(match value.first() {
            Some(HclEvent::ScalarValue(scalar)) => {
                if self.traits.is_conditional_default(&key.path, &scalar.to_json()) {
                    AttributeContent::ConditionalDefault
                } else {
                    scalar.content()
                }
            }
            Some(HclEvent::JsonStart) if value.len() <= 4 && !matches!(value.get(1), Some(HclEvent::ScalarValue(_))) => {
                AttributeContent::EmptyCollection
            }
            Some(HclEvent::JsonStart) => AttributeContent::Value,
            Some(HclEvent::SequenceStart | HclEvent::MappingStart | HclEvent::BlockStart { .. }) if empty => {
                AttributeContent::EmptyCollection
            }
            Some(HclEvent::SequenceStart) if key.shape == AttributeShape::BlockList => AttributeContent::BlockList,
            Some(HclEvent::SequenceStart) => AttributeContent::Sequence,
            Some(HclEvent::MappingStart) => AttributeContent::Mapping,
            Some(HclEvent::BlockStart { .. }) => AttributeContent::BlockObject,
            _ => AttributeContent::Null,
        })
    }

    /// True if any key inside the block value after the front key would
    /// be written.
    fn block_has_output(&self) -> Result<bool, SerializerError> {
        let length = self.queue.peek_value(0).map_err(|e| self.queue_error(e))?.len();
        for index in 1..=length {
            let Ok(HclEvent::MappingKey(key)) = self.queue.get(index) else {
                continue;
            };
            if key.shape.is_block() {
                continue;
            }
            let content = self.content_at(index, key)?;
            let defaulted = content == AttributeContent::Null && self.traits.default_for(&key.path).is_some();
            if self.is_required(key) || (!key.computed_only && (defaulted || self.traits.should_emit(&key.path, content, &self.populated))) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_required(&self, key: &MappingKey) -> bool {
        key.required || self.traits.is_required(&key.path)
    }

    // ─── Keys ────────────────────────────────────────────────

    fn mapping_key(&mut self) -> Result<(), SerializerError> {
        let key = match self.queue.peek_front() {
            Ok(HclEvent::MappingKey(key)) => key.clone(),
            Ok(other) => return Err(self.unexpected("MappingKey", other.kind())),
            Err(e) => return Err(self.queue_error(e)),
        };

        let filtered = match self.frames.last() {
            Some(Frame::Resource | Frame::Block) => true,
            Some(Frame::Mapping { filtered }) => *filtered,
            _ => return Err(self.unexpected("value", "MappingKey")),
        };

        if filtered {
            self.apply_default(&key)?;
            let content = self.content_at(0, &key)?;
            if !self.should_write(&key, content)? {
                log::debug!("{}: skipping {}", self.address, key.path);
                self.queue.consume_key().map_err(|e| self.queue_error(e))?;
                return Ok(());
            }
        }

        self.queue.pop_front().map_err(|e| self.queue_error(e))?;
        self.write_key(&key);
        Ok(())
    }

    fn apply_default(&mut self, key: &MappingKey) -> Result<(), SerializerError> {
        if !matches!(self.queue.get(1), Ok(HclEvent::ScalarValue(Scalar::Null))) {
            return Ok(());
        }
        let scalar = self.traits.apply_default(&key.path, Scalar::Null);
        if scalar != Scalar::Null {
            log::debug!("{}: default for {}", self.address, key.path);
            self.queue
                .set(1, HclEvent::ScalarValue(scalar))
                .map_err(|e| self.queue_error(e))?;
        }
        Ok(())
    }

    fn should_write(&self, key: &MappingKey, content: AttributeContent) -> Result<bool, SerializerError> {
        let required = self.is_required(key);
        if !required {
            if key.computed_only || !self.traits.should_emit(&key.path, content, &self.populated) {
                return Ok(false);
            }
        }
        self.check_schema_conflicts(key);
        if key.shape.is_block() && !required {
            return self.block_has_output();
        }
        Ok(true)
    }

    /// Schema conflicts not covered by a trait group are reported, not
    /// resolved; both attributes are written.
    fn check_schema_conflicts(&self, key: &MappingKey) {
        if !self.populated.contains(&key.path) {
            return;
        }
        for other in &key.conflicts_with {
            let other_path = AttributePath::parse(other);
            if !self.populated.contains(&other_path) {
                continue;
            }
            let covered = self.traits.conflicting_arguments.iter().any(|group| {
                group.iter().any(|p| key.path.is_like(p)) && group.iter().any(|p| other_path.is_like(p))
            });
            if !covered {
                log::warn!(
                    "{}: {} conflicts with {} and no trait decides between them",
                    self.address,
                    key.path,
                    other
                );
            }
        }
    }

    fn write_key(&mut self, key: &MappingKey) {
        if key.shape.is_block() && !self.in_json() {
            self.pending = Some(key.shape);
            return;
        }
        let indent = self.indent();
        self.out.push_str(&format!("{}{} = ", indent, object_key(&key.name)));
        self.inline = true;
    }

    // ─── Values and structure ────────────────────────────────

    fn event(&mut self, event: HclEvent) -> Result<(), SerializerError> {
        let kind = event.kind();
        match event {
            HclEvent::Comment(text) => {
                let indent = self.indent();
                self.out.push_str(&format!("{}# {}\n", indent, text));
            }
            HclEvent::ResourceStart {
                resource_type,
                name,
            } => {
                if !self.frames.is_empty() {
                    return Err(self.unexpected("attribute", kind));
                }
                self.out.push_str(&format!("resource {} {} {{\n", quote(&resource_type), quote(&name)));
                self.frames.push(Frame::Resource);
            }
            HclEvent::ResourceEnd => {
                self.pop(Frame::Resource, kind)?;
                self.out.push_str("}\n\n");
            }
            HclEvent::ScalarValue(scalar) => {
                self.begin_value(kind)?;
                self.out.push_str(&scalar.to_hcl());
                self.finish_value();
            }
            HclEvent::SequenceStart => {
                if self.pending.take() == Some(AttributeShape::BlockList) {
                    self.frames.push(Frame::BlockList);
                    return Ok(());
                }
                self.begin_value(kind)?;
                if matches!(self.queue.peek_front(), Ok(HclEvent::SequenceEnd)) {
                    self.queue.pop_front().map_err(|e| self.queue_error(e))?;
                    self.out.push_str("[]");
                    self.finish_value();
                } else {
                    self.out.push_str("[\n");
                    self.frames.push(Frame::Sequence);
                }
            }
            HclEvent::SequenceEnd => match self.frames.pop() {
                Some(Frame::BlockList) => {}
                Some(Frame::Sequence) => {
                    let indent = self.indent();
                    self.out.push_str(&format!("{}]", indent));
                    self.finish_value();
                }
                _ => return Err(self.unexpected("SequenceStart", kind)),
            },
            HclEvent::MappingStart => {
                let filtered = self.frames.last() == Some(&Frame::Sequence) && !self.in_json();
                self.begin_value(kind)?;
                if matches!(self.queue.peek_front(), Ok(HclEvent::MappingEnd)) {
                    self.queue.pop_front().map_err(|e| self.queue_error(e))?;
                    self.out.push_str("{}");
                    self.finish_value();
                } else {
                    self.out.push_str("{\n");
                    self.frames.push(Frame::Mapping { filtered });
                }
            }
            HclEvent::MappingEnd => {
                if !matches!(self.frames.pop(), Some(Frame::Mapping { .. })) {
                    return Err(self.unexpected("MappingStart", kind));
                }
                let indent = self.indent();
                self.out.push_str(&format!("{}}}", indent));
                self.finish_value();
            }
            HclEvent::BlockStart { name } => {
                let pending = self.pending.take();
                if self.frames.last() != Some(&Frame::BlockList) && pending != Some(AttributeShape::BlockObject) {
                    return Err(self.unexpected("block key", kind));
                }
                let indent = self.indent();
                self.out.push_str(&format!("{}{} {{\n", indent, name));
                self.frames.push(Frame::Block);
            }
            HclEvent::BlockEnd => {
                self.pop(Frame::Block, kind)?;
                let indent = self.indent();
                self.out.push_str(&format!("{}}}\n", indent));
            }
            HclEvent::JsonStart => {
                self.begin_value(kind)?;
                self.out.push_str("jsonencode(");
                self.frames.push(Frame::Json);
                self.inline = true;
            }
            HclEvent::JsonEnd => {
                self.pop(Frame::Json, kind)?;
                self.out.push(')');
                self.finish_value();
            }
            HclEvent::MappingKey(_) => return Err(self.unexpected("value", kind)),
        }
        Ok(())
    }

    fn pop(&mut self, expected: Frame, kind: &'static str) -> Result<(), SerializerError> {
        match self.frames.pop() {
            Some(frame) if frame == expected => Ok(()),
            _ => Err(self.unexpected("matching start", kind)),
        }
    }

    /// Positions the cursor for a value: after `key = `, or on a fresh
    /// indented line inside a list or document.
    fn begin_value(&mut self, kind: &'static str) -> Result<(), SerializerError> {
        if self.inline {
            self.inline = false;
            return Ok(());
        }
        match self.frames.last() {
            Some(Frame::Sequence | Frame::Json) => {
                let indent = self.indent();
                self.out.push_str(&indent);
                Ok(())
            }
            _ => Err(self.unexpected("MappingKey", kind)),
        }
    }

    fn finish_value(&mut self) {
        self.inline = false;
        match self.frames.last() {
            Some(Frame::Sequence) => self.out.push_str(",\n"),
            Some(Frame::Json) => {}
            _ => self.out.push('\n'),
        }
    }

    fn in_json(&self) -> bool {
        self.frames.contains(&Frame::Json)
    }

    fn indent(&self) -> String {
        "  ".repeat(self.frames.iter().filter(|f| f.indents()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Reference;
    use crate::schema::ResourceSchema;
    use crate::serializer::serialize_resource;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(yaml: &str, resource_type: &str, attributes: serde_json::Value) -> String {
        let registry = TraitRegistry::from_yaml(yaml).unwrap();
        let traits = registry.get_traits(resource_type);
        let events = serialize_resource(
            resource_type,
            "t",
            &Value::from(attributes),
            &traits,
            &ResourceSchema::default(),
        );
        emit_resource(&traits, events).unwrap()
    }

    #[test]
    fn test_scalars() {
        let out = render(
            "[]",
            "test_thing",
            json!({ "name": "x", "count": 3, "enabled": true, "ratio": 0.5 }),
        );
        assert_eq!(
            out,
            "resource \"test_thing\" \"t\" {\n  name = \"x\"\n  count = 3\n  enabled = true\n  ratio = 0.5\n}\n\n"
        );
    }

    #[test]
    fn test_empty_values_suppressed() {
        let out = render(
            "[]",
            "test_thing",
            json!({ "a": null, "b": "", "c": false, "d": [], "e": {}, "f": "kept" }),
        );
        assert_eq!(out, "resource \"test_thing\" \"t\" {\n  f = \"kept\"\n}\n\n");
    }

    #[test]
    fn test_required_default_and_unconfigurable() {
        let yaml = r#"
- resource_type: test_thing
  required_attributes: [acl]
  unconfigurable_attributes: [arn]
  default_values:
    acl: private
"#;
        let out = render(yaml, "test_thing", json!({ "arn": "arn:aws:x", "name": "n" }));
        assert_eq!(
            out,
            "resource \"test_thing\" \"t\" {\n  name = \"n\"\n  acl = \"private\"\n}\n\n"
        );
    }

    #[test]
    fn test_required_without_default_is_null() {
        let yaml = "- resource_type: test_thing\n  required_attributes: [policy]\n";
        let out = render(yaml, "test_thing", json!({}));
        assert_eq!(out, "resource \"test_thing\" \"t\" {\n  policy = null\n}\n\n");
    }

    #[test]
    fn test_conflicting_arguments_first_wins() {
        let yaml = "- resource_type: test_thing\n  conflicting_arguments: [[bucket, bucket_prefix]]\n";
        let out = render(
            yaml,
            "test_thing",
            json!({ "bucket_prefix": "logs-", "bucket": "logs-123" }),
        );
        assert_eq!(out, "resource \"test_thing\" \"t\" {\n  bucket = \"logs-123\"\n}\n\n");
    }

    #[test]
    fn test_conditional_default_suppressed() {
        let yaml = r#"
- resource_type: test_thing
  conditional_attributes:
    - name: fifo_queue
      value: false
    - name: delay
      value: 0
"#;
        let out = render(yaml, "test_thing", json!({ "fifo_queue": false, "delay": 0, "name": "q" }));
        assert_eq!(out, "resource \"test_thing\" \"t\" {\n  name = \"q\"\n}\n\n");
    }

    #[test]
    fn test_blocks() {
        let yaml = "- resource_type: test_thing\n  block_object_attributes: [versioning, logging]\n";
        let out = render(
            yaml,
            "test_thing",
            json!({
                "name": "x",
                "rule": [ { "id": "a", "enabled": true }, { "id": "b", "prefix": "" } ],
                "versioning": { "enabled": false },
                "logging": { "target": "t" }
            }),
        );
        let expected = r#"resource "test_thing" "t" {
  name = "x"
  rule {
    id = "a"
    enabled = true
  }
  rule {
    id = "b"
  }
  logging {
    target = "t"
  }
}

"#;
        assert_eq!(out, expected);
    }

    #[test]
    fn test_attribute_list_of_objects_keeps_required_keys() {
        let yaml = r#"
- resource_type: test_sg
  required_attributes: [ingress.*.description, ingress.*.self]
  non_block_type_attributes: [ingress]
"#;
        let out = render(
            yaml,
            "test_sg",
            json!({
                "ingress": [ {
                    "from_port": 80,
                    "description": "",
                    "self": false,
                    "cidr_blocks": ["0.0.0.0/0"],
                    "ipv6_cidr_blocks": []
                } ]
            }),
        );
        let expected = r#"resource "test_sg" "t" {
  ingress = [
    {
      from_port = 80
      description = ""
      self = false
      cidr_blocks = [
        "0.0.0.0/0",
      ]
    },
  ]
}

"#;
        assert_eq!(out, expected);
    }

    #[test]
    fn test_map_attribute_keys_unfiltered() {
        let out = render("[]", "test_thing", json!({ "tags": { "Name": "", "aws:team": "core" } }));
        let expected = r#"resource "test_thing" "t" {
  tags = {
    Name = ""
    "aws:team" = "core"
  }
}

"#;
        assert_eq!(out, expected);
    }

    #[test]
    fn test_json_document() {
        let policy = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Resource":"arn:aws:s3:::b/${aws:username}","Condition":{"StringEquals":{"aws:SourceAccount":"1"}}}]}"#;
        let out = render("[]", "test_thing", json!({ "policy": policy }));
        let expected = r#"resource "test_thing" "t" {
  policy = jsonencode({
    Version = "2012-10-17"
    Statement = [
      {
        Effect = "Allow"
        Resource = "arn:aws:s3:::b/$${aws:username}"
        Condition = {
          StringEquals = {
            "aws:SourceAccount" = "1"
          }
        }
      },
    ]
  })
}

"#;
        assert_eq!(out, expected);
    }

    #[test]
    fn test_reference_written_unquoted() {
        let registry = TraitRegistry::from_yaml("[]").unwrap();
        let traits = registry.get_traits("test_thing");
        let attributes = Value::Object(vec![(
            "role".into(),
            Value::Reference(Reference::Indirect("aws_iam_role.Role.arn".into())),
        )]);
        let events = serialize_resource("test_thing", "t", &attributes, &traits, &ResourceSchema::default());
        let out = emit_resource(&traits, events).unwrap();
        assert_eq!(out, "resource \"test_thing\" \"t\" {\n  role = aws_iam_role.Role.arn\n}\n\n");
    }

    #[test]
    fn test_unbalanced_resource_is_error() {
        let traits = ResourceTraits::default();
        let events = vec![
            HclEvent::ResourceStart {
                resource_type: "test_thing".into(),
                name: "t".into(),
            },
            HclEvent::SequenceStart,
            HclEvent::ResourceEnd,
        ];
        let err = emit_resource(&traits, events).unwrap_err();
        assert!(matches!(err, SerializerError::Unbalanced { .. }));
        assert_eq!(err.address(), "test_thing.t");
    }

    #[test]
    fn test_emitter_isolates_failed_resource() {
        let registry = TraitRegistry::from_yaml("[]").unwrap();
        let start = |name: &str| HclEvent::ResourceStart {
            resource_type: "test_thing".into(),
            name: name.into(),
        };
        let key = |name: &str| {
            HclEvent::MappingKey(MappingKey::new(name, AttributePath::parse(name), AttributeShape::Value))
        };
        let events = vec![
            HclEvent::Comment("generated".into()),
            start("bad"),
            HclEvent::MappingStart,
            HclEvent::SequenceEnd,
            key("orphan"),
            HclEvent::ResourceEnd,
            start("good"),
            key("name"),
            HclEvent::ScalarValue(Scalar::String("ok".into())),
            HclEvent::ResourceEnd,
        ];
        let mut emitter = HclEmitter::new(&registry);
        let diags = emitter.emit_all(events);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.iter().next().and_then(|d| d.address.as_deref()),
            Some("test_thing.bad")
        );
        assert_eq!(
            emitter.finish().unwrap(),
            "# generated\nresource \"test_thing\" \"good\" {\n  name = \"ok\"\n}\n\n"
        );
    }

    #[test]
    fn test_resource_missing_its_end_is_dropped_alone() {
        let registry = TraitRegistry::from_yaml("[]").unwrap();
        let resource = |name: &str, close: bool| {
            let mut events = vec![
                HclEvent::ResourceStart {
                    resource_type: "test_thing".into(),
                    name: name.into(),
                },
                HclEvent::MappingKey(MappingKey::new("name", AttributePath::parse("name"), AttributeShape::Value)),
                HclEvent::ScalarValue(Scalar::String(name.into())),
            ];
            if close {
                events.push(HclEvent::ResourceEnd);
            }
            events
        };
        let events: Vec<_> = [resource("a", true), resource("b", false), resource("c", true)]
            .into_iter()
            .flatten()
            .collect();

        let mut emitter = HclEmitter::new(&registry);
        let diags = emitter.emit_all(events);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.iter().next().and_then(|d| d.address.as_deref()),
            Some("test_thing.b")
        );
        assert_eq!(
            emitter.finish().unwrap(),
            "resource \"test_thing\" \"a\" {\n  name = \"a\"\n}\n\nresource \"test_thing\" \"c\" {\n  name = \"c\"\n}\n\n"
        );
    }

    #[test]
    fn test_open_resource_keeps_earlier_output() {
        let registry = TraitRegistry::from_yaml("[]").unwrap();
        let mut emitter = HclEmitter::new(&registry);
        let start = |name: &str| HclEvent::ResourceStart {
            resource_type: "test_thing".into(),
            name: name.into(),
        };
        emitter.emit(start("a")).unwrap();
        emitter.emit(HclEvent::ResourceEnd).unwrap();
        emitter.emit(start("b")).unwrap();
        assert_eq!(emitter.output(), "resource \"test_thing\" \"a\" {\n}\n\n");
        let err = emitter.finish().unwrap_err();
        assert_eq!(err.address(), "test_thing.b");
    }

    #[test]
    fn test_finish_with_open_resource() {
        let registry = TraitRegistry::from_yaml("[]").unwrap();
        let mut emitter = HclEmitter::new(&registry);
        emitter
            .emit(HclEvent::ResourceStart {
                resource_type: "test_thing".into(),
                name: "t".into(),
            })
            .unwrap();
        assert!(emitter.finish().is_err());
    }
}
