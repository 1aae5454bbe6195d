//! Machine-readable diagnostics of `terraform validate -json` and
//! `terraform plan -json`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::diag::Diagnostic;

#[derive(Debug, thiserror::Error)]
pub enum PlanDecodeError {
    #[error("invalid diagnostic on output line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid validate output: {0}")]
    Document(#[from] serde_json::Error),
}

/// Classification of a diagnostic by its headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingAttributeSeparator,
    MissingRequiredArgument,
    UnconfigurableAttribute,
    InvalidOrUnknownKey,
    Unrecognized,
}

impl ErrorKind {
    /// Exact match on the headline, with or without the `Error: ` prefix.
    pub fn classify(headline: &str) -> Self {
        let summary = headline.strip_prefix("Error: ").unwrap_or(headline);
        match summary {
            "Missing attribute separator" => ErrorKind::MissingAttributeSeparator,
            "Missing required argument" => ErrorKind::MissingRequiredArgument,
            "Value for unconfigurable attribute" => ErrorKind::UnconfigurableAttribute,
            "Invalid or unknown key" => ErrorKind::InvalidOrUnknownKey,
            _ => ErrorKind::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub byte: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    #[serde(default)]
    pub filename: String,
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Enclosing block header, e.g. `resource "aws_dynamodb_table" "Table"`.
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub start_line: usize,
    #[serde(default)]
    pub highlight_start_offset: usize,
    #[serde(default)]
    pub highlight_end_offset: usize,
    #[serde(default)]
    pub values: Vec<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDiagnostic {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub range: Option<Range>,
    #[serde(default)]
    pub snippet: Option<Snippet>,
}

/// One line of machine-readable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanError {
    #[serde(rename = "@level", default)]
    pub level: String,
    #[serde(rename = "@message", default)]
    pub message: String,
    #[serde(rename = "@module", default)]
    pub module: String,
    #[serde(rename = "@timestamp", default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    #[serde(default)]
    pub diagnostic: Option<PlanDiagnostic>,
}

impl PlanError {
    /// An error-level diagnostic with the given headline.
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        let summary = summary.into();
        PlanError {
            level: "error".to_string(),
            message: format!("Error: {}", summary),
            module: "terraform.ui".to_string(),
            timestamp: String::new(),
            message_type: "diagnostic".to_string(),
            diagnostic: Some(PlanDiagnostic {
                severity: "error".to_string(),
                summary,
                detail: detail.into(),
                ..PlanDiagnostic::default()
            }),
        }
    }

    pub fn with_range(mut self, filename: &str, start_line: usize, end_line: usize) -> Self {
        if let Some(diagnostic) = &mut self.diagnostic {
            diagnostic.range = Some(Range {
                filename: filename.to_string(),
                start: Position {
                    line: start_line,
                    column: 1,
                    byte: 0,
                },
                end: Position {
                    line: end_line,
                    column: 1,
                    byte: 0,
                },
            });
        }
        self
    }

    pub fn with_snippet(mut self, context: Option<&str>, code: &str) -> Self {
        if let Some(diagnostic) = &mut self.diagnostic {
            let start_line = diagnostic.range.as_ref().map(|r| r.start.line).unwrap_or(0);
            diagnostic.snippet = Some(Snippet {
                context: context.map(str::to_string),
                code: code.to_string(),
                start_line,
                ..Snippet::default()
            });
        }
        self
    }

    fn from_validate(diagnostic: PlanDiagnostic) -> Self {
        let severity = if diagnostic.severity.is_empty() { "error".to_string() } else { diagnostic.severity.clone() };
        let mut prefix = severity.clone();
        if let Some(first) = prefix.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        PlanError {
            message: format!("{}: {}", prefix, diagnostic.summary),
            level: severity,
            module: "terraform.ui".to_string(),
            timestamp: String::new(),
            message_type: "diagnostic".to_string(),
            diagnostic: Some(diagnostic),
        }
    }

    /// Headline: the diagnostic summary, else the `@message`.
    pub fn summary(&self) -> &str {
        match &self.diagnostic {
            Some(d) if !d.summary.is_empty() => &d.summary,
            _ => &self.message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::classify(self.summary())
    }

    pub fn is_error(&self) -> bool {
        self.level == "error"
    }

    pub fn range(&self) -> Option<&Range> {
        self.diagnostic.as_ref().and_then(|d| d.range.as_ref())
    }

    pub fn snippet(&self) -> Option<&Snippet> {
        self.diagnostic.as_ref().and_then(|d| d.snippet.as_ref())
    }

    /// First line the diagnostic points at, 1-based.
    pub fn line(&self) -> Option<usize> {
        self.range().map(|r| r.start.line)
    }

    fn fingerprint_into(&self, hasher: &mut DefaultHasher) {
        self.summary().hash(hasher);
        self.range().hash(hasher);
        if let Some(snippet) = self.snippet() {
            snippet.context.hash(hasher);
            snippet.code.hash(hasher);
            snippet.start_line.hash(hasher);
            snippet.highlight_start_offset.hash(hasher);
            snippet.highlight_end_offset.hash(hasher);
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (address, detail) = match &self.diagnostic {
            Some(d) => (d.address.clone(), d.detail.clone()),
            None => (None, String::new()),
        };
        let detail = match self.line() {
            Some(line) if detail.is_empty() => format!("at line {}", line),
            Some(line) => format!("{} (line {})", detail, line),
            None => detail,
        };
        Diagnostic::error(address, self.summary(), detail)
    }
}

/// The error diagnostics of one trial compile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanErrorCollection {
    errors: Vec<PlanError>,
}

#[derive(Deserialize)]
struct ValidateOutput {
    #[serde(default)]
    diagnostics: Vec<PlanDiagnostic>,
}

impl PlanErrorCollection {
    pub fn new(errors: Vec<PlanError>) -> Self {
        PlanErrorCollection { errors }
    }

    /// Parses line-delimited `-json` output, keeping error diagnostics.
    pub fn from_json_lines(text: &str) -> Result<Self, PlanDecodeError> {
        let mut errors = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let error: PlanError =
                serde_json::from_str(line).map_err(|source| PlanDecodeError::Line { line: index + 1, source })?;
            if error.message_type == "diagnostic" && error.is_error() {
                errors.push(error);
            }
        }
        Ok(PlanErrorCollection { errors })
    }

    /// Parses the document printed by `terraform validate -json`.
    pub fn from_validate_json(text: &str) -> Result<Self, PlanDecodeError> {
        let output: ValidateOutput = serde_json::from_str(text)?;
        let errors = output
            .diagnostics
            .into_iter()
            .map(PlanError::from_validate)
            .filter(PlanError::is_error)
            .collect();
        Ok(PlanErrorCollection { errors })
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlanError> {
        self.errors.iter()
    }

    /// Hash over headlines, ranges and snippets. Two rounds with the same
    /// fingerprint made no progress.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for error in &self.errors {
            error.fingerprint_into(&mut hasher);
        }
        hasher.finish()
    }

    pub fn into_vec(self) -> Vec<PlanError> {
        self.errors
    }
}

impl IntoIterator for PlanErrorCollection {
    type Item = PlanError;
    type IntoIter = std::vec::IntoIter<PlanError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PLAN_LINES: &str = r#"{"@level":"info","@message":"Terraform 1.5.7","@module":"terraform.ui","@timestamp":"2024-01-10T10:00:00.000000Z","terraform":"1.5.7","type":"version","ui":"1.1"}
{"@level":"error","@message":"Error: Value for unconfigurable attribute","@module":"terraform.ui","@timestamp":"2024-01-10T10:00:01.000000Z","diagnostic":{"severity":"error","summary":"Value for unconfigurable attribute","detail":"Can't configure a value for \"arn\": its value will be decided automatically based on the result of applying this configuration.","address":"aws_s3_bucket.Bucket","range":{"filename":"main.tf","start":{"line":12,"column":3,"byte":210},"end":{"line":12,"column":40,"byte":247}},"snippet":{"context":"resource \"aws_s3_bucket\" \"Bucket\"","code":"  arn = \"arn:aws:s3:::bucket\"","start_line":12,"highlight_start_offset":2,"highlight_end_offset":5,"values":[]}},"type":"diagnostic"}
"#;

    const VALIDATE: &str = r#"{
      "format_version": "1.0",
      "valid": false,
      "error_count": 1,
      "warning_count": 1,
      "diagnostics": [
        {
          "severity": "warning",
          "summary": "Argument is deprecated",
          "detail": "Use the aws_s3_bucket_acl resource instead"
        },
        {
          "severity": "error",
          "summary": "Missing required argument",
          "detail": "The argument \"attribute_name\" is required, but no definition was found.",
          "range": {
            "filename": "main.tf",
            "start": { "line": 30, "column": 9, "byte": 700 },
            "end": { "line": 30, "column": 9, "byte": 700 }
          },
          "snippet": {
            "context": "resource \"aws_dynamodb_table\" \"Table\"",
            "code": "  ttl {",
            "start_line": 30,
            "highlight_start_offset": 8,
            "highlight_end_offset": 8,
            "values": []
          }
        }
      ]
    }"#;

    #[test]
    fn test_classify_headlines() {
        assert_eq!(ErrorKind::classify("Error: Missing attribute separator"), ErrorKind::MissingAttributeSeparator);
        assert_eq!(ErrorKind::classify("Missing required argument"), ErrorKind::MissingRequiredArgument);
        assert_eq!(ErrorKind::classify("Error: Value for unconfigurable attribute"), ErrorKind::UnconfigurableAttribute);
        assert_eq!(ErrorKind::classify("Invalid or unknown key"), ErrorKind::InvalidOrUnknownKey);
        assert_eq!(ErrorKind::classify("Error: Missing attribute separator."), ErrorKind::Unrecognized);
        assert_eq!(ErrorKind::classify("error: missing required argument"), ErrorKind::Unrecognized);
    }

    #[test]
    fn test_json_lines_keep_error_diagnostics() {
        let errors = PlanErrorCollection::from_json_lines(PLAN_LINES).unwrap();
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.kind(), ErrorKind::UnconfigurableAttribute);
        assert_eq!(error.line(), Some(12));
        assert_eq!(error.range().unwrap().end.column, 40);
        assert_eq!(error.snippet().unwrap().context.as_deref(), Some("resource \"aws_s3_bucket\" \"Bucket\""));

        let diag = error.to_diagnostic();
        assert_eq!(diag.address.as_deref(), Some("aws_s3_bucket.Bucket"));
        assert!(diag.detail.ends_with("(line 12)"));
    }

    #[test]
    fn test_bad_line_reports_position() {
        let err = PlanErrorCollection::from_json_lines("{}\nnot json\n").unwrap_err();
        assert!(matches!(err, PlanDecodeError::Line { line: 2, .. }));
    }

    #[test]
    fn test_validate_output() {
        let errors = PlanErrorCollection::from_validate_json(VALIDATE).unwrap();
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.message, "Error: Missing required argument");
        assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(error.snippet().unwrap().code, "  ttl {");
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = PlanErrorCollection::new(vec![PlanError::error("Invalid or unknown key", "").with_range("main.tf", 3, 3)]);
        let b = PlanErrorCollection::new(vec![PlanError::error("Invalid or unknown key", "").with_range("main.tf", 3, 3)]);
        let c = PlanErrorCollection::new(vec![PlanError::error("Invalid or unknown key", "").with_range("main.tf", 4, 4)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
