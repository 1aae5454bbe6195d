//! Line-level fixes for recognized diagnostics.

use std::sync::LazyLock;

use regex::Regex;

use super::plan::{ErrorKind, PlanError};
use super::script::HclScript;

/// Leading unquoted token, typically a JSON primitive with punctuation.
static BAREWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(\s*)([^"]([^\s]+)[^"])\s*"#).expect("bareword pattern"));

static RESOURCE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^resource\s+"(\w+)""#).expect("resource header pattern"));

static TTL_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*ttl\s+\{").expect("ttl pattern"));

static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\}\s*$").expect("block end pattern"));

type ResourceFixer = fn(&mut HclScript, &PlanError) -> bool;

pub struct PlanFixer;

impl PlanFixer {
    /// Applies the fix for `error`. Returns whether the script changed.
    pub fn fix(script: &mut HclScript, error: &PlanError) -> bool {
        let fixed = match error.kind() {
            ErrorKind::MissingAttributeSeparator => quote_bareword(script, error),
            ErrorKind::UnconfigurableAttribute | ErrorKind::InvalidOrUnknownKey => remove_range(script, error),
            ErrorKind::MissingRequiredArgument => match resource_type(error).and_then(resource_fixer) {
                Some(fixer) => fixer(script, error),
                None => false,
            },
            ErrorKind::Unrecognized => false,
        };
        if fixed {
            log::debug!("fixed '{}' at line {}", error.summary(), error.line().unwrap_or(0));
        }
        fixed
    }
}

fn resource_fixer(resource_type: &str) -> Option<ResourceFixer> {
    match resource_type {
        "aws_dynamodb_table" => Some(fix_dynamodb_table),
        _ => None,
    }
}

fn resource_type(error: &PlanError) -> Option<&str> {
    let context = error.snippet()?.context.as_deref()?;
    RESOURCE_HEADER
        .captures(context)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn quote_bareword(script: &mut HclScript, error: &PlanError) -> bool {
    let Some(line) = error.line() else {
        return false;
    };
    let Ok(text) = script.get(line) else {
        return false;
    };
    let Some(caps) = BAREWORD.captures(text) else {
        return false;
    };
    let (Some(indent), Some(token), Some(whole)) = (caps.get(1), caps.get(2), caps.get(0)) else {
        return false;
    };
    let replaced = format!("{}\"{}\" {}", indent.as_str(), token.as_str().trim(), &text[whole.end()..]);
    script.set(line, replaced).is_ok()
}

fn remove_range(script: &mut HclScript, error: &PlanError) -> bool {
    let Some(range) = error.range() else {
        return false;
    };
    script.remove_lines(range.start.line, range.end.line).is_ok()
}

/// A `ttl` block cannot be written without its attribute name, even when
/// disabled. The whole block goes.
fn fix_dynamodb_table(script: &mut HclScript, error: &PlanError) -> bool {
    let in_ttl = error.snippet().is_some_and(|s| TTL_BLOCK.is_match(&s.code));
    let Some(start) = error.line().filter(|_| in_ttl) else {
        return false;
    };
    let end = (start + 1..=script.len()).find(|&line| script.get(line).is_ok_and(|text| BLOCK_END.is_match(text)));
    match end {
        Some(end) => script.remove_lines(start, end).is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unconfigurable_attribute_removes_range() {
        let mut script = HclScript::new("resource \"aws_s3_bucket\" \"B\" {\n  arn    = \"x\"\n  bucket = \"b\"\n}\n");
        let error = PlanError::error("Value for unconfigurable attribute", "").with_range("main.tf", 2, 2);
        assert!(PlanFixer::fix(&mut script, &error));
        assert_eq!(script.to_string(), "resource \"aws_s3_bucket\" \"B\" {\n  bucket = \"b\"\n}\n");
    }

    #[test]
    fn test_unknown_key_out_of_range_is_not_fixed() {
        let mut script = HclScript::new("a\n");
        let error = PlanError::error("Invalid or unknown key", "").with_range("main.tf", 4, 6);
        assert!(!PlanFixer::fix(&mut script, &error));
        assert_eq!(script.len(), 1);
    }

    #[test]
    fn test_missing_separator_quotes_bareword() {
        let mut script = HclScript::new("  policy = jsonencode({\n    arn:aws:iam::123:root = 1\n  })\n");
        let error = PlanError::error("Missing attribute separator", "").with_range("main.tf", 2, 2);
        assert!(PlanFixer::fix(&mut script, &error));
        assert_eq!(script.get(2).unwrap(), "    \"arn:aws:iam::123:root\" = 1");
    }

    #[test]
    fn test_dynamodb_ttl_block_removed() {
        let text = "resource \"aws_dynamodb_table\" \"Table\" {\n  name = \"t\"\n  ttl {\n    enabled = false\n  }\n  hash_key = \"id\"\n}\n";
        let mut script = HclScript::new(text);
        let error = PlanError::error("Missing required argument", "")
            .with_range("main.tf", 3, 3)
            .with_snippet(Some("resource \"aws_dynamodb_table\" \"Table\""), "  ttl {");
        assert!(PlanFixer::fix(&mut script, &error));
        assert_eq!(
            script.to_string(),
            "resource \"aws_dynamodb_table\" \"Table\" {\n  name = \"t\"\n  hash_key = \"id\"\n}\n"
        );
    }

    #[test]
    fn test_missing_required_without_fixer() {
        let mut script = HclScript::new("resource \"aws_instance\" \"I\" {\n}\n");
        let error = PlanError::error("Missing required argument", "")
            .with_range("main.tf", 1, 1)
            .with_snippet(Some("resource \"aws_instance\" \"I\""), "resource \"aws_instance\" \"I\" {");
        assert!(!PlanFixer::fix(&mut script, &error));
    }

    #[test]
    fn test_unrecognized_is_left_alone() {
        let mut script = HclScript::new("a\n");
        let error = PlanError::error("Unsupported argument", "").with_range("main.tf", 1, 1);
        assert!(!PlanFixer::fix(&mut script, &error));
        assert_eq!(script.to_string(), "a\n");
    }
}
