//! Small helpers for writing HCL text.

/// State stores every number as a float; whole ones are written without
/// a fraction (`30`, not `30.0`).
pub fn format_number(n: f64) -> String {
    match n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        true => (n as i64).to_string(),
        false => n.to_string(),
    }
}

/// Escapes a string for use inside an HCL quoted template.
///
/// Literal `${` and `%{` sequences are doubled so Terraform does not
/// treat them as interpolation or directives.
pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                result.push(c);
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

/// Quotes and escapes a string literal.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

/// Literal keywords that read as values, not names, when left bare.
const KEYWORDS: [&str; 3] = ["true", "false", "null"];

/// Returns true if `s` is a valid bare HCL identifier.
pub fn is_valid_identifier(s: &str) -> bool {
    if KEYWORDS.contains(&s) {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Renders an object key, quoting it when it is not a bare identifier.
pub fn object_key(key: &str) -> String {
    if is_valid_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Turns an arbitrary name into something usable as a Terraform block label.
pub fn sanitize_label(name: &str) -> String {
    let mut label: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !label.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        label.insert(0, '_');
    }
    label
}
