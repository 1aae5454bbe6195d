//! Dotted attribute paths into a resource's attribute tree.
//!
//! Paths are written `ingress.0.cidr_blocks`; the bracketed form
//! `ingress[0].cidr_blocks` produced by JSON path tooling is accepted too.
//! Numeric segments address list elements.

use std::fmt;

/// A path to an attribute within a resource's attribute tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributePath {
    segments: Vec<String>,
}

impl AttributePath {
    /// The empty path, addressing the resource body itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted or bracketed path.
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                    let mut index = String::new();
                    for c in chars.by_ref() {
                        if c == ']' {
                            break;
                        }
                        index.push(c);
                    }
                    let index = index.trim_matches(|c| c == '\'' || c == '"');
                    if !index.is_empty() {
                        segments.push(index.to_string());
                    }
                }
                _ => current.push(c),
            }
        }

        if !current.is_empty() {
            segments.push(current);
        }

        Self { segments }
    }

    /// Returns a new path with a named child segment appended.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Returns a new path with a list index segment appended.
    pub fn index(&self, index: usize) -> Self {
        self.child(&index.to_string())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The final segment, or the empty string for the root.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Returns true if the path matches `pattern`.
    ///
    /// The pattern is dotted; `*` within a segment matches any run of
    /// characters inside that one segment, so `ingress.*.description`
    /// matches `ingress.3.description` but not `ingress.3.x.description`.
    pub fn is_like(&self, pattern: &str) -> bool {
        let pattern = AttributePath::parse(pattern);
        pattern.segments.len() == self.segments.len()
            && pattern
                .segments
                .iter()
                .zip(&self.segments)
                .all(|(p, s)| glob_match(p, s))
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for AttributePath {
    fn from(path: &str) -> Self {
        AttributePath::parse(path)
    }
}

/// Glob match within a single segment, `*` being the only metacharacter.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let path = AttributePath::parse("ingress.0.cidr_blocks");
        assert_eq!(path.segments(), &["ingress", "0", "cidr_blocks"]);
        assert_eq!(path.to_string(), "ingress.0.cidr_blocks");
    }

    #[test]
    fn test_parse_bracketed() {
        let path = AttributePath::parse("ingress[0].cidr_blocks");
        assert_eq!(path.to_string(), "ingress.0.cidr_blocks");
        let path = AttributePath::parse("tags['Name']");
        assert_eq!(path.segments(), &["tags", "Name"]);
    }

    #[test]
    fn test_child_and_index() {
        let path = AttributePath::root().child("egress").index(2).child("self");
        assert_eq!(path.to_string(), "egress.2.self");
        assert_eq!(path.name(), "self");
        assert_eq!(path.depth(), 3);
        assert!(AttributePath::root().is_root());
    }

    #[test]
    fn test_is_like_wildcard_segment() {
        let path = AttributePath::parse("ingress.3.description");
        assert!(path.is_like("ingress.*.description"));
        assert!(path.is_like("ingress.3.description"));
        assert!(!path.is_like("egress.*.description"));
        assert!(!path.is_like("ingress.*"));
    }

    #[test]
    fn test_is_like_does_not_cross_segments() {
        let path = AttributePath::parse("ingress.3.x.description");
        assert!(!path.is_like("ingress.*.description"));
    }

    #[test]
    fn test_is_like_partial_glob() {
        assert!(AttributePath::parse("tags_all").is_like("tags*"));
        assert!(AttributePath::parse("bucket_domain_name").is_like("*_domain_name"));
        assert!(!AttributePath::parse("bucket").is_like("*_name"));
    }
}
