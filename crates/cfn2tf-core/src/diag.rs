use std::fmt;

/// How serious a [`Diagnostic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Something worth telling the user about a generated document: a resource
/// that could not be written, a reference that could not be resolved, or a
/// terraform error the repair loop left in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// `aws_s3_bucket.Bucket`, when the diagnostic concerns one resource.
    pub address: Option<String>,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    fn with_severity(severity: Severity, address: Option<String>, summary: String, detail: String) -> Self {
        Diagnostic {
            severity,
            address,
            summary,
            detail,
        }
    }

    /// An error, optionally tied to a resource address.
    pub fn error(address: Option<String>, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, address, summary.into(), detail.into())
    }

    /// A warning, optionally tied to a resource address.
    pub fn warning(address: Option<String>, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, address, summary.into(), detail.into())
    }

    /// True for error severity.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn concerns(&self, address: &str) -> bool {
        self.address.as_deref() == Some(address)
    }
}

// `error: aws_sqs_queue.Q: summary; detail`
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.severity.label())?;
        f.write_str(": ")?;
        if let Some(address) = &self.address {
            write!(f, "{}: ", address)?;
        }
        f.write_str(&self.summary)?;
        if !self.detail.is_empty() {
            write!(f, "; {}", self.detail)?;
        }
        Ok(())
    }
}

/// Diagnostics gathered over one export, in the order they were raised.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic. Errors are also logged at debug level.
    pub fn add(&mut self, diag: Diagnostic) {
        if diag.is_error() {
            log::debug!("{}", diag);
        }
        self.entries.push(diag);
    }

    /// Appends an error.
    pub fn error(&mut self, address: Option<String>, summary: impl Into<String>, detail: impl Into<String>) {
        self.add(Diagnostic::error(address, summary, detail));
    }

    /// Appends a warning.
    pub fn warning(&mut self, address: Option<String>, summary: impl Into<String>, detail: impl Into<String>) {
        self.add(Diagnostic::warning(address, summary, detail));
    }

    /// Appends every diagnostic of `other`, keeping its order.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        for diag in other {
            self.add(diag);
        }
    }

    /// True if at least one error was raised.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// True if at least one warning was raised.
    pub fn has_warnings(&self) -> bool {
        self.entries.len() > self.error_count()
    }

    /// Number of error-severity diagnostics.
    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    /// True when nothing was raised.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of diagnostics of any severity.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Diagnostics in the order they were raised.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    /// Diagnostics raised against one resource address.
    pub fn for_address<'a>(&'a self, address: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.entries.iter().filter(move |d| d.concerns(address))
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Warnings first, then errors, so errors end up closest to the prompt.
impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for severity in [Severity::Warning, Severity::Error] {
            for diag in self.entries.iter().filter(|d| d.severity == severity) {
                writeln!(f, "{}", diag)?;
            }
        }
        Ok(())
    }
}
