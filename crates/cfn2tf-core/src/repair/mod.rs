//! Plan-feedback repair.
//!
//! The emitted document is trial-compiled, recognized diagnostics are
//! patched on the text, and the document is compiled again. The loop is
//! bounded; whatever is still reported after the last round is returned
//! unfixed.

mod fixer;
mod plan;
mod script;

use std::collections::HashSet;

pub use fixer::PlanFixer;
pub use plan::{
    ErrorKind, PlanDecodeError, PlanDiagnostic, PlanError, PlanErrorCollection, Position, Range, Snippet,
};
pub use script::{HclScript, ScriptError};

use crate::diag::Diagnostics;
use crate::writer::MAIN_SCRIPT_FILE;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("trial compile failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Decode(#[from] PlanDecodeError),
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Something that compiles a document and reports its error diagnostics.
pub trait TrialCompiler {
    fn compile(&mut self, document: &str) -> Result<PlanErrorCollection, CompileError>;
}

/// Result of a repair run.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub document: String,
    /// Rounds in which fixes were applied.
    pub rounds: usize,
    /// Diagnostics still reported by the last compile.
    pub remaining: Vec<PlanError>,
    /// Total number of fixes applied.
    pub fixed: usize,
}

impl RepairOutcome {
    pub fn is_clean(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        for error in &self.remaining {
            diags.add(error.to_diagnostic());
        }
        diags
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RepairLoop {
    max_rounds: usize,
}

impl RepairLoop {
    pub fn new(max_rounds: usize) -> Self {
        RepairLoop { max_rounds }
    }

    /// Compiles and fixes until the document is clean, a round fixes
    /// nothing, the same diagnostics come back, or the round limit is hit.
    pub fn run<C>(&self, compiler: &mut C, document: String) -> Result<RepairOutcome, CompileError>
    where
        C: TrialCompiler + ?Sized,
    {
        let mut document = document;
        let mut rounds = 0;
        let mut fixed = 0;
        let mut seen = HashSet::new();

        loop {
            let errors = compiler.compile(&document)?;
            if errors.is_empty() {
                log::info!("document is valid after {} repair round(s)", rounds);
                return Ok(RepairOutcome {
                    document,
                    rounds,
                    remaining: Vec::new(),
                    fixed,
                });
            }
            if rounds >= self.max_rounds || !seen.insert(errors.fingerprint()) {
                log::warn!("{} diagnostic(s) remain after {} repair round(s)", errors.len(), rounds);
                return Ok(RepairOutcome {
                    document,
                    rounds,
                    remaining: errors.into_vec(),
                    fixed,
                });
            }

            let pending = errors.into_vec();
            let (scheduled, absorbed) = schedule(&pending);

            let mut script = HclScript::new(&document);
            let mut applied = absorbed;
            for error in scheduled {
                if PlanFixer::fix(&mut script, error) {
                    applied += 1;
                } else {
                    log::warn!("no fix for '{}' at line {}", error.summary(), error.line().unwrap_or(0));
                }
            }
            if applied == 0 {
                return Ok(RepairOutcome {
                    document,
                    rounds,
                    remaining: pending,
                    fixed,
                });
            }

            rounds += 1;
            fixed += applied;
            document = script.to_string();
        }
    }
}

fn removal_span(error: &PlanError) -> Option<(usize, usize)> {
    match error.kind() {
        ErrorKind::UnconfigurableAttribute | ErrorKind::InvalidOrUnknownKey => error
            .range()
            .map(|r| (r.start.line, r.end.line))
            .filter(|(start, end)| start <= end),
        _ => None,
    }
}

/// Orders one round's errors bottom-up, so removing lines does not shift
/// pending ranges, and keeps only the outermost of nested removals.
/// Errors inside a kept removal are absorbed by it; a removal that only
/// partly overlaps a kept one waits for the next compile. Returns the
/// errors to apply and the number absorbed.
fn schedule(errors: &[PlanError]) -> (Vec<&PlanError>, usize) {
    let mut spans: Vec<(usize, usize)> = errors.iter().filter_map(removal_span).collect();
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    let mut kept: Vec<(usize, usize)> = Vec::new();
    for span in spans {
        match kept.last() {
            Some(&(_, end)) if span.0 <= end => {}
            _ => kept.push(span),
        }
    }
    let enclosing = |line: usize| kept.iter().copied().find(|&(start, end)| start <= line && line <= end);

    let mut claimed = HashSet::new();
    let mut scheduled = Vec::new();
    let mut absorbed = 0;
    for error in errors {
        match removal_span(error) {
            Some(span) if kept.contains(&span) && claimed.insert(span) => scheduled.push(error),
            Some((start, end)) => match enclosing(start) {
                Some((_, outer_end)) if end <= outer_end => absorbed += 1,
                _ => log::debug!("deferring overlapping removal of lines {}..={}", start, end),
            },
            None => match error.line().and_then(enclosing) {
                Some(_) => absorbed += 1,
                None => scheduled.push(error),
            },
        }
    }
    scheduled.sort_by(|a, b| b.line().cmp(&a.line()));
    (scheduled, absorbed)
}

/// In-process trial compile that only checks HCL syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxCheck;

impl TrialCompiler for SyntaxCheck {
    fn compile(&mut self, document: &str) -> Result<PlanErrorCollection, CompileError> {
        let error = match hcl::parse(document) {
            Ok(_) => return Ok(PlanErrorCollection::default()),
            Err(hcl::Error::Parse(err)) => {
                let line = err.location().line();
                PlanError::error("Missing attribute separator", err.message()).with_range(MAIN_SCRIPT_FILE, line, line)
            }
            Err(err) => PlanError::error("Invalid HCL document", err.to_string()),
        };
        Ok(PlanErrorCollection::new(vec![error]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Reports an unconfigurable attribute for every `arn =` line.
    struct ArnCheck {
        compiles: usize,
    }

    impl TrialCompiler for ArnCheck {
        fn compile(&mut self, document: &str) -> Result<PlanErrorCollection, CompileError> {
            self.compiles += 1;
            let errors = document
                .lines()
                .enumerate()
                .filter(|(_, line)| line.trim_start().starts_with("arn "))
                .map(|(i, _)| {
                    PlanError::error("Value for unconfigurable attribute", "arn").with_range(MAIN_SCRIPT_FILE, i + 1, i + 1)
                })
                .collect();
            Ok(PlanErrorCollection::new(errors))
        }
    }

    /// Always reports the same unrecognized error.
    struct Stubborn;

    impl TrialCompiler for Stubborn {
        fn compile(&mut self, _document: &str) -> Result<PlanErrorCollection, CompileError> {
            Ok(PlanErrorCollection::new(vec![
                PlanError::error("Unsupported block type", "").with_range(MAIN_SCRIPT_FILE, 1, 1)
            ]))
        }
    }

    /// Reports a fixable error on line 1 forever.
    struct Endless;

    impl TrialCompiler for Endless {
        fn compile(&mut self, document: &str) -> Result<PlanErrorCollection, CompileError> {
            if document.is_empty() {
                return Ok(PlanErrorCollection::default());
            }
            Ok(PlanErrorCollection::new(vec![
                PlanError::error("Invalid or unknown key", "")
                    .with_range(MAIN_SCRIPT_FILE, 1, 1)
                    .with_snippet(None, document.lines().next().unwrap_or("")),
            ]))
        }
    }

    #[test]
    fn test_unconfigurable_lines_removed() {
        let document = "resource \"aws_s3_bucket\" \"A\" {\n  arn = \"x\"\n  bucket = \"a\"\n  arn = \"y\"\n}\n";
        let mut compiler = ArnCheck { compiles: 0 };
        let outcome = RepairLoop::new(3).run(&mut compiler, document.to_string()).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.fixed, 2);
        assert_eq!(compiler.compiles, 2);
        assert_eq!(outcome.document, "resource \"aws_s3_bucket\" \"A\" {\n  bucket = \"a\"\n}\n");
    }

    #[test]
    fn test_unfixable_errors_surface() {
        let outcome = RepairLoop::new(3).run(&mut Stubborn, "x = 1\n".to_string()).unwrap();
        assert!(!outcome.is_clean());
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.remaining.len(), 1);
        assert_eq!(outcome.document, "x = 1\n");
        assert!(outcome.diagnostics().has_errors());
    }

    #[test]
    fn test_round_limit() {
        let document = "a = 1\nb = 2\nc = 3\nd = 4\ne = 5\n";
        let outcome = RepairLoop::new(2).run(&mut Endless, document.to_string()).unwrap();
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.fixed, 2);
        assert_eq!(outcome.document, "c = 3\nd = 4\ne = 5\n");
        assert_eq!(outcome.remaining.len(), 1);
    }

    /// Reports an unknown `bad` block and an unconfigurable `arn` inside it.
    struct NestedBlock;

    impl TrialCompiler for NestedBlock {
        fn compile(&mut self, document: &str) -> Result<PlanErrorCollection, CompileError> {
            if !document.contains("bad {") {
                return Ok(PlanErrorCollection::default());
            }
            Ok(PlanErrorCollection::new(vec![
                PlanError::error("Invalid or unknown key", "bad").with_range(MAIN_SCRIPT_FILE, 3, 5),
                PlanError::error("Value for unconfigurable attribute", "arn").with_range(MAIN_SCRIPT_FILE, 4, 4),
            ]))
        }
    }

    #[test]
    fn test_nested_removals_keep_following_lines() {
        let document = "resource \"t\" \"r\" {\n  a = 1\n  bad {\n    arn = \"x\"\n  }\n  keep = 2\n}\n";
        let outcome = RepairLoop::new(3).run(&mut NestedBlock, document.to_string()).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.fixed, 2);
        assert_eq!(outcome.document, "resource \"t\" \"r\" {\n  a = 1\n  keep = 2\n}\n");
    }

    #[test]
    fn test_schedule_defers_partial_overlap() {
        let errors = vec![
            PlanError::error("Invalid or unknown key", "").with_range(MAIN_SCRIPT_FILE, 5, 7),
            PlanError::error("Invalid or unknown key", "").with_range(MAIN_SCRIPT_FILE, 3, 5),
            PlanError::error("Value for unconfigurable attribute", "").with_range(MAIN_SCRIPT_FILE, 4, 4),
            PlanError::error("Missing attribute separator", "").with_range(MAIN_SCRIPT_FILE, 9, 9),
            PlanError::error("Missing attribute separator", "").with_range(MAIN_SCRIPT_FILE, 4, 4),
        ];
        let (scheduled, absorbed) = schedule(&errors);
        let lines: Vec<_> = scheduled.iter().map(|e| e.line()).collect();
        assert_eq!(lines, vec![Some(9), Some(3)]);
        assert_eq!(absorbed, 2);
    }

    #[test]
    fn test_syntax_check() {
        let mut check = SyntaxCheck;
        assert!(check.compile("a = 1\n").unwrap().is_empty());

        let errors = check.compile("a = 1\nb c d\n").unwrap();
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.kind(), ErrorKind::MissingAttributeSeparator);
        assert!(error.line().is_some());
    }
}
