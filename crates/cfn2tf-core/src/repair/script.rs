use std::fmt;

use crate::declarations::{Variable, VariableType};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("invalid line {line} in HCL document of {count} lines")]
    LineOutOfRange { line: usize, count: usize },
    #[error("invalid line range {start}..={end}")]
    InvalidRange { start: usize, end: usize },
}

/// An emitted document held as lines, addressed 1-based the way
/// diagnostic ranges address it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HclScript {
    lines: Vec<String>,
}

impl HclScript {
    pub fn new(text: &str) -> Self {
        HclScript {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    fn index(&self, line: usize) -> Result<usize, ScriptError> {
        if line == 0 || line > self.lines.len() {
            return Err(ScriptError::LineOutOfRange {
                line,
                count: self.lines.len(),
            });
        }
        Ok(line - 1)
    }

    pub fn get(&self, line: usize) -> Result<&str, ScriptError> {
        let index = self.index(line)?;
        Ok(&self.lines[index])
    }

    pub fn set(&mut self, line: usize, text: impl Into<String>) -> Result<(), ScriptError> {
        let index = self.index(line)?;
        self.lines[index] = text.into();
        Ok(())
    }

    /// Removes lines `start..=end`.
    pub fn remove_lines(&mut self, start: usize, end: usize) -> Result<(), ScriptError> {
        if start > end {
            return Err(ScriptError::InvalidRange { start, end });
        }
        let first = self.index(start)?;
        let last = self.index(end)?;
        self.lines.drain(first..=last);
        Ok(())
    }

    /// Removes several inclusive ranges. Ranges are applied from the
    /// bottom of the document up so earlier line numbers stay valid.
    pub fn remove_line_ranges(&mut self, ranges: &[(usize, usize)]) -> Result<(), ScriptError> {
        let mut ordered = ranges.to_vec();
        ordered.sort_by(|a, b| b.0.cmp(&a.0));
        for (start, end) in ordered {
            self.remove_lines(start, end)?;
        }
        Ok(())
    }

    /// Replaces quoted literals equal to a scalar string variable's default
    /// with a reference to the variable. Declaration lines are left alone.
    /// Returns the number of lines changed.
    pub fn fix_up_variable_references<'v>(&mut self, variables: impl IntoIterator<Item = &'v Variable>) -> usize {
        let mut changed = 0;
        for variable in variables {
            if variable.variable_type != VariableType::String {
                continue;
            }
            let Some(default) = variable.default.as_deref().filter(|d| !d.is_empty()) else {
                continue;
            };
            let literal = format!("\"{}\"", default);
            let reference = variable.address();
            for line in &mut self.lines {
                if is_default_line(line) || !line.contains(&literal) {
                    continue;
                }
                *line = line.replace(&literal, &reference);
                changed += 1;
            }
        }
        changed
    }
}

// `default = ...` inside a variable block, not `default_tags` and the like.
fn is_default_line(line: &str) -> bool {
    line.trim_start()
        .strip_prefix("default")
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

impl fmt::Display for HclScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
