//! Validation reporter

use std::fmt::Write as _;

use crate::rules::RuleKind;

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failed
    Error,
    /// Warning - issue but not blocking
    Warning,
}

/// One problem found in a mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub kind: RuleKind,
    /// Mapping key, `source=>destination`
    pub mapping: String,
    /// Offending member path, if the issue concerns a member
    pub path: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    #[must_use]
    pub fn new(
        severity: Severity,
        kind: RuleKind,
        mapping: &str,
        path: Option<String>,
        message: String,
    ) -> Self {
        Self {
            severity,
            kind,
            mapping: mapping.to_string(),
            path,
            message,
        }
    }
}

/// Result of validating a registry
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an issue according to its severity
    pub fn add(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => {
                self.errors.push(issue);
                self.is_valid = false;
            }
            Severity::Warning => self.warnings.push(issue),
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub(crate) fn truncate_errors(&mut self, max_errors: usize) {
        if max_errors > 0 {
            self.errors.truncate(max_errors);
        }
    }

    /// Error messages joined by newlines
    #[must_use]
    pub fn error_message(&self) -> String {
        self.errors
            .iter()
            .map(|issue| issue.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders validation reports as text
pub struct ValidationReporter {
    show_warnings: bool,
}

impl ValidationReporter {
    #[must_use]
    pub fn new() -> Self {
        Self { show_warnings: true }
    }

    #[must_use]
    pub fn errors_only() -> Self {
        Self {
            show_warnings: false,
        }
    }

    /// One line per issue followed by a summary line
    #[must_use]
    pub fn render(&self, report: &ValidationReport) -> String {
        let mut out = String::new();
        for issue in &report.errors {
            let _ = writeln!(out, "error[{}]: {}", issue.kind.code(), issue.message);
        }
        if self.show_warnings {
            for issue in &report.warnings {
                let _ = writeln!(out, "warning[{}]: {}", issue.kind.code(), issue.message);
            }
        }
        let status = if report.is_valid { "valid" } else { "invalid" };
        let _ = write!(
            out,
            "configuration {status}: {} error(s), {} warning(s)",
            report.errors.len(),
            report.warnings.len()
        );
        out
    }
}

impl Default for ValidationReporter {
    fn default() -> Self {
        Self::new()
    }
}
