use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// `{{` without a matching `}}`.
    UnclosedTag,
    /// `}}` without a pending `{{`.
    UnmatchedClose,
    /// Block helper opened and never closed.
    UnclosedBlock,
    /// Block helper closed with a different name than it was opened with.
    MismatchedBlock,
    /// Block close with no open block.
    UnmatchedBlockClose,
    EmptyExpression,
    UnknownHelper,
    UnknownField,
    MissingRequiredField,
    MissingSchema,
    /// Legacy syntax left in converted text.
    UnconvertedSyntax,
    ContentReduction,
    /// A located tag that no rule or adapter could convert.
    UnconvertedTag,
    /// A tag found in the text but in no run.
    UnlocatedTag,
    /// A tag whose characters span several runs.
    SplitTag,
    /// Finding reported by an AI validator.
    AiReported,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::UnclosedTag => "unclosed_tag",
            IssueKind::UnmatchedClose => "unmatched_close",
            IssueKind::UnclosedBlock => "unclosed_block",
            IssueKind::MismatchedBlock => "mismatched_block",
            IssueKind::UnmatchedBlockClose => "unmatched_block_close",
            IssueKind::EmptyExpression => "empty_expression",
            IssueKind::UnknownHelper => "unknown_helper",
            IssueKind::UnknownField => "unknown_field",
            IssueKind::MissingRequiredField => "missing_required_field",
            IssueKind::MissingSchema => "missing_schema",
            IssueKind::UnconvertedSyntax => "unconverted_syntax",
            IssueKind::ContentReduction => "content_reduction",
            IssueKind::UnconvertedTag => "unconverted_tag",
            IssueKind::UnlocatedTag => "unlocated_tag",
            IssueKind::SplitTag => "split_tag",
            IssueKind::AiReported => "ai_reported",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding. `line` and `column` are 1-based; `0` means
/// the finding is not tied to a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub severity: Severity,
    pub kind: IssueKind,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn error(kind: IssueKind, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            severity: Severity::Error,
            kind,
            suggestion: None,
        }
    }

    pub fn warning(kind: IssueKind, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            severity: Severity::Warning,
            kind,
            suggestion: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Which path produced a validation report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    #[default]
    Rules,
    Ai,
    AiFallbackToRules,
}

impl ValidationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationMethod::Rules => "rules",
            ValidationMethod::Ai => "ai",
            ValidationMethod::AiFallbackToRules => "ai_fallback_to_rules",
        }
    }
}

/// 1-based line and character column of a byte offset in `text`.
pub fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |index| index + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Coarse confidence scale: 0.3 with errors, 0.7 with only warnings, 1.0 clean.
pub fn confidence_tier(errors: usize, warnings: usize) -> f64 {
    if errors > 0 {
        0.3
    } else if warnings > 0 {
        0.7
    } else {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub completeness: f64,
    /// Always one of the [`confidence_tier`] values.
    pub confidence: f64,
    /// Confidence stated by the AI validator, kept apart from the tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
    pub method: ValidationMethod,
}

impl ValidationReport {
    /// Builds a report from raw findings over a text of `total_lines` lines.
    ///
    /// Validity, completeness and the confidence tier are derived here so
    /// that `is_valid` always agrees with the error list.
    pub fn from_issues(
        issues: Vec<ValidationIssue>,
        total_lines: usize,
        method: ValidationMethod,
    ) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .partition(|issue| issue.severity == Severity::Error);
        let completeness = completeness(errors.iter().chain(&warnings), total_lines);
        let confidence = confidence_tier(errors.len(), warnings.len());
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            completeness,
            confidence,
            ai_confidence: None,
            method,
        }
    }

    #[must_use]
    pub fn with_ai_confidence(mut self, confidence: f64) -> Self {
        self.ai_confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(&self.warnings)
    }

    pub fn has_kind(&self, kind: IssueKind) -> bool {
        self.issues().any(|issue| issue.kind == kind)
    }
}

fn completeness<'a>(issues: impl Iterator<Item = &'a ValidationIssue>, total_lines: usize) -> f64 {
    let touched: BTreeSet<usize> = issues
        .filter(|issue| issue.line > 0)
        .map(|issue| issue.line)
        .collect();
    if touched.is_empty() {
        return 1.0;
    }
    let total = total_lines.max(1) as f64;
    (1.0 - touched.len() as f64 / total).clamp(0.0, 1.0)
}
