//! Syntax check: delimiter balance, block-helper balance and helper names.
//!
//! Only balance problems are errors; everything else is a warning, so a
//! template is valid exactly when its delimiters and blocks pair up.

use std::collections::BTreeSet;

use docgen_model::{IssueKind, ValidationIssue, line_and_column};
use rapidfuzz::distance::jaro_winkler;

use crate::expression::expressions;

/// Block helpers every handlebars runtime provides.
pub const CORE_HELPERS: [&str; 6] = ["if", "unless", "each", "with", "lookup", "log"];

/// Minimum similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Allow-list of block helper names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperSet {
    names: BTreeSet<String>,
}

impl Default for HelperSet {
    fn default() -> Self {
        Self {
            names: CORE_HELPERS.iter().map(|name| (*name).to_string()).collect(),
        }
    }
}

impl HelperSet {
    /// Core helpers plus `extra` (e.g. the comparison helpers a target
    /// platform adds).
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        set.names.extend(extra.into_iter().map(Into::into));
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Closest known helper to `name`, if it is close enough to be a typo.
    pub fn closest(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .map(|known| (known, jaro_winkler::similarity(name.chars(), known.chars())))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(known, _)| known.as_str())
    }
}

struct OpenBlock<'t> {
    name: &'t str,
    line: usize,
    column: usize,
}

pub fn check_syntax(text: &str, helpers: &HelperSet) -> Vec<ValidationIssue> {
    let mut issues = check_delimiters(text);
    issues.extend(check_blocks(text, helpers));
    issues
}

/// Pairs every `}}` with the nearest pending `{{`, across lines.
fn check_delimiters(text: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut pending: Vec<usize> = Vec::new();
    let bytes = text.as_bytes();
    let mut index = 0;
    while index + 1 < bytes.len() {
        match &bytes[index..index + 2] {
            b"{{" => {
                pending.push(index);
                index += 2;
            }
            b"}}" => {
                if pending.pop().is_none() {
                    let (line, column) = line_and_column(text, index);
                    issues.push(ValidationIssue::error(
                        IssueKind::UnmatchedClose,
                        line,
                        column,
                        "Unmatched closing handlebars",
                    ));
                }
                index += 2;
            }
            _ => index += 1,
        }
    }
    for offset in pending {
        let (line, column) = line_and_column(text, offset);
        issues.push(
            ValidationIssue::error(
                IssueKind::UnclosedTag,
                line,
                column,
                "Unclosed handlebars expression",
            )
            .with_suggestion("Add the missing }}"),
        );
    }
    issues
}

fn check_blocks(text: &str, helpers: &HelperSet) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut open: Vec<OpenBlock<'_>> = Vec::new();
    for expression in expressions(text) {
        if expression.body.is_empty() {
            issues.push(ValidationIssue::warning(
                IssueKind::EmptyExpression,
                expression.line,
                expression.column,
                "Empty handlebars expression",
            ));
            continue;
        }
        let Some((sigil, name)) = expression.block() else {
            continue;
        };
        if sigil == '#' {
            if !helpers.contains(name) {
                let suggestion = match helpers.closest(name) {
                    Some(known) => format!("Did you mean `{known}`?"),
                    None => format!(
                        "Known helpers: {}",
                        helpers.names().collect::<Vec<_>>().join(", ")
                    ),
                };
                issues.push(
                    ValidationIssue::warning(
                        IssueKind::UnknownHelper,
                        expression.line,
                        expression.column,
                        format!("Unknown helper: {name}"),
                    )
                    .with_suggestion(suggestion),
                );
            }
            open.push(OpenBlock {
                name,
                line: expression.line,
                column: expression.column,
            });
            continue;
        }
        match open.pop() {
            None => issues.push(ValidationIssue::error(
                IssueKind::UnmatchedBlockClose,
                expression.line,
                expression.column,
                format!("Closing {{{{/{name}}}}} has no open block"),
            )),
            Some(block) if block.name != name => issues.push(
                ValidationIssue::error(
                    IssueKind::MismatchedBlock,
                    expression.line,
                    expression.column,
                    format!(
                        "Closing {{{{/{name}}}}} does not match {{{{#{}}}}} opened on line {}",
                        block.name, block.line
                    ),
                )
                .with_suggestion(format!("Close the block with {{{{/{}}}}}", block.name)),
            ),
            Some(_) => {}
        }
    }
    for block in open {
        issues.push(
            ValidationIssue::error(
                IssueKind::UnclosedBlock,
                block.line,
                block.column,
                format!("Unclosed block helper {{{{#{}}}}}", block.name),
            )
            .with_suggestion(format!("Add {{{{/{}}}}}", block.name)),
        );
    }
    issues
}
