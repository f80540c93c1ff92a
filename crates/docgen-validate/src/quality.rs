//! Conversion-quality check: converted text compared with the original.

use std::sync::LazyLock;

use docgen_model::{IssueKind, ValidationIssue, line_and_column};
use regex::Regex;

/// Converted text below this share of the original's non-empty lines is
/// reported as possible content loss.
const MIN_CONTENT_RATIO: f64 = 0.5;

static LEGACY_SYNTAX: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\{IF\b", "IF statement not fully converted"),
        (r"\{TABLE\b", "TABLE statement not fully converted"),
        (r"\{LOOP\b", "LOOP statement not fully converted"),
        (r"\{END\b", "END statement not fully converted"),
        (r"&[=+!]", "Unconverted merge field"),
        (r"&[A-Za-z0-9_]", "Possible unconverted merge field"),
    ]
    .into_iter()
    .map(|(pattern, message)| {
        (
            Regex::new(pattern).expect("Invalid legacy syntax regex"),
            message,
        )
    })
    .collect()
});

fn non_empty_lines(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

pub fn check_conversion_quality(original: &str, converted: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut residual: Vec<(usize, ValidationIssue)> = Vec::new();
    for (pattern, message) in LEGACY_SYNTAX.iter() {
        for found in pattern.find_iter(converted) {
            let (line, column) = line_and_column(converted, found.start());
            residual.push((
                found.start(),
                ValidationIssue::warning(
                    IssueKind::UnconvertedSyntax,
                    line,
                    column,
                    format!("{message}: `{}`", found.as_str()),
                )
                .with_suggestion("Review the conversion of this Conga syntax to handlebars"),
            ));
        }
    }
    residual.sort_by_key(|(offset, _)| *offset);
    issues.extend(residual.into_iter().map(|(_, issue)| issue));

    let original_lines = non_empty_lines(original);
    if original_lines > 0 {
        let ratio = non_empty_lines(converted) as f64 / original_lines as f64;
        if ratio < MIN_CONTENT_RATIO {
            issues.push(
                ValidationIssue::warning(
                    IssueKind::ContentReduction,
                    0,
                    0,
                    format!(
                        "Significant reduction in content after conversion ({:.0}% of original lines)",
                        ratio * 100.0
                    ),
                )
                .with_suggestion("Verify that no content was removed during conversion"),
            );
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use docgen_model::Severity;

    use super::*;

    #[test]
    fn residual_legacy_syntax_is_reported_per_occurrence() {
        let converted = "{{#each items}}\n{IF \"x\" = \"y\" \"a\" \"b\"} &=Account.Name\n{END Items}";
        let issues = check_conversion_quality(converted, converted);
        let found: Vec<(usize, usize, &str)> = issues
            .iter()
            .map(|issue| (issue.line, issue.column, issue.message.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (2, 1, "IF statement not fully converted: `{IF`"),
                (2, 24, "Unconverted merge field: `&=`"),
                (3, 1, "END statement not fully converted: `{END`"),
            ]
        );
        assert!(issues.iter().all(|issue| issue.severity == Severity::Warning));
    }

    #[test]
    fn clean_conversion_has_no_findings() {
        let original = "Dear &=Contact.Name\n{TABLE Group=Items}\n{END Items}";
        let converted = "Dear contact.name\n{{#each items}}\n{{/each}}";
        assert!(check_conversion_quality(original, converted).is_empty());
    }

    #[test]
    fn content_loss_is_one_warning() {
        let original = "one\ntwo\nthree\nfour\n\n";
        let issues = check_conversion_quality(original, "one\n\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::ContentReduction);
        assert!(check_conversion_quality(original, "one\ntwo").is_empty());
        assert!(check_conversion_quality("", "").is_empty());
    }
}
