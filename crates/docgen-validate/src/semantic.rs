//! Semantic check: field references against a data schema.

use std::collections::BTreeSet;

use docgen_model::{IssueKind, Schema, ValidationIssue};

use crate::expression::expressions;

/// Literal keywords that are never field references.
const KEYWORDS: [&str; 6] = ["this", "root", "true", "false", "null", "undefined"];

/// A field name referenced by a template expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReference {
    /// Last path segment, without array indices.
    pub name: String,
    /// Position of the first expression referencing it.
    pub line: usize,
    pub column: usize,
}

/// Distinct field references in first-appearance order.
///
/// Helper names, literals, hash arguments and built-ins (`this`, `root`,
/// `@index`, ...) are skipped; names compare case-insensitively.
pub fn field_references(text: &str) -> Vec<FieldReference> {
    let mut seen = BTreeSet::new();
    let mut references = Vec::new();
    for expression in expressions(text) {
        for name in expression_paths(expression.body) {
            if seen.insert(name.to_ascii_lowercase()) {
                references.push(FieldReference {
                    name,
                    line: expression.line,
                    column: expression.column,
                });
            }
        }
    }
    references
}

fn expression_paths(body: &str) -> Vec<String> {
    if body.is_empty()
        || body.starts_with(['!', '>', '/', '^'])
        || body == "else"
        || body.starts_with("else ")
    {
        return Vec::new();
    }
    let is_block = body.starts_with('#');
    let body = body.trim_start_matches(['#', '&']).trim_start();
    let tokens = tokenize(body);
    // A single bare token is a path; otherwise the first token is a helper.
    let arguments = if !is_block && tokens.len() == 1 {
        &tokens[..]
    } else {
        tokens.get(1..).unwrap_or_default()
    };
    arguments
        .iter()
        .filter_map(|token| reference_name(token))
        .collect()
}

/// Splits on whitespace outside quotes.
fn tokenize(body: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut quote: Option<char> = None;
    let mut start: Option<usize> = None;
    for (index, c) in body.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                start.get_or_insert(index);
            }
            None if c.is_whitespace() => {
                if let Some(begin) = start.take() {
                    tokens.push(&body[begin..index]);
                }
            }
            None => {
                start.get_or_insert(index);
            }
        }
    }
    if let Some(begin) = start {
        tokens.push(&body[begin..]);
    }
    tokens
}

fn reference_name(token: &str) -> Option<String> {
    // `(helper` opens a subexpression; its first token is a helper name.
    if token.starts_with('(') || token.contains('=') || token.starts_with(['"', '\'', '|']) {
        return None;
    }
    let path = token.trim_end_matches(')').trim_end_matches('|');
    let segment = path
        .rsplit(['.', '/'])
        .next()
        .unwrap_or(path)
        .split('[')
        .next()
        .unwrap_or_default();
    let first = segment.chars().next()?;
    if first == '@'
        || first.is_ascii_digit()
        || first == '-'
        || segment == "as"
        || KEYWORDS.contains(&segment)
    {
        return None;
    }
    Some(segment.to_string())
}

pub fn check_semantics(text: &str, schema: Option<&Schema>) -> Vec<ValidationIssue> {
    let Some(schema) = schema else {
        return vec![
            ValidationIssue::warning(
                IssueKind::MissingSchema,
                0,
                0,
                "No schema provided for semantic validation",
            )
            .with_suggestion("Provide a JSON schema for more thorough validation"),
        ];
    };
    let references = field_references(text);
    let mut issues: Vec<ValidationIssue> = references
        .iter()
        .filter(|reference| !schema.has_field_ignore_case(&reference.name))
        .map(|reference| {
            ValidationIssue::warning(
                IssueKind::UnknownField,
                reference.line,
                reference.column,
                format!("Field not found in schema: {}", reference.name),
            )
            .with_suggestion("Check for typos or add this field to your schema")
        })
        .collect();
    for required in &schema.required {
        let used = references
            .iter()
            .any(|reference| reference.name.eq_ignore_ascii_case(required));
        if !used {
            issues.push(
                ValidationIssue::warning(
                    IssueKind::MissingRequiredField,
                    0,
                    0,
                    format!("Required field not used in template: {required}"),
                )
                .with_suggestion("Reference this field or mark it optional in the schema"),
            );
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn names(text: &str) -> Vec<String> {
        field_references(text)
            .into_iter()
            .map(|reference| reference.name)
            .collect()
    }

    #[test]
    fn references_skip_helpers_literals_and_builtins() {
        let text = r#"{{account.name}} {{#each line_items}}{{this.quantity}} {{@index}}{{/each}}
{{#eq status "Active"}}x{{else}}y{{/eq}} {{date close_date format="dd-MM-yyyy"}}
{{items.[0].price}} {{orders[2]}} {{#if (gt amount 100)}}big{{/if}} {{! note }} {{this}}"#;
        assert_eq!(
            names(text),
            vec![
                "name",
                "line_items",
                "quantity",
                "status",
                "close_date",
                "price",
                "orders",
                "amount",
            ]
        );
    }

    #[test]
    fn references_are_deduplicated_case_insensitively() {
        let references = field_references("{{Email}}\n{{email}}");
        assert_eq!(references.len(), 1);
        assert_eq!((references[0].line, references[0].column), (1, 1));
    }

    #[test]
    fn unknown_and_missing_required_fields_are_warnings() {
        let schema = Schema::from_value(&json!({
            "properties": {"Name": {"type": "string"}, "Email": {"type": "string"}},
            "required": ["Email", "Name"]
        }))
        .expect("schema");
        let issues = check_semantics("Hi {{name}}\n{{phone}}", Some(&schema));
        let kinds: Vec<(IssueKind, usize)> =
            issues.iter().map(|issue| (issue.kind, issue.line)).collect();
        assert_eq!(
            kinds,
            vec![
                (IssueKind::UnknownField, 2),
                (IssueKind::MissingRequiredField, 0)
            ]
        );
        assert!(issues[1].message.ends_with("Email"));
    }

    #[test]
    fn missing_schema_degrades_to_one_warning() {
        let issues = check_semantics("{{anything}}", None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MissingSchema);
    }
}
