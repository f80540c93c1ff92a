//! Complete `{{ ... }}` expressions of a template.

use std::sync::LazyLock;

use docgen_model::line_and_column;
use regex::Regex;

static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("Invalid expression regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Expression<'t> {
    /// Inner text, trimmed, without triple-stash braces.
    pub body: &'t str,
    pub line: usize,
    pub column: usize,
}

impl<'t> Expression<'t> {
    /// The block sigil (`#` or `/`) and helper name, for block expressions.
    pub fn block(&self) -> Option<(char, &'t str)> {
        let body = self.body;
        let sigil = body.chars().next().filter(|c| matches!(c, '#' | '/'))?;
        let name = body[1..]
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '}')
            .next()
            .unwrap_or_default();
        Some((sigil, name))
    }
}

pub(crate) fn expressions(text: &str) -> Vec<Expression<'_>> {
    EXPRESSION
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let body = captures.get(1)?.as_str().trim_start_matches('{').trim();
            let (line, column) = line_and_column(text, whole.start());
            Some(Expression { body, line, column })
        })
        .collect()
}
