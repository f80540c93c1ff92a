//! Conversion rule table.
//!
//! A literal map (legacy text to replacement) is consulted first, then a
//! single ordered list of typed pattern rules. The first rule of the tag's
//! kind whose pattern matches the whole tag text wins.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use docgen_model::{TagKind, TagOccurrence};
use regex::{Captures, Regex};

use crate::classifier::{classify, top_level};

/// Built-in literal mappings.
///
/// Literal hits are emitted exactly as authored here, without the
/// delimiter wrapping the pattern rules add.
pub fn builtin_literals() -> BTreeMap<String, String> {
    [
        ("&=Account.Name", "account.name"),
        ("&=Contact.Name", "contact.name"),
        ("&=Opportunity.Name", "opportunity.name"),
        ("&=Date.Today", r#"{{date now format="dd-MM-yyyy"}}"#),
    ]
    .into_iter()
    .map(|(legacy, replacement)| (legacy.to_string(), replacement.to_string()))
    .collect()
}

struct PatternRule {
    name: &'static str,
    kind: TagKind,
    pattern: Regex,
    build: fn(&RuleTable, &Captures<'_>) -> Option<String>,
}

fn rule(
    name: &'static str,
    kind: TagKind,
    pattern: &str,
    build: fn(&RuleTable, &Captures<'_>) -> Option<String>,
) -> PatternRule {
    PatternRule {
        name,
        kind,
        pattern: Regex::new(pattern).expect("Invalid conversion rule regex"),
        build,
    }
}

/// Pattern rules in evaluation order.
static PATTERN_RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    vec![
        rule(
            "merge_field",
            TagKind::MergeField,
            r"^&=([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)$",
            |_, captures| merge_field(captures),
        ),
        rule(
            "braced_date",
            TagKind::BracedField,
            r"^\{\{\s*([^\\}]+?)\s*\\@\s*([^}]+?)\s*\}\}$",
            |_, captures| braced_date(captures),
        ),
        rule(
            "braced_field",
            TagKind::BracedField,
            r"^\{\{([^}]+)\}\}$",
            |_, captures| braced_field(captures),
        ),
        rule(
            "conditional_eq",
            TagKind::Conditional,
            r#"^\{IF\s+"([^"]+)"\s*=\s*"([^"]*)"\s+"([^"]*)"\s+"([^"]*)"\s*\}$"#,
            |table, captures| comparison(table, captures, "eq", true),
        ),
        rule(
            "conditional_gt",
            TagKind::Conditional,
            r#"^\{IF\s+"([^"]+)"\s*>\s*"([^"]*)"\s+"([^"]*)"\s+"([^"]*)"\s*\}$"#,
            |table, captures| comparison(table, captures, "gt", false),
        ),
        rule(
            "conditional_lt",
            TagKind::Conditional,
            r#"^\{IF\s+"([^"]+)"\s*<\s*"([^"]*)"\s+"([^"]*)"\s+"([^"]*)"\s*\}$"#,
            |table, captures| comparison(table, captures, "lt", false),
        ),
        rule(
            "loop_start",
            TagKind::LoopStart,
            r"^\{(?:TABLE|LOOP)\s+[^}]*?\b(?:Group|Collection)\s*=\s*([A-Za-z0-9_.]+)[^}]*\}$",
            |_, captures| Some(format!("{{{{#each {}}}}}", captures[1].to_lowercase())),
        ),
        rule(
            "loop_end",
            TagKind::LoopEnd,
            r"^\{END\s+[^}]+\}$",
            |_, _| Some("{{/each}}".to_string()),
        ),
    ]
});

/// `Object.Field` becomes `{{object.Field}}`: only the first dotted segment
/// is lowercased.
fn merge_field(captures: &Captures<'_>) -> Option<String> {
    let path = &captures[1];
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let mut converted = head.to_lowercase();
    if let Some(rest) = rest {
        converted.push('.');
        converted.push_str(rest);
    }
    Some(format!("{{{{{converted}}}}}"))
}

fn braced_date(captures: &Captures<'_>) -> Option<String> {
    let field = captures[1].trim().to_lowercase();
    Some(format!(
        "{{{{date {field} format=\"{}\"}}}}",
        captures[2].trim()
    ))
}

/// Lowercases the leading path token; anything after it is kept as written.
fn braced_field(captures: &Captures<'_>) -> Option<String> {
    let expression = captures[1].trim();
    if is_target_expression(expression) {
        return Some(captures[0].to_string());
    }
    let (path, rest) = match expression.find(char::is_whitespace) {
        Some(split) => expression.split_at(split),
        None => (expression, ""),
    };
    Some(format!("{{{{{}{rest}}}}}", path.to_lowercase()))
}

/// True for expressions already written in handlebars form.
///
/// Block markers, comments, `else`, and expressions whose leading token
/// starts lowercase (helper calls and converted paths) are left exactly as
/// they are, so converting a converted template changes nothing.
fn is_target_expression(expression: &str) -> bool {
    expression.starts_with(['#', '/', '!', '>', '^', '@', '~'])
        || expression == "else"
        || expression
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_lowercase())
}

/// Branch values go back through the table so tags inside them are converted.
fn comparison(
    table: &RuleTable,
    captures: &Captures<'_>,
    helper: &str,
    quote_value: bool,
) -> Option<String> {
    let field = condition_field(&captures[1])?;
    let value = &captures[2];
    let value = if quote_value {
        format!("\"{value}\"")
    } else {
        value.to_string()
    };
    Some(format!(
        "{{{{#{helper} {field} {value}}}}}{}{{{{else}}}}{}{{{{/{helper}}}}}",
        table.convert_fragment(&captures[3]),
        table.convert_fragment(&captures[4]),
    ))
}

/// Field name of a condition: braces stripped, lowercased.
fn condition_field(raw: &str) -> Option<String> {
    let field = raw
        .trim()
        .trim_start_matches("{{")
        .trim_end_matches("}}")
        .trim();
    (!field.is_empty()).then(|| field.to_lowercase())
}

/// Immutable rule table shared by every document of a run.
#[derive(Debug, Clone)]
pub struct RuleTable {
    literals: BTreeMap<String, String>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            literals: builtin_literals(),
        }
    }
}

impl RuleTable {
    /// Built-in literals extended by `mappings`; user entries win on equal keys.
    pub fn with_mappings<I, K, V>(mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::default();
        table.literals.extend(
            mappings
                .into_iter()
                .map(|(legacy, replacement)| (legacy.into(), replacement.into())),
        );
        table
    }

    pub fn literals(&self) -> &BTreeMap<String, String> {
        &self.literals
    }

    /// Converts one tag, returning the name of the rule that fired.
    ///
    /// `None` when neither a literal nor a pattern rule of the tag's kind
    /// applies.
    pub fn apply(&self, tag: &TagOccurrence) -> Option<(&'static str, String)> {
        if let Some(replacement) = self.literals.get(&tag.raw_text) {
            return Some(("literal", replacement.clone()));
        }
        PATTERN_RULES
            .iter()
            .filter(|rule| rule.kind == tag.kind)
            .find_map(|rule| {
                let captures = rule.pattern.captures(&tag.raw_text)?;
                (rule.build)(self, &captures).map(|converted| (rule.name, converted))
            })
    }

    /// Converts every top-level tag in `text` that a rule handles; other
    /// tags and the text between them are kept.
    fn convert_fragment(&self, text: &str) -> String {
        let occurrences = classify(text);
        let top = top_level(&occurrences);
        let mut converted = String::with_capacity(text.len());
        let mut cursor = 0;
        for (occurrence, is_top_level) in occurrences.iter().zip(top) {
            if !is_top_level || occurrence.span_start < cursor {
                continue;
            }
            if let Some(replacement) = self.convert(occurrence) {
                converted.push_str(&text[cursor..occurrence.span_start]);
                converted.push_str(&replacement);
                cursor = occurrence.span_end;
            }
        }
        converted.push_str(&text[cursor..]);
        converted
    }

    /// Convenience wrapper returning only the converted text.
    pub fn convert(&self, tag: &TagOccurrence) -> Option<String> {
        self.apply(tag).map(|(_, converted)| converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    fn convert_one(table: &RuleTable, text: &str) -> Option<String> {
        let occurrences = classify(text);
        let tag = occurrences.first().expect("tag");
        assert_eq!(tag.raw_text, text, "fixture must be a single tag");
        table.convert(tag)
    }

    #[test]
    fn literal_map_wins_over_pattern() {
        let table = RuleTable::default();
        let tag = &classify("&=Account.Name")[0];
        assert_eq!(table.apply(tag), Some(("literal", "account.name".to_string())));
        assert_eq!(
            convert_one(&table, "&=Date.Today").as_deref(),
            Some(r#"{{date now format="dd-MM-yyyy"}}"#)
        );
    }

    #[test]
    fn merge_field_lowercases_first_segment_only() {
        let table = RuleTable::default();
        assert_eq!(
            convert_one(&table, "&=Opportunity.CloseDate").as_deref(),
            Some("{{opportunity.CloseDate}}")
        );
        assert_eq!(convert_one(&table, "&=Email").as_deref(), Some("{{email}}"));
    }

    #[test]
    fn braced_fields() {
        let table = RuleTable::default();
        assert_eq!(
            convert_one(&table, "{{CloseDate \\@ MM/dd/yyyy}}").as_deref(),
            Some(r#"{{date closedate format="MM/dd/yyyy"}}"#)
        );
        assert_eq!(convert_one(&table, "{{Account.Name}}").as_deref(), Some("{{account.name}}"));
        assert_eq!(convert_one(&table, "{{#each items}}").as_deref(), Some("{{#each items}}"));
        assert_eq!(
            convert_one(&table, "{{opportunity.CloseDate}}").as_deref(),
            Some("{{opportunity.CloseDate}}")
        );
    }

    #[test]
    fn braced_field_with_format_switch_lowercases_the_field() {
        let table = RuleTable::default();
        let tag = &classify(r"{{Amount \# $#,##0.00}}")[0];
        assert_eq!(
            table.apply(tag),
            Some(("braced_field", r"{{amount \# $#,##0.00}}".to_string()))
        );
        assert_eq!(
            convert_one(&table, r"{{amount \# $#,##0.00}}").as_deref(),
            Some(r"{{amount \# $#,##0.00}}")
        );
        assert_eq!(
            convert_one(&table, r#"{{date now format="dd-MM-yyyy"}}"#).as_deref(),
            Some(r#"{{date now format="dd-MM-yyyy"}}"#)
        );
    }

    #[test]
    fn conditionals_try_eq_then_gt_then_lt() {
        let table = RuleTable::default();
        assert_eq!(
            convert_one(&table, r#"{IF "{{status}}" = "Active" "Open" "Closed"}"#).as_deref(),
            Some(r#"{{#eq status "Active"}}Open{{else}}Closed{{/eq}}"#)
        );
        assert_eq!(
            convert_one(&table, r#"{IF "{{Amount}}" > "1000" "Large" "Small"}"#).as_deref(),
            Some("{{#gt amount 1000}}Large{{else}}Small{{/gt}}")
        );
        assert_eq!(
            convert_one(&table, r#"{IF "Days" < "30" "Due soon" ""}"#).as_deref(),
            Some("{{#lt days 30}}Due soon{{else}}{{/lt}}")
        );
        assert_eq!(
            convert_one(&table, r#"{IF "{{Stage}}" != "Lost" "a" "b"}"#),
            None
        );
    }

    #[test]
    fn conditional_branches_are_converted() {
        let table = RuleTable::default();
        assert_eq!(
            convert_one(&table, r#"{IF "{{Type}}" = "Partner" "&=Account.Name" "none"}"#).as_deref(),
            Some(r#"{{#eq type "Partner"}}account.name{{else}}none{{/eq}}"#)
        );
        assert_eq!(
            convert_one(&table, r#"{IF "{{Amount}}" > "0" "Owed by &=Contact.Email" "Paid"}"#)
                .as_deref(),
            Some("{{#gt amount 0}}Owed by {{contact.Email}}{{else}}Paid{{/gt}}")
        );
    }

    #[test]
    fn loops() {
        let table = RuleTable::default();
        assert_eq!(
            convert_one(&table, "{TABLE Group=LineItems}").as_deref(),
            Some("{{#each lineitems}}")
        );
        assert_eq!(
            convert_one(&table, "{LOOP Collection=Contacts}").as_deref(),
            Some("{{#each contacts}}")
        );
        assert_eq!(convert_one(&table, "{END LineItems}").as_deref(), Some("{{/each}}"));
        assert_eq!(convert_one(&table, "{TABLE Items}"), None);
    }

    #[test]
    fn user_mappings_override_builtins() {
        let table = RuleTable::with_mappings([
            ("&=Account.Name", "{{account.legal_name}}"),
            ("{TABLE Items}", "{{#each items}}"),
        ]);
        assert_eq!(
            convert_one(&table, "&=Account.Name").as_deref(),
            Some("{{account.legal_name}}")
        );
        assert_eq!(
            convert_one(&table, "{TABLE Items}").as_deref(),
            Some("{{#each items}}")
        );
        assert_eq!(table.literals().len(), 5);
    }
}
