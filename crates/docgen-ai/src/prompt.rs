//! Prompts for AI-assisted conversion and validation.

use docgen_model::{ConversionContext, TagOccurrence};

/// Longest template excerpt sent for validation, in characters.
pub const VALIDATION_SAMPLE_CHARS: usize = 2000;

const CONVERSION_SYSTEM: &str = "\
You convert Conga Composer merge templates into Box DocGen templates.
Box DocGen uses handlebars syntax. Preserve every piece of static text exactly.

Rules:
- &=Object.Field merge fields become {{object.field}}.
- {IF \"{{Field}}\" = \"Value\" \"Then\" \"Else\"} becomes {{#eq field \"Value\"}}Then{{else}}Else{{/eq}}; use #gt and #lt for > and <.
- {TABLE Group=Name} or {LOOP Collection=Name} opens {{#each name}}; {END Name} closes it with {{/each}}.
- {{Field \\@ format}} becomes {{date field format=\"format\"}}.
Answer with the converted text only.";

const TAG_SYSTEM: &str = "\
You convert a single Conga Composer tag into Box DocGen handlebars syntax.
Answer with the converted tag only, without explanation or code fences.";

const VALIDATION_SYSTEM: &str = "\
You review Box DocGen templates converted from Conga Composer templates.
Check that merge fields, conditionals and loops were converted faithfully, that every block helper is closed, and that no static text was lost.
Answer with JSON: {\"is_valid\": bool, \"issues\": [string], \"confidence\": number, \"suggestions\": [string]}.";

/// A system prompt paired with a user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub struct PromptBuilder<'a> {
    context: &'a ConversionContext,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(context: &'a ConversionContext) -> Self {
        Self { context }
    }

    /// Prompt converting the whole template text.
    pub fn conversion(&self) -> Prompt {
        let user = format!(
            "CONGA TEMPLATE:\n{}\n\nQUERY:\n{}\n\nSCHEMA FIELDS:\n{}\n\nCUSTOM INSTRUCTIONS:\n{}\n\nCONVERTED TEMPLATE:",
            self.context.template_text,
            self.context.query_text.as_deref().unwrap_or("N/A"),
            self.schema_fields(),
            self.context.custom_instructions.as_deref().unwrap_or("None"),
        );
        Prompt {
            system: CONVERSION_SYSTEM.to_string(),
            user,
        }
    }

    /// Prompt converting one tag no rule could handle.
    pub fn tag_conversion(&self, tag: &TagOccurrence) -> Prompt {
        let mut user = format!("TAG KIND: {}\nTAG:\n{}\n", tag.kind, tag.raw_text);
        if !self.context.schema_fields().is_empty() {
            user.push_str(&format!("\nSCHEMA FIELDS:\n{}\n", self.schema_fields()));
        }
        if let Some(instructions) = &self.context.custom_instructions {
            user.push_str(&format!("\nCUSTOM INSTRUCTIONS:\n{instructions}\n"));
        }
        user.push_str("\nCONVERTED TAG:");
        Prompt {
            system: TAG_SYSTEM.to_string(),
            user,
        }
    }

    /// Prompt asking for a review of a finished conversion.
    pub fn validation(&self, original: &str, converted: &str) -> Prompt {
        let user = format!(
            "ORIGINAL CONGA TEMPLATE:\n{}\n\nCONVERTED BOX DOCGEN TEMPLATE:\n{}\n\nSCHEMA FIELDS:\n{}\n\nVALIDATION ANALYSIS:",
            sample(original),
            sample(converted),
            self.schema_fields(),
        );
        Prompt {
            system: VALIDATION_SYSTEM.to_string(),
            user,
        }
    }

    fn schema_fields(&self) -> String {
        let fields = self.context.schema_fields();
        if fields.is_empty() {
            return "N/A".to_string();
        }
        fields
            .iter()
            .map(|field| format!("- {field}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn sample(text: &str) -> &str {
    match text.char_indices().nth(VALIDATION_SAMPLE_CHARS) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
