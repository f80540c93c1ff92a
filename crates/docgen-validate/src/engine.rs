//! Validation engine combining the rule-based checks, with optional AI
//! delegation.

use docgen_ai::{AdapterError, PromptBuilder, TextGenerator, ValidationFeedback, parse_validation};
use docgen_model::{
    ConversionContext, IssueKind, Schema, ValidationIssue, ValidationMethod, ValidationReport,
};
use tracing::{debug, warn};

use crate::quality::check_conversion_quality;
use crate::semantic::check_semantics;
use crate::syntax::{HelperSet, check_syntax};

/// Token budget for one validation call.
const VALIDATION_MAX_TOKENS: u32 = 1024;

fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

pub struct Validator<'a> {
    helpers: HelperSet,
    generator: Option<&'a dyn TextGenerator>,
    max_tokens: u32,
}

impl Default for Validator<'_> {
    fn default() -> Self {
        Self::new(HelperSet::default())
    }
}

impl<'a> Validator<'a> {
    pub fn new(helpers: HelperSet) -> Self {
        Self {
            helpers,
            generator: None,
            max_tokens: VALIDATION_MAX_TOKENS,
        }
    }

    /// Delegates [`Validator::validate_conversion`] to `generator`.
    #[must_use]
    pub fn with_generator(mut self, generator: &'a dyn TextGenerator, max_tokens: u32) -> Self {
        self.generator = Some(generator);
        self.max_tokens = max_tokens;
        self
    }

    pub fn helpers(&self) -> &HelperSet {
        &self.helpers
    }

    /// Delimiter and block balance only.
    pub fn validate_syntax(&self, text: &str) -> ValidationReport {
        ValidationReport::from_issues(
            check_syntax(text, &self.helpers),
            line_count(text),
            ValidationMethod::Rules,
        )
    }

    /// Field references against `schema`; never produces errors.
    pub fn validate_semantics(&self, text: &str, schema: Option<&Schema>) -> ValidationReport {
        ValidationReport::from_issues(
            check_semantics(text, schema),
            line_count(text),
            ValidationMethod::Rules,
        )
    }

    /// Syntax, semantic and conversion-quality checks over the converted text.
    pub fn validate_rules(
        &self,
        original: &str,
        converted: &str,
        schema: Option<&Schema>,
    ) -> ValidationReport {
        let mut issues = check_syntax(converted, &self.helpers);
        issues.extend(check_semantics(converted, schema));
        issues.extend(check_conversion_quality(original, converted));
        let report =
            ValidationReport::from_issues(issues, line_count(converted), ValidationMethod::Rules);
        debug!(
            errors = report.error_count(),
            warnings = report.warning_count(),
            completeness = report.completeness,
            "rule-based validation finished"
        );
        report
    }

    /// Validates a conversion, through the AI adapter when one is set.
    ///
    /// Any adapter failure, or a response without a verdict, falls back to
    /// the rule-based checks and is tagged as such in the report.
    pub fn validate_conversion(
        &self,
        original: &str,
        converted: &str,
        schema: Option<&Schema>,
        context: &ConversionContext,
    ) -> ValidationReport {
        let Some(generator) = self.generator else {
            return self.validate_rules(original, converted, schema);
        };
        match self.ask_generator(generator, original, converted, context) {
            Ok(feedback) if feedback.is_valid.is_some() => {
                feedback_report(&feedback, line_count(converted))
            }
            Ok(_) => {
                warn!("AI validation response stated no verdict; using rule-based checks");
                self.fallback(original, converted, schema)
            }
            Err(error) => {
                warn!(error = %error, "AI validation failed; using rule-based checks");
                self.fallback(original, converted, schema)
            }
        }
    }

    fn ask_generator(
        &self,
        generator: &dyn TextGenerator,
        original: &str,
        converted: &str,
        context: &ConversionContext,
    ) -> Result<ValidationFeedback, AdapterError> {
        let prompt = PromptBuilder::new(context).validation(original, converted);
        let raw = generator.generate_text(&prompt.user, &prompt.system, self.max_tokens)?;
        Ok(parse_validation(&raw))
    }

    fn fallback(&self, original: &str, converted: &str, schema: Option<&Schema>) -> ValidationReport {
        ValidationReport {
            method: ValidationMethod::AiFallbackToRules,
            ..self.validate_rules(original, converted, schema)
        }
    }
}

/// Report shape for an AI verdict.
///
/// Reported issues are errors when the verdict is negative and warnings
/// otherwise; suggestions attach to issues in order.
fn feedback_report(feedback: &ValidationFeedback, total_lines: usize) -> ValidationReport {
    let rejected = feedback.is_valid == Some(false);
    let mut issues: Vec<ValidationIssue> = feedback
        .issues
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let issue = if rejected {
                ValidationIssue::error(IssueKind::AiReported, 0, 0, message.clone())
            } else {
                ValidationIssue::warning(IssueKind::AiReported, 0, 0, message.clone())
            };
            match feedback.suggestions.get(index) {
                Some(suggestion) => issue.with_suggestion(suggestion.clone()),
                None => issue,
            }
        })
        .collect();
    if rejected && issues.is_empty() {
        issues.push(ValidationIssue::error(
            IssueKind::AiReported,
            0,
            0,
            "AI validator rejected the conversion without listing issues",
        ));
    }
    ValidationReport::from_issues(issues, total_lines, ValidationMethod::Ai)
        .with_ai_confidence(feedback.confidence)
}

#[cfg(test)]
mod tests {
    use docgen_ai::ScriptedGenerator;

    use super::*;

    #[test]
    fn rules_combine_all_checks() {
        let report = Validator::default().validate_rules(
            "&=Contact.Name\n{TABLE Group=Items}",
            "{{contact.name}}\n{{#each items}}",
            None,
        );
        assert!(!report.is_valid);
        assert!(report.has_kind(IssueKind::UnclosedBlock));
        assert!(report.has_kind(IssueKind::MissingSchema));
        assert!((report.confidence - 0.3).abs() < f64::EPSILON);
        assert!((report.completeness - 0.5).abs() < f64::EPSILON);
        assert_eq!(report.method, ValidationMethod::Rules);
    }

    #[test]
    fn ai_verdict_shapes_the_report() {
        let generator = ScriptedGenerator::new([Ok(r#"{"is_valid": false, "issues": ["loop never closed"], "confidence": 0.8, "suggestions": ["add {{/each}}"]}"#.to_string())]);
        let validator = Validator::default().with_generator(&generator, 300);
        let report = validator.validate_conversion(
            "{TABLE Group=Items}",
            "{{#each items}}",
            None,
            &ConversionContext::default(),
        );
        assert_eq!(report.method, ValidationMethod::Ai);
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].message, "loop never closed");
        assert_eq!(report.errors[0].suggestion.as_deref(), Some("add {{/each}}"));
        assert!((report.confidence - 0.3).abs() < f64::EPSILON);
        assert_eq!(report.ai_confidence, Some(0.8));
        assert_eq!(generator.calls()[0].max_tokens, 300);
    }

    #[test]
    fn positive_ai_verdict_keeps_the_clean_tier() {
        let generator = ScriptedGenerator::new([Ok(
            "Validation result: PASS\nConfidence: 0.85".to_string()
        )]);
        let report = Validator::default().with_generator(&generator, 64).validate_conversion(
            "&=Contact.Name",
            "{{contact.name}}",
            None,
            &ConversionContext::default(),
        );
        assert!(report.is_valid);
        assert_eq!(report.method, ValidationMethod::Ai);
        assert_eq!(report.error_count() + report.warning_count(), 0);
        assert!((report.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.ai_confidence, Some(0.85));
    }

    #[test]
    fn adapter_failure_falls_back_to_rules() {
        let generator = ScriptedGenerator::new([
            Err(AdapterError::Authentication("expired".to_string())),
            Ok("no verdict here".to_string()),
        ]);
        let validator = Validator::default().with_generator(&generator, 64);
        for _ in 0..2 {
            let report = validator.validate_conversion(
                "&=Contact.Name",
                "{{contact.name}}",
                None,
                &ConversionContext::default(),
            );
            assert_eq!(report.method, ValidationMethod::AiFallbackToRules);
            assert!(report.is_valid);
            assert!(report.has_kind(IssueKind::MissingSchema));
        }
    }
}
