//! Per-tag conversion with an explicit three-state outcome.

use docgen_ai::{
    AdapterError, NormalizedResponse, PromptBuilder, TextGenerator, normalize_response,
};
use docgen_model::{ConversionContext, TagOccurrence, TagOutcome, UnconvertedReason};
use tracing::{debug, warn};

use crate::rules::RuleTable;

/// Token budget for a single generation call.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Delegation state of one document pass.
///
/// An authentication failure is terminal: every later tag of the pass skips
/// the adapter instead of failing the same way again.
#[derive(Debug, Default)]
pub struct DelegationSession {
    disabled: Option<String>,
    calls: usize,
}

impl DelegationSession {
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.is_some()
    }
}

/// Rule table plus an optional AI adapter.
///
/// Read-only once built, so one engine serves every document of a batch.
pub struct ConversionEngine<'a> {
    rules: RuleTable,
    generator: Option<&'a dyn TextGenerator>,
    max_tokens: u32,
}

impl<'a> ConversionEngine<'a> {
    pub fn new(rules: RuleTable) -> Self {
        Self {
            rules,
            generator: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    #[must_use]
    pub fn with_generator(mut self, generator: &'a dyn TextGenerator, max_tokens: u32) -> Self {
        self.generator = Some(generator);
        self.max_tokens = max_tokens;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Converts one tag: rule table first, then the adapter when configured.
    pub fn convert_tag(
        &self,
        tag: &TagOccurrence,
        context: &ConversionContext,
        session: &mut DelegationSession,
    ) -> TagOutcome {
        if let Some((rule, converted)) = self.rules.apply(tag) {
            debug!(kind = %tag.kind, rule, "converted tag by rule");
            return TagOutcome::Converted(converted);
        }
        let Some(generator) = self.generator else {
            return TagOutcome::Unconverted(UnconvertedReason::NoRule);
        };
        if let Some(reason) = &session.disabled {
            return TagOutcome::Unconverted(UnconvertedReason::DelegationFailed(reason.clone()));
        }

        let prompt = PromptBuilder::new(context).tag_conversion(tag);
        session.calls += 1;
        match generator.generate_text(&prompt.user, &prompt.system, self.max_tokens) {
            Ok(raw) => {
                let normalized = normalize_response(&raw);
                let content = normalized.content.trim();
                if content.is_empty() {
                    warn!(kind = %tag.kind, "AI adapter returned no usable conversion");
                    return TagOutcome::Unconverted(UnconvertedReason::DelegationFailed(
                        "empty response".to_string(),
                    ));
                }
                debug!(
                    kind = %tag.kind,
                    confidence = normalized.confidence,
                    warnings = normalized.warnings.len(),
                    "converted tag by AI delegation"
                );
                TagOutcome::Delegated(content.to_string())
            }
            Err(error) => {
                warn!(kind = %tag.kind, error = %error, "AI delegation failed");
                let detail = error.to_string();
                if error.is_authentication() {
                    session.disabled = Some(detail.clone());
                }
                TagOutcome::Unconverted(UnconvertedReason::DelegationFailed(detail))
            }
        }
    }

    /// Runs the whole template text through the adapter.
    pub fn convert_text_with_ai(
        &self,
        context: &ConversionContext,
    ) -> Result<NormalizedResponse, AdapterError> {
        let generator = self
            .generator
            .ok_or_else(|| AdapterError::remote("no AI adapter configured"))?;
        let prompt = PromptBuilder::new(context).conversion();
        let raw = generator.generate_text(&prompt.user, &prompt.system, self.max_tokens)?;
        let normalized = normalize_response(&raw);
        debug!(
            chars = normalized.content.len(),
            confidence = normalized.confidence,
            warnings = normalized.warnings.len(),
            "converted template by AI"
        );
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use docgen_ai::ScriptedGenerator;

    use super::*;
    use crate::classifier::classify;

    fn tag(text: &str) -> TagOccurrence {
        classify(text).into_iter().next().expect("tag")
    }

    #[test]
    fn rule_hit_never_calls_the_adapter() {
        let generator = ScriptedGenerator::new([]);
        let engine = ConversionEngine::new(RuleTable::default()).with_generator(&generator, 64);
        let mut session = DelegationSession::default();
        let outcome = engine.convert_tag(
            &tag("{TABLE Group=Items}"),
            &ConversionContext::default(),
            &mut session,
        );
        assert_eq!(outcome, TagOutcome::Converted("{{#each items}}".to_string()));
        assert!(generator.calls().is_empty());
    }

    #[test]
    fn rule_miss_without_adapter_is_unconverted() {
        let engine = ConversionEngine::new(RuleTable::default());
        let outcome = engine.convert_tag(
            &tag(r#"{IF "{{Stage}}" != "Lost" "a" "b"}"#),
            &ConversionContext::default(),
            &mut DelegationSession::default(),
        );
        assert_eq!(outcome, TagOutcome::Unconverted(UnconvertedReason::NoRule));
    }

    #[test]
    fn rule_miss_is_delegated_and_normalized() {
        let generator = ScriptedGenerator::new([Ok(
            "```\n{{#unless (eq stage \"Lost\")}}a{{else}}b{{/unless}}\n```".to_string(),
        )]);
        let engine = ConversionEngine::new(RuleTable::default()).with_generator(&generator, 256);
        let mut session = DelegationSession::default();
        let outcome = engine.convert_tag(
            &tag(r#"{IF "{{Stage}}" != "Lost" "a" "b"}"#),
            &ConversionContext::default(),
            &mut session,
        );
        assert_eq!(
            outcome,
            TagOutcome::Delegated("{{#unless (eq stage \"Lost\")}}a{{else}}b{{/unless}}".to_string())
        );
        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].max_tokens, 256);
        assert!(calls[0].prompt.contains("TAG KIND: conditional"));
        assert_eq!(session.calls(), 1);
    }

    #[test]
    fn authentication_failure_disables_later_delegation() {
        let generator = ScriptedGenerator::new([
            Err(AdapterError::Authentication("token expired".to_string())),
            Ok("{{#each items}}".to_string()),
        ]);
        let engine = ConversionEngine::new(RuleTable::default()).with_generator(&generator, 64);
        let mut session = DelegationSession::default();
        let context = ConversionContext::default();
        let first = engine.convert_tag(&tag("{TABLE Items}"), &context, &mut session);
        let second = engine.convert_tag(&tag("{LOOP Things}"), &context, &mut session);
        assert!(matches!(
            first,
            TagOutcome::Unconverted(UnconvertedReason::DelegationFailed(_))
        ));
        assert_eq!(first, second);
        assert!(session.is_disabled());
        assert_eq!(generator.calls().len(), 1);
    }

    #[test]
    fn service_failure_only_affects_its_tag() {
        let generator = ScriptedGenerator::new([
            Err(AdapterError::remote("busy")),
            Ok("{{#each items}}".to_string()),
        ]);
        let engine = ConversionEngine::new(RuleTable::default()).with_generator(&generator, 64);
        let mut session = DelegationSession::default();
        let context = ConversionContext::default();
        let first = engine.convert_tag(&tag("{TABLE Items}"), &context, &mut session);
        let second = engine.convert_tag(&tag("{TABLE Items}"), &context, &mut session);
        assert_eq!(first.label(), "unconverted");
        assert_eq!(second, TagOutcome::Delegated("{{#each items}}".to_string()));
    }

    #[test]
    fn whole_template_conversion() {
        let generator = ScriptedGenerator::new([Ok(
            r#"{"content": "Dear {{contact.name}}", "confidence": 0.9}"#.to_string(),
        )]);
        let engine = ConversionEngine::new(RuleTable::default()).with_generator(&generator, 512);
        let normalized = engine
            .convert_text_with_ai(&ConversionContext::new("Dear &=Contact.Name"))
            .expect("conversion");
        assert_eq!(normalized.content, "Dear {{contact.name}}");
        assert!(generator.calls()[0].prompt.starts_with("CONGA TEMPLATE:\nDear &=Contact.Name"));

        let without = ConversionEngine::new(RuleTable::default());
        assert!(without.convert_text_with_ai(&ConversionContext::default()).is_err());
    }
}
