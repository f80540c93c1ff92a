//! End-to-end checks of the validation engine on converted templates.

use docgen_ai::{AdapterError, ScriptedGenerator};
use docgen_model::{
    ConversionContext, IssueKind, Schema, Severity, ValidationMethod, ValidationReport,
};
use docgen_validate::{HelperSet, Validator};
use proptest::prelude::*;
use serde_json::json;

fn contact_schema() -> Schema {
    Schema::from_value(&json!({
        "properties": {
            "Name": {"type": "string", "description": "Contact name"},
            "Email": {"type": "string"},
            "Stage": {"type": "string"}
        },
        "required": ["Email"]
    }))
    .expect("schema")
}

#[test]
fn extra_open_block_is_the_only_error() {
    let converted = "Dear {{contact.name}}\n{{#each x}}\n{{#each items}}{{item}}{{/each}}";
    let report = Validator::default().validate_syntax(converted);
    assert!(!report.is_valid);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.errors[0].kind, IssueKind::UnclosedBlock);
    assert_eq!((report.errors[0].line, report.errors[0].column), (2, 1));
    assert!((report.confidence - 0.3).abs() < f64::EPSILON);
}

#[test]
fn unreferenced_required_field_is_a_single_warning() {
    let report =
        Validator::default().validate_semantics("Dear {{name}},\n{{stage}}", Some(&contact_schema()));
    assert!(report.is_valid);
    assert_eq!(report.error_count(), 0);
    assert_eq!(report.warning_count(), 1);
    assert_eq!(report.warnings[0].kind, IssueKind::MissingRequiredField);
    assert!(report.warnings[0].message.contains("Email"));
    assert!((report.confidence - 0.7).abs() < f64::EPSILON);
    assert!((report.completeness - 1.0).abs() < f64::EPSILON);
}

#[test]
fn full_conversion_report() {
    let original = "Dear &=Contact.Name\n{IF \"{{Stage}}\" = \"Won\" \"Thanks\" \"Soon\"}\n\
                    {TABLE Group=Items}\n&=Item.Name\n{END Items}";
    let converted = "Dear {{contact.name}}\n{{#eq stage \"Won\"}}Thanks{{else}}Soon{{/eq}}\n\
                     {{#each items}}\n{{item.name}}\n{{/each}}\n&=Contact.Email";
    let validator = Validator::new(HelperSet::with_extra(["eq", "gt", "lt"]));
    let report = validator.validate_rules(original, converted, Some(&contact_schema()));

    assert!(report.is_valid);
    assert_eq!(report.method, ValidationMethod::Rules);
    let kinds: Vec<_> = report.warnings.iter().map(|issue| issue.kind).collect();
    assert_eq!(
        kinds,
        vec![
            IssueKind::UnknownField,
            IssueKind::MissingRequiredField,
            IssueKind::UnconvertedSyntax,
        ]
    );
    assert_eq!(report.warnings[0].line, 3);
    assert_eq!(report.warnings[2].line, 6);
    assert!((report.completeness - 4.0 / 6.0).abs() < 1e-9);
    assert!((report.confidence - 0.7).abs() < f64::EPSILON);
}

#[test]
fn report_serializes_with_snake_case_kinds() {
    let report = Validator::default().validate_syntax("{{#each items}}");
    let value = serde_json::to_value(&report).expect("serialize");
    assert_eq!(value["is_valid"], false);
    assert_eq!(value["method"], "rules");
    assert_eq!(value["errors"][0]["kind"], "unclosed_block");
    assert_eq!(value["errors"][0]["severity"], "error");
}

#[test]
fn ai_validation_and_fallback() {
    let generator = ScriptedGenerator::new([
        Ok("```json\n{\"is_valid\": true, \"issues\": [\"date format looks odd\"], \"confidence\": 0.9}\n```".to_string()),
        Err(AdapterError::Timeout(std::time::Duration::from_secs(30))),
    ]);
    let context = ConversionContext::new("&=Date.Today").with_schema(Some(contact_schema()));
    let validator = Validator::default().with_generator(&generator, 512);

    let report = validator.validate_conversion(
        "&=Date.Today",
        "{{date now format=\"dd-MM-yyyy\"}}",
        context.schema.as_ref(),
        &context,
    );
    assert_eq!(report.method, ValidationMethod::Ai);
    assert!(report.is_valid);
    assert_eq!(report.warnings[0].kind, IssueKind::AiReported);
    assert!((report.confidence - 0.7).abs() < f64::EPSILON);
    assert_eq!(report.ai_confidence, Some(0.9));
    let calls = generator.calls();
    assert!(calls[0].prompt.contains("SCHEMA FIELDS:\n- Email\n- Name\n- Stage"));

    let report = validator.validate_conversion(
        "&=Date.Today",
        "{{#each items}}",
        context.schema.as_ref(),
        &context,
    );
    assert_eq!(report.method, ValidationMethod::AiFallbackToRules);
    assert!(!report.is_valid);
    assert!(report.has_kind(IssueKind::UnclosedBlock));
}

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ,.]{0,8}",
        "[a-z][a-z_]{0,6}".prop_map(|name| format!("{{{{{name}}}}}")),
        "[a-z][a-z_]{0,6}\\.[a-z]{1,5}".prop_map(|path| format!("{{{{{path}}}}}")),
    ]
}

fn balanced_template() -> impl Strategy<Value = String> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(|parts| parts.join("\n")),
            ("[a-z]{1,6}", inner.clone())
                .prop_map(|(name, body)| format!("{{{{#each {name}}}}}{body}{{{{/each}}}}")),
            ("[a-z]{1,6}", inner.clone(), inner).prop_map(|(name, then, otherwise)| {
                format!("{{{{#if {name}}}}}{then}{{{{else}}}}{otherwise}{{{{/if}}}}")
            }),
        ]
    })
}

fn error_free(report: &ValidationReport) -> bool {
    report.issues().all(|issue| issue.severity == Severity::Warning)
}

proptest! {
    #[test]
    fn balanced_templates_are_valid(template in balanced_template()) {
        let report = Validator::default().validate_syntax(&template);
        prop_assert!(report.is_valid, "{:?}", report.errors);
        prop_assert!(error_free(&report));
    }

    #[test]
    fn one_unclosed_block_is_one_error(template in balanced_template(), name in "[a-z]{1,6}") {
        let broken = format!("{template}\n{{{{#with {name}}}}}");
        let report = Validator::default().validate_syntax(&broken);
        prop_assert!(!report.is_valid);
        prop_assert_eq!(report.error_count(), 1);
        prop_assert_eq!(report.errors[0].kind, IssueKind::UnclosedBlock);
    }

    #[test]
    fn confidence_follows_the_tiers(template in balanced_template(), stated in 0.0f64..=1.0) {
        let clean = Validator::default().validate_syntax(&template);
        let broken = Validator::default().validate_syntax(&format!("{template}}}}}"));
        prop_assert!(broken.confidence <= 0.3);
        prop_assert!(broken.confidence <= clean.confidence);
        if clean.issues().next().is_none() {
            prop_assert!((clean.confidence - 1.0).abs() < f64::EPSILON);
        }
        let annotated = clean.clone().with_ai_confidence(stated);
        prop_assert!((annotated.confidence - clean.confidence).abs() < f64::EPSILON);
        prop_assert!([0.3, 0.7, 1.0].iter().any(|tier| (annotated.confidence - tier).abs() < f64::EPSILON));
    }
}
