//! Batch conversion over real files in a temporary directory.

use std::fs;

use docgen_ai::{AdapterError, ScriptedGenerator};
use docgen_cli::pipeline::{BatchPipeline, OutputOptions, list_tags, merge_issues};
use docgen_cli::types::DocumentStatus;
use docgen_convert::{ConversionEngine, RuleTable};
use docgen_docx::Template;
use docgen_model::{IssueKind, Schema, TagKind, ValidationMethod};
use docgen_validate::{HelperSet, Validator};
use serde_json::json;

const LETTER: &str = "Dear &=Contact.Name,\n\
                      {IF \"{{Stage}}\" = \"Won\" \"Thank you\" \"Talk soon\"}\n\
                      {TABLE Group=LineItems}\n\
                      &=LineItem.Product x &=LineItem.Quantity\n\
                      {END LineItems}\n\
                      Printed &=Date.Today";

fn pipeline(output: OutputOptions) -> BatchPipeline<'static> {
    BatchPipeline::new(
        ConversionEngine::new(RuleTable::default()),
        Validator::new(HelperSet::with_extra(["eq", "gt", "lt"])),
        output,
    )
}

#[test]
fn converts_and_publishes_each_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("letter.txt");
    fs::write(&input, LETTER).expect("write input");
    let out_dir = dir.path().join("out");

    let mut seen = Vec::new();
    let result = pipeline(OutputOptions {
        output_dir: Some(out_dir.clone()),
        ..OutputOptions::default()
    })
    .run(&[input], |summary| seen.push(summary.name()));

    assert_eq!(seen, vec!["letter.txt"]);
    assert!(!result.has_failures());
    let converted = result.documents[0].converted().expect("converted");
    assert_eq!(converted.output, Some(out_dir.join("converted_letter.txt")));
    assert_eq!(converted.tags.total, 7);
    assert_eq!(converted.tags.converted, 7);
    assert_eq!(converted.tags.subsumed, 1);
    assert!(converted.report.is_valid);
    assert!(converted.report.has_kind(IssueKind::MissingSchema));
    assert_eq!(converted.report.method, ValidationMethod::Rules);

    let written = fs::read_to_string(out_dir.join("converted_letter.txt")).expect("read output");
    insta::assert_snapshot!(written, @r#"
    Dear contact.name,
    {{#eq stage "Won"}}Thank you{{else}}Talk soon{{/eq}}
    {{#each lineitems}}
    {{lineitem.Product}} x {{lineitem.Quantity}}
    {{/each}}
    Printed {{date now format="dd-MM-yyyy"}}
    "#);
}

#[test]
fn failed_document_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let broken = dir.path().join("broken.docx");
    fs::write(&broken, b"not a zip").expect("write broken");
    let unsupported = dir.path().join("notes.pdf");
    fs::write(&unsupported, b"%PDF").expect("write pdf");
    let good = dir.path().join("short.txt");
    fs::write(&good, "Hi &=Account.Name").expect("write good");

    let result = pipeline(OutputOptions::default()).run(&[broken, unsupported, good], |_| {});

    assert_eq!(result.succeeded(), 1);
    assert!(result.has_failures());
    match &result.documents[0].status {
        DocumentStatus::Failed { error } => {
            assert!(error.contains("broken.docx"), "{error}");
            assert!(error.contains("invalid docx archive"), "{error}");
        }
        DocumentStatus::Converted(_) => panic!("broken archive converted"),
    }
    assert!(!dir.path().join("converted_broken.docx").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("converted_short.txt")).expect("read"),
        "Hi account.name"
    );

    let report = serde_json::to_value(&result).expect("serialize");
    assert!(report["generated_at"].is_string());
    assert_eq!(report["documents"][0]["status"], "failed");
    assert_eq!(report["documents"][2]["status"], "converted");
    assert_eq!(report["documents"][2]["tags"]["converted"], 1);
    assert_eq!(report["documents"][2]["report"]["is_valid"], true);
}

#[test]
fn dry_run_writes_nothing_and_uses_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("note.tmpl");
    fs::write(&input, "Dear &=Contact.Name\n{{Phone}}").expect("write");
    let schema = Schema::from_value(&json!({
        "properties": {"Name": {"type": "string"}, "Email": {"type": "string"}},
        "required": ["Email"]
    }))
    .expect("schema");

    let result = pipeline(OutputOptions {
        dry_run: true,
        prefix: "docgen_".to_string(),
        ..OutputOptions::default()
    })
    .with_schema(Some(schema))
    .run(&[input], |_| {});

    let converted = result.documents[0].converted().expect("converted");
    assert_eq!(converted.output, None);
    assert!(!dir.path().join("docgen_note.tmpl").exists());
    let kinds: Vec<_> = converted.report.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(
        kinds,
        vec![IssueKind::UnknownField, IssueKind::MissingRequiredField]
    );
}

#[test]
fn ai_delegation_and_conversion_warnings_reach_the_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("loop.txt");
    fs::write(&input, "{TABLE Items}\n&=Item.Name\n{END Items}").expect("write");
    let generator = ScriptedGenerator::new([Err(AdapterError::Authentication(
        "token expired".to_string(),
    ))]);
    let pipeline = BatchPipeline::new(
        ConversionEngine::new(RuleTable::default()).with_generator(&generator, 256),
        Validator::default(),
        OutputOptions {
            dry_run: true,
            ..OutputOptions::default()
        },
    );

    let result = pipeline.run(&[input], |_| {});
    let converted = result.documents[0].converted().expect("converted");
    assert_eq!(converted.tags.unconverted, 1);
    assert_eq!(converted.tags.ai_calls, 1);
    assert_eq!(generator.calls().len(), 1);
    assert!(converted.report.has_kind(IssueKind::UnconvertedTag));
    assert!(converted.report.has_kind(IssueKind::UnconvertedSyntax));
    assert!(!converted.report.is_valid);
    assert!(converted.report.confidence <= 0.3);
}

#[test]
fn merging_keeps_method_and_recomputes_the_tier() {
    let validator = Validator::default();
    let base = validator.validate_syntax("{{name}}").with_ai_confidence(0.6);
    let issue = docgen_model::ValidationIssue::warning(IssueKind::SplitTag, 1, 1, "split");
    let merged = merge_issues(base.clone(), vec![issue], "{{name}}");
    assert_eq!(merged.method, base.method);
    assert_eq!(merged.warning_count(), 1);
    assert!((merged.confidence - 0.7).abs() < f64::EPSILON);
    assert_eq!(merged.ai_confidence, Some(0.6));
    assert!((merged.completeness - 0.0).abs() < f64::EPSILON);
}

#[test]
fn tag_listing_reports_rules_and_nesting() {
    let template = Template::from_plain_text(
        "{IF \"{{Stage}}\" > \"3\" \"a\" \"b\"}\n{TABLE Items}\nTotal {{Amount",
    );
    let engine = ConversionEngine::new(RuleTable::default());
    let inventory = list_tags(&template.document, &engine);
    let tags = &inventory.tags;
    let summary: Vec<_> = tags
        .iter()
        .map(|tag| (tag.line, tag.occurrence.kind, tag.nested, tag.rule))
        .collect();
    assert_eq!(
        summary,
        vec![
            (1, TagKind::Conditional, false, Some("conditional_gt")),
            (1, TagKind::BracedField, true, Some("braced_field")),
            (2, TagKind::LoopStart, false, None),
        ]
    );
    assert!(tags.iter().all(|tag| tag.occurrence.location.is_some()));
    let stray: Vec<_> = inventory
        .stray_runs
        .iter()
        .map(|run| (run.coordinate.to_string(), run.text.as_str()))
        .collect();
    assert_eq!(stray, vec![("p2/r0".to_string(), "Total {{Amount")]);
}
