use std::path::Path;

use anyhow::{Context, Result};
use docgen_ai::{BoxAiClient, TextGenerator};
use docgen_cli::config::{AiConfig, Config};
use docgen_cli::pipeline::{BatchPipeline, OutputOptions, list_tags};
use docgen_convert::{ConversionEngine, RuleTable};
use docgen_docx::{Template, write_atomic};
use docgen_model::{QueryCatalog, Schema};
use docgen_validate::{HelperSet, Validator};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::cli::{ConvertArgs, ReportFormatArg, TagsArgs, ValidateArgs};
use crate::summary::{print_batch_summary, print_tag_listing, print_validation_report};

pub fn run_convert(args: &ConvertArgs) -> Result<i32> {
    let config = Config::load(args.config.as_deref())?;
    let client = build_client(&config.ai, args.ai)?;
    let generator = client.as_ref().map(|client| client as &dyn TextGenerator);

    let mut engine = ConversionEngine::new(rule_table(&config));
    let mut validator = Validator::new(helper_set(&config));
    if let Some(generator) = generator {
        engine = engine.with_generator(generator, config.ai.max_tokens);
        if config.ai.validate_with_ai {
            validator = validator.with_generator(generator, config.ai.max_tokens);
        }
    }
    let output = OutputOptions {
        output_dir: args.output_dir.clone(),
        prefix: args
            .prefix
            .clone()
            .unwrap_or_else(|| config.conversion.output_prefix.clone()),
        dry_run: args.dry_run,
    };
    let pipeline = BatchPipeline::new(engine, validator, output)
        .with_schema(load_schema(args.schema.as_deref()))
        .with_query(load_query(args.query.as_deref()))
        .with_instructions(args.instructions.clone());

    let progress = progress_bar(args.inputs.len() as u64);
    let result = pipeline.run(&args.inputs, |summary| {
        progress.set_message(summary.name());
        progress.inc(1);
    });
    progress.finish_and_clear();

    if let Some(path) = &args.report {
        let json = serde_json::to_vec_pretty(&result).context("serialize batch report")?;
        write_atomic(path, &json).with_context(|| format!("write report {}", path.display()))?;
        info!(path = %path.display(), "wrote batch report");
    }
    print_batch_summary(&result);
    Ok(if result.has_failures() { 1 } else { 0 })
}

pub fn run_validate(args: &ValidateArgs) -> Result<i32> {
    let config = Config::load(args.config.as_deref())?;
    let converted = Template::open(&args.converted)
        .with_context(|| format!("open {}", args.converted.display()))?
        .document
        .flattened_text();
    // Without an original, the converted text stands in for it so the
    // residual-syntax check still runs.
    let original = match &args.original {
        Some(path) => Template::open(path)
            .with_context(|| format!("open {}", path.display()))?
            .document
            .flattened_text(),
        None => converted.clone(),
    };
    let schema = load_schema(args.schema.as_deref());
    let report =
        Validator::new(helper_set(&config)).validate_rules(&original, &converted, schema.as_ref());
    match args.format {
        ReportFormatArg::Table => print_validation_report(&report),
        ReportFormatArg::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("serialize report")?
            );
        }
    }
    Ok(if report.is_valid { 0 } else { 1 })
}

pub fn run_tags(args: &TagsArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let template = Template::open(&args.input)
        .with_context(|| format!("open {}", args.input.display()))?;
    let engine = ConversionEngine::new(rule_table(&config));
    print_tag_listing(&list_tags(&template.document, &engine));
    Ok(())
}

fn rule_table(config: &Config) -> RuleTable {
    RuleTable::with_mappings(config.conversion.mappings.clone())
}

fn helper_set(config: &Config) -> HelperSet {
    HelperSet::with_extra(config.validation.extra_helpers.iter().cloned())
}

/// Builds the Box AI client when enabled by flag or config.
fn build_client(ai: &AiConfig, forced: bool) -> Result<Option<BoxAiClient>> {
    if !(forced || ai.enabled) {
        return Ok(None);
    }
    let credentials = ai.credentials()?;
    info!(
        base_url = %ai.base_url,
        auth_method = %credentials.method,
        max_tokens = ai.max_tokens,
        "AI delegation enabled"
    );
    let client = BoxAiClient::new(ai.client_config(), credentials)
        .context("create Box AI client")?;
    Ok(Some(client))
}

/// Loads the schema; an unreadable schema degrades to none.
fn load_schema(path: Option<&Path>) -> Option<Schema> {
    let path = path?;
    match Schema::from_path(path) {
        Ok(schema) => Some(schema),
        Err(error) => {
            warn!(path = %path.display(), error = %error, "ignoring invalid schema");
            None
        }
    }
}

/// Loads the default query text; an unreadable query file degrades to none.
fn load_query(path: Option<&Path>) -> Option<String> {
    let path = path?;
    match QueryCatalog::from_path(path) {
        Ok(catalog) => catalog.default_query().map(str::to_string),
        Err(error) => {
            warn!(path = %path.display(), error = %error, "ignoring invalid query file");
            None
        }
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let progress = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    progress.set_style(style);
    progress
}
