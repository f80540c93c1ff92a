//! Batch conversion: one document at a time, each fully converted,
//! validated and published before the next one starts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use docgen_convert::{
    CandidateRun, ConversionEngine, TagLocator, classify, convert_document, top_level,
};
use docgen_docx::Template;
use docgen_model::{
    ConversionContext, Document, Schema, TagOccurrence, ValidationIssue, ValidationReport,
    line_and_column,
};
use docgen_validate::Validator;
use tracing::{debug, info, info_span, trace, warn};

use crate::config::DEFAULT_OUTPUT_PREFIX;
use crate::logging::redact_value;
use crate::types::{
    BatchResult, ConvertedDocument, DocumentStatus, DocumentSummary, TagCounts, display_name,
};

/// Where and whether converted documents are written.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Defaults to each input's own directory.
    pub output_dir: Option<PathBuf>,
    pub prefix: String,
    pub dry_run: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            dry_run: false,
        }
    }
}

impl OutputOptions {
    pub fn output_path(&self, input: &Path) -> Result<PathBuf> {
        let file_name = input
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("input path has no file name: {}", input.display()))?;
        let directory = match &self.output_dir {
            Some(directory) => directory.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        Ok(directory.join(format!("{}{file_name}", self.prefix)))
    }
}

/// Everything one batch run shares across documents. Read-only once built.
pub struct BatchPipeline<'a> {
    engine: ConversionEngine<'a>,
    validator: Validator<'a>,
    schema: Option<Schema>,
    query: Option<String>,
    instructions: Option<String>,
    output: OutputOptions,
}

impl<'a> BatchPipeline<'a> {
    pub fn new(engine: ConversionEngine<'a>, validator: Validator<'a>, output: OutputOptions) -> Self {
        Self {
            engine,
            validator,
            schema: None,
            query: None,
            instructions: None,
            output,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Option<Schema>) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Converts every input in order; failures are recorded and the batch goes on.
    pub fn run(
        &self,
        inputs: &[PathBuf],
        mut on_document: impl FnMut(&DocumentSummary),
    ) -> BatchResult {
        let mut documents = Vec::with_capacity(inputs.len());
        for input in inputs {
            let status = match self.convert_file(input) {
                Ok(converted) => DocumentStatus::Converted(converted),
                Err(error) => {
                    let error = format!("{error:#}");
                    warn!(document = %display_name(input), error = %error, "document failed");
                    DocumentStatus::Failed { error }
                }
            };
            let summary = DocumentSummary {
                input: input.clone(),
                status,
            };
            on_document(&summary);
            documents.push(summary);
        }
        let result = BatchResult {
            generated_at: Utc::now(),
            documents,
        };
        info!(
            documents = result.documents.len(),
            succeeded = result.succeeded(),
            "batch complete"
        );
        result
    }

    /// Converts, validates and (unless dry-running) publishes one document.
    pub fn convert_file(&self, input: &Path) -> Result<ConvertedDocument> {
        let span = info_span!("document", name = %display_name(input));
        let _guard = span.enter();

        let mut template =
            Template::open(input).with_context(|| format!("open {}", input.display()))?;
        let original = template.document.flattened_text();
        let context = ConversionContext::new(original.clone())
            .with_query(self.query.clone())
            .with_schema(self.schema.clone())
            .with_instructions(self.instructions.clone());

        let conversion = convert_document(&mut template.document, &self.engine, &context);
        let converted = template.document.flattened_text();
        trace!(converted = %redact_value(&converted), "converted template text");

        let validation =
            self.validator
                .validate_conversion(&original, &converted, self.schema.as_ref(), &context);
        let report = merge_issues(validation, conversion.issues.clone(), &converted);
        let tags = TagCounts::from(&conversion);

        let output = if self.output.dry_run {
            None
        } else {
            let path = self.output.output_path(input)?;
            template
                .save(&path)
                .with_context(|| format!("write {}", path.display()))?;
            Some(path)
        };
        info!(
            tags = tags.total,
            converted = tags.converted,
            delegated = tags.delegated,
            unconverted = tags.unconverted,
            errors = report.error_count(),
            warnings = report.warning_count(),
            written = output.is_some(),
            "document converted"
        );
        Ok(ConvertedDocument {
            output,
            tags,
            report,
        })
    }
}

/// Folds per-tag conversion findings into the validation report.
///
/// The merged report keeps the validation method and any AI-stated
/// confidence; the confidence tier is recomputed over all findings.
pub fn merge_issues(
    report: ValidationReport,
    conversion_issues: Vec<ValidationIssue>,
    converted: &str,
) -> ValidationReport {
    if conversion_issues.is_empty() {
        return report;
    }
    let method = report.method;
    let ai_confidence = report.ai_confidence;
    let issues: Vec<ValidationIssue> = report
        .errors
        .into_iter()
        .chain(report.warnings)
        .chain(conversion_issues)
        .collect();
    let total_lines = converted.split('\n').count();
    ValidationReport {
        ai_confidence,
        ..ValidationReport::from_issues(issues, total_lines, method)
    }
}

/// A classified tag as listed by the `tags` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagListing {
    pub line: usize,
    pub column: usize,
    pub occurrence: TagOccurrence,
    /// Nested inside another tag.
    pub nested: bool,
    /// Name of the rule that would convert it.
    pub rule: Option<&'static str>,
}

/// Output of the `tags` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagInventory {
    pub tags: Vec<TagListing>,
    /// Runs holding tag fragments that no recognised tag accounts for.
    pub stray_runs: Vec<CandidateRun>,
}

/// Classifies and locates every tag of `document` without changing it.
pub fn list_tags(document: &Document, engine: &ConversionEngine<'_>) -> TagInventory {
    let text = document.flattened_text();
    let locator = TagLocator::scan(document);
    let mut occurrences = classify(&text);
    locator.locate(&mut occurrences);
    let stray_runs: Vec<CandidateRun> = locator
        .unmatched_candidates(&occurrences)
        .into_iter()
        .cloned()
        .collect();
    let outer = top_level(&occurrences);
    debug!(
        tags = occurrences.len(),
        stray_runs = stray_runs.len(),
        "listed tags"
    );
    let tags = occurrences
        .into_iter()
        .zip(outer)
        .map(|(occurrence, is_top)| {
            let (line, column) = line_and_column(&text, occurrence.span_start);
            let rule = engine.rules().apply(&occurrence).map(|(name, _)| name);
            TagListing {
                line,
                column,
                occurrence,
                nested: !is_top,
                rule,
            }
        })
        .collect();
    TagInventory { tags, stray_runs }
}
