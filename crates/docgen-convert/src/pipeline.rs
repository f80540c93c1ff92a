//! Single-pass conversion of one document.
//!
//! Locate, classify, convert and rewrite run back to back on the same
//! document with no structural edits in between, so every run coordinate
//! taken by the locator is still valid when the rewriter uses it.

use docgen_model::{
    ConversionContext, Document, IssueKind, TagOccurrence, TagOutcome, UnconvertedReason,
    ValidationIssue, line_and_column,
};
use tracing::{debug, warn};

use crate::classifier::{classify, top_level};
use crate::converter::{ConversionEngine, DelegationSession};
use crate::locator::TagLocator;
use crate::rewriter::DocumentRewriter;

/// One top-level tag and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub occurrence: TagOccurrence,
    pub outcome: TagOutcome,
}

/// Outcome of converting one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentConversion {
    pub records: Vec<TagRecord>,
    /// Per-tag findings: unlocated, split and unconverted tags.
    pub issues: Vec<ValidationIssue>,
    /// Occurrences nested inside another tag and converted with it.
    pub subsumed: usize,
    pub candidate_runs: usize,
    pub ai_calls: usize,
}

impl DocumentConversion {
    fn count(&self, label: &str) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome.label() == label)
            .count()
    }

    pub fn converted(&self) -> usize {
        self.count("converted")
    }

    pub fn delegated(&self) -> usize {
        self.count("delegated")
    }

    pub fn unconverted(&self) -> usize {
        self.count("unconverted")
    }

    pub fn split(&self) -> usize {
        self.records
            .iter()
            .filter(|record| {
                record
                    .occurrence
                    .location
                    .is_some_and(|location| location.is_split())
            })
            .count()
    }

    pub fn unlocated(&self) -> usize {
        self.records
            .iter()
            .filter(|record| {
                matches!(
                    record.outcome,
                    TagOutcome::Unconverted(UnconvertedReason::Unlocated)
                )
            })
            .count()
    }
}

/// Converts every top-level legacy tag of `document` in place.
pub fn convert_document(
    document: &mut Document,
    engine: &ConversionEngine<'_>,
    context: &ConversionContext,
) -> DocumentConversion {
    let text = document.flattened_text();
    let locator = TagLocator::scan(document);
    let mut occurrences = classify(&text);
    locator.locate(&mut occurrences);
    let top = top_level(&occurrences);

    let mut conversion = DocumentConversion {
        candidate_runs: locator.candidates().len(),
        ..DocumentConversion::default()
    };
    let mut session = DelegationSession::default();
    let mut rewriter = DocumentRewriter::new(document);

    for (occurrence, is_top_level) in occurrences.into_iter().zip(top) {
        if !is_top_level {
            conversion.subsumed += 1;
            continue;
        }
        let (line, column) = line_and_column(&text, occurrence.span_start);
        let Some(location) = occurrence.location else {
            warn!(kind = %occurrence.kind, line, "tag not held by any run");
            conversion.issues.push(
                ValidationIssue::warning(
                    IssueKind::UnlocatedTag,
                    line,
                    column,
                    format!("{} tag could not be located in any run", occurrence.kind),
                )
                .with_suggestion("Retype the tag so it does not span paragraphs"),
            );
            conversion.records.push(TagRecord {
                occurrence,
                outcome: TagOutcome::Unconverted(UnconvertedReason::Unlocated),
            });
            continue;
        };
        if location.is_split() {
            conversion.issues.push(ValidationIssue::warning(
                IssueKind::SplitTag,
                line,
                column,
                format!(
                    "{} tag spans runs {location}; converted text takes the formatting of its first run",
                    occurrence.kind
                ),
            ));
        }

        let mut outcome = engine.convert_tag(&occurrence, context, &mut session);
        let rewrite = outcome
            .replacement()
            .filter(|replacement| *replacement != occurrence.raw_text)
            .map(|replacement| rewriter.apply(&location, &occurrence.raw_text, replacement));
        if let Some(Err(error)) = rewrite {
            warn!(kind = %occurrence.kind, %location, error = %error, "rewrite failed");
            conversion.issues.push(ValidationIssue::warning(
                IssueKind::UnlocatedTag,
                line,
                column,
                format!("{} tag could not be rewritten: {error}", occurrence.kind),
            ));
            outcome = TagOutcome::Unconverted(UnconvertedReason::Unlocated);
        } else if let TagOutcome::Unconverted(reason) = &outcome {
            conversion.issues.push(
                ValidationIssue::warning(
                    IssueKind::UnconvertedTag,
                    line,
                    column,
                    format!("{} tag left unconverted: {reason}", occurrence.kind),
                )
                .with_suggestion("Convert this tag manually"),
            );
        }
        debug!(
            kind = %occurrence.kind,
            %location,
            outcome = outcome.label(),
            "processed tag"
        );
        conversion.records.push(TagRecord {
            occurrence,
            outcome,
        });
    }
    conversion.ai_calls = session.calls();

    debug!(
        tags = conversion.records.len(),
        converted = conversion.converted(),
        delegated = conversion.delegated(),
        unconverted = conversion.unconverted(),
        subsumed = conversion.subsumed,
        "converted document"
    );
    conversion
}

/// Converts plain template text, one paragraph per line.
pub fn convert_text(
    text: &str,
    engine: &ConversionEngine<'_>,
    context: &ConversionContext,
) -> (String, DocumentConversion) {
    let mut document = Document::from_plain_text(text);
    let conversion = convert_document(&mut document, engine, context);
    (document.flattened_text(), conversion)
}
