//! Tag locator.
//!
//! Scans paragraphs in flattening order and records, per paragraph, where
//! each run starts in the flattened document text. A span of the flattened
//! text then resolves to the run (or run range) that holds it.

use docgen_model::{Document, ParagraphCoordinate, RunCoordinate, TagLocation, TagOccurrence};
use tracing::debug;

/// Fragments that mark a run as holding tag text.
pub const TAG_FRAGMENTS: [&str; 7] = ["&=", "{{", "}}", "{IF", "{TABLE", "{LOOP", "{END"];

/// A run whose text contains at least one tag fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRun {
    pub coordinate: RunCoordinate,
    pub text: String,
}

#[derive(Debug, Clone)]
struct ParagraphSpan {
    coordinate: ParagraphCoordinate,
    /// Byte offset of the paragraph in the flattened text.
    start: usize,
    /// Cumulative end offset of every run, relative to `start`.
    run_ends: Vec<usize>,
}

impl ParagraphSpan {
    fn len(&self) -> usize {
        self.run_ends.last().copied().unwrap_or(0)
    }
}

/// Read-only index from flattened-text offsets to formatted runs.
#[derive(Debug, Clone, Default)]
pub struct TagLocator {
    paragraphs: Vec<ParagraphSpan>,
    candidates: Vec<CandidateRun>,
}

impl TagLocator {
    pub fn scan(document: &Document) -> Self {
        let mut paragraphs = Vec::new();
        let mut candidates = Vec::new();
        let mut offset = 0;
        for (coordinate, paragraph) in document.paragraphs_in_order() {
            let mut run_ends = Vec::with_capacity(paragraph.runs.len());
            let mut end = 0;
            for (index, run) in paragraph.runs.iter().enumerate() {
                end += run.text.len();
                run_ends.push(end);
                if TAG_FRAGMENTS.iter().any(|fragment| run.text.contains(fragment)) {
                    candidates.push(CandidateRun {
                        coordinate: RunCoordinate::new(coordinate, index),
                        text: run.text.clone(),
                    });
                }
            }
            paragraphs.push(ParagraphSpan {
                coordinate,
                start: offset,
                run_ends,
            });
            // Paragraphs are joined by a single newline.
            offset += end + 1;
        }
        debug!(
            paragraphs = paragraphs.len(),
            candidate_runs = candidates.len(),
            "scanned document runs"
        );
        Self {
            paragraphs,
            candidates,
        }
    }

    /// Runs holding tag fragments, in flattening order.
    ///
    /// Only a hint: occurrences are placed through [`TagLocator::resolve`].
    pub fn candidates(&self) -> &[CandidateRun] {
        &self.candidates
    }

    /// Candidate runs that no located occurrence touches, such as runs with
    /// an unterminated `{{` or half of a tag that crosses a paragraph break.
    pub fn unmatched_candidates(&self, occurrences: &[TagOccurrence]) -> Vec<&CandidateRun> {
        self.candidates
            .iter()
            .filter(|candidate| {
                !occurrences.iter().any(|occurrence| {
                    occurrence
                        .location
                        .as_ref()
                        .is_some_and(|location| location.covers(candidate.coordinate))
                })
            })
            .collect()
    }

    /// Resolves the flattened-text span `start..end` to its run(s).
    ///
    /// Returns `None` for empty spans and for spans crossing a paragraph
    /// boundary, which no run can hold.
    pub fn resolve(&self, start: usize, end: usize) -> Option<TagLocation> {
        if start >= end {
            return None;
        }
        let index = self
            .paragraphs
            .partition_point(|paragraph| paragraph.start <= start)
            .checked_sub(1)?;
        let paragraph = &self.paragraphs[index];
        if end > paragraph.start + paragraph.len() {
            return None;
        }
        let local_start = start - paragraph.start;
        let local_end = end - paragraph.start;
        let first_run = paragraph.run_ends.partition_point(|&run_end| run_end <= local_start);
        let last_run = paragraph.run_ends.partition_point(|&run_end| run_end < local_end);
        if first_run == last_run {
            Some(TagLocation::Run(RunCoordinate::new(
                paragraph.coordinate,
                first_run,
            )))
        } else {
            Some(TagLocation::Split {
                paragraph: paragraph.coordinate,
                first_run,
                last_run,
            })
        }
    }

    /// Fills in `location` for every occurrence; unresolvable spans stay `None`.
    pub fn locate(&self, occurrences: &mut [TagOccurrence]) {
        for occurrence in occurrences {
            occurrence.location = self.resolve(occurrence.span_start, occurrence.span_end);
        }
    }
}

#[cfg(test)]
mod tests {
    use docgen_model::{Cell, Paragraph, Row, Run, Table};

    use super::*;

    fn document() -> Document {
        Document {
            paragraphs: vec![
                Paragraph::new(vec![Run::new("Dear "), Run::new("&=Contact.Name")]),
                Paragraph::new(vec![
                    Run::new("Total: {{Am"),
                    Run::new("ou"),
                    Run::new("nt}} due"),
                ]),
            ],
            tables: vec![Table {
                rows: vec![Row {
                    cells: vec![Cell {
                        paragraphs: vec![Paragraph::from_text("{TABLE Group=Items}")],
                    }],
                }],
            }],
        }
    }

    #[test]
    fn candidates_follow_flattening_order() {
        let locator = TagLocator::scan(&document());
        let coordinates: Vec<String> = locator
            .candidates()
            .iter()
            .map(|candidate| candidate.coordinate.to_string())
            .collect();
        assert_eq!(coordinates, vec!["p0/r1", "p1/r0", "p1/r2", "t0.r0.c0.p0/r0"]);
    }

    #[test]
    fn runs_without_a_complete_tag_are_unmatched() {
        let document = Document::from_plain_text(
            "Hi &=Contact.Name\n{IF \"a\"\n= \"b\" \"c\" \"d\"}\nTotal {{Amount",
        );
        let locator = TagLocator::scan(&document);
        let mut occurrences = crate::classifier::classify(&document.flattened_text());
        locator.locate(&mut occurrences);
        let unmatched: Vec<&str> = locator
            .unmatched_candidates(&occurrences)
            .into_iter()
            .map(|candidate| candidate.text.as_str())
            .collect();
        assert_eq!(unmatched, vec!["{IF \"a\"", "Total {{Amount"]);
    }

    #[test]
    fn spans_resolve_to_single_runs() {
        let document = document();
        let text = document.flattened_text();
        let locator = TagLocator::scan(&document);

        let start = text.find("&=").expect("merge field");
        let location = locator.resolve(start, start + "&=Contact.Name".len());
        assert_eq!(
            location,
            Some(TagLocation::Run(RunCoordinate::new(
                ParagraphCoordinate::Body { paragraph: 0 },
                1
            )))
        );

        let start = text.find("{TABLE").expect("table tag");
        let location = locator.resolve(start, start + "{TABLE Group=Items}".len());
        assert_eq!(
            location.map(|location| location.to_string()).as_deref(),
            Some("t0.r0.c0.p0/r0")
        );
    }

    #[test]
    fn split_spans_cover_the_run_range() {
        let document = document();
        let text = document.flattened_text();
        let start = text.find("{{Am").expect("braced field");
        let location = TagLocator::scan(&document).resolve(start, start + "{{Amount}}".len());
        assert_eq!(
            location,
            Some(TagLocation::Split {
                paragraph: ParagraphCoordinate::Body { paragraph: 1 },
                first_run: 0,
                last_run: 2,
            })
        );
    }

    #[test]
    fn cross_paragraph_spans_are_unresolved() {
        let document = Document::from_plain_text("{IF \"a\"\n= \"b\" \"c\" \"d\"}");
        let text = document.flattened_text();
        let locator = TagLocator::scan(&document);
        assert_eq!(locator.resolve(0, text.len()), None);
        assert_eq!(locator.resolve(3, 3), None);
    }

    #[test]
    fn empty_runs_are_skipped() {
        let document = Document {
            paragraphs: vec![Paragraph::new(vec![
                Run::new(""),
                Run::new("&=Account.Name"),
                Run::new(""),
            ])],
            tables: Vec::new(),
        };
        let location = TagLocator::scan(&document).resolve(0, "&=Account.Name".len());
        assert_eq!(location.map(|location| location.anchor().run), Some(1));
    }
}
