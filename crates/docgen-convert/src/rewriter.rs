//! In-place document rewriter.
//!
//! Replaces tag text inside the runs the locator resolved, touching only run
//! text. Runs are never added or removed, so every coordinate of the pass
//! stays valid while rewriting.

use std::collections::HashMap;

use docgen_model::{Document, ParagraphCoordinate, RunCoordinate, TagLocation};

use crate::error::{Result, RewriteError};

/// Applies converted tags to one document in ascending span order.
///
/// Each run keeps a search cursor past its last replacement, so repeated or
/// prefix-overlapping tags in one run are replaced exactly once each and
/// converted text is never searched again.
pub struct DocumentRewriter<'d> {
    document: &'d mut Document,
    cursors: HashMap<RunCoordinate, usize>,
}

impl<'d> DocumentRewriter<'d> {
    pub fn new(document: &'d mut Document) -> Self {
        Self {
            document,
            cursors: HashMap::new(),
        }
    }

    /// Replaces `raw` with `converted` at `location`.
    pub fn apply(&mut self, location: &TagLocation, raw: &str, converted: &str) -> Result<()> {
        match *location {
            TagLocation::Run(coordinate) => self.apply_in_run(coordinate, location, raw, converted),
            TagLocation::Split {
                paragraph,
                first_run,
                last_run,
            } => self.apply_split(paragraph, first_run, last_run, location, raw, converted),
        }
    }

    fn apply_in_run(
        &mut self,
        coordinate: RunCoordinate,
        location: &TagLocation,
        raw: &str,
        converted: &str,
    ) -> Result<()> {
        let cursor = self.cursors.get(&coordinate).copied().unwrap_or(0);
        let run = self
            .document
            .run_mut(&coordinate)
            .ok_or(RewriteError::RunMissing(coordinate))?;
        let position = run
            .text
            .get(cursor..)
            .and_then(|rest| rest.find(raw))
            .map(|offset| cursor + offset)
            .ok_or(RewriteError::TextNotFound {
                location: *location,
            })?;
        run.text
            .replace_range(position..position + raw.len(), converted);
        self.cursors
            .insert(coordinate, position + converted.len());
        Ok(())
    }

    /// Puts the converted text in the first run and trims the remaining tag
    /// characters out of the following runs.
    fn apply_split(
        &mut self,
        paragraph: ParagraphCoordinate,
        first_run: usize,
        last_run: usize,
        location: &TagLocation,
        raw: &str,
        converted: &str,
    ) -> Result<()> {
        let first = RunCoordinate::new(paragraph, first_run);
        let cursor = self.cursors.get(&first).copied().unwrap_or(0);
        let runs = &mut self
            .document
            .paragraph_mut(paragraph)
            .ok_or(RewriteError::ParagraphMissing(paragraph))?
            .runs;
        if last_run >= runs.len() || first_run >= last_run {
            return Err(RewriteError::RunMissing(RunCoordinate::new(paragraph, last_run)));
        }

        let mut joined = String::new();
        let mut starts = Vec::with_capacity(last_run - first_run + 1);
        for run in &runs[first_run..=last_run] {
            starts.push(joined.len());
            joined.push_str(&run.text);
        }
        let first_len = runs[first_run].text.len();
        let last_start = starts[starts.len() - 1];
        let not_found = RewriteError::TextNotFound {
            location: *location,
        };
        let start = joined
            .get(cursor..)
            .and_then(|rest| rest.find(raw))
            .map(|offset| cursor + offset)
            .ok_or_else(|| not_found.clone())?;
        let end = start + raw.len();
        if start >= first_len || end <= last_start {
            return Err(not_found);
        }

        let first_text = &mut runs[first_run].text;
        first_text.truncate(start);
        first_text.push_str(converted);
        for run in &mut runs[first_run + 1..last_run] {
            run.text.clear();
        }
        let last_text = &mut runs[last_run].text;
        last_text.replace_range(..end - last_start, "");

        self.cursors.insert(first, start + converted.len());
        for run in first_run + 1..=last_run {
            self.cursors.remove(&RunCoordinate::new(paragraph, run));
        }
        Ok(())
    }
}
