//! Tag classifier.
//!
//! One fixed pattern per [`TagKind`], applied to the flattened document text
//! in kind-priority order. Classification is pure: the same text always
//! yields the same occurrences.

use std::sync::LazyLock;

use docgen_model::{TagKind, TagOccurrence};
use regex::Regex;

static MERGE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&=([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)").expect("Invalid merge field regex")
});
static BRACED_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("Invalid braced field regex"));
static CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{IF\s+"([^"]+)"\s+([^}]+)\}"#).expect("Invalid conditional regex")
});
static LOOP_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(?:TABLE|LOOP)\s+([^}]+)\}").expect("Invalid loop start regex")
});
static LOOP_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{END\s+([^}]+)\}").expect("Invalid loop end regex"));

fn pattern(kind: TagKind) -> &'static Regex {
    match kind {
        TagKind::MergeField => &MERGE_FIELD,
        TagKind::BracedField => &BRACED_FIELD,
        TagKind::Conditional => &CONDITIONAL,
        TagKind::LoopStart => &LOOP_START,
        TagKind::LoopEnd => &LOOP_END,
    }
}

/// Finds every legacy tag occurrence in `text`, sorted by span start.
///
/// Occurrences starting at the same offset keep kind-priority order.
/// Locations are left unset; see [`crate::TagLocator::locate`].
pub fn classify(text: &str) -> Vec<TagOccurrence> {
    let mut occurrences = Vec::new();
    for kind in TagKind::ALL {
        for captures in pattern(kind).captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            occurrences.push(TagOccurrence {
                kind,
                raw_text: whole.as_str().to_string(),
                captures: captures
                    .iter()
                    .skip(1)
                    .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect(),
                span_start: whole.start(),
                span_end: whole.end(),
                location: None,
            });
        }
    }
    occurrences.sort_by_key(|occurrence| occurrence.span_start);
    occurrences
}

/// Flags occurrences nested inside another occurrence's span.
///
/// The `{{Status}}` inside `{IF "{{Status}}" = ...}` is converted as part of
/// the conditional, never on its own.
pub fn top_level(occurrences: &[TagOccurrence]) -> Vec<bool> {
    occurrences
        .iter()
        .map(|occurrence| !occurrences.iter().any(|other| occurrence.is_within(other)))
        .collect()
}
