use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::{ParagraphCoordinate, RunCoordinate};

/// Legacy tag classes recognised in template text.
///
/// Declaration order is the classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    MergeField,
    BracedField,
    Conditional,
    LoopStart,
    LoopEnd,
}

impl TagKind {
    pub const ALL: [TagKind; 5] = [
        TagKind::MergeField,
        TagKind::BracedField,
        TagKind::Conditional,
        TagKind::LoopStart,
        TagKind::LoopEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TagKind::MergeField => "merge_field",
            TagKind::BracedField => "braced_field",
            TagKind::Conditional => "conditional",
            TagKind::LoopStart => "loop_start",
            TagKind::LoopEnd => "loop_end",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the text of a tag physically lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TagLocation {
    /// The whole tag sits inside one run.
    Run(RunCoordinate),
    /// The tag spans runs `first_run..=last_run` of one paragraph.
    Split {
        paragraph: ParagraphCoordinate,
        first_run: usize,
        last_run: usize,
    },
}

impl TagLocation {
    /// Coordinate of the run that receives the converted text.
    pub fn anchor(&self) -> RunCoordinate {
        match *self {
            TagLocation::Run(coordinate) => coordinate,
            TagLocation::Split {
                paragraph,
                first_run,
                ..
            } => RunCoordinate::new(paragraph, first_run),
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, TagLocation::Split { .. })
    }

    /// True when `coordinate` holds some of the tag's text.
    pub fn covers(&self, coordinate: RunCoordinate) -> bool {
        match *self {
            TagLocation::Run(run) => run == coordinate,
            TagLocation::Split {
                paragraph,
                first_run,
                last_run,
            } => {
                coordinate.paragraph == paragraph
                    && (first_run..=last_run).contains(&coordinate.run)
            }
        }
    }
}

impl fmt::Display for TagLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagLocation::Run(coordinate) => write!(f, "{coordinate}"),
            TagLocation::Split {
                paragraph,
                first_run,
                last_run,
            } => write!(f, "{paragraph}/r{first_run}-r{last_run}"),
        }
    }
}

/// One recognised tag in the flattened document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOccurrence {
    pub kind: TagKind,
    pub raw_text: String,
    /// Capture groups of the classifying pattern, in group order.
    pub captures: Vec<String>,
    /// Byte offset of the tag start in the flattened text.
    pub span_start: usize,
    /// Byte offset one past the tag end in the flattened text.
    pub span_end: usize,
    pub location: Option<TagLocation>,
}

impl TagOccurrence {
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }

    /// True when this occurrence lies entirely within `other`'s span.
    pub fn is_within(&self, other: &TagOccurrence) -> bool {
        self.span_start >= other.span_start
            && self.span_end <= other.span_end
            && (self.span_start, self.span_end) != (other.span_start, other.span_end)
    }
}

/// Why a tag was left in its legacy form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum UnconvertedReason {
    /// No rule matched and no AI adapter is configured.
    NoRule,
    /// The AI adapter was configured but failed or returned nothing usable.
    DelegationFailed(String),
    /// The tag was found in the text but not in any run.
    Unlocated,
}

impl fmt::Display for UnconvertedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnconvertedReason::NoRule => f.write_str("no conversion rule matched"),
            UnconvertedReason::DelegationFailed(detail) => {
                write!(f, "AI delegation unavailable: {detail}")
            }
            UnconvertedReason::Unlocated => f.write_str("tag could not be located in any run"),
        }
    }
}

/// Result of converting a single tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum TagOutcome {
    /// Produced by the rule table.
    Converted(String),
    /// Produced by the AI adapter.
    Delegated(String),
    Unconverted(UnconvertedReason),
}

impl TagOutcome {
    /// Replacement text, if the tag was converted by either path.
    pub fn replacement(&self) -> Option<&str> {
        match self {
            TagOutcome::Converted(text) | TagOutcome::Delegated(text) => Some(text),
            TagOutcome::Unconverted(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TagOutcome::Converted(_) => "converted",
            TagOutcome::Delegated(_) => "delegated",
            TagOutcome::Unconverted(_) => "unconverted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_location_covers_its_run_range() {
        let paragraph = ParagraphCoordinate::Body { paragraph: 2 };
        let split = TagLocation::Split {
            paragraph,
            first_run: 1,
            last_run: 3,
        };
        assert!(split.covers(RunCoordinate::new(paragraph, 3)));
        assert!(!split.covers(RunCoordinate::new(paragraph, 4)));
        assert!(!split.covers(RunCoordinate::new(ParagraphCoordinate::Body { paragraph: 1 }, 2)));
        assert!(TagLocation::Run(RunCoordinate::new(paragraph, 0)).covers(RunCoordinate::new(paragraph, 0)));
    }

    fn occurrence(start: usize, end: usize) -> TagOccurrence {
        TagOccurrence {
            kind: TagKind::BracedField,
            raw_text: String::new(),
            captures: Vec::new(),
            span_start: start,
            span_end: end,
            location: None,
        }
    }

    #[test]
    fn nested_span_is_within_outer() {
        let outer = occurrence(0, 40);
        assert!(occurrence(5, 15).is_within(&outer));
        assert!(!outer.is_within(&outer));
        assert!(!occurrence(35, 45).is_within(&outer));
    }

    #[test]
    fn split_location_anchors_on_first_run() {
        let location = TagLocation::Split {
            paragraph: ParagraphCoordinate::Body { paragraph: 2 },
            first_run: 1,
            last_run: 3,
        };
        assert_eq!(location.anchor().run, 1);
        assert_eq!(location.to_string(), "p2/r1-r3");
        assert!(location.is_split());
    }

    #[test]
    fn outcome_replacement() {
        assert_eq!(
            TagOutcome::Delegated("{{x}}".to_string()).replacement(),
            Some("{{x}}")
        );
        assert_eq!(TagOutcome::Unconverted(UnconvertedReason::NoRule).replacement(), None);
    }
}
