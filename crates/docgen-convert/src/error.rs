//! Error types for in-place rewriting.

use docgen_model::{ParagraphCoordinate, RunCoordinate, TagLocation};
use thiserror::Error;

/// Failure to apply one converted tag to the document.
///
/// Never fatal for a document: the pass records the tag as unlocated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("run {0} no longer exists")]
    RunMissing(RunCoordinate),

    #[error("paragraph {0} no longer exists")]
    ParagraphMissing(ParagraphCoordinate),

    #[error("tag text not found at {location}")]
    TextNotFound { location: TagLocation },
}

pub type Result<T> = std::result::Result<T, RewriteError>;
