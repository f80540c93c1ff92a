//! Conga to Box DocGen tag conversion.
//!
//! A document pass runs the pieces in order:
//!
//! - **locator**: maps flattened-text spans back to formatted runs
//! - **classifier**: finds typed legacy tag occurrences in the flattened text
//! - **rules**: ordered literal and pattern rules producing handlebars text
//! - **converter**: three-state per-tag conversion with optional AI delegation
//! - **rewriter**: in-place replacement inside the located runs
//! - **pipeline**: the single-pass conversion of one document

pub mod classifier;
pub mod converter;
pub mod error;
pub mod locator;
pub mod pipeline;
pub mod rewriter;
pub mod rules;

pub use classifier::{classify, top_level};
pub use converter::{ConversionEngine, DEFAULT_MAX_TOKENS, DelegationSession};
pub use error::{Result, RewriteError};
pub use locator::{CandidateRun, TAG_FRAGMENTS, TagLocator};
pub use pipeline::{DocumentConversion, TagRecord, convert_document, convert_text};
pub use rewriter::DocumentRewriter;
pub use rules::{RuleTable, builtin_literals};
