//! Shared data model for the template conversion workspace.
//!
//! The document abstraction here is the only view of a template the
//! conversion core ever sees: ordered paragraphs of formatted runs followed
//! by tables whose cells hold paragraphs of their own.

pub mod context;
pub mod document;
pub mod error;
pub mod issue;
pub mod query;
pub mod schema;
pub mod tag;

pub use context::ConversionContext;
pub use document::{
    Cell, Document, Paragraph, ParagraphCoordinate, Row, Run, RunCoordinate, RunFormat, Table,
};
pub use error::{QueryError, SchemaError};
pub use issue::{
    IssueKind, Severity, ValidationIssue, ValidationMethod, ValidationReport, confidence_tier,
    line_and_column,
};
pub use query::{QueryCatalog, QueryCondition, QueryMetadata, QueryType};
pub use schema::{FieldSpec, Schema, SchemaViolation};
pub use tag::{TagKind, TagLocation, TagOccurrence, TagOutcome, UnconvertedReason};
