//! `.docx` and plain-text template I/O.
//!
//! Reading maps `word/document.xml` onto [`docgen_model::Document`]. Writing
//! re-streams the original XML and only touches the text of runs whose
//! content changed, so run properties and every other package part are
//! carried over byte for byte.

pub mod error;
mod frames;
pub mod package;
mod reader;
pub mod save;
mod writer;

pub use error::{DocxError, Result};
pub use package::{DOCUMENT_PART, Template, TemplateFormat};
pub use reader::parse_document_xml;
pub use save::write_atomic;
pub use writer::rewrite_document_xml;
