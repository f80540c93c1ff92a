//! Template containers: `.docx` packages and plain-text templates.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use docgen_model::Document;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocxError, Result};
use crate::reader::parse_document_xml;
use crate::save::write_atomic;
use crate::writer::rewrite_document_xml;

/// Main document part of a WordprocessingML package.
pub const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Docx,
    PlainText,
}

impl TemplateFormat {
    /// Detects the container from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "docx" => Some(Self::Docx),
            "txt" | "hbs" | "tmpl" | "handlebars" => Some(Self::PlainText),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Docx {
        archive: Vec<u8>,
        document_xml: Vec<u8>,
        compression: CompressionMethod,
    },
    PlainText {
        line_ending: &'static str,
    },
}

/// A loaded template: the editable document plus what is needed to write it back.
#[derive(Debug, Clone)]
pub struct Template {
    pub document: Document,
    source: Source,
}

impl Template {
    pub fn open(path: &Path) -> Result<Self> {
        let format =
            TemplateFormat::from_path(path).ok_or_else(|| DocxError::UnsupportedFormat {
                path: path.to_path_buf(),
            })?;
        let bytes = fs::read(path).map_err(|e| DocxError::io("read", path, e))?;
        let template = match format {
            TemplateFormat::Docx => Self::from_docx_bytes(bytes)?,
            TemplateFormat::PlainText => {
                let text = String::from_utf8(bytes).map_err(|_| DocxError::NotUtf8 {
                    path: path.to_path_buf(),
                })?;
                Self::from_plain_text(&text)
            }
        };
        debug!(
            path = %path.display(),
            paragraphs = template.document.paragraphs.len(),
            tables = template.document.tables.len(),
            "opened template"
        );
        Ok(template)
    }

    pub fn from_docx_bytes(archive: Vec<u8>) -> Result<Self> {
        let (document_xml, compression) = {
            let mut zip = ZipArchive::new(Cursor::new(archive.as_slice()))?;
            let mut part = match zip.by_name(DOCUMENT_PART) {
                Ok(part) => part,
                Err(zip::result::ZipError::FileNotFound) => {
                    return Err(DocxError::MissingPart(DOCUMENT_PART));
                }
                Err(error) => return Err(error.into()),
            };
            let mut document_xml = Vec::new();
            part.read_to_end(&mut document_xml)
                .map_err(|e| DocxError::io("read", DOCUMENT_PART, e))?;
            (document_xml, part.compression())
        };
        let document = parse_document_xml(&document_xml)?;
        Ok(Self {
            document,
            source: Source::Docx {
                archive,
                document_xml,
                compression,
            },
        })
    }

    /// Lines are written back with `\r\n` when the text uses it, `\n` otherwise.
    pub fn from_plain_text(text: &str) -> Self {
        let line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
        Self {
            document: Document::from_plain_text(text),
            source: Source::PlainText { line_ending },
        }
    }

    pub fn format(&self) -> TemplateFormat {
        match self.source {
            Source::Docx { .. } => TemplateFormat::Docx,
            Source::PlainText { .. } => TemplateFormat::PlainText,
        }
    }

    /// Serializes the current document into the template's container format.
    pub fn render(&self) -> Result<Vec<u8>> {
        match &self.source {
            Source::PlainText { line_ending } => Ok(self
                .document
                .paragraphs_in_order()
                .into_iter()
                .map(|(_, paragraph)| paragraph.text())
                .collect::<Vec<_>>()
                .join(*line_ending)
                .into_bytes()),
            Source::Docx {
                archive,
                document_xml,
                compression,
            } => {
                let rewritten = rewrite_document_xml(document_xml, &self.document)?;
                repackage(archive, &rewritten, *compression)
            }
        }
    }

    /// Renders and atomically writes the template to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.render()?;
        write_atomic(path, &bytes)
    }
}

/// Copies every entry of `archive` unchanged except the main document part.
fn repackage(
    archive: &[u8],
    document_xml: &[u8],
    compression: CompressionMethod,
) -> Result<Vec<u8>> {
    let mut source = ZipArchive::new(Cursor::new(archive))?;
    let mut output = ZipWriter::new(Cursor::new(Vec::new()));
    for index in 0..source.len() {
        let entry = source.by_index_raw(index)?;
        if entry.name() == DOCUMENT_PART {
            drop(entry);
            let options = SimpleFileOptions::default().compression_method(compression);
            output.start_file(DOCUMENT_PART, options)?;
            output
                .write_all(document_xml)
                .map_err(|e| DocxError::io("write", DOCUMENT_PART, e))?;
        } else {
            output.raw_copy_file(entry)?;
        }
    }
    Ok(output.finish()?.into_inner())
}
