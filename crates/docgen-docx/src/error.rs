use std::io;
use std::path::PathBuf;

use docgen_model::RunCoordinate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid docx archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to serialize document XML: {0}")]
    XmlWrite(#[source] io::Error),

    #[error("docx package has no {0} part")]
    MissingPart(&'static str),

    #[error("unsupported template format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("template is not valid UTF-8: {}", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("document structure changed before writing: no run at {0}")]
    StructureChanged(RunCoordinate),

    #[error("failed to move {} into place at {}: {source}", temp_path.display(), target_path.display())]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DocxError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DocxError>;
