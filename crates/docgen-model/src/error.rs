use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a data schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid schema shape: {0}")]
    Shape(String),
}

impl SchemaError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while loading data queries.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to read query file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("query `{name}` is not a string")]
    NotAString { name: String },
    #[error("query data must be a JSON object or raw query text")]
    UnsupportedShape,
}

impl QueryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
