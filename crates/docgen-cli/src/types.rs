use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use docgen_convert::DocumentConversion;
use docgen_model::ValidationReport;
use serde::Serialize;

/// Outcome of a batch run, also the shape of the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub generated_at: DateTime<Utc>,
    pub documents: Vec<DocumentSummary>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.documents
            .iter()
            .filter(|document| document.converted().is_some())
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.succeeded() < self.documents.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub input: PathBuf,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

impl DocumentSummary {
    pub fn name(&self) -> String {
        display_name(&self.input)
    }

    pub fn converted(&self) -> Option<&ConvertedDocument> {
        match &self.status {
            DocumentStatus::Converted(document) => Some(document),
            DocumentStatus::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Converted(ConvertedDocument),
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertedDocument {
    /// `None` on dry runs.
    pub output: Option<PathBuf>,
    pub tags: TagCounts,
    pub report: ValidationReport,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagCounts {
    pub total: usize,
    pub converted: usize,
    pub delegated: usize,
    pub unconverted: usize,
    pub split: usize,
    pub unlocated: usize,
    pub subsumed: usize,
    pub ai_calls: usize,
}

impl From<&DocumentConversion> for TagCounts {
    fn from(conversion: &DocumentConversion) -> Self {
        Self {
            total: conversion.records.len(),
            converted: conversion.converted(),
            delegated: conversion.delegated(),
            unconverted: conversion.unconverted(),
            split: conversion.split(),
            unlocated: conversion.unlocated(),
            subsumed: conversion.subsumed,
            ai_calls: conversion.ai_calls,
        }
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or_else(|| path.display().to_string(), str::to_string)
}
