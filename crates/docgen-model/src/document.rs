//! Rich-text document abstraction.
//!
//! Mirrors the shape exposed by word-processing libraries: body paragraphs
//! first, then tables of rows of cells, each cell holding its own
//! paragraphs. Every paragraph is a sequence of runs with uniform formatting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Character formatting carried by a run.
///
/// Container readers fill this in for reporting; writers never rebuild a
/// run's formatting from it, they keep the original properties untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font: Option<String>,
    /// Font size in half-points, as stored by the container.
    pub size: Option<u32>,
    pub color: Option<String>,
}

/// The smallest span of text with uniform formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub format: RunFormat,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: RunFormat::default(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: RunFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    /// Single-run paragraph holding `text`.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            runs: vec![Run::new(text)],
        }
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Row>,
}

/// Position of a paragraph within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ParagraphCoordinate {
    Body {
        paragraph: usize,
    },
    Table {
        table: usize,
        row: usize,
        cell: usize,
        paragraph: usize,
    },
}

impl fmt::Display for ParagraphCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body { paragraph } => write!(f, "p{paragraph}"),
            Self::Table {
                table,
                row,
                cell,
                paragraph,
            } => write!(f, "t{table}.r{row}.c{cell}.p{paragraph}"),
        }
    }
}

/// Locator for one formatted run.
///
/// Only valid for the document pass that produced it; structural edits to
/// the document invalidate every coordinate taken before them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunCoordinate {
    pub paragraph: ParagraphCoordinate,
    pub run: usize,
}

impl RunCoordinate {
    pub fn new(paragraph: ParagraphCoordinate, run: usize) -> Self {
        Self { paragraph, run }
    }
}

impl fmt::Display for RunCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/r{}", self.paragraph, self.run)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
    pub tables: Vec<Table>,
}

impl Document {
    /// Builds a document from plain text: one single-run paragraph per line.
    pub fn from_plain_text(text: &str) -> Self {
        let paragraphs = text
            .split('\n')
            .map(|line| Paragraph::from_text(line.strip_suffix('\r').unwrap_or(line)))
            .collect();
        Self {
            paragraphs,
            tables: Vec::new(),
        }
    }

    /// Paragraphs in flattening order: body first, then table cells in
    /// (table, row, cell, paragraph) order.
    pub fn paragraphs_in_order(&self) -> Vec<(ParagraphCoordinate, &Paragraph)> {
        let mut ordered: Vec<(ParagraphCoordinate, &Paragraph)> = self
            .paragraphs
            .iter()
            .enumerate()
            .map(|(paragraph, p)| (ParagraphCoordinate::Body { paragraph }, p))
            .collect();
        for (table_index, table) in self.tables.iter().enumerate() {
            for (row_index, row) in table.rows.iter().enumerate() {
                for (cell_index, cell) in row.cells.iter().enumerate() {
                    for (paragraph_index, paragraph) in cell.paragraphs.iter().enumerate() {
                        ordered.push((
                            ParagraphCoordinate::Table {
                                table: table_index,
                                row: row_index,
                                cell: cell_index,
                                paragraph: paragraph_index,
                            },
                            paragraph,
                        ));
                    }
                }
            }
        }
        ordered
    }

    /// Full document text: every paragraph in flattening order joined by `\n`.
    pub fn flattened_text(&self) -> String {
        self.paragraphs_in_order()
            .into_iter()
            .map(|(_, paragraph)| paragraph.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn paragraph(&self, coordinate: ParagraphCoordinate) -> Option<&Paragraph> {
        match coordinate {
            ParagraphCoordinate::Body { paragraph } => self.paragraphs.get(paragraph),
            ParagraphCoordinate::Table {
                table,
                row,
                cell,
                paragraph,
            } => self
                .tables
                .get(table)?
                .rows
                .get(row)?
                .cells
                .get(cell)?
                .paragraphs
                .get(paragraph),
        }
    }

    pub fn paragraph_mut(&mut self, coordinate: ParagraphCoordinate) -> Option<&mut Paragraph> {
        match coordinate {
            ParagraphCoordinate::Body { paragraph } => self.paragraphs.get_mut(paragraph),
            ParagraphCoordinate::Table {
                table,
                row,
                cell,
                paragraph,
            } => self
                .tables
                .get_mut(table)?
                .rows
                .get_mut(row)?
                .cells
                .get_mut(cell)?
                .paragraphs
                .get_mut(paragraph),
        }
    }

    pub fn run(&self, coordinate: &RunCoordinate) -> Option<&Run> {
        self.paragraph(coordinate.paragraph)?.runs.get(coordinate.run)
    }

    pub fn run_mut(&mut self, coordinate: &RunCoordinate) -> Option<&mut Run> {
        self.paragraph_mut(coordinate.paragraph)?
            .runs
            .get_mut(coordinate.run)
    }

    /// Total number of runs across all paragraphs.
    pub fn run_count(&self) -> usize {
        self.paragraphs_in_order()
            .iter()
            .map(|(_, paragraph)| paragraph.runs.len())
            .sum()
    }
}
