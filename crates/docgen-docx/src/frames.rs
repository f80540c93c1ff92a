//! Element stack shared by the reader and the writer.
//!
//! Only direct children are structural: body `p`/`tbl`, table `tr`, row
//! `tc`, cell `p`, paragraph `r`, run `t`/`tab`/`br`/`cr`/`rPr`. Anything
//! else (hyperlinks, content controls, nested tables) is opaque, which keeps
//! coordinates identical between the reading pass and the writing pass.

use docgen_model::{ParagraphCoordinate, RunCoordinate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Frame {
    Body,
    Table { table: usize },
    Row { table: usize, row: usize },
    Cell { table: usize, row: usize, cell: usize },
    Paragraph(ParagraphCoordinate),
    Run(RunCoordinate),
    RunProps,
    Text,
    /// `tab`, read as `\t`.
    Tab,
    /// `br` or `cr`, read as `\n`.
    Break,
    Other,
}

#[derive(Debug, Default)]
pub(crate) struct FrameTracker {
    stack: Vec<Frame>,
    body_paragraphs: usize,
    tables: usize,
    rows: usize,
    cells: usize,
    cell_paragraphs: usize,
    runs: usize,
}

impl FrameTracker {
    pub(crate) fn top(&self) -> Option<Frame> {
        self.stack.last().copied()
    }

    /// Pushes the frame for an element with the given local name.
    pub(crate) fn enter(&mut self, local_name: &[u8]) -> Frame {
        let frame = match (self.top(), local_name) {
            (_, b"body") if !self.stack.contains(&Frame::Body) => Frame::Body,
            (Some(Frame::Body), b"p") => {
                let paragraph = self.body_paragraphs;
                self.body_paragraphs += 1;
                self.runs = 0;
                Frame::Paragraph(ParagraphCoordinate::Body { paragraph })
            }
            (Some(Frame::Body), b"tbl") => {
                let table = self.tables;
                self.tables += 1;
                self.rows = 0;
                Frame::Table { table }
            }
            (Some(Frame::Table { table }), b"tr") => {
                let row = self.rows;
                self.rows += 1;
                self.cells = 0;
                Frame::Row { table, row }
            }
            (Some(Frame::Row { table, row }), b"tc") => {
                let cell = self.cells;
                self.cells += 1;
                self.cell_paragraphs = 0;
                Frame::Cell { table, row, cell }
            }
            (Some(Frame::Cell { table, row, cell }), b"p") => {
                let paragraph = self.cell_paragraphs;
                self.cell_paragraphs += 1;
                self.runs = 0;
                Frame::Paragraph(ParagraphCoordinate::Table {
                    table,
                    row,
                    cell,
                    paragraph,
                })
            }
            (Some(Frame::Paragraph(paragraph)), b"r") => {
                let run = self.runs;
                self.runs += 1;
                Frame::Run(RunCoordinate::new(paragraph, run))
            }
            (Some(Frame::Run(_)), b"t") => Frame::Text,
            (Some(Frame::Run(_)), b"tab") => Frame::Tab,
            (Some(Frame::Run(_)), b"br" | b"cr") => Frame::Break,
            (Some(Frame::Run(_)), b"rPr") => Frame::RunProps,
            _ => Frame::Other,
        };
        self.stack.push(frame);
        frame
    }

    pub(crate) fn leave(&mut self) -> Option<Frame> {
        self.stack.pop()
    }

    pub(crate) fn in_text(&self) -> bool {
        self.stack.contains(&Frame::Text)
    }

    pub(crate) fn current_run(&self) -> Option<RunCoordinate> {
        self.stack.iter().rev().find_map(|frame| match frame {
            Frame::Run(coordinate) => Some(*coordinate),
            _ => None,
        })
    }
}
