use docgen_model::{Document, Paragraph, ParagraphCoordinate, Row, Run, RunFormat, Table};
use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};

use crate::error::{DocxError, Result};
use crate::frames::{Frame, FrameTracker};

/// Parses a WordprocessingML main document part into the document model.
pub fn parse_document_xml(xml: &[u8]) -> Result<Document> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut builder = Builder::default();
    loop {
        match reader.read_event()? {
            Event::Start(start) => builder.enter(&start),
            Event::Empty(start) => {
                builder.enter(&start);
                builder.leave();
            }
            Event::End(_) => builder.leave(),
            Event::Text(text) if builder.tracker.in_text() => {
                let decoded = text.decode().map_err(|e| DocxError::Xml(e.into()))?;
                builder.push_text(&decoded);
            }
            Event::CData(data) if builder.tracker.in_text() => {
                let decoded = data.decode().map_err(|e| DocxError::Xml(e.into()))?;
                builder.push_text(&decoded);
            }
            Event::GeneralRef(reference) if builder.tracker.in_text() => {
                builder.push_text(&resolve_reference(&reference)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(builder.document)
}

pub(crate) fn resolve_reference(reference: &BytesRef<'_>) -> Result<String> {
    if let Some(ch) = reference.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name = reference.decode().map_err(|e| DocxError::Xml(e.into()))?;
    Ok(resolve_xml_entity(&name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("&{name};")))
}

#[derive(Default)]
struct Builder {
    tracker: FrameTracker,
    document: Document,
}

impl Builder {
    fn enter(&mut self, start: &BytesStart<'_>) {
        let parent = self.tracker.top();
        let frame = self.tracker.enter(start.local_name().as_ref());
        match frame {
            Frame::Table { .. } => self.document.tables.push(Table::default()),
            Frame::Row { table, .. } => {
                if let Some(table) = self.document.tables.get_mut(table) {
                    table.rows.push(Row::default());
                }
            }
            Frame::Cell { table, row, .. } => {
                if let Some(row) = self
                    .document
                    .tables
                    .get_mut(table)
                    .and_then(|table| table.rows.get_mut(row))
                {
                    row.cells.push(docgen_model::Cell::default());
                }
            }
            Frame::Paragraph(coordinate) => self.push_paragraph(coordinate),
            Frame::Run(coordinate) => {
                if let Some(paragraph) = self.document.paragraph_mut(coordinate.paragraph) {
                    paragraph.runs.push(Run::default());
                }
            }
            Frame::Tab => self.push_text("\t"),
            Frame::Break => self.push_text("\n"),
            _ => {}
        }
        if parent == Some(Frame::RunProps) {
            self.apply_format(start);
        }
    }

    fn leave(&mut self) {
        self.tracker.leave();
    }

    fn push_paragraph(&mut self, coordinate: ParagraphCoordinate) {
        match coordinate {
            ParagraphCoordinate::Body { .. } => self.document.paragraphs.push(Paragraph::default()),
            ParagraphCoordinate::Table {
                table, row, cell, ..
            } => {
                if let Some(cell) = self
                    .document
                    .tables
                    .get_mut(table)
                    .and_then(|table| table.rows.get_mut(row))
                    .and_then(|row| row.cells.get_mut(cell))
                {
                    cell.paragraphs.push(Paragraph::default());
                }
            }
        }
    }

    fn current_run(&mut self) -> Option<&mut Run> {
        let coordinate = self.tracker.current_run()?;
        self.document.run_mut(&coordinate)
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.current_run() {
            run.text.push_str(text);
        }
    }

    fn apply_format(&mut self, start: &BytesStart<'_>) {
        let name = start.local_name().as_ref().to_vec();
        let value = attribute_value(start, b"val");
        let Some(run) = self.current_run() else {
            return;
        };
        let format: &mut RunFormat = &mut run.format;
        match name.as_slice() {
            b"b" => format.bold = is_on(value.as_deref()),
            b"i" => format.italic = is_on(value.as_deref()),
            b"u" => format.underline = !matches!(value.as_deref(), Some("none")),
            b"sz" => format.size = value.and_then(|v| v.parse().ok()),
            b"color" => format.color = value,
            b"rFonts" => format.font = attribute_value(start, b"ascii"),
            _ => {}
        }
    }
}

fn is_on(value: Option<&str>) -> bool {
    !matches!(value, Some("0" | "false" | "off"))
}

fn attribute_value(start: &BytesStart<'_>, local_name: &[u8]) -> Option<String> {
    start
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == local_name)
        .and_then(|attr| String::from_utf8(attr.value.into_owned()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p>
      <w:r><w:rPr><w:b/><w:sz w:val="24"/></w:rPr><w:t xml:space="preserve">Dear </w:t></w:r>
      <w:r><w:rPr><w:i/><w:rFonts w:ascii="Arial"/><w:color w:val="FF0000"/></w:rPr><w:t>&amp;=Contact.Name</w:t></w:r>
    </w:p>
    <w:p/>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:t>{TABLE Group=Items}</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>A</w:t><w:tab/><w:t>B</w:t><w:br w:type="page"/></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
  </w:body>
</w:document>"#;

    #[test]
    fn reads_paragraphs_runs_and_tables() {
        let document = parse_document_xml(XML.as_bytes()).expect("parse");
        assert_eq!(document.paragraphs.len(), 2);
        assert_eq!(document.paragraphs[0].text(), "Dear &=Contact.Name");
        assert!(document.paragraphs[1].runs.is_empty());
        let cells = &document.tables[0].rows[0].cells;
        assert_eq!(cells[0].paragraphs[0].text(), "{TABLE Group=Items}");
        assert_eq!(cells[1].paragraphs[0].runs[0].text, "A\tB\n");
    }

    #[test]
    fn reads_run_formatting() {
        let document = parse_document_xml(XML.as_bytes()).expect("parse");
        let first = &document.paragraphs[0].runs[0].format;
        assert!(first.bold);
        assert_eq!(first.size, Some(24));
        let second = &document.paragraphs[0].runs[1].format;
        assert!(second.italic);
        assert!(!second.bold);
        assert_eq!(second.font.as_deref(), Some("Arial"));
        assert_eq!(second.color.as_deref(), Some("FF0000"));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_document_xml(b"<w:document><w:body></w:document>").is_err());
    }
}
