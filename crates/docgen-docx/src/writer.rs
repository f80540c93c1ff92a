use std::collections::{BTreeMap, VecDeque};

use docgen_model::{Document, RunCoordinate};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{DocxError, Result};
use crate::frames::{Frame, FrameTracker};
use crate::reader::parse_document_xml;

/// Re-serializes `xml` with the run texts of `updated`.
///
/// Runs whose text is unchanged are copied verbatim. A changed run gets its
/// new text written where its first `t`, `tab` or `br` element stood: text
/// segments become `t` elements, and `\t` / `\n` reuse the run's own tab and
/// break elements in their original order. Its `rPr` and any other children
/// stay as they were.
pub fn rewrite_document_xml(xml: &[u8], updated: &Document) -> Result<Vec<u8>> {
    let original = parse_document_xml(xml)?;
    let mut separators = run_separators(xml)?;
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut tracker = FrameTracker::default();
    let mut active: Option<Replacement> = None;
    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(start) => {
                let suppressed = tracker.in_text() && active.is_some();
                match tracker.enter(start.local_name().as_ref()) {
                    Frame::Run(coordinate) => {
                        active = replacement_for(coordinate, start, &original, updated)?.map(
                            |replacement| {
                                replacement.with_separators(separators.remove(&coordinate))
                            },
                        );
                    }
                    frame @ (Frame::Text | Frame::Tab | Frame::Break) => {
                        if let Some(replacement) = active.as_mut() {
                            replacement.write_text(&mut writer, text_template(frame, start))?;
                            continue;
                        }
                    }
                    _ => {}
                }
                if suppressed {
                    continue;
                }
            }
            Event::Empty(start) => {
                let suppressed = tracker.in_text() && active.is_some();
                let frame = tracker.enter(start.local_name().as_ref());
                tracker.leave();
                match frame {
                    Frame::Run(coordinate) => {
                        if let Some(mut replacement) =
                            replacement_for(coordinate, start, &original, updated)?
                        {
                            writer
                                .write_event(Event::Start(start.borrow()))
                                .map_err(DocxError::XmlWrite)?;
                            replacement.write_text(&mut writer, None)?;
                            writer
                                .write_event(Event::End(start.to_end()))
                                .map_err(DocxError::XmlWrite)?;
                            continue;
                        }
                    }
                    Frame::Text | Frame::Tab | Frame::Break => {
                        if let Some(replacement) = active.as_mut() {
                            replacement.write_text(&mut writer, text_template(frame, start))?;
                            continue;
                        }
                    }
                    _ => {}
                }
                if suppressed {
                    continue;
                }
            }
            Event::End(_) => match tracker.leave() {
                Some(Frame::Text | Frame::Tab | Frame::Break) if active.is_some() => continue,
                Some(Frame::Run(_)) => finish_run(&mut writer, &mut active)?,
                _ if tracker.in_text() && active.is_some() => continue,
                _ => {}
            },
            Event::Text(_) | Event::CData(_) | Event::GeneralRef(_)
                if tracker.in_text() && active.is_some() =>
            {
                continue;
            }
            Event::Eof => break,
            _ => {}
        }
        writer.write_event(event).map_err(DocxError::XmlWrite)?;
    }
    Ok(writer.into_inner())
}

/// Only a `t` element lends its qualified name to the new text elements.
fn text_template<'a, 'b>(frame: Frame, start: &'a BytesStart<'b>) -> Option<&'a BytesStart<'b>> {
    (frame == Frame::Text).then_some(start)
}

/// A `tab`, `br` or `cr` element of a run, kept with its attributes.
struct Separator {
    character: char,
    element: BytesStart<'static>,
}

/// Tab and break elements of every run, in document order.
fn run_separators(xml: &[u8]) -> Result<BTreeMap<RunCoordinate, VecDeque<Separator>>> {
    let mut reader = Reader::from_reader(xml);
    let mut tracker = FrameTracker::default();
    let mut separators: BTreeMap<RunCoordinate, VecDeque<Separator>> = BTreeMap::new();
    loop {
        let (start, empty) = match reader.read_event()? {
            Event::Start(start) => (start, false),
            Event::Empty(start) => (start, true),
            Event::End(_) => {
                tracker.leave();
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };
        let character = match tracker.enter(start.local_name().as_ref()) {
            Frame::Tab => Some('\t'),
            Frame::Break => Some('\n'),
            _ => None,
        };
        if let (Some(character), Some(run)) = (character, tracker.current_run()) {
            separators.entry(run).or_default().push_back(Separator {
                character,
                element: start.into_owned(),
            });
        }
        if empty {
            tracker.leave();
        }
    }
    Ok(separators)
}

/// Pending text for a run being rewritten.
struct Replacement {
    text: String,
    prefix: Option<String>,
    separators: VecDeque<Separator>,
    written: bool,
}

impl Replacement {
    fn with_separators(mut self, separators: Option<VecDeque<Separator>>) -> Self {
        self.separators = separators.unwrap_or_default();
        self
    }

    fn qualified(&self, local_name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{local_name}"),
            None => local_name.to_string(),
        }
    }

    /// Writes the new text once, naming `t` elements after `template` when
    /// given.
    fn write_text(
        &mut self,
        writer: &mut Writer<Vec<u8>>,
        template: Option<&BytesStart<'_>>,
    ) -> Result<()> {
        if self.written {
            return Ok(());
        }
        self.written = true;
        let text_name = match template {
            Some(start) => String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            None => self.qualified("t"),
        };
        let text = std::mem::take(&mut self.text);
        let mut segment_start = 0;
        for (index, character) in text.char_indices() {
            if character != '\t' && character != '\n' {
                continue;
            }
            write_text_element(writer, &text_name, &text[segment_start..index])?;
            let element = self.separator_element(character);
            writer
                .write_event(Event::Empty(element))
                .map_err(DocxError::XmlWrite)?;
            segment_start = index + character.len_utf8();
        }
        write_text_element(writer, &text_name, &text[segment_start..])
    }

    /// The run's next original separator for `character`, or a fresh one.
    fn separator_element(&mut self, character: char) -> BytesStart<'static> {
        if let Some(position) = self
            .separators
            .iter()
            .position(|separator| separator.character == character)
            && let Some(separator) = self.separators.remove(position)
        {
            return separator.element;
        }
        let local_name = if character == '\t' { "tab" } else { "br" };
        BytesStart::new(self.qualified(local_name))
    }
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let mut start = BytesStart::new(name);
    start.push_attribute(("xml:space", "preserve"));
    writer
        .write_event(Event::Start(start))
        .map_err(DocxError::XmlWrite)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(DocxError::XmlWrite)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(DocxError::XmlWrite)
}

fn replacement_for(
    coordinate: RunCoordinate,
    start: &BytesStart<'_>,
    original: &Document,
    updated: &Document,
) -> Result<Option<Replacement>> {
    let new_run = updated
        .run(&coordinate)
        .ok_or(DocxError::StructureChanged(coordinate))?;
    let unchanged = original
        .run(&coordinate)
        .is_some_and(|run| run.text == new_run.text);
    if unchanged {
        return Ok(None);
    }
    let qualified = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let prefix = qualified.split_once(':').map(|(prefix, _)| prefix.to_string());
    Ok(Some(Replacement {
        text: new_run.text.clone(),
        prefix,
        separators: VecDeque::new(),
        written: false,
    }))
}

/// Emits text for a changed run that had no `t`, `tab` or `br` element,
/// then clears it. Called before the run's closing tag is written.
fn finish_run(writer: &mut Writer<Vec<u8>>, active: &mut Option<Replacement>) -> Result<()> {
    if let Some(mut replacement) = active.take() {
        replacement.write_text(writer, None)?;
    }
    Ok(())
}
