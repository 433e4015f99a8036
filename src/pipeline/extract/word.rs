//! DOCX text: body paragraphs first, then table cells, each in document order.
//!
//! A `.docx` file is a zip container; the main story lives in
//! `word/document.xml` as WordprocessingML. Text runs are `<w:t>` elements
//! inside `<w:p>` paragraphs; tables are `<w:tbl>/<w:tr>/<w:tc>`, and each
//! cell holds its own paragraphs. Only top-level tables are read, which is
//! also what a cell's visible text amounts to in most documents.
//!
//! Text boxes (`w:txbxContent`) are anchored inside a run of the paragraph
//! that owns them. Their content is skipped so the surrounding paragraph
//! stays intact.

use super::TextExtractor;
use crate::document::DocumentKind;
use crate::error::ExtractError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";

/// Word documents via `zip` + `quick-xml`; no scratch file needed.
#[derive(Debug, Default)]
pub struct WordExtractor;

impl TextExtractor for WordExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Word
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError::Word(format!("not a DOCX container ({e})")))?;

        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| ExtractError::Word(format!("{DOCUMENT_PART}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| ExtractError::Word(format!("{DOCUMENT_PART}: {e}")))?;

        extract_docx_xml(&xml)
    }
}

/// Pull paragraph and table-cell text out of a `document.xml` body.
///
/// Non-empty body paragraphs come first, then non-empty top-level table
/// cells (row-major), all joined with newlines. A cell with several
/// paragraphs keeps them newline-separated.
pub fn extract_docx_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut cells: Vec<String> = Vec::new();

    let mut table_depth = 0usize;
    let mut text_box_depth = 0usize;
    let mut in_text = false;
    let mut paragraph = String::new();
    let mut cell: Option<Vec<String>> = None;

    loop {
        match reader
            .read_event()
            .map_err(|e| ExtractError::Word(format!("malformed XML: {e}")))?
        {
            Event::Start(e) if text_box_depth > 0 => {
                if e.name().as_ref() == b"w:txbxContent" {
                    text_box_depth += 1;
                }
            }
            Event::End(e) if text_box_depth > 0 => {
                if e.name().as_ref() == b"w:txbxContent" {
                    text_box_depth -= 1;
                }
            }
            Event::Empty(_) if text_box_depth > 0 => {}
            Event::Start(e) => match e.name().as_ref() {
                b"w:txbxContent" => text_box_depth += 1,
                b"w:tbl" => table_depth += 1,
                b"w:tc" if table_depth == 1 => cell = Some(Vec::new()),
                b"w:p" => paragraph.clear(),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => paragraph.push('\t'),
                b"w:br" | b"w:cr" => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::Word(format!("bad text run: {e}")))?;
                paragraph.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let text = std::mem::take(&mut paragraph);
                    match table_depth {
                        0 => paragraphs.push(text),
                        1 => {
                            if let Some(parts) = cell.as_mut() {
                                parts.push(text);
                            }
                        }
                        _ => {}
                    }
                }
                b"w:tc" if table_depth == 1 => {
                    if let Some(parts) = cell.take() {
                        cells.push(parts.join("\n"));
                    }
                }
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let text = paragraphs
        .into_iter()
        .chain(cells)
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(text)
}
