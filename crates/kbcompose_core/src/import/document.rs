//! Text extraction from PDF and DOCX uploads.
//!
//! # Invariants
//! - Output is raw extracted text; callers run `clean_text` afterwards.
//! - A malformed file yields `ImportError::Extraction`, never a panic.

use crate::import::text::ImportError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::panic;

const DOCX_BODY_PART: &str = "word/document.xml";

/// Extracts text from a PDF. Pages are separated by a blank line.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ImportError> {
    let extracted = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| extraction_error(".pdf", "PDF parser aborted on malformed input"))?
        .map_err(|err| extraction_error(".pdf", err))?;
    Ok(extracted.replace('\u{c}', "\n\n"))
}

/// Extracts paragraph text from a DOCX, followed by table rows.
///
/// Table cells are joined with `" | "`, one row per block.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ImportError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|err| extraction_error(".docx", err))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|err| extraction_error(".docx", err))?
        .read_to_string(&mut xml)
        .map_err(|err| extraction_error(".docx", err))?;

    let body = docx_blocks(&xml).map_err(|err| extraction_error(".docx", err))?;
    Ok(body.join("\n\n"))
}

fn docx_blocks(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut rows = Vec::new();
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut cells: Vec<String> = Vec::new();
    let mut table_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"t" => in_text = true,
                b"tbl" => table_depth += 1,
                _ => {}
            },
            Event::Empty(tag) => match tag.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(text) if in_text => paragraph.push_str(&text.unescape()?),
            Event::End(tag) => match tag.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = paragraph.trim();
                    if table_depth == 0 {
                        if !text.is_empty() {
                            paragraphs.push(text.to_string());
                        }
                    } else if !text.is_empty() {
                        if !cell.is_empty() {
                            cell.push('\n');
                        }
                        cell.push_str(text);
                    }
                    paragraph.clear();
                }
                b"tc" => {
                    let text = cell.trim();
                    if !text.is_empty() {
                        cells.push(text.to_string());
                    }
                    cell.clear();
                }
                b"tr" => {
                    if !cells.is_empty() {
                        rows.push(cells.join(" | "));
                    }
                    cells.clear();
                }
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    paragraphs.extend(rows);
    Ok(paragraphs)
}

fn extraction_error(ext: &str, reason: impl ToString) -> ImportError {
    ImportError::Extraction {
        ext: ext.to_string(),
        reason: reason.to_string(),
    }
}
