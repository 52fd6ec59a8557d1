//! Flat buffer codec for multi-document composition.
//!
//! # Responsibility
//! - Split one flat buffer into ordered logical documents.
//! - Own the single segment walk shared by parsing and cursor lookup.
//!
//! # Invariants
//! - The separator is matched as a literal substring, never as a pattern.
//! - `&buffer[doc.start_pos..doc.end_pos] == doc.content` for every document.
//! - Document indices are dense `0..N-1` over non-blank segments only.
//! - Blank segments consume their length plus one separator width.

use crate::buffer::preview::{preview_with, PREVIEW_LIMIT, PREVIEW_MIN_BREAK};
use crate::model::document::{DocKey, LogicalDocument};
use std::ops::ControlFlow;

/// Literal token delimiting logical documents (eight ASCII dashes).
pub const SEPARATOR: &str = "--------";

/// Separator used whenever the core re-serializes a document list.
pub const CANONICAL_SEPARATOR: &str = "\n\n--------\n\n";

/// One raw split result observed by [`walk_segments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Untrimmed segment text.
    pub raw: &'a str,
    /// Byte offset of `raw` in the buffer.
    pub start: usize,
    /// Trimmed segment text; empty for blank segments.
    pub content: &'a str,
    /// Byte offset of `content` in the buffer.
    pub content_start: usize,
    /// Would-be document index, `None` for blank segments.
    pub index: Option<usize>,
}

impl Segment<'_> {
    /// End offset (exclusive) of the raw segment.
    pub fn end(&self) -> usize {
        self.start + self.raw.len()
    }

    /// End offset (exclusive) of the trimmed content.
    pub fn content_end(&self) -> usize {
        self.content_start + self.content.len()
    }

    pub fn is_blank(&self) -> bool {
        self.index.is_none()
    }
}

/// Walks the buffer segment by segment, blank ones included.
///
/// The visitor may stop the walk early by returning `ControlFlow::Break`.
/// Parsing and offset lookup both go through this routine so they can never
/// disagree about where a document starts.
pub fn walk_segments<'a, F>(buffer: &'a str, mut visit: F)
where
    F: FnMut(Segment<'a>) -> ControlFlow<()>,
{
    let mut cursor = 0usize;
    let mut next_index = 0usize;
    let mut raw_segments = buffer.split(SEPARATOR).peekable();

    while let Some(raw) = raw_segments.next() {
        let separator_width = if raw_segments.peek().is_some() {
            SEPARATOR.len()
        } else {
            0
        };

        let content = raw.trim();
        let segment = if content.is_empty() {
            Segment {
                raw,
                start: cursor,
                content,
                content_start: cursor,
                index: None,
            }
        } else {
            let leading = raw.len() - raw.trim_start().len();
            let index = next_index;
            next_index += 1;
            Segment {
                raw,
                start: cursor,
                content,
                content_start: cursor + leading,
                index: Some(index),
            }
        };

        if visit(segment).is_break() {
            return;
        }
        cursor += raw.len() + separator_width;
    }
}

/// Preview bounds applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub preview_limit: usize,
    pub preview_min_break: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            preview_limit: PREVIEW_LIMIT,
            preview_min_break: PREVIEW_MIN_BREAK,
        }
    }
}

/// Parses the buffer into its ordered logical documents.
///
/// Never fails: blank or separator-only buffers yield an empty list.
pub fn parse(buffer: &str) -> Vec<LogicalDocument> {
    parse_with(buffer, ParseOptions::default())
}

/// Same as [`parse`] with caller-provided preview bounds.
pub fn parse_with(buffer: &str, options: ParseOptions) -> Vec<LogicalDocument> {
    let mut documents = Vec::new();
    walk_segments(buffer, |segment| {
        if let Some(index) = segment.index {
            documents.push(LogicalDocument {
                index,
                content: segment.content.to_string(),
                start_pos: segment.content_start,
                end_pos: segment.content_end(),
                segment_start: segment.start,
                segment_end: segment.end(),
                char_count: segment.content.chars().count(),
                preview: preview_with(
                    segment.content,
                    options.preview_limit,
                    options.preview_min_break,
                ),
                key: DocKey::of(segment.content),
            });
        }
        ControlFlow::Continue(())
    });
    documents
}

/// Returns document contents in order, without offsets or previews.
pub fn contents(buffer: &str) -> Vec<String> {
    let mut out = Vec::new();
    walk_segments(buffer, |segment| {
        if !segment.is_blank() {
            out.push(segment.content.to_string());
        }
        ControlFlow::Continue(())
    });
    out
}

/// Byte ranges of every separator occurrence, in order.
///
/// Used by highlight overlays; shares the walk so separator spans always sit
/// exactly between the segments [`parse`] sees.
pub fn separator_spans(buffer: &str) -> Vec<std::ops::Range<usize>> {
    let mut spans = Vec::new();
    walk_segments(buffer, |segment| {
        let end = segment.end();
        if end < buffer.len() {
            spans.push(end..end + SEPARATOR.len());
        }
        ControlFlow::Continue(())
    });
    spans
}
