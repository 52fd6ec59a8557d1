//! Cursor-to-document and document-to-range mapping.
//!
//! # Responsibility
//! - Resolve a cursor byte offset to the owning document index.
//! - Resolve a document index to its buffer range.
//!
//! # Invariants
//! - Uses the same segment walk as `separator::parse`; the two never disagree.
//! - Segment bounds are inclusive at both ends for cursor lookup.
//! - Never scrolls or moves anything; offset math only.

use crate::buffer::separator::walk_segments;
use crate::model::document::LogicalDocument;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::{ControlFlow, Range};

/// Offset lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetError {
    /// Index is stale relative to the current parse.
    OutOfRange { index: usize, len: usize },
}

impl Display for OffsetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { index, len } => {
                write!(f, "document index {index} out of range for {len} documents")
            }
        }
    }
}

impl Error for OffsetError {}

/// Returns the index of the document whose segment contains `cursor_pos`.
///
/// The raw (untrimmed) segment is used, so a cursor resting in the padding
/// around a document still selects it. Cursors inside a separator or a blank
/// segment map to `None`.
pub fn document_at(cursor_pos: usize, buffer: &str) -> Option<usize> {
    let mut found = None;
    walk_segments(buffer, |segment| {
        if segment.start > cursor_pos {
            return ControlFlow::Break(());
        }
        if let Some(index) = segment.index {
            if cursor_pos <= segment.end() {
                found = Some(index);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    });
    found
}

/// Returns the trimmed content range of document `index`.
pub fn range_for(index: usize, documents: &[LogicalDocument]) -> Result<Range<usize>, OffsetError> {
    documents
        .get(index)
        .map(LogicalDocument::range)
        .ok_or(OffsetError::OutOfRange {
            index,
            len: documents.len(),
        })
}

/// Clamps a derived offset (scroll target, shifted cursor) into the buffer.
///
/// The result always lands on a char boundary, moving left if needed.
pub fn clamp_to_buffer(offset: i64, buffer: &str) -> usize {
    let mut clamped = usize::try_from(offset.max(0))
        .unwrap_or(usize::MAX)
        .min(buffer.len());
    while !buffer.is_char_boundary(clamped) {
        clamped -= 1;
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::{clamp_to_buffer, document_at, range_for, OffsetError};
    use crate::buffer::separator::{parse, SEPARATOR};

    #[test]
    fn boundary_positions_resolve_to_adjacent_document() {
        let buffer = format!("abc{SEPARATOR}def");
        assert_eq!(document_at(0, &buffer), Some(0));
        assert_eq!(document_at(3, &buffer), Some(0));
        assert_eq!(document_at(4, &buffer), None);
        assert_eq!(document_at(11, &buffer), Some(1));
        assert_eq!(document_at(14, &buffer), Some(1));
    }

    #[test]
    fn cursor_past_end_is_none() {
        assert_eq!(document_at(99, "abc"), None);
    }

    #[test]
    fn blank_segment_is_not_a_document() {
        let buffer = format!("a{SEPARATOR}   {SEPARATOR}b");
        assert_eq!(document_at(10, &buffer), None);
        assert_eq!(document_at(buffer.len(), &buffer), Some(1));
    }

    #[test]
    fn range_for_rejects_stale_index() {
        let docs = parse(&format!("a{SEPARATOR}b"));
        assert_eq!(range_for(1, &docs).unwrap(), 9..10);
        assert_eq!(
            range_for(2, &docs).unwrap_err(),
            OffsetError::OutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn clamp_handles_negative_overflow_and_char_boundaries() {
        assert_eq!(clamp_to_buffer(-5, "abc"), 0);
        assert_eq!(clamp_to_buffer(50, "abc"), 3);
        assert_eq!(clamp_to_buffer(2, "é!"), 2);
        assert_eq!(clamp_to_buffer(1, "é!"), 0);
    }
}
