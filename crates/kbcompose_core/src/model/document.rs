//! Logical document model.
//!
//! # Responsibility
//! - Describe one trimmed, non-blank buffer segment with its offsets.
//! - Provide a stable content address (`DocKey`) for async result caches.
//!
//! # Invariants
//! - `content` equals the buffer slice `start_pos..end_pos` exactly.
//! - `segment_start <= start_pos <= end_pos <= segment_end`.
//! - Equal content always yields an equal `DocKey`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};
use std::ops::Range;

/// Content address of a logical document.
///
/// Lowercase hex SHA-256 of the trimmed content. Keys survive reordering,
/// insertion and deletion of other documents, unlike positional indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocKey(String);

impl DocKey {
    /// Computes the key for already-trimmed content.
    pub fn of(content: &str) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Short prefix used in log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl Display for DocKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One logical document derived from the flat buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalDocument {
    /// Dense 0-based position among non-blank segments.
    pub index: usize,
    /// Trimmed segment text.
    pub content: String,
    /// Byte offset of `content` in the buffer.
    pub start_pos: usize,
    /// Byte offset one past the end of `content`.
    pub end_pos: usize,
    /// Byte offset of the untrimmed segment.
    pub segment_start: usize,
    /// Byte offset one past the end of the untrimmed segment.
    pub segment_end: usize,
    /// Character count of `content`.
    pub char_count: usize,
    /// Bounded summary for the document list.
    pub preview: String,
    /// Content address used by result caches.
    pub key: DocKey,
}

impl LogicalDocument {
    /// Byte range of the trimmed content.
    pub fn range(&self) -> Range<usize> {
        self.start_pos..self.end_pos
    }
}
