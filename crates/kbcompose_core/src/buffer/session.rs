//! Single-owner editing session over the flat buffer.
//!
//! # Responsibility
//! - Own the buffer, cursor and selection.
//! - Re-derive the one canonical parse after every change.
//! - Apply structural edits as no-ops when their parameters are stale.
//!
//! # Invariants
//! - `documents()` always equals `parse_with(buffer(), options)`.
//! - Cursor and selection always lie within the buffer on char boundaries.
//! - A rejected mutation leaves buffer, cursor and documents untouched.

use crate::buffer::mutation::{self, MutationResult};
use crate::buffer::offset::{clamp_to_buffer, document_at, range_for, OffsetError};
use crate::buffer::separator::{parse_with, separator_spans, ParseOptions};
use crate::config::ComposerConfig;
use crate::model::document::{DocKey, LogicalDocument};
use log::{debug, warn};
use std::ops::Range;
use uuid::Uuid;

/// Editing view state for one composition buffer.
#[derive(Debug, Clone)]
pub struct ComposerSession {
    id: Uuid,
    options: ParseOptions,
    buffer: String,
    documents: Vec<LogicalDocument>,
    cursor: usize,
    selection: Option<Range<usize>>,
}

impl Default for ComposerSession {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

impl ComposerSession {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            options,
            buffer: String::new(),
            documents: Vec::new(),
            cursor: 0,
            selection: None,
        }
    }

    pub fn from_config(config: &ComposerConfig) -> Self {
        Self::new(config.parse_options())
    }

    /// Creates a session seeded with existing text (imported file, draft).
    pub fn with_buffer(options: ParseOptions, buffer: impl Into<String>) -> Self {
        let mut session = Self::new(options);
        session.set_buffer(buffer);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn documents(&self) -> &[LogicalDocument] {
        &self.documents
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selection(&self) -> Option<Range<usize>> {
        self.selection.clone()
    }

    /// Ordered document contents, ready for bulk submission.
    pub fn contents(&self) -> Vec<String> {
        self.documents.iter().map(|doc| doc.content.clone()).collect()
    }

    /// Keystroke path: replaces the whole buffer and re-parses.
    pub fn set_buffer(&mut self, buffer: impl Into<String>) {
        self.buffer = buffer.into();
        self.reparse();
        self.cursor = clamp_to_buffer(self.cursor as i64, &self.buffer);
        self.selection = None;
    }

    /// Moves the cursor, clamped into the buffer. Clears the selection.
    pub fn set_cursor(&mut self, position: i64) -> usize {
        self.cursor = clamp_to_buffer(position, &self.buffer);
        self.selection = None;
        self.cursor
    }

    /// Index of the document under the cursor.
    pub fn document_at_cursor(&self) -> Option<usize> {
        document_at(self.cursor, &self.buffer)
    }

    /// Document under the cursor, resolved through the current parse.
    pub fn active_document(&self) -> Option<&LogicalDocument> {
        self.document_at_cursor()
            .and_then(|index| self.documents.get(index))
    }

    /// Finds the current index of a document by content key.
    pub fn index_of(&self, key: &DocKey) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| &doc.key == key)
    }

    /// Selects document `index` and returns the clamped scroll target.
    ///
    /// `scroll_lead` is how far before the document start the view should
    /// begin; the result is clamped to `[0, buffer length]`.
    pub fn select_document(&mut self, index: usize, scroll_lead: usize) -> Result<usize, OffsetError> {
        let range = range_for(index, &self.documents)?;
        self.cursor = range.start;
        let lead_start = range.start.saturating_sub(scroll_lead);
        let scroll = clamp_to_buffer(i64::try_from(lead_start).unwrap_or(i64::MAX), &self.buffer);
        self.selection = Some(range);
        Ok(scroll)
    }

    /// Byte ranges of separator tokens for highlight overlays.
    pub fn separator_spans(&self) -> Vec<Range<usize>> {
        separator_spans(&self.buffer)
    }

    pub fn insert_separator(&mut self) {
        let next = mutation::insert_separator(&self.buffer);
        self.commit("insert_separator", next);
    }

    pub fn append_imported(&mut self, text: &str) {
        let next = mutation::append_imported(&self.buffer, text);
        self.commit("append_imported", next);
    }

    /// Deletes one document. Returns `false` when the index is stale.
    pub fn delete_document(&mut self, index: usize) -> bool {
        let result = mutation::delete_one(&self.documents, index);
        self.apply("delete_one", result)
    }

    /// Splits one document into chunks. Returns `false` on a no-op.
    pub fn replace_document<S: AsRef<str>>(&mut self, index: usize, chunks: &[S]) -> bool {
        let result = mutation::replace_one(&self.documents, index, chunks);
        self.apply("replace_one", result)
    }

    pub fn replace_all<S: AsRef<str>>(&mut self, contents: &[S]) {
        let next = mutation::replace_all(contents);
        self.commit("replace_all", next);
    }

    fn apply(&mut self, op: &str, result: MutationResult<String>) -> bool {
        match result {
            Ok(next) => {
                self.commit(op, next);
                true
            }
            Err(err) => {
                warn!(
                    "event=buffer_mutation module=buffer status=skipped session={} op={} documents={} reason={}",
                    self.id,
                    op,
                    self.documents.len(),
                    err
                );
                false
            }
        }
    }

    fn commit(&mut self, op: &str, next: String) {
        let before = self.documents.len();
        self.buffer = next;
        self.reparse();
        self.cursor = clamp_to_buffer(self.cursor as i64, &self.buffer);
        self.selection = None;
        debug!(
            "event=buffer_mutation module=buffer status=ok session={} op={} documents_before={} documents_after={} bytes={}",
            self.id,
            op,
            before,
            self.documents.len(),
            self.buffer.len()
        );
    }

    fn reparse(&mut self) {
        self.documents = parse_with(&self.buffer, self.options);
    }
}

#[cfg(test)]
mod tests {
    use super::ComposerSession;
    use crate::buffer::separator::{ParseOptions, SEPARATOR};

    fn session(buffer: &str) -> ComposerSession {
        ComposerSession::with_buffer(ParseOptions::default(), buffer)
    }

    #[test]
    fn stale_delete_is_a_noop() {
        let mut s = session(&format!("a{SEPARATOR}b"));
        let before = s.buffer().to_string();
        assert!(!s.delete_document(5));
        assert_eq!(s.buffer(), before);
        assert_eq!(s.documents().len(), 2);
    }

    #[test]
    fn select_document_sets_selection_and_clamps_scroll() {
        let mut s = session(&format!("first{SEPARATOR}  second"));
        let scroll = s.select_document(1, 100).expect("index 1 exists");
        assert_eq!(scroll, 0);
        assert_eq!(s.cursor(), 15);
        let selection = s.selection().expect("selection set");
        assert_eq!(&s.buffer()[selection], "second");
        assert_eq!(s.document_at_cursor(), Some(1));
    }

    #[test]
    fn huge_scroll_lead_clamps_to_buffer_start() {
        let mut s = session(&format!("first{SEPARATOR}second"));
        assert_eq!(s.select_document(1, usize::MAX).expect("index 1 exists"), 0);
        assert_eq!(s.select_document(1, 3).expect("index 1 exists"), 10);
    }

    #[test]
    fn cursor_is_clamped_after_shrinking_edit() {
        let mut s = session(&format!("keep{SEPARATOR}a much longer document"));
        s.set_cursor(i64::MAX);
        assert!(s.delete_document(1));
        assert_eq!(s.cursor(), s.buffer().len());
        assert_eq!(s.contents(), vec!["keep".to_string()]);
    }

    #[test]
    fn documents_track_every_edit() {
        let mut s = ComposerSession::default();
        s.append_imported("one");
        s.insert_separator();
        s.set_buffer(format!("{}two", s.buffer()));
        assert_eq!(s.contents(), vec!["one".to_string(), "two".to_string()]);
        assert_eq!(s.separator_spans().len(), 1);
    }
}
