//! Structural edits over the document list.
//!
//! # Responsibility
//! - Produce a new flat buffer for insert/append/replace/delete operations.
//! - Re-serialize with the canonical separator only.
//!
//! # Invariants
//! - Functions are pure: inputs are never modified, callers re-parse.
//! - Output never leaves two documents unseparated.
//! - Output never drops a non-blank document that was not targeted.

use crate::buffer::separator::CANONICAL_SEPARATOR;
use crate::model::document::LogicalDocument;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MutationResult<T> = Result<T, MutationError>;

/// Rejected structural edit. The buffer must be left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationError {
    /// Target index is stale relative to the documents passed in.
    IndexOutOfRange { index: usize, len: usize },
    /// Replacement would not split the target into two or more documents.
    NothingToSplit { chunks: usize },
}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "document index {index} out of range for {len} documents")
            }
            Self::NothingToSplit { chunks } => {
                write!(f, "replacement has {chunks} non-blank chunk(s); need at least 2")
            }
        }
    }
}

impl Error for MutationError {}

/// Appends an empty document slot at the end of the buffer.
///
/// Always appends, regardless of where the cursor is.
pub fn insert_separator(buffer: &str) -> String {
    format!("{buffer}{CANONICAL_SEPARATOR}")
}

/// Appends imported text as a new document.
///
/// An effectively empty buffer is replaced outright so no leading separator
/// is produced.
pub fn append_imported(buffer: &str, text: &str) -> String {
    if buffer.trim().is_empty() {
        text.to_string()
    } else {
        format!("{buffer}{CANONICAL_SEPARATOR}{text}")
    }
}

/// Replaces document `target` with the given chunks, in place.
///
/// Chunks are trimmed and blank chunks dropped before the split check.
pub fn replace_one<S: AsRef<str>>(
    documents: &[LogicalDocument],
    target: usize,
    replacements: &[S],
) -> MutationResult<String> {
    check_index(documents, target)?;

    let chunks = normalize_contents(replacements);
    if chunks.len() <= 1 {
        return Err(MutationError::NothingToSplit {
            chunks: chunks.len(),
        });
    }

    let mut out: Vec<&str> = Vec::with_capacity(documents.len() + chunks.len() - 1);
    out.extend(documents[..target].iter().map(|doc| doc.content.as_str()));
    out.extend(chunks.iter().copied());
    out.extend(documents[target + 1..].iter().map(|doc| doc.content.as_str()));
    Ok(join_documents(&out))
}

/// Rebuilds the buffer from a fresh ordered list of contents.
pub fn replace_all<S: AsRef<str>>(contents: &[S]) -> String {
    join_documents(&normalize_contents(contents))
}

/// Removes document `target`, keeping every other document and its order.
pub fn delete_one(documents: &[LogicalDocument], target: usize) -> MutationResult<String> {
    check_index(documents, target)?;

    let kept: Vec<&str> = documents
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != target)
        .map(|(_, doc)| doc.content.as_str())
        .collect();
    Ok(join_documents(&kept))
}

/// Joins contents with the canonical separator, as-is.
pub fn join_documents<S: AsRef<str>>(contents: &[S]) -> String {
    contents
        .iter()
        .map(|value| value.as_ref())
        .collect::<Vec<&str>>()
        .join(CANONICAL_SEPARATOR)
}

fn normalize_contents<S: AsRef<str>>(contents: &[S]) -> Vec<&str> {
    contents
        .iter()
        .map(|value| value.as_ref().trim())
        .filter(|value| !value.is_empty())
        .collect()
}

fn check_index(documents: &[LogicalDocument], target: usize) -> MutationResult<()> {
    if target >= documents.len() {
        return Err(MutationError::IndexOutOfRange {
            index: target,
            len: documents.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{append_imported, insert_separator, replace_all, replace_one, MutationError};
    use crate::buffer::separator::{parse, CANONICAL_SEPARATOR};

    #[test]
    fn insert_separator_always_appends() {
        assert_eq!(insert_separator("abc"), format!("abc{CANONICAL_SEPARATOR}"));
        assert_eq!(parse(&insert_separator("abc")).len(), 1);
    }

    #[test]
    fn append_into_blank_buffer_replaces_it() {
        assert_eq!(append_imported("  \n", "imported"), "imported");
        assert_eq!(
            append_imported("tail", "imported"),
            format!("tail{CANONICAL_SEPARATOR}imported")
        );
    }

    #[test]
    fn replace_one_requires_two_real_chunks() {
        let docs = parse("only");
        assert_eq!(
            replace_one(&docs, 0, &["one", "   "]).unwrap_err(),
            MutationError::NothingToSplit { chunks: 1 }
        );
        assert_eq!(
            replace_one(&docs, 3, &["a", "b"]).unwrap_err(),
            MutationError::IndexOutOfRange { index: 3, len: 1 }
        );
    }

    #[test]
    fn replace_all_drops_blanks_and_trims() {
        let buffer = replace_all(&["  a ", "", "\n", "b"]);
        assert_eq!(buffer, format!("a{CANONICAL_SEPARATOR}b"));
    }

    #[test]
    fn replace_all_of_nothing_is_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(replace_all(&empty), "");
    }
}
