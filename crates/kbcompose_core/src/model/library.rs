//! Document library records.
//!
//! These mirror the backend CRUD boundary: a group owns an ordered list of
//! documents, each with free-form string metadata and an optional embedding
//! received from elsewhere.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable numeric id assigned by the library store.
pub type GroupId = i64;
/// Stable numeric id assigned by the library store.
pub type DocumentId = i64;

/// Destination group for composed documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentGroup {
    pub id: GroupId,
    pub name: String,
    pub document_count: u32,
}

/// Create/update payload for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDocument {
    /// Already split and trimmed content.
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    /// Only set when importing vectors verbatim from a bundle.
    pub embedding: Option<Vec<f32>>,
}

impl NewDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Persisted document row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub group_id: Option<GroupId>,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub embedding: Option<Vec<f32>>,
    /// Epoch milliseconds.
    pub updated_at: i64,
}
