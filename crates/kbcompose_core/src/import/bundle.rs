//! Group bundle: the JSON export/import format of a document group.
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "groupName": "Research",
//!   "exportedAt": "2026-03-01T12:30:00.000Z",
//!   "includesVectors": false,
//!   "documents": [{ "content": "...", "metadata": {} }]
//! }
//! ```

use crate::buffer::mutation::join_documents;
use crate::buffer::separator::contents;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const BUNDLE_VERSION: &str = "1.0";
pub const DEFAULT_GROUP_NAME: &str = "Imported Group";

#[derive(Debug)]
pub enum BundleError {
    Json(serde_json::Error),
    UnsupportedVersion(String),
    NoDocuments,
}

impl Display for BundleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid bundle json: {err}"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported bundle version `{version}`; expected {BUNDLE_VERSION}")
            }
            Self::NoDocuments => write!(f, "bundle contains no documents"),
        }
    }
}

impl Error for BundleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BundleError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBundle {
    pub version: String,
    #[serde(default = "default_group_name")]
    pub group_name: String,
    #[serde(default)]
    pub exported_at: String,
    #[serde(default)]
    pub includes_vectors: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_dimension: Option<u32>,
    #[serde(default)]
    pub documents: Vec<BundleDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDocument {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl BundleDocument {
    /// Metadata as strings; non-string values keep their JSON text.
    pub fn string_metadata(&self) -> BTreeMap<String, String> {
        self.metadata
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

fn default_group_name() -> String {
    DEFAULT_GROUP_NAME.to_string()
}

impl GroupBundle {
    /// Empty bundle stamped with `exported_at`.
    pub fn new(group_name: impl Into<String>, exported_at: DateTime<Utc>) -> Self {
        Self {
            version: BUNDLE_VERSION.to_string(),
            group_name: group_name.into(),
            exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            includes_vectors: false,
            embedding_model: None,
            vector_dimension: None,
            documents: Vec::new(),
        }
    }

    /// One bundle document per logical document of `buffer`.
    pub fn from_buffer(
        group_name: impl Into<String>,
        buffer: &str,
        exported_at: DateTime<Utc>,
    ) -> Self {
        let mut bundle = Self::new(group_name, exported_at);
        bundle.documents = contents(buffer)
            .into_iter()
            .map(|content| BundleDocument {
                content,
                ..BundleDocument::default()
            })
            .collect();
        bundle
    }

    /// Rebuilds a canonical buffer from the non-blank documents.
    pub fn to_buffer(&self) -> String {
        let contents = self
            .documents
            .iter()
            .map(|doc| doc.content.trim())
            .filter(|content| !content.is_empty())
            .collect::<Vec<_>>();
        join_documents(&contents)
    }

    pub fn from_json(value: &str) -> Result<Self, BundleError> {
        let bundle: Self = serde_json::from_str(value)?;
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn to_json_pretty(&self) -> Result<String, BundleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), BundleError> {
        if self.version != BUNDLE_VERSION {
            return Err(BundleError::UnsupportedVersion(self.version.clone()));
        }
        if self.documents.is_empty() {
            return Err(BundleError::NoDocuments);
        }
        Ok(())
    }
}
