//! Document library use-cases.
//!
//! # Responsibility
//! - Commit a composed buffer to a group, one stored document per logical
//!   document.
//! - Load a group back into a buffer.
//! - Export groups as bundles and import bundles into new groups.
//!
//! # Invariants
//! - Committed documents are exactly the trimmed, non-blank contents of the
//!   buffer, in order.
//! - Imports never merge into an existing group; name clashes get a
//!   ` (n)` suffix.

use crate::buffer::mutation::join_documents;
use crate::buffer::separator::contents;
use crate::import::bundle::{BundleDocument, BundleError, GroupBundle};
use crate::model::library::{DocumentGroup, DocumentId, GroupId, NewDocument};
use crate::repo::document_repo::{DocumentRepository, RepoError};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Highest ` (n)` suffix tried before giving up on a group name.
pub const MAX_NAME_SUFFIX: u32 = 1000;

#[derive(Debug)]
pub enum LibraryError {
    GroupNotFound(GroupId),
    /// Buffer has no non-blank document to commit.
    EmptyBuffer,
    /// Every ` (n)` suffix up to [`MAX_NAME_SUFFIX`] is taken.
    NameExhausted(String),
    Bundle(BundleError),
    Repo(RepoError),
}

impl Display for LibraryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::EmptyBuffer => write!(f, "buffer contains no documents"),
            Self::NameExhausted(name) => write!(f, "too many groups named like `{name}`"),
            Self::Bundle(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LibraryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Bundle(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LibraryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::GroupNotFound(id) => Self::GroupNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<BundleError> for LibraryError {
    fn from(value: BundleError) -> Self {
        Self::Bundle(value)
    }
}

/// Outcome of [`LibraryService::import_bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Newly created group, with its final document count.
    pub group: DocumentGroup,
    pub imported: usize,
    /// Blank or rejected documents.
    pub failed: usize,
    pub total: usize,
}

/// Library facade over a repository implementation.
pub struct LibraryService<R: DocumentRepository> {
    repo: R,
}

impl<R: DocumentRepository> LibraryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns the group named `name`, creating it when missing.
    pub fn ensure_group(&self, name: &str) -> Result<DocumentGroup, LibraryError> {
        match self.repo.find_group_by_name(name)? {
            Some(group) => Ok(group),
            None => Ok(self.repo.create_group(name)?),
        }
    }

    /// Stores every logical document of `buffer` under `group_id`.
    pub fn bulk_add(
        &self,
        buffer: &str,
        group_id: Option<GroupId>,
    ) -> Result<Vec<DocumentId>, LibraryError> {
        let documents = contents(buffer);
        if documents.is_empty() {
            return Err(LibraryError::EmptyBuffer);
        }

        let ids = documents
            .into_iter()
            .map(|content| self.repo.create_document(group_id, &NewDocument::new(content)))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "event=library_bulk_add module=service status=ok group_id={} count={}",
            group_id.map_or_else(|| "none".to_string(), |id| id.to_string()),
            ids.len()
        );
        Ok(ids)
    }

    /// Joins a group's documents into a canonical buffer.
    pub fn load_group_buffer(&self, group_id: GroupId) -> Result<String, LibraryError> {
        let documents = self.repo.list_group_documents(group_id)?;
        let contents = documents
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>();
        Ok(join_documents(&contents))
    }

    /// Builds the export bundle of one group.
    ///
    /// `embedding_model` names the model that produced the stored vectors and
    /// is only written when `include_vectors` is set.
    pub fn export_group(
        &self,
        group_id: GroupId,
        include_vectors: bool,
        embedding_model: Option<&str>,
        exported_at: DateTime<Utc>,
    ) -> Result<GroupBundle, LibraryError> {
        let group = self
            .repo
            .get_group(group_id)?
            .ok_or(LibraryError::GroupNotFound(group_id))?;
        let documents = self.repo.list_group_documents(group_id)?;

        let mut bundle = GroupBundle::new(group.name, exported_at);
        bundle.includes_vectors = include_vectors;
        bundle.documents = documents
            .into_iter()
            .map(|doc| BundleDocument {
                content: doc.content,
                metadata: doc
                    .metadata
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
                embedding: if include_vectors { doc.embedding } else { None },
            })
            .collect();
        if include_vectors {
            bundle.embedding_model = embedding_model.map(str::to_string);
            bundle.vector_dimension = bundle
                .documents
                .iter()
                .find_map(|doc| doc.embedding.as_ref())
                .and_then(|embedding| u32::try_from(embedding.len()).ok());
        }

        info!(
            "event=library_export module=service status=ok group_id={} count={} vectors={}",
            group_id,
            bundle.documents.len(),
            include_vectors
        );
        Ok(bundle)
    }

    /// `base`, or the first free `base (n)` for n in `1..=MAX_NAME_SUFFIX`.
    pub fn unique_group_name(&self, base: &str) -> Result<String, LibraryError> {
        let base = base.trim();
        if self.repo.find_group_by_name(base)?.is_none() {
            return Ok(base.to_string());
        }
        for suffix in 1..=MAX_NAME_SUFFIX {
            let candidate = format!("{base} ({suffix})");
            if self.repo.find_group_by_name(&candidate)?.is_none() {
                return Ok(candidate);
            }
        }
        Err(LibraryError::NameExhausted(base.to_string()))
    }

    /// Imports a bundle into a fresh group.
    ///
    /// Embeddings are carried over only when `use_existing_vectors` is set.
    pub fn import_bundle(
        &self,
        bundle: &GroupBundle,
        use_existing_vectors: bool,
    ) -> Result<ImportSummary, LibraryError> {
        bundle.validate()?;

        let name = self.unique_group_name(&bundle.group_name)?;
        let group = self.repo.create_group(&name)?;

        let mut imported = 0;
        let mut failed = 0;
        for doc in &bundle.documents {
            if doc.content.trim().is_empty() {
                failed += 1;
                continue;
            }
            let new_document = NewDocument {
                content: doc.content.clone(),
                metadata: doc.string_metadata(),
                embedding: if use_existing_vectors {
                    doc.embedding.clone()
                } else {
                    None
                },
            };
            match self.repo.create_document(Some(group.id), &new_document) {
                Ok(_) => imported += 1,
                Err(err) => {
                    warn!(
                        "event=library_import module=service status=error group_id={} error={}",
                        group.id, err
                    );
                    failed += 1;
                }
            }
        }

        let group = self
            .repo
            .get_group(group.id)?
            .ok_or(LibraryError::GroupNotFound(group.id))?;
        info!(
            "event=library_import module=service status=ok group_id={} imported={} failed={}",
            group.id, imported, failed
        );
        Ok(ImportSummary {
            group,
            imported,
            failed,
            total: bundle.documents.len(),
        })
    }
}
