//! Document/group repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist document groups and their ordered documents.
//! - Round-trip metadata and embeddings as JSON columns.
//!
//! # Invariants
//! - Document content is stored trimmed and is never blank.
//! - Group names are unique and non-blank.
//! - Group documents list in insertion order (`id ASC`).

use crate::db::DbError;
use crate::model::library::{DocumentGroup, DocumentId, GroupId, NewDocument, StoredDocument};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    GroupNotFound(GroupId),
    DocumentNotFound(DocumentId),
    DuplicateGroup(String),
    /// Input rejected before reaching storage.
    InvalidInput(String),
    /// Stored row could not be decoded.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::DuplicateGroup(name) => write!(f, "group already exists: `{name}`"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted document data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// CRUD boundary of the document library.
pub trait DocumentRepository {
    fn create_group(&self, name: &str) -> RepoResult<DocumentGroup>;
    fn get_group(&self, id: GroupId) -> RepoResult<Option<DocumentGroup>>;
    fn find_group_by_name(&self, name: &str) -> RepoResult<Option<DocumentGroup>>;
    /// Groups sorted by name.
    fn list_groups(&self) -> RepoResult<Vec<DocumentGroup>>;
    fn create_document(
        &self,
        group_id: Option<GroupId>,
        document: &NewDocument,
    ) -> RepoResult<DocumentId>;
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<StoredDocument>>;
    /// Replaces content and metadata; keeps the stored embedding unless a new
    /// one is supplied.
    fn update_document(&self, id: DocumentId, document: &NewDocument) -> RepoResult<()>;
    fn delete_document(&self, id: DocumentId) -> RepoResult<()>;
    fn list_group_documents(&self, group_id: GroupId) -> RepoResult<Vec<StoredDocument>>;
}

/// SQLite-backed document repository over a migrated connection.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

const GROUP_COLUMNS: &str = "SELECT
        g.id,
        g.name,
        (SELECT COUNT(*) FROM documents d WHERE d.group_id = g.id) AS document_count
     FROM document_groups g";

const DOCUMENT_COLUMNS: &str = "SELECT
        id,
        group_id,
        content,
        metadata_json,
        embedding_json,
        updated_at
     FROM documents";

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_group(&self, name: &str) -> RepoResult<DocumentGroup> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepoError::InvalidInput(
                "group name cannot be empty".to_string(),
            ));
        }
        if self.find_group_by_name(name)?.is_some() {
            return Err(RepoError::DuplicateGroup(name.to_string()));
        }

        self.conn.execute(
            "INSERT INTO document_groups (name) VALUES (?1);",
            [name],
        )?;
        Ok(DocumentGroup {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            document_count: 0,
        })
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<DocumentGroup>> {
        let sql = format!("{GROUP_COLUMNS} WHERE g.id = ?1;");
        let group = self
            .conn
            .query_row(&sql, [id], group_from_row)
            .optional()?;
        Ok(group)
    }

    fn find_group_by_name(&self, name: &str) -> RepoResult<Option<DocumentGroup>> {
        let sql = format!("{GROUP_COLUMNS} WHERE g.name = ?1;");
        let group = self
            .conn
            .query_row(&sql, [name.trim()], group_from_row)
            .optional()?;
        Ok(group)
    }

    fn list_groups(&self) -> RepoResult<Vec<DocumentGroup>> {
        let sql = format!("{GROUP_COLUMNS} ORDER BY g.name ASC, g.id ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let groups = stmt
            .query_map([], group_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    fn create_document(
        &self,
        group_id: Option<GroupId>,
        document: &NewDocument,
    ) -> RepoResult<DocumentId> {
        let content = validated_content(document)?;
        if let Some(group_id) = group_id {
            ensure_group_exists(self.conn, group_id)?;
        }

        self.conn.execute(
            "INSERT INTO documents (group_id, content, metadata_json, embedding_json)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                group_id,
                content,
                encode_metadata(&document.metadata)?,
                encode_embedding(document.embedding.as_deref())?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_document(&self, id: DocumentId) -> RepoResult<Option<StoredDocument>> {
        let sql = format!("{DOCUMENT_COLUMNS} WHERE id = ?1;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(document_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_document(&self, id: DocumentId, document: &NewDocument) -> RepoResult<()> {
        let content = validated_content(document)?;
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                content = ?2,
                metadata_json = ?3,
                embedding_json = COALESCE(?4, embedding_json),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                content,
                encode_metadata(&document.metadata)?,
                encode_embedding(document.embedding.as_deref())?,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::DocumentNotFound(id));
        }
        Ok(())
    }

    fn delete_document(&self, id: DocumentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::DocumentNotFound(id));
        }
        Ok(())
    }

    fn list_group_documents(&self, group_id: GroupId) -> RepoResult<Vec<StoredDocument>> {
        ensure_group_exists(self.conn, group_id)?;

        let sql = format!("{DOCUMENT_COLUMNS} WHERE group_id = ?1 ORDER BY id ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([group_id])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(document_from_row(row)?);
        }
        Ok(documents)
    }
}

fn validated_content(document: &NewDocument) -> RepoResult<&str> {
    let content = document.content.trim();
    if content.is_empty() {
        return Err(RepoError::InvalidInput(
            "document content cannot be empty".to_string(),
        ));
    }
    Ok(content)
}

fn ensure_group_exists(conn: &Connection, group_id: GroupId) -> RepoResult<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM document_groups WHERE id = ?1;",
            [group_id],
            |_| Ok(()),
        )
        .optional()?;
    exists.ok_or(RepoError::GroupNotFound(group_id))
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentGroup> {
    Ok(DocumentGroup {
        id: row.get("id")?,
        name: row.get("name")?,
        document_count: row.get("document_count")?,
    })
}

fn document_from_row(row: &Row<'_>) -> RepoResult<StoredDocument> {
    let metadata_json: String = row.get("metadata_json")?;
    let embedding_json: Option<String> = row.get("embedding_json")?;

    let metadata = serde_json::from_str::<BTreeMap<String, String>>(&metadata_json)
        .map_err(|err| RepoError::InvalidData(format!("metadata: {err}")))?;
    let embedding = embedding_json
        .map(|value| serde_json::from_str::<Vec<f32>>(&value))
        .transpose()
        .map_err(|err| RepoError::InvalidData(format!("embedding: {err}")))?;

    Ok(StoredDocument {
        id: row.get("id")?,
        group_id: row.get("group_id")?,
        content: row.get("content")?,
        metadata,
        embedding,
        updated_at: row.get("updated_at")?,
    })
}

fn encode_metadata(metadata: &BTreeMap<String, String>) -> RepoResult<String> {
    serde_json::to_string(metadata).map_err(|err| RepoError::InvalidInput(err.to_string()))
}

fn encode_embedding(embedding: Option<&[f32]>) -> RepoResult<Option<String>> {
    embedding
        .map(serde_json::to_string)
        .transpose()
        .map_err(|err| RepoError::InvalidInput(err.to_string()))
}
