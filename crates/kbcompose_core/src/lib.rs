//! Core logic for kbcompose, a multi-document composition buffer.
//!
//! One flat text buffer holds many logical documents split by a literal
//! separator line. This crate parses and edits that buffer, coordinates
//! per-document analysis requests, and stores composed documents in a local
//! library.

pub mod analysis;
pub mod buffer;
pub mod config;
pub mod db;
pub mod import;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use analysis::coordinator::{
    apply_chunk_all, apply_chunk_result, AnalysisCoordinator, ChunkAllOutcome, ChunkOutcome,
    FanOutSummary, OpState, ResultCache,
};
pub use analysis::fallback::{fallback_chunk, LocalChunker};
pub use analysis::service::{
    AnalysisService, LogNotifier, Notice, NoticeLevel, Notifier, ServiceError, ServiceResult,
};
pub use buffer::mutation::{MutationError, MutationResult};
pub use buffer::offset::{document_at, OffsetError};
pub use buffer::preview::preview;
pub use buffer::separator::{parse, parse_with, ParseOptions, CANONICAL_SEPARATOR, SEPARATOR};
pub use buffer::session::ComposerSession;
pub use config::{ComposerConfig, ConfigError};
pub use import::bundle::{BundleError, GroupBundle};
pub use import::text::{import_file, ImportError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::document::{DocKey, LogicalDocument};
pub use model::library::{DocumentGroup, DocumentId, GroupId, NewDocument, StoredDocument};
pub use repo::document_repo::{DocumentRepository, RepoError, RepoResult, SqliteDocumentRepository};
pub use service::library_service::{ImportSummary, LibraryError, LibraryService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
