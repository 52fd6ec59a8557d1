//! Domain model for the composition buffer and the document library.
//!
//! # Responsibility
//! - Define the derived `LogicalDocument` shape shared by every projection.
//! - Define library records (`DocumentGroup`, `StoredDocument`).
//!
//! # Invariants
//! - `LogicalDocument` is derived from the buffer and never stored.
//! - Per-document async state is keyed by `DocKey`, not by position.

pub mod document;
pub mod library;
