//! Persistence contracts and their SQLite implementations.
//!
//! # Invariants
//! - Repository APIs report semantic errors (`GroupNotFound`,
//!   `DocumentNotFound`) in addition to storage errors.

pub mod document_repo;
