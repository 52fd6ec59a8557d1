//! Async analysis of logical documents.
//!
//! # Responsibility
//! - Define the remote service boundary and its wire types.
//! - Coordinate per-document requests and their cached results.
//! - Provide a local chunker for offline use.

pub mod coordinator;
pub mod fallback;
pub mod service;
pub mod types;
