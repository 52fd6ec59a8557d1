//! Multi-document composition buffer.
//!
//! # Responsibility
//! - Encode/decode the flat buffer into logical documents (`separator`).
//! - Map cursor offsets to documents and back (`offset`).
//! - Derive bounded previews (`preview`).
//! - Apply pure structural edits (`mutation`).
//! - Own one editing session and its projections (`session`).
//!
//! # Invariants
//! - Everything here is synchronous and performs no I/O.
//! - Parsing and cursor lookup share one segment walk.

pub mod mutation;
pub mod offset;
pub mod preview;
pub mod separator;
pub mod session;
