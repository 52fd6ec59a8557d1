//! Use-case services over the repository layer.
//!
//! # Responsibility
//! - Orchestrate repository calls into library-level operations.
//! - Keep callers decoupled from storage details.

pub mod library_service;
