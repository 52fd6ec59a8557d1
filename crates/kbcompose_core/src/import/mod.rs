//! Getting content into and out of the composer.
//!
//! - `text`: extension gate and cleanup for uploaded files.
//! - `document`: PDF and DOCX text extraction.
//! - `bundle`: the group export/import JSON format.

pub mod bundle;
pub mod document;
pub mod text;
