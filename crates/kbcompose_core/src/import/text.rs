//! File import: extension gate and text cleanup.
//!
//! # Responsibility
//! - Gate imported files by extension.
//! - Decode and normalize text before it is appended to the buffer.
//!
//! # Invariants
//! - Output uses `\n` line endings only and has no NUL characters.
//! - Output never contains three consecutive newlines produced by the input.
//! - Output is trimmed.

use crate::import::document::{extract_docx, extract_pdf};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EXCESS_BLANK_LINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-line regex"));
static INLINE_WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("valid inline whitespace regex"));

/// Extensions decoded as text.
pub const TEXT_EXTENSIONS: &[&str] = &[".txt", ".md", ".markdown"];
/// Every extension `import_file` accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".docx", ".markdown", ".md", ".pdf", ".txt"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// `.pdf` / `.docx` content could not be read.
    Extraction { ext: String, reason: String },
    /// `.doc`: legacy Word format; must be re-saved as `.docx` or text.
    LegacyDoc,
    UnsupportedType(String),
    /// Nothing left after cleanup.
    Empty,
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extraction { ext, reason } => {
                write!(f, "failed to extract text from `{ext}` file: {reason}")
            }
            Self::LegacyDoc => write!(
                f,
                "legacy .doc files are not supported; save as .docx or .txt first"
            ),
            Self::UnsupportedType(ext) if ext.is_empty() => {
                write!(f, "file has no extension; supported: {}", SUPPORTED_EXTENSIONS.join(", "))
            }
            Self::UnsupportedType(ext) => write!(
                f,
                "unsupported file type `{ext}`; supported: {}",
                SUPPORTED_EXTENSIONS.join(", ")
            ),
            Self::Empty => write!(f, "file contains no text"),
        }
    }
}

impl Error for ImportError {}

/// Lowercase extension including the dot, or `""` when there is none.
pub fn extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

pub fn is_supported(file_name: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension(file_name).as_str())
}

/// Decodes UTF-8, replacing invalid sequences.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Normalizes line endings and whitespace of imported text.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text.replace('\0', "").replace("\r\n", "\n").replace('\r', "\n");
    let text = EXCESS_BLANK_LINES_RE.replace_all(&text, "\n\n");
    let text = INLINE_WHITESPACE_RE.replace_all(&text, " ");

    text.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Extracts cleaned text from an uploaded file.
///
/// The result is ready for `append_imported`.
pub fn import_file(file_name: &str, bytes: &[u8]) -> Result<String, ImportError> {
    let ext = extension(file_name);
    let raw = match ext.as_str() {
        ".pdf" => extract_pdf(bytes)?,
        ".docx" => extract_docx(bytes)?,
        ".doc" => return Err(ImportError::LegacyDoc),
        other if TEXT_EXTENSIONS.contains(&other) => decode_text(bytes),
        _ => return Err(ImportError::UnsupportedType(ext)),
    };

    let text = clean_text(&raw);
    if text.is_empty() {
        return Err(ImportError::Empty);
    }
    info!(
        "event=file_import module=import status=ok ext={} input_bytes={} output_bytes={}",
        ext,
        bytes.len(),
        text.len()
    );
    Ok(text)
}
