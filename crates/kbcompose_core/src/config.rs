//! Composer configuration.
//!
//! # Responsibility
//! - Hold tunables for previews, analysis fan-out and local chunking.
//! - Load them from a JSON file with per-field defaults.
//!
//! # Invariants
//! - A loaded config has passed `validate()`.
//! - Missing fields fall back to the same defaults as `ComposerConfig::default()`.

use crate::buffer::preview::{PREVIEW_LIMIT, PREVIEW_MIN_BREAK};
use crate::buffer::separator::ParseOptions;
use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_FALLBACK_CHUNK_SIZE: usize = 1000;

/// Configuration load/validation error.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Tunables shared by the composer session and analysis coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Maximum preview length in characters.
    pub preview_limit: usize,
    /// Word breaks at or before this character position are ignored.
    pub preview_min_break: usize,
    /// Upper bound on in-flight analysis requests for "all" operations.
    pub max_concurrency: usize,
    /// Target chunk size for the local fallback chunker.
    pub fallback_chunk_size: usize,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            preview_limit: PREVIEW_LIMIT,
            preview_min_break: PREVIEW_MIN_BREAK,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fallback_chunk_size: DEFAULT_FALLBACK_CHUNK_SIZE,
            log_level: default_log_level().to_string(),
        }
    }
}

impl ComposerConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(value: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview_limit == 0 {
            return Err(ConfigError::Invalid(
                "preview_limit must be greater than 0".to_string(),
            ));
        }
        if self.preview_min_break >= self.preview_limit {
            return Err(ConfigError::Invalid(format!(
                "preview_min_break ({}) must be below preview_limit ({})",
                self.preview_min_break, self.preview_limit
            )));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.fallback_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "fallback_chunk_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse options derived from the preview settings.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            preview_limit: self.preview_limit,
            preview_min_break: self.preview_min_break,
        }
    }
}
