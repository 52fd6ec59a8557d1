//! Wire types for the chunk, fact-check and knowledge-check services.
//!
//! Field names match the remote JSON contract (snake_case).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Request body for the smart-chunk service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartChunkRequest {
    pub content: String,
}

/// Response body of the smart-chunk service.
///
/// An absent or single-element `chunks` list means "nothing to do".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartChunkResponse {
    #[serde(default)]
    pub chunks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u32>,
}

impl SmartChunkResponse {
    pub fn from_chunks(chunks: Vec<String>) -> Self {
        let chunk_count = u32::try_from(chunks.len()).ok();
        Self {
            chunks,
            chunk_count,
        }
    }
}

/// Request body for the fact-check service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactCheckRequest {
    pub content: String,
    /// RFC 3339 / ISO-8601 timestamp of the request.
    pub current_time: String,
}

impl FactCheckRequest {
    pub fn new(content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            current_time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactVerdict {
    Verified,
    MostlyTrue,
    Mixed,
    Unverified,
    False,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSource {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Fact-check result for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactCheckReport {
    /// 0–100.
    pub credibility_score: u8,
    pub verdict: FactVerdict,
    pub analysis: String,
    #[serde(default)]
    pub sources: Vec<FactSource>,
    pub claims_checked: u32,
}

/// Request body for the knowledge-check service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeCheckRequest {
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeVerdict {
    Consistent,
    MostlyConsistent,
    Mixed,
    NoReference,
    Inconsistent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub doc_id: i64,
    pub title: String,
    pub snippet: String,
    /// 0.0–1.0.
    pub similarity: f32,
}

/// Knowledge-base consistency result for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeCheckReport {
    /// 0–100.
    pub consistency_score: u8,
    pub verdict: KnowledgeVerdict,
    pub analysis: String,
    #[serde(default)]
    pub sources: Vec<KnowledgeSource>,
    pub claims_checked: u32,
}
