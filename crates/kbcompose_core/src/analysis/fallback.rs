//! Local paragraph/sentence chunker.
//!
//! # Responsibility
//! - Split a document into size-bounded chunks without a remote service.
//! - Serve as the chunk side of `AnalysisService` for offline use.
//!
//! # Invariants
//! - Chunks are trimmed and non-empty.
//! - Paragraph order and sentence order are preserved.
//! - A single sentence longer than the target size is kept whole.

use crate::analysis::service::{AnalysisService, ServiceError, ServiceResult};
use crate::analysis::types::{
    FactCheckReport, FactCheckRequest, KnowledgeCheckReport, KnowledgeCheckRequest,
    SmartChunkRequest, SmartChunkResponse,
};
use async_trait::async_trait;

/// Default target chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Content shorter than this is never split.
pub const MIN_SPLIT_CHARS: usize = 100;

const PARAGRAPH_BREAK: &str = "\n\n";
const SENTENCE_BREAK: &str = ". ";

/// Splits `content` into chunks of at most `max_chunk_size` characters.
///
/// Paragraphs are packed greedily; a paragraph that alone exceeds the target
/// is packed sentence by sentence instead.
pub fn fallback_chunk(content: &str, max_chunk_size: usize) -> Vec<String> {
    let trimmed = content.trim();
    if trimmed.chars().count() < MIN_SPLIT_CHARS {
        return vec![trimmed.to_string()];
    }

    let mut packer = Packer::new(max_chunk_size);
    for paragraph in trimmed.split(PARAGRAPH_BREAK) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if packer.fits(paragraph, PARAGRAPH_BREAK) {
            packer.push(paragraph, PARAGRAPH_BREAK);
            continue;
        }

        packer.flush();
        if char_len(paragraph) <= max_chunk_size {
            packer.push(paragraph, PARAGRAPH_BREAK);
            continue;
        }

        for sentence in paragraph.split_inclusive(SENTENCE_BREAK) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            if !packer.fits(sentence, " ") {
                packer.flush();
            }
            packer.push(sentence, " ");
        }
    }
    packer.flush();

    if packer.chunks.is_empty() {
        vec![trimmed.to_string()]
    } else {
        packer.chunks
    }
}

struct Packer {
    max: usize,
    current: String,
    chunks: Vec<String>,
}

impl Packer {
    fn new(max: usize) -> Self {
        Self {
            max,
            current: String::new(),
            chunks: Vec::new(),
        }
    }

    fn fits(&self, piece: &str, joiner: &str) -> bool {
        char_len(&self.current) + char_len(piece) + char_len(joiner) <= self.max
    }

    fn push(&mut self, piece: &str, joiner: &str) {
        if !self.current.is_empty() {
            self.current.push_str(joiner);
        }
        self.current.push_str(piece);
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
        }
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// `AnalysisService` backed by [`fallback_chunk`].
///
/// Only chunking is available; fact and knowledge checks need the remote
/// service and report `ServiceError::Unsupported`.
#[derive(Debug, Clone, Copy)]
pub struct LocalChunker {
    max_chunk_size: usize,
}

impl LocalChunker {
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }
}

impl Default for LocalChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

#[async_trait]
impl AnalysisService for LocalChunker {
    async fn smart_chunk(&self, request: SmartChunkRequest) -> ServiceResult<SmartChunkResponse> {
        if request.content.trim().is_empty() {
            return Err(ServiceError::InvalidResponse(
                "content cannot be empty".to_string(),
            ));
        }
        let chunks = fallback_chunk(&request.content, self.max_chunk_size);
        Ok(SmartChunkResponse::from_chunks(chunks))
    }

    async fn fact_check(&self, _request: FactCheckRequest) -> ServiceResult<FactCheckReport> {
        Err(ServiceError::Unsupported("fact_check"))
    }

    async fn knowledge_check(
        &self,
        _request: KnowledgeCheckRequest,
    ) -> ServiceResult<KnowledgeCheckReport> {
        Err(ServiceError::Unsupported("knowledge_check"))
    }
}
