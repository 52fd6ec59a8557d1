//! Analysis service and notifier contracts.
//!
//! # Responsibility
//! - Define the async boundary to the chunk / fact-check / knowledge-check
//!   services.
//! - Define the non-blocking notification sink used for failures.
//!
//! # Invariants
//! - Implementations never mutate the buffer; they only return data.

use crate::analysis::types::{
    FactCheckReport, FactCheckRequest, KnowledgeCheckReport, KnowledgeCheckRequest,
    SmartChunkRequest, SmartChunkResponse,
};
use crate::logging::log_safe;
use async_trait::async_trait;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of one remote analysis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Transport-level failure (connection refused, timeout, reset).
    Network(String),
    /// Remote replied with a non-success status.
    Status { code: u16, message: String },
    /// Remote replied with a body that does not match the contract.
    InvalidResponse(String),
    /// This service implementation does not provide the operation.
    Unsupported(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network failure: {message}"),
            Self::Status { code, message } => write!(f, "service returned {code}: {message}"),
            Self::InvalidResponse(message) => write!(f, "invalid service response: {message}"),
            Self::Unsupported(operation) => write!(f, "operation not supported: {operation}"),
        }
    }
}

impl Error for ServiceError {}

/// Remote analysis/transform service.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn smart_chunk(&self, request: SmartChunkRequest) -> ServiceResult<SmartChunkResponse>;
    async fn fact_check(&self, request: FactCheckRequest) -> ServiceResult<FactCheckReport>;
    async fn knowledge_check(
        &self,
        request: KnowledgeCheckRequest,
    ) -> ServiceResult<KnowledgeCheckReport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient user-facing message (toast/banner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Sink for transient notices. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that forwards notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(
                "event=notice module=analysis level=info message={}",
                log_safe(&notice.message)
            ),
            NoticeLevel::Error => warn!(
                "event=notice module=analysis level=error message={}",
                log_safe(&notice.message)
            ),
        }
    }
}
