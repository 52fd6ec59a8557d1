//! Per-document async fan-out for chunking, fact-checking and
//! knowledge-checking.
//!
//! # Responsibility
//! - Issue one service request per document (single or "all" mode).
//! - Fold results into per-document state keyed by content address.
//! - Feed chunk results back into the session through the mutation engine.
//!
//! # Invariants
//! - Failures are never cached: the entry reverts to `Unstarted`.
//! - "All" mode marks every pending entry `Loading` before the first await.
//! - At most `max_concurrency` requests are in flight per fan-out.
//! - Each completion writes only its own entry.
//! - Cancellation reverts in-flight entries to `Unstarted`, and so does
//!   dropping a request future before it completes.
//! - A chunk result whose document no longer exists is dropped, never
//!   applied to whatever now sits at the old index.

use crate::analysis::service::{AnalysisService, Notice, Notifier, ServiceResult};
use crate::analysis::types::{
    FactCheckReport, FactCheckRequest, KnowledgeCheckReport, KnowledgeCheckRequest,
    SmartChunkRequest,
};
use crate::buffer::mutation::replace_all;
use crate::buffer::session::ComposerSession;
use crate::config::ComposerConfig;
use crate::model::document::{DocKey, LogicalDocument};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one cached analysis result.
#[derive(Debug, Clone, PartialEq)]
pub enum OpState<T> {
    Unstarted,
    Loading,
    Done(T),
}

impl<T> OpState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn done(&self) -> Option<&T> {
        match self {
            Self::Done(value) => Some(value),
            _ => None,
        }
    }
}

/// Sparse result map keyed by document content address.
#[derive(Debug)]
pub struct ResultCache<T> {
    entries: Mutex<HashMap<DocKey, OpState<T>>>,
}

impl<T> Default for ResultCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> ResultCache<T> {
    pub fn state(&self, key: &DocKey) -> OpState<T> {
        self.entries
            .lock()
            .get(key)
            .cloned()
            .unwrap_or(OpState::Unstarted)
    }

    /// State of the document currently at `index`.
    pub fn state_at(&self, documents: &[LogicalDocument], index: usize) -> OpState<T> {
        documents
            .get(index)
            .map_or(OpState::Unstarted, |doc| self.state(&doc.key))
    }

    /// Number of entries holding a result.
    pub fn done_count(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|state| matches!(state, OpState::Done(_)))
            .count()
    }

    /// Drops entries that belong to no live document.
    pub fn forget_missing(&self, documents: &[LogicalDocument]) -> usize {
        let live: HashSet<&DocKey> = documents.iter().map(|doc| &doc.key).collect();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, state| state.is_loading() || live.contains(key));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Marks `key` loading unless it is already loading or (when
    /// `keep_done`) already done. The returned entry must be settled with
    /// [`PendingEntry::finish`]; dropping it reverts the key to `Unstarted`.
    fn begin(&self, key: &DocKey, keep_done: bool) -> Option<PendingEntry<'_, T>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(OpState::Loading) => None,
            Some(OpState::Done(_)) if keep_done => None,
            _ => {
                entries.insert(key.clone(), OpState::Loading);
                Some(PendingEntry {
                    cache: self,
                    key: key.clone(),
                    settled: false,
                })
            }
        }
    }
}

/// A `Loading` entry owned by one request.
struct PendingEntry<'a, T> {
    cache: &'a ResultCache<T>,
    key: DocKey,
    settled: bool,
}

impl<T> PendingEntry<'_, T> {
    /// Stores the result, or reverts to `Unstarted` on `None`.
    fn finish(mut self, value: Option<T>) {
        self.settled = true;
        let mut entries = self.cache.entries.lock();
        match value {
            Some(value) => {
                entries.insert(self.key.clone(), OpState::Done(value));
            }
            None => {
                entries.remove(&self.key);
            }
        }
    }
}

impl<T> Drop for PendingEntry<'_, T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut entries = self.cache.entries.lock();
        if entries.get(&self.key).is_some_and(OpState::is_loading) {
            entries.remove(&self.key);
        }
    }
}

/// Marks one document as being chunked until dropped.
struct ChunkingMark<'a> {
    keys: &'a Mutex<HashSet<DocKey>>,
    key: DocKey,
}

impl<'a> ChunkingMark<'a> {
    fn claim(keys: &'a Mutex<HashSet<DocKey>>, key: &DocKey) -> Option<Self> {
        keys.lock().insert(key.clone()).then(|| Self {
            keys,
            key: key.clone(),
        })
    }
}

impl Drop for ChunkingMark<'_> {
    fn drop(&mut self) {
        self.keys.lock().remove(&self.key);
    }
}

/// Counters for one "all documents" run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutSummary {
    /// Requests issued.
    pub requested: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Documents with a cached result, already in flight, or duplicate content.
    pub skipped: usize,
}

/// Result of chunking one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Two or more trimmed, non-blank chunks.
    Split(Vec<String>),
    /// Service returned zero or one chunk.
    NothingToDo,
    /// The document is already being chunked.
    Busy,
    Failed,
    Cancelled,
}

/// Chunk results of one "all documents" run, keyed by the source document.
#[derive(Debug, Clone, Default)]
pub struct ChunkAllOutcome {
    pub splits: HashMap<DocKey, Vec<String>>,
    pub summary: FanOutSummary,
}

type Outcome<T> = Option<ServiceResult<T>>;

/// Coordinates analysis requests for one editing session.
pub struct AnalysisCoordinator {
    service: Arc<dyn AnalysisService>,
    notifier: Arc<dyn Notifier>,
    max_concurrency: usize,
    fact_checks: ResultCache<FactCheckReport>,
    knowledge_checks: ResultCache<KnowledgeCheckReport>,
    chunking: Mutex<HashSet<DocKey>>,
    cancel: Mutex<CancellationToken>,
}

impl AnalysisCoordinator {
    pub fn new(
        service: Arc<dyn AnalysisService>,
        notifier: Arc<dyn Notifier>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            service,
            notifier,
            max_concurrency: max_concurrency.max(1),
            fact_checks: ResultCache::default(),
            knowledge_checks: ResultCache::default(),
            chunking: Mutex::new(HashSet::new()),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn from_config(
        service: Arc<dyn AnalysisService>,
        notifier: Arc<dyn Notifier>,
        config: &ComposerConfig,
    ) -> Self {
        Self::new(service, notifier, config.max_concurrency)
    }

    pub fn fact_checks(&self) -> &ResultCache<FactCheckReport> {
        &self.fact_checks
    }

    pub fn knowledge_checks(&self) -> &ResultCache<KnowledgeCheckReport> {
        &self.knowledge_checks
    }

    /// Whether a chunk request for this document is in flight.
    pub fn is_chunking(&self, key: &DocKey) -> bool {
        self.chunking.lock().contains(key)
    }

    /// Aborts every in-flight request. Later requests are unaffected.
    pub fn cancel_all(&self) {
        let mut token = self.cancel.lock();
        token.cancel();
        *token = CancellationToken::new();
        info!("event=analysis_cancel module=analysis status=ok");
    }

    /// Cancels in-flight requests and forgets every cached result.
    pub fn reset(&self) {
        self.cancel_all();
        self.fact_checks.clear();
        self.knowledge_checks.clear();
        self.chunking.lock().clear();
    }

    /// Drops cached results for documents that no longer exist.
    pub fn forget_missing(&self, documents: &[LogicalDocument]) {
        let dropped = self.fact_checks.forget_missing(documents)
            + self.knowledge_checks.forget_missing(documents);
        if dropped > 0 {
            info!(
                "event=analysis_prune module=analysis status=ok dropped={}",
                dropped
            );
        }
    }

    /// Fact-checks one document, replacing any earlier result.
    pub async fn fact_check_one(&self, doc: &LogicalDocument) -> Option<FactCheckReport> {
        let service = Arc::clone(&self.service);
        self.run_one("fact_check", &self.fact_checks, doc, move |content| {
            let service = Arc::clone(&service);
            async move { service.fact_check(FactCheckRequest::new(content, Utc::now())).await }
        })
        .await
    }

    /// Fact-checks every document that has no result yet.
    pub async fn fact_check_all(&self, documents: &[LogicalDocument]) -> FanOutSummary {
        let service = Arc::clone(&self.service);
        self.run_all("fact_check", &self.fact_checks, documents, move |content| {
            let service = Arc::clone(&service);
            async move { service.fact_check(FactCheckRequest::new(content, Utc::now())).await }
        })
        .await
    }

    /// Checks one document against the knowledge base.
    pub async fn knowledge_check_one(
        &self,
        doc: &LogicalDocument,
    ) -> Option<KnowledgeCheckReport> {
        let service = Arc::clone(&self.service);
        self.run_one("knowledge_check", &self.knowledge_checks, doc, move |content| {
            let service = Arc::clone(&service);
            async move {
                service
                    .knowledge_check(KnowledgeCheckRequest { content })
                    .await
            }
        })
        .await
    }

    /// Checks every document without a result against the knowledge base.
    pub async fn knowledge_check_all(&self, documents: &[LogicalDocument]) -> FanOutSummary {
        let service = Arc::clone(&self.service);
        self.run_all(
            "knowledge_check",
            &self.knowledge_checks,
            documents,
            move |content| {
                let service = Arc::clone(&service);
                async move {
                    service
                        .knowledge_check(KnowledgeCheckRequest { content })
                        .await
                }
            },
        )
        .await
    }

    /// Asks the chunk service to split one document.
    pub async fn chunk_one(&self, doc: &LogicalDocument) -> ChunkOutcome {
        let Some(mark) = ChunkingMark::claim(&self.chunking, &doc.key) else {
            return ChunkOutcome::Busy;
        };

        let token = self.token();
        let request = SmartChunkRequest {
            content: doc.content.clone(),
        };
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.service.smart_chunk(request) => Some(result),
        };
        drop(mark);

        match outcome {
            None => ChunkOutcome::Cancelled,
            Some(Err(err)) => {
                warn!(
                    "event=analysis_request module=analysis status=error op=chunk index={} key={} error={}",
                    doc.index,
                    doc.key.short(),
                    err
                );
                self.notifier
                    .notify(Notice::error(format!("Smart chunking failed: {err}")));
                ChunkOutcome::Failed
            }
            Some(Ok(response)) => {
                let chunks = normalize_chunks(response.chunks);
                if chunks.len() <= 1 {
                    self.notifier
                        .notify(Notice::info("Document does not need to be split"));
                    ChunkOutcome::NothingToDo
                } else {
                    ChunkOutcome::Split(chunks)
                }
            }
        }
    }

    /// Chunks every document; documents already being chunked are skipped.
    pub async fn chunk_all(&self, documents: &[LogicalDocument]) -> ChunkAllOutcome {
        let mut summary = FanOutSummary::default();
        let mut pending = Vec::new();
        let mut marks = HashMap::new();
        for doc in documents {
            match ChunkingMark::claim(&self.chunking, &doc.key) {
                Some(mark) => {
                    marks.insert(doc.key.clone(), mark);
                    pending.push((doc.key.clone(), doc.content.clone()));
                }
                None => summary.skipped += 1,
            }
        }

        let mut splits = HashMap::new();
        let service = Arc::clone(&self.service);
        let call = move |content: String| {
            let service = Arc::clone(&service);
            async move { service.smart_chunk(SmartChunkRequest { content }).await }
        };
        self.run_bounded("chunk", pending, &mut summary, call, |key, outcome| {
            marks.remove(&key);
            let Some(Ok(response)) = outcome else {
                return false;
            };
            let chunks = normalize_chunks(response.chunks);
            if chunks.len() > 1 {
                splits.insert(key, chunks);
            }
            true
        })
        .await;

        if summary.failed > 0 {
            self.notifier.notify(Notice::error(format!(
                "Smart chunking failed for {} of {} documents",
                summary.failed, summary.requested
            )));
        }
        ChunkAllOutcome { splits, summary }
    }

    /// Sends the whole buffer for chunking and returns the rebuilt buffer.
    ///
    /// Returns `None` when the service has nothing to split or fails.
    pub async fn chunk_buffer(&self, documents: &[LogicalDocument]) -> Option<String> {
        let content = documents
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        if content.is_empty() {
            return None;
        }

        let token = self.token();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.service.smart_chunk(SmartChunkRequest { content }) => Some(result),
        };
        match outcome? {
            Ok(response) => {
                let chunks = normalize_chunks(response.chunks);
                (chunks.len() > 1).then(|| replace_all(&chunks))
            }
            Err(err) => {
                self.notifier
                    .notify(Notice::error(format!("Smart chunking failed: {err}")));
                None
            }
        }
    }

    fn token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    async fn run_one<T, F, Fut>(
        &self,
        op: &'static str,
        cache: &ResultCache<T>,
        doc: &LogicalDocument,
        call: F,
    ) -> Option<T>
    where
        T: Clone,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ServiceResult<T>>,
    {
        let entry = cache.begin(&doc.key, false)?;

        let token = self.token();
        let started_at = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = call(doc.content.clone()) => Some(result),
        };

        match outcome {
            Some(Ok(value)) => {
                entry.finish(Some(value.clone()));
                info!(
                    "event=analysis_request module=analysis status=ok op={} index={} key={} duration_ms={}",
                    op,
                    doc.index,
                    doc.key.short(),
                    started_at.elapsed().as_millis()
                );
                Some(value)
            }
            Some(Err(err)) => {
                entry.finish(None);
                warn!(
                    "event=analysis_request module=analysis status=error op={} index={} key={} error={}",
                    op,
                    doc.index,
                    doc.key.short(),
                    err
                );
                self.notifier
                    .notify(Notice::error(format!("{} failed: {err}", op_label(op))));
                None
            }
            None => {
                entry.finish(None);
                None
            }
        }
    }

    async fn run_all<T, F, Fut>(
        &self,
        op: &'static str,
        cache: &ResultCache<T>,
        documents: &[LogicalDocument],
        call: F,
    ) -> FanOutSummary
    where
        T: Clone,
        F: Fn(String) -> Fut,
        Fut: Future<Output = ServiceResult<T>>,
    {
        let mut summary = FanOutSummary::default();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        let mut entries = HashMap::new();
        for doc in documents {
            let entry = if seen.insert(&doc.key) {
                cache.begin(&doc.key, true)
            } else {
                None
            };
            let Some(entry) = entry else {
                summary.skipped += 1;
                continue;
            };
            entries.insert(doc.key.clone(), entry);
            pending.push((doc.key.clone(), doc.content.clone()));
        }

        self.run_bounded(op, pending, &mut summary, call, |key, outcome| {
            let value = match outcome {
                Some(Ok(value)) => Some(value),
                _ => None,
            };
            let completed = value.is_some();
            if let Some(entry) = entries.remove(&key) {
                entry.finish(value);
            }
            completed
        })
        .await;

        if summary.failed > 0 {
            self.notifier.notify(Notice::error(format!(
                "{} failed for {} of {} documents",
                op_label(op),
                summary.failed,
                summary.requested
            )));
        }
        summary
    }

    /// Runs `call` for every pending entry with bounded concurrency.
    ///
    /// `on_result` receives `None` for cancelled requests and returns whether
    /// the result counts as completed.
    async fn run_bounded<T, F, Fut, R>(
        &self,
        op: &'static str,
        pending: Vec<(DocKey, String)>,
        summary: &mut FanOutSummary,
        call: F,
        mut on_result: R,
    ) where
        F: Fn(String) -> Fut,
        Fut: Future<Output = ServiceResult<T>>,
        R: FnMut(DocKey, Outcome<T>) -> bool,
    {
        summary.requested = pending.len();
        let started_at = Instant::now();
        info!(
            "event=analysis_fanout module=analysis status=start op={} requested={} skipped={} max_concurrency={}",
            op, summary.requested, summary.skipped, self.max_concurrency
        );

        let token = self.token();
        let call = &call;
        let results = stream::iter(pending)
            .map(|(key, content)| {
                let token = token.clone();
                async move {
                    let outcome = tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        result = call(content) => Some(result),
                    };
                    (key, outcome)
                }
            })
            .buffer_unordered(self.max_concurrency);
        futures::pin_mut!(results);

        while let Some((key, outcome)) = results.next().await {
            let cancelled = outcome.is_none();
            let failed = matches!(outcome, Some(Err(_)));
            if let Some(Err(err)) = &outcome {
                warn!(
                    "event=analysis_request module=analysis status=error op={} key={} error={}",
                    op,
                    key.short(),
                    err
                );
            }
            let completed = on_result(key, outcome);
            if cancelled {
                summary.cancelled += 1;
            } else if failed {
                summary.failed += 1;
            } else if completed {
                summary.completed += 1;
            }
        }

        info!(
            "event=analysis_fanout module=analysis status=ok op={} completed={} failed={} cancelled={} duration_ms={}",
            op,
            summary.completed,
            summary.failed,
            summary.cancelled,
            started_at.elapsed().as_millis()
        );
    }
}

/// Applies a single-document chunk result to the session.
///
/// The target is located by content key in the current parse, so edits made
/// while the request was in flight cannot redirect the split to another
/// document. Returns `false` when the document is gone or the split is a
/// no-op.
pub fn apply_chunk_result(session: &mut ComposerSession, key: &DocKey, chunks: &[String]) -> bool {
    let Some(index) = session.index_of(key) else {
        info!(
            "event=chunk_apply module=analysis status=skipped reason=document_gone key={}",
            key.short()
        );
        return false;
    };
    session.replace_document(index, chunks)
}

/// Flattens "chunk all" results over the session's current documents.
///
/// Documents without a split are kept as they are. Returns the number of
/// documents that were split.
pub fn apply_chunk_all(session: &mut ComposerSession, splits: &HashMap<DocKey, Vec<String>>) -> usize {
    let mut flattened = Vec::new();
    let mut split_count = 0;
    for doc in session.documents() {
        match splits.get(&doc.key) {
            Some(chunks) if chunks.len() > 1 => {
                flattened.extend(chunks.iter().cloned());
                split_count += 1;
            }
            _ => flattened.push(doc.content.clone()),
        }
    }

    if split_count > 0 {
        session.replace_all(&flattened);
    }
    split_count
}

fn normalize_chunks(chunks: Vec<String>) -> Vec<String> {
    chunks
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

fn op_label(op: &str) -> &'static str {
    match op {
        "fact_check" => "Fact check",
        "knowledge_check" => "Knowledge check",
        _ => "Smart chunking",
    }
}
