use async_trait::async_trait;
use kbcompose_core::analysis::coordinator::{
    apply_chunk_all, apply_chunk_result, AnalysisCoordinator, ChunkOutcome, OpState,
};
use kbcompose_core::analysis::service::{
    AnalysisService, Notice, NoticeLevel, Notifier, ServiceError, ServiceResult,
};
use kbcompose_core::analysis::types::{
    FactCheckReport, FactCheckRequest, FactVerdict, KnowledgeCheckReport, KnowledgeCheckRequest,
    KnowledgeVerdict, SmartChunkRequest, SmartChunkResponse,
};
use kbcompose_core::buffer::separator::{parse, SEPARATOR};
use kbcompose_core::{ComposerSession, LogicalDocument};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Chunks on `|`, fails any request whose content contains `bad`.
#[derive(Default)]
struct ScriptedService {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedService {
    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    async fn enter(&self, content: &str) -> ServiceResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if content.contains("bad") {
            return Err(ServiceError::Network("connection reset".to_string()));
        }
        Ok(())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for ScriptedService {
    async fn smart_chunk(&self, request: SmartChunkRequest) -> ServiceResult<SmartChunkResponse> {
        self.enter(&request.content).await?;
        let chunks = request.content.split('|').map(str::to_string).collect();
        Ok(SmartChunkResponse::from_chunks(chunks))
    }

    async fn fact_check(&self, request: FactCheckRequest) -> ServiceResult<FactCheckReport> {
        self.enter(&request.content).await?;
        Ok(FactCheckReport {
            credibility_score: 80,
            verdict: FactVerdict::MostlyTrue,
            analysis: format!("checked {} chars", request.content.len()),
            sources: Vec::new(),
            claims_checked: 1,
        })
    }

    async fn knowledge_check(
        &self,
        request: KnowledgeCheckRequest,
    ) -> ServiceResult<KnowledgeCheckReport> {
        self.enter(&request.content).await?;
        Ok(KnowledgeCheckReport {
            consistency_score: 90,
            verdict: KnowledgeVerdict::Consistent,
            analysis: "matches library".to_string(),
            sources: Vec::new(),
            claims_checked: 2,
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn errors(&self) -> usize {
        self.notices
            .lock()
            .iter()
            .filter(|notice| notice.level == NoticeLevel::Error)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

fn setup(
    service: ScriptedService,
    max_concurrency: usize,
) -> (Arc<ScriptedService>, Arc<RecordingNotifier>, AnalysisCoordinator) {
    let service = Arc::new(service);
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator =
        AnalysisCoordinator::new(service.clone(), notifier.clone(), max_concurrency);
    (service, notifier, coordinator)
}

fn docs(parts: &[&str]) -> Vec<LogicalDocument> {
    parse(&parts.join(SEPARATOR))
}

#[tokio::test]
async fn fact_check_all_caches_by_content() {
    let (service, _, coordinator) = setup(ScriptedService::default(), 4);
    let documents = docs(&["alpha", "beta", "gamma"]);

    let summary = coordinator.fact_check_all(&documents).await;
    assert_eq!((summary.requested, summary.completed, summary.skipped), (3, 3, 0));
    for index in 0..3 {
        let state = coordinator.fact_checks().state_at(&documents, index);
        assert_eq!(state.done().map(|report| report.credibility_score), Some(80));
    }

    let again = coordinator.fact_check_all(&documents).await;
    assert_eq!((again.requested, again.skipped), (0, 3));
    assert_eq!(service.calls(), 3);
}

#[tokio::test]
async fn results_follow_documents_across_reorders() {
    let (_, _, coordinator) = setup(ScriptedService::default(), 2);
    let before = docs(&["first", "second"]);
    coordinator.fact_check_one(&before[1]).await.expect("report");

    let after = docs(&["inserted", "first", "second"]);
    assert_eq!(coordinator.fact_checks().state_at(&after, 0), OpState::Unstarted);
    assert_eq!(coordinator.fact_checks().state_at(&after, 1), OpState::Unstarted);
    assert!(coordinator.fact_checks().state_at(&after, 2).done().is_some());
}

#[tokio::test]
async fn failures_revert_to_unstarted_and_notify() {
    let (_, notifier, coordinator) = setup(ScriptedService::default(), 4);
    let documents = docs(&["fine", "bad claim", "also fine"]);

    let summary = coordinator.knowledge_check_all(&documents).await;
    assert_eq!((summary.completed, summary.failed), (2, 1));
    assert_eq!(
        coordinator.knowledge_checks().state_at(&documents, 1),
        OpState::Unstarted
    );
    assert_eq!(notifier.errors(), 1);

    assert!(coordinator.fact_check_one(&documents[1]).await.is_none());
    assert_eq!(coordinator.fact_checks().state(&documents[1].key), OpState::Unstarted);
    assert_eq!(notifier.errors(), 2);
}

#[tokio::test]
async fn all_mode_marks_everything_loading_before_awaiting() {
    let gate = Arc::new(Semaphore::new(0));
    let (_, _, coordinator) = setup(ScriptedService::gated(gate.clone()), 1);
    let documents = docs(&["one", "two", "three"]);

    let (summary, ()) = tokio::join!(coordinator.fact_check_all(&documents), async {
        tokio::task::yield_now().await;
        for doc in &documents {
            assert!(coordinator.fact_checks().state(&doc.key).is_loading());
        }
        gate.add_permits(documents.len());
    });
    assert_eq!(summary.completed, 3);
}

#[tokio::test]
async fn fan_out_respects_max_concurrency() {
    let (service, _, coordinator) = setup(ScriptedService::default(), 2);
    let parts: Vec<String> = (0..8).map(|n| format!("document {n}")).collect();
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    let documents = docs(&parts);

    let summary = coordinator.fact_check_all(&documents).await;
    assert_eq!(summary.completed, 8);
    assert_eq!(service.max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn duplicate_content_is_requested_once() {
    let (service, _, coordinator) = setup(ScriptedService::default(), 4);
    let documents = docs(&["same", "same", "other"]);

    let summary = coordinator.fact_check_all(&documents).await;
    assert_eq!((summary.requested, summary.skipped), (2, 1));
    assert_eq!(service.calls(), 2);
    assert!(coordinator.fact_checks().state_at(&documents, 1).done().is_some());
}

#[tokio::test]
async fn cancel_all_reverts_in_flight_entries() {
    let gate = Arc::new(Semaphore::new(0));
    let (_, notifier, coordinator) = setup(ScriptedService::gated(gate.clone()), 4);
    let documents = docs(&["one", "two"]);

    let (summary, ()) = tokio::join!(coordinator.fact_check_all(&documents), async {
        tokio::task::yield_now().await;
        coordinator.cancel_all();
    });
    assert_eq!((summary.cancelled, summary.completed), (2, 0));
    for doc in &documents {
        assert_eq!(coordinator.fact_checks().state(&doc.key), OpState::Unstarted);
    }
    assert_eq!(notifier.errors(), 0);

    gate.add_permits(1);
    assert!(coordinator.fact_check_one(&documents[0]).await.is_some());
}

#[tokio::test]
async fn abandoned_fan_outs_leave_documents_retriable() {
    let gate = Arc::new(Semaphore::new(0));
    let (service, _, coordinator) = setup(ScriptedService::gated(gate.clone()), 4);
    let documents = docs(&["one", "two"]);

    let abandoned = timeout(
        Duration::from_millis(10),
        coordinator.fact_check_all(&documents),
    )
    .await;
    assert!(abandoned.is_err());
    for doc in &documents {
        assert_eq!(coordinator.fact_checks().state(&doc.key), OpState::Unstarted);
    }

    let abandoned = timeout(Duration::from_millis(10), coordinator.chunk_all(&documents)).await;
    assert!(abandoned.is_err());
    assert!(documents.iter().all(|doc| !coordinator.is_chunking(&doc.key)));

    let abandoned = timeout(Duration::from_millis(10), coordinator.chunk_one(&documents[0])).await;
    assert!(abandoned.is_err());
    assert!(!coordinator.is_chunking(&documents[0].key));

    let calls_before = service.calls();
    gate.add_permits(4);
    assert!(coordinator.fact_check_one(&documents[0]).await.is_some());
    let retry = coordinator.fact_check_all(&documents).await;
    assert_eq!((retry.requested, retry.completed, retry.skipped), (1, 1, 1));
    let chunked = coordinator.chunk_all(&documents).await;
    assert_eq!((chunked.summary.requested, chunked.summary.skipped), (2, 0));
    assert_eq!(service.calls(), calls_before + 4);
}

#[tokio::test]
async fn chunk_result_lands_on_the_same_document_after_edits() {
    let (_, _, coordinator) = setup(ScriptedService::default(), 4);
    let mut session = ComposerSession::default();
    session.set_buffer(format!("keep{SEPARATOR}left|right"));
    let target = session.documents()[1].clone();

    let ChunkOutcome::Split(chunks) = coordinator.chunk_one(&target).await else {
        panic!("expected a split");
    };

    session.set_buffer(format!("new first{SEPARATOR}keep{SEPARATOR}left|right"));
    assert!(apply_chunk_result(&mut session, &target.key, &chunks));
    assert_eq!(session.contents(), ["new first", "keep", "left", "right"]);
}

#[tokio::test]
async fn chunk_result_for_a_deleted_document_is_dropped() {
    let (_, _, coordinator) = setup(ScriptedService::default(), 4);
    let mut session = ComposerSession::default();
    session.set_buffer(format!("keep{SEPARATOR}left|right"));
    let target = session.documents()[1].clone();

    let ChunkOutcome::Split(chunks) = coordinator.chunk_one(&target).await else {
        panic!("expected a split");
    };

    assert!(session.delete_document(1));
    let before = session.buffer().to_string();
    assert!(!apply_chunk_result(&mut session, &target.key, &chunks));
    assert_eq!(session.buffer(), before);
}

#[tokio::test]
async fn single_chunk_reply_is_nothing_to_do() {
    let (_, notifier, coordinator) = setup(ScriptedService::default(), 4);
    let documents = docs(&["already atomic"]);

    assert_eq!(coordinator.chunk_one(&documents[0]).await, ChunkOutcome::NothingToDo);
    assert!(!coordinator.is_chunking(&documents[0].key));
    assert_eq!(notifier.notices.lock().len(), 1);
    assert_eq!(notifier.errors(), 0);
}

#[tokio::test]
async fn chunk_all_flattens_splits_in_order() {
    let (_, notifier, coordinator) = setup(ScriptedService::default(), 2);
    let mut session = ComposerSession::default();
    session.set_buffer(format!("a1|a2{SEPARATOR}b{SEPARATOR}c1|c2|c3{SEPARATOR}bad|doc"));

    let outcome = coordinator.chunk_all(session.documents()).await;
    assert_eq!(outcome.summary.requested, 4);
    assert_eq!(outcome.summary.failed, 1);
    assert_eq!(outcome.splits.len(), 2);
    assert_eq!(notifier.errors(), 1);

    assert_eq!(apply_chunk_all(&mut session, &outcome.splits), 2);
    assert_eq!(
        session.contents(),
        ["a1", "a2", "b", "c1", "c2", "c3", "bad|doc"]
    );
}

#[tokio::test]
async fn chunk_buffer_rebuilds_from_whole_text() {
    let (service, _, coordinator) = setup(ScriptedService::default(), 2);
    let documents = docs(&["x|y", "z"]);

    let rebuilt = coordinator.chunk_buffer(&documents).await.expect("split");
    let texts: Vec<String> = parse(&rebuilt).into_iter().map(|doc| doc.content).collect();
    assert_eq!(texts, ["x", "y\n\nz"]);
    assert_eq!(service.calls(), 1);
    assert!(coordinator.chunk_buffer(&[]).await.is_none());
}

#[tokio::test]
async fn forget_missing_drops_results_of_removed_documents() {
    let (_, _, coordinator) = setup(ScriptedService::default(), 2);
    let documents = docs(&["stay", "go"]);
    coordinator.fact_check_all(&documents).await;
    assert_eq!(coordinator.fact_checks().done_count(), 2);

    coordinator.forget_missing(&docs(&["stay"]));
    assert_eq!(coordinator.fact_checks().done_count(), 1);

    coordinator.reset();
    assert_eq!(coordinator.fact_checks().done_count(), 0);
}
