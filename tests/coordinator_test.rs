//! 请求协调器集成测试
//!
//! 用 Mock 引擎覆盖提交协议的关键性质：槽位写入与追问清空、忙碌拒绝、
//! 校验拦截、历史刷新与回放、并发提交、超时与取消。

use std::sync::Arc;
use std::time::Duration;

use mitra::core::{PrimaryPayload, RequestCoordinator, SubmitError};
use mitra::engines::{EngineCallError, MockEngine};
use mitra::session::SessionIdentity;
use mitra::workflow::{DocumentPayload, HistoryKind, WorkflowKind};

fn make_coordinator(engine: Arc<MockEngine>) -> Arc<RequestCoordinator> {
    Arc::new(RequestCoordinator::new(
        SessionIdentity::from_raw("user-test"),
        engine,
        Duration::from_secs(5),
    ))
}

#[tokio::test]
async fn test_primary_success_writes_slot_and_refreshes_history() {
    let engine = Arc::new(MockEngine::new());
    let coordinator = make_coordinator(engine.clone());

    coordinator
        .submit_primary(
            WorkflowKind::DocumentAnalysis,
            PrimaryPayload::Document(DocumentPayload::from_text("Breach of contract claim")),
        )
        .await
        .unwrap();

    let state = coordinator.snapshot();
    let slot = state.store.read(WorkflowKind::DocumentAnalysis);
    assert!(slot.primary.starts_with("Analysis:"));
    assert!(slot.follow_up.is_empty());
    assert!(!state.busy.document);
    assert!(state.banner_error.is_none());

    // 成功提交后账本已刷新，最新条目在前
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history[0].kind, HistoryKind::DocumentAnalysis);
    assert!(state.history[0].preview().starts_with("Breach of contract claim"));
}

#[tokio::test]
async fn test_follow_up_keeps_primary_until_next_primary() {
    let engine = Arc::new(MockEngine::new());
    let coordinator = make_coordinator(engine.clone());

    coordinator
        .submit_primary(
            WorkflowKind::SimilarCases,
            PrimaryPayload::CaseQuery("property dispute".into()),
        )
        .await
        .unwrap();
    coordinator
        .submit_follow_up(WorkflowKind::SimilarCases, "What about appeals?")
        .await
        .unwrap();

    let state = coordinator.snapshot();
    let slot = state.store.read(WorkflowKind::SimilarCases);
    assert!(slot.primary.starts_with("Similar cases:"));
    assert_eq!(slot.follow_up, "Answer: What about appeals?");

    // 新的主结果必须清掉旧追问
    coordinator
        .submit_primary(
            WorkflowKind::SimilarCases,
            PrimaryPayload::CaseQuery("tenancy eviction".into()),
        )
        .await
        .unwrap();
    let slot = coordinator.snapshot().store.read(WorkflowKind::SimilarCases).clone();
    assert!(slot.primary.contains("tenancy eviction"));
    assert!(slot.follow_up.is_empty());
}

#[tokio::test]
async fn test_busy_rejects_duplicate_submission() {
    let engine = Arc::new(MockEngine::new().with_delay(Duration::from_millis(200)));
    let coordinator = make_coordinator(engine.clone());

    let first = {
        let c = coordinator.clone();
        tokio::spawn(async move {
            c.submit_primary(
                WorkflowKind::DocumentAnalysis,
                PrimaryPayload::Document(DocumentPayload::from_text("first submission")),
            )
            .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = coordinator
        .submit_primary(
            WorkflowKind::DocumentAnalysis,
            PrimaryPayload::Document(DocumentPayload::from_text("second submission")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Busy(WorkflowKind::DocumentAnalysis)));
    assert!(coordinator.snapshot().inline_notice.is_some());

    // 被拒绝的提交没有出网，第一个请求照常完成
    first.await.unwrap().unwrap();
    assert_eq!(engine.call_count(), 1);
    let state = coordinator.snapshot();
    assert!(state.store.read(WorkflowKind::DocumentAnalysis).primary.contains("first submission"));
    assert!(!state.busy.document);
}

#[tokio::test]
async fn test_validation_blocks_before_engine_call() {
    let engine = Arc::new(MockEngine::new());
    let coordinator = make_coordinator(engine.clone());

    let err = coordinator
        .submit_primary(
            WorkflowKind::SimilarCases,
            PrimaryPayload::CaseQuery("   ".into()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Validation(_)));

    let err = coordinator
        .submit_follow_up(WorkflowKind::SimilarCases, "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Validation(_)));

    // 追问不能指向追问/历史槽位
    let err = coordinator
        .submit_follow_up(WorkflowKind::History, "anything")
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Validation(_)));

    assert_eq!(engine.call_count(), 0);
    let state = coordinator.snapshot();
    assert!(state.inline_notice.is_some());
    assert!(!state.busy.any());
}

#[tokio::test]
async fn test_concurrent_workflows_run_in_parallel() {
    let engine = Arc::new(MockEngine::new().with_delay(Duration::from_millis(100)));
    let coordinator = make_coordinator(engine.clone());

    let (doc, similar) = tokio::join!(
        coordinator.submit_primary(
            WorkflowKind::DocumentAnalysis,
            PrimaryPayload::Document(DocumentPayload::from_text("lease agreement")),
        ),
        coordinator.submit_primary(
            WorkflowKind::SimilarCases,
            PrimaryPayload::CaseQuery("lease termination".into()),
        ),
    );
    doc.unwrap();
    similar.unwrap();

    let state = coordinator.snapshot();
    assert!(!state.store.read(WorkflowKind::DocumentAnalysis).primary.is_empty());
    assert!(!state.store.read(WorkflowKind::SimilarCases).primary.is_empty());
    assert_eq!(engine.call_count(), 2);
    assert_eq!(state.history.len(), 2);
}

#[tokio::test]
async fn test_engine_error_leaves_store_untouched() {
    let failing = Arc::new(
        MockEngine::new().with_failure(EngineCallError::Engine("model overloaded".into())),
    );
    let failing_coordinator = make_coordinator(failing);
    let err = failing_coordinator
        .submit_primary(
            WorkflowKind::SimilarCases,
            PrimaryPayload::CaseQuery("anything".into()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Engine(_)));

    let state = failing_coordinator.snapshot();
    assert!(state.store.read(WorkflowKind::SimilarCases).is_empty());
    assert_eq!(state.banner_error.as_deref(), Some("Engine error: model overloaded"));
    assert!(!state.busy.similar);
}

#[tokio::test]
async fn test_timeout_settles_as_transport_error() {
    let engine = Arc::new(MockEngine::new().with_delay(Duration::from_millis(500)));
    let coordinator = Arc::new(RequestCoordinator::new(
        SessionIdentity::from_raw("user-test"),
        engine,
        Duration::from_millis(50),
    ));

    let err = coordinator
        .submit_primary(
            WorkflowKind::SimilarCases,
            PrimaryPayload::CaseQuery("slow query".into()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Transport(_)));

    let state = coordinator.snapshot();
    assert!(!state.busy.similar);
    assert!(state.store.read(WorkflowKind::SimilarCases).is_empty());
    assert_eq!(state.banner_error.as_deref(), Some("Transport error: Request timed out"));

    // 槽位已释放，可以立即重试
    assert!(!coordinator.snapshot().busy.get(WorkflowKind::SimilarCases));
}

#[tokio::test]
async fn test_cancel_releases_busy_flag() {
    let engine = Arc::new(MockEngine::new().with_delay(Duration::from_millis(500)));
    let coordinator = make_coordinator(engine.clone());

    let pending = {
        let c = coordinator.clone();
        tokio::spawn(async move {
            c.submit_primary(
                WorkflowKind::DocumentAnalysis,
                PrimaryPayload::Document(DocumentPayload::from_text("to be cancelled")),
            )
            .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    coordinator.cancel(WorkflowKind::DocumentAnalysis).await;

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, SubmitError::Transport(_)));

    let state = coordinator.snapshot();
    assert!(!state.busy.document);
    assert!(state.store.read(WorkflowKind::DocumentAnalysis).is_empty());
}

#[tokio::test]
async fn test_load_history_entry_replays_without_engine_call() {
    let engine = Arc::new(MockEngine::new());
    let coordinator = make_coordinator(engine.clone());

    coordinator
        .submit_primary(
            WorkflowKind::SimilarCases,
            PrimaryPayload::CaseQuery("property dispute".into()),
        )
        .await
        .unwrap();
    let calls_after_submit = engine.call_count();

    coordinator.select_workflow(WorkflowKind::History).await;
    coordinator.load_history_entry(0).await;

    let state = coordinator.snapshot();
    assert_eq!(state.active, WorkflowKind::SimilarCases);
    assert!(state.store.read(WorkflowKind::SimilarCases).primary.starts_with("Similar cases:"));
    // 回放是纯本地操作
    assert_eq!(engine.call_count(), calls_after_submit);

    // 越界下标不改状态
    coordinator.load_history_entry(99).await;
    assert_eq!(coordinator.snapshot().active, WorkflowKind::SimilarCases);
}

#[tokio::test]
async fn test_refresh_history_replaces_wholesale() {
    let engine = Arc::new(MockEngine::new());
    let coordinator = make_coordinator(engine.clone());
    let session = SessionIdentity::from_raw("user-test");

    // 引擎侧先积累两条历史，再手动刷新
    use mitra::engines::AnalysisEngine;
    engine
        .analyze_document(&session, &DocumentPayload::from_text("first"))
        .await
        .unwrap();
    engine.find_similar_cases(&session, "second").await.unwrap();

    coordinator.refresh_history().await;
    let state = coordinator.snapshot();
    assert_eq!(state.history.len(), 2);
    assert_eq!(state.history[0].kind, HistoryKind::SimilarCases);

    // 再次刷新是幂等的整体替换
    coordinator.refresh_history().await;
    assert_eq!(coordinator.snapshot().history.len(), 2);
}

#[tokio::test]
async fn test_select_workflow_clears_inline_notice() {
    let engine = Arc::new(MockEngine::new());
    let coordinator = make_coordinator(engine);

    let _ = coordinator
        .submit_follow_up(WorkflowKind::FollowUp, "misplaced question")
        .await;
    assert!(coordinator.snapshot().inline_notice.is_some());

    coordinator.select_workflow(WorkflowKind::SimilarCases).await;
    let state = coordinator.snapshot();
    assert_eq!(state.active, WorkflowKind::SimilarCases);
    assert!(state.inline_notice.is_none());
}
