//! Mock 分析引擎（离线演示与测试用，无需服务端）
//!
//! 回显式结果 + 内置历史账本：每次成功提交都像真实服务端一样记一条历史
//! （预览取输入前 200 字符），fetch_history 返回最新在前的快照。
//! 可选注入人为延迟与固定失败，供并发/忙碌/错误路径测试使用。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::engines::{AnalysisEngine, EngineCallError};
use crate::session::SessionIdentity;
use crate::workflow::{DocumentPayload, HistoryEntry, HistoryKind};

/// 服务端风格的预览：前 200 字符 + "..."
fn make_preview(text: &str) -> String {
    let head: String = text.chars().take(200).collect();
    format!("{}...", head)
}

/// Mock 引擎：回显输入并维护自己的历史账本
#[derive(Default)]
pub struct MockEngine {
    delay: Option<Duration>,
    failure: Option<EngineCallError>,
    calls: AtomicUsize,
    history: Mutex<Vec<HistoryEntry>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次提交调用前先等待 delay（模拟慢引擎）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 所有提交调用固定返回该错误（历史拉取不受影响）
    pub fn with_failure(mut self, failure: EngineCallError) -> Self {
        self.failure = Some(failure);
        self
    }

    /// 已发生的提交调用次数（不含 fetch_history）
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter_call(&self) -> Result<(), EngineCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn record(&self, kind: HistoryKind, preview: Option<String>, query: Option<String>, result: &str) {
        let entry = HistoryEntry {
            kind,
            document_preview: preview,
            query,
            result: result.to_string(),
            timestamp: Some(chrono::Utc::now().timestamp_millis()),
        };
        // 最新在前，与协调器对账本顺序的约定一致
        self.history.lock().unwrap().insert(0, entry);
    }
}

#[async_trait]
impl AnalysisEngine for MockEngine {
    async fn analyze_document(
        &self,
        _session: &SessionIdentity,
        payload: &DocumentPayload,
    ) -> Result<String, EngineCallError> {
        self.enter_call().await?;
        let source = match &payload.file {
            Some(file) => file.filename.clone(),
            None => payload.text_preview().to_string(),
        };
        let result = format!("Analysis: {}", make_preview(&source));
        self.record(
            HistoryKind::DocumentAnalysis,
            Some(make_preview(&source)),
            None,
            &result,
        );
        Ok(result)
    }

    async fn find_similar_cases(
        &self,
        _session: &SessionIdentity,
        query: &str,
    ) -> Result<String, EngineCallError> {
        self.enter_call().await?;
        let result = format!("Similar cases: {}", query);
        self.record(HistoryKind::SimilarCases, None, Some(query.to_string()), &result);
        Ok(result)
    }

    async fn ask_follow_up(
        &self,
        _session: &SessionIdentity,
        question: &str,
    ) -> Result<String, EngineCallError> {
        self.enter_call().await?;
        let result = format!("Answer: {}", question);
        self.record(HistoryKind::FollowUp, None, Some(question.to_string()), &result);
        Ok(result)
    }

    async fn fetch_history(
        &self,
        _session: &SessionIdentity,
    ) -> Result<Vec<HistoryEntry>, EngineCallError> {
        Ok(self.history.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_history_newest_first() {
        let engine = MockEngine::new();
        let session = SessionIdentity::from_raw("user-test");

        engine
            .analyze_document(&session, &DocumentPayload::from_text("Breach of contract"))
            .await
            .unwrap();
        engine.find_similar_cases(&session, "property dispute").await.unwrap();

        let history = engine.fetch_history(&session).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, HistoryKind::SimilarCases);
        assert_eq!(history[1].kind, HistoryKind::DocumentAnalysis);
        assert!(history[1].preview().starts_with("Breach of contract"));
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure_skips_recording() {
        let engine = MockEngine::new().with_failure(EngineCallError::Engine("boom".into()));
        let session = SessionIdentity::from_raw("user-test");

        let err = engine.find_similar_cases(&session, "anything").await.unwrap_err();
        assert!(matches!(err, EngineCallError::Engine(_)));
        assert!(engine.fetch_history(&session).await.unwrap().is_empty());
    }
}
