//! HTTP 分析引擎
//!
//! 对接分析服务的四个端点：
//! - POST /api/analyze-document（multipart：user_id + file|text）
//! - POST /api/find-similar-cases（JSON：{query, user_id}）
//! - POST /api/ask-follow-up（JSON：{query, user_id}）
//! - GET  /api/user-history?user_id=...
//!
//! 服务端无论状态码都可能带 `{"error": ...}` 载荷（如非法 PDF 返回 400），
//! 所以先解析响应体再看状态码：有 error 字段算引擎错误，其余失败算传输错误。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;

use crate::engines::{AnalysisEngine, EngineCallError};
use crate::session::SessionIdentity;
use crate::workflow::{DocumentPayload, HistoryEntry};

/// 分析服务的 HTTP 客户端：持有 base_url 与带超时的 reqwest Client
pub struct HttpEngine {
    client: Client,
    base_url: String,
}

/// 分析端点的统一响应包络
#[derive(Debug, Deserialize)]
struct ResultEnvelope {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// 历史端点的响应包络
#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

/// 包络 -> 结果：error 字段优先，成功状态必须带 result
fn unwrap_result(status: reqwest::StatusCode, envelope: ResultEnvelope) -> Result<String, EngineCallError> {
    if let Some(error) = envelope.error {
        return Err(EngineCallError::Engine(error));
    }
    match envelope.result {
        Some(result) if status.is_success() => Ok(result),
        _ => Err(EngineCallError::Transport(format!("HTTP {}", status))),
    }
}

impl HttpEngine {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_envelope(&self, resp: reqwest::Response) -> Result<String, EngineCallError> {
        let status = resp.status();
        let envelope: ResultEnvelope = resp
            .json()
            .await
            .map_err(|e| EngineCallError::Transport(format!("Invalid response body: {}", e)))?;
        unwrap_result(status, envelope)
    }

    /// JSON 提交端点的公共路径（find-similar-cases 与 ask-follow-up 同构）
    async fn post_query(
        &self,
        path: &str,
        session: &SessionIdentity,
        query: &str,
    ) -> Result<String, EngineCallError> {
        let resp = self
            .client
            .post(self.url(path))
            .json(&serde_json::json!({
                "query": query,
                "user_id": session.as_str(),
            }))
            .send()
            .await
            .map_err(|e| EngineCallError::Transport(format!("Request failed: {}", e)))?;
        self.read_envelope(resp).await
    }
}

#[async_trait]
impl AnalysisEngine for HttpEngine {
    async fn analyze_document(
        &self,
        session: &SessionIdentity,
        payload: &DocumentPayload,
    ) -> Result<String, EngineCallError> {
        let mut form = multipart::Form::new().text("user_id", session.as_str().to_string());
        if let Some(file) = &payload.file {
            let part = multipart::Part::bytes(file.bytes.clone())
                .file_name(file.filename.clone())
                .mime_str("application/pdf")
                .map_err(|e| EngineCallError::Transport(e.to_string()))?;
            form = form.part("file", part);
        } else {
            form = form.text("text", payload.text_preview().to_string());
        }

        let resp = self
            .client
            .post(self.url("/api/analyze-document"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| EngineCallError::Transport(format!("Request failed: {}", e)))?;
        self.read_envelope(resp).await
    }

    async fn find_similar_cases(
        &self,
        session: &SessionIdentity,
        query: &str,
    ) -> Result<String, EngineCallError> {
        self.post_query("/api/find-similar-cases", session, query).await
    }

    async fn ask_follow_up(
        &self,
        session: &SessionIdentity,
        question: &str,
    ) -> Result<String, EngineCallError> {
        self.post_query("/api/ask-follow-up", session, question).await
    }

    async fn fetch_history(
        &self,
        session: &SessionIdentity,
    ) -> Result<Vec<HistoryEntry>, EngineCallError> {
        let resp = self
            .client
            .get(self.url("/api/user-history"))
            .query(&[("user_id", session.as_str())])
            .send()
            .await
            .map_err(|e| EngineCallError::Transport(format!("Request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EngineCallError::Transport(format!("HTTP {}", status)));
        }
        let envelope: HistoryEnvelope = resp
            .json()
            .await
            .map_err(|e| EngineCallError::Transport(format!("Invalid response body: {}", e)))?;
        Ok(envelope.history)
    }
}
