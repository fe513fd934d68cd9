//! 外部引擎抽象
//!
//! 四个分析端点（文书分析 / 类案检索 / 追问 / 历史拉取）统一收在 AnalysisEngine
//! trait 后面：协调器只认 trait，后端可以是 HTTP 服务或内置 Mock。
//! 文书模板渲染走独立的 DocumentRenderer trait（端口不同、与核心槽位无关）。

mod http;
mod mock;
mod templates;

pub use http::HttpEngine;
pub use mock::MockEngine;
pub use templates::{DocumentRenderer, HttpDocumentRenderer, RenderedDocument, TemplateInfo};

use async_trait::async_trait;
use thiserror::Error;

use crate::session::SessionIdentity;
use crate::workflow::{DocumentPayload, HistoryEntry};

/// 引擎调用失败的两种形态
///
/// - `Engine`：请求送达且服务端返回了 `{"error": ...}` 载荷
/// - `Transport`：请求根本没完成（连接失败、超时、响应不可解析、被取消）
#[derive(Error, Debug, Clone)]
pub enum EngineCallError {
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// 分析引擎：协调器的唯一外呼通道
///
/// 每个调用都带 SessionIdentity，服务端据此维护会话历史。追问请求不携带
/// 目标工作流——与哪个结果关联是客户端自己的约定。
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// 文书分析：PDF 文件或纯文本
    async fn analyze_document(
        &self,
        session: &SessionIdentity,
        payload: &DocumentPayload,
    ) -> Result<String, EngineCallError>;

    /// 类案检索
    async fn find_similar_cases(
        &self,
        session: &SessionIdentity,
        query: &str,
    ) -> Result<String, EngineCallError>;

    /// 追问问答（服务端以整个会话历史为上下文）
    async fn ask_follow_up(
        &self,
        session: &SessionIdentity,
        question: &str,
    ) -> Result<String, EngineCallError>;

    /// 拉取该会话的完整历史（最新在前）
    async fn fetch_history(
        &self,
        session: &SessionIdentity,
    ) -> Result<Vec<HistoryEntry>, EngineCallError>;
}
