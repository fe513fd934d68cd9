//! 文书模板渲染（旁路流程，不经过结果槽位）
//!
//! 文书生成服务独立部署（默认 5005 端口）：
//! - GET  /api/templates 返回 {模板 ID: {title, description, placeholders}}
//! - POST /api/generate-document 接收 {template_type, user_inputs}，
//!   返回 {document: base64(docx), filename}
//!
//! 这里只负责拿到解码后的字节；落盘由编排器完成。

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::engines::EngineCallError;

/// 模板描述（服务端目录条目）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// 需要用户填写的占位字段名（如 petitioner_name）
    #[serde(default)]
    pub placeholders: Vec<String>,
}

/// 渲染完成的文书：文件名 + 解码后的 docx 字节
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 文书模板渲染器
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// 拉取模板目录
    async fn list_templates(&self) -> Result<HashMap<String, TemplateInfo>, EngineCallError>;

    /// 渲染指定模板，字段值由调用方提供
    async fn render(
        &self,
        template_type: &str,
        user_inputs: &HashMap<String, String>,
    ) -> Result<RenderedDocument, EngineCallError>;
}

/// 文书生成服务的 HTTP 客户端
pub struct HttpDocumentRenderer {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateEnvelope {
    #[serde(default)]
    document: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpDocumentRenderer {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DocumentRenderer for HttpDocumentRenderer {
    async fn list_templates(&self) -> Result<HashMap<String, TemplateInfo>, EngineCallError> {
        let resp = self
            .client
            .get(format!("{}/api/templates", self.base_url))
            .send()
            .await
            .map_err(|e| EngineCallError::Transport(format!("Request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EngineCallError::Transport(format!("HTTP {}", status)));
        }
        resp.json()
            .await
            .map_err(|e| EngineCallError::Transport(format!("Invalid response body: {}", e)))
    }

    async fn render(
        &self,
        template_type: &str,
        user_inputs: &HashMap<String, String>,
    ) -> Result<RenderedDocument, EngineCallError> {
        let resp = self
            .client
            .post(format!("{}/api/generate-document", self.base_url))
            .json(&serde_json::json!({
                "template_type": template_type,
                "user_inputs": user_inputs,
            }))
            .send()
            .await
            .map_err(|e| EngineCallError::Transport(format!("Request failed: {}", e)))?;

        let status = resp.status();
        let envelope: GenerateEnvelope = resp
            .json()
            .await
            .map_err(|e| EngineCallError::Transport(format!("Invalid response body: {}", e)))?;

        if let Some(error) = envelope.error {
            return Err(EngineCallError::Engine(error));
        }
        let (document, filename) = match (envelope.document, envelope.filename) {
            (Some(d), Some(f)) if status.is_success() => (d, f),
            _ => return Err(EngineCallError::Transport(format!("HTTP {}", status))),
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(document.as_bytes())
            .map_err(|e| EngineCallError::Transport(format!("Invalid document payload: {}", e)))?;
        Ok(RenderedDocument { filename, bytes })
    }
}
