//! 工作流定义
//!
//! WorkflowKind 是封闭枚举（文书分析 / 类案检索 / 追问 / 历史回放），
//! 取代原型里按 Tab 序号索引结果的做法，避免页签增删导致的错位。
//! 同时定义各工作流的提交载荷类型与校验。

mod history;
mod store;

pub use history::{HistoryEntry, HistoryKind, HistoryLedger};
pub use store::{ResultSlot, ResultStore};

use serde::Serialize;

/// 工作流类别（封闭枚举）
///
/// `History` 是伪工作流：仅作为历史回放的展示槽位，不接受提交。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkflowKind {
    /// 文书分析（上传 PDF 或粘贴文本）
    DocumentAnalysis,
    /// 类案检索（描述法律情形）
    SimilarCases,
    /// 追问问答
    FollowUp,
    /// 历史回放（伪工作流）
    History,
}

impl WorkflowKind {
    /// 侧边栏导航顺序
    pub const ALL: [WorkflowKind; 4] = [
        WorkflowKind::DocumentAnalysis,
        WorkflowKind::SimilarCases,
        WorkflowKind::FollowUp,
        WorkflowKind::History,
    ];

    /// Tab 循环切换的下一项
    pub fn next(&self) -> WorkflowKind {
        match self {
            WorkflowKind::DocumentAnalysis => WorkflowKind::SimilarCases,
            WorkflowKind::SimilarCases => WorkflowKind::FollowUp,
            WorkflowKind::FollowUp => WorkflowKind::History,
            WorkflowKind::History => WorkflowKind::DocumentAnalysis,
        }
    }

    /// 界面标题（与侧边栏导航一致）
    pub fn title(&self) -> &'static str {
        match self {
            WorkflowKind::DocumentAnalysis => "Document Analysis",
            WorkflowKind::SimilarCases => "Similar Cases",
            WorkflowKind::FollowUp => "Follow-up",
            WorkflowKind::History => "History",
        }
    }

    /// 是否可作为主结果的提交目标（FollowUp/History 槽位仅接受追问或回放写入）
    pub fn accepts_primary(&self) -> bool {
        matches!(self, WorkflowKind::DocumentAnalysis | WorkflowKind::SimilarCases)
    }

    /// 是否可作为追问目标（仅两个主工作流的结果面板渲染追问区）
    pub fn accepts_follow_up(&self) -> bool {
        matches!(self, WorkflowKind::DocumentAnalysis | WorkflowKind::SimilarCases)
    }
}

/// 上传的 PDF 文件（文件名 + 原始字节）
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 文书分析的提交载荷：PDF 文件或纯文本，二者至少其一
#[derive(Debug, Clone, Default)]
pub struct DocumentPayload {
    pub file: Option<PdfUpload>,
    pub text: Option<String>,
}

impl DocumentPayload {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            file: None,
            text: Some(text.into()),
        }
    }

    pub fn from_file(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file: Some(PdfUpload {
                filename: filename.into(),
                bytes,
            }),
            text: None,
        }
    }

    /// 校验：有文件时必须是 .pdf；无文件时文本不能为空白
    pub fn validate(&self) -> Result<(), String> {
        if let Some(file) = &self.file {
            if !file.filename.to_lowercase().ends_with(".pdf") {
                return Err("Only PDF files are supported".to_string());
            }
            return Ok(());
        }
        match &self.text {
            Some(text) if !text.trim().is_empty() => Ok(()),
            _ => Err("Please upload a PDF file or enter text".to_string()),
        }
    }

    /// 提交内容的文本形式（无文件时用于日志与预览）
    pub fn text_preview(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_payload_validation() {
        assert!(DocumentPayload::default().validate().is_err());
        assert!(DocumentPayload::from_text("   ").validate().is_err());
        assert!(DocumentPayload::from_text("Breach of contract").validate().is_ok());
        assert!(DocumentPayload::from_file("case.pdf", vec![1, 2, 3]).validate().is_ok());
        assert!(DocumentPayload::from_file("case.docx", vec![1]).validate().is_err());
    }

    #[test]
    fn test_submission_targets() {
        assert!(WorkflowKind::DocumentAnalysis.accepts_primary());
        assert!(WorkflowKind::SimilarCases.accepts_follow_up());
        assert!(!WorkflowKind::History.accepts_primary());
        assert!(!WorkflowKind::FollowUp.accepts_follow_up());
    }
}
