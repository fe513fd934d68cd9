//! 历史账本
//!
//! 服务端为每个会话维护一份有序操作日志（最新在前），客户端只做整体快照替换，
//! 不做增量合并。回放历史条目是纯本地操作：把已算好的结果写回对应槽位，不会
//! 再触发引擎调用。

use serde::{Deserialize, Serialize};

use super::WorkflowKind;

/// 历史条目类别（与服务端 `type` 字段对应）
///
/// 服务端未来可能新增类别，未识别的字符串落入 `Unknown`，回放时退回 History 槽位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    DocumentAnalysis,
    SimilarCases,
    FollowUp,
    #[serde(other)]
    Unknown,
}

impl HistoryKind {
    /// 映射到回放目标工作流
    pub fn workflow(&self) -> WorkflowKind {
        match self {
            HistoryKind::DocumentAnalysis => WorkflowKind::DocumentAnalysis,
            HistoryKind::SimilarCases => WorkflowKind::SimilarCases,
            HistoryKind::FollowUp => WorkflowKind::FollowUp,
            HistoryKind::Unknown => WorkflowKind::History,
        }
    }
}

/// 单条历史记录（服务端 JSON 原样映射）
///
/// 文书分析条目带 `document_preview`，检索/追问条目带 `query`；`timestamp`
/// 为毫秒时间戳，旧服务端可能不返回。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl HistoryEntry {
    /// 列表展示用的预览文本：文书预览 > 查询文本 > 占位
    pub fn preview(&self) -> &str {
        self.document_preview
            .as_deref()
            .or(self.query.as_deref())
            .unwrap_or("Analysis")
    }
}

/// 历史账本：服务端快照的本地只读副本（最新在前）
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    /// 整体替换为新快照（唯一的写入方式）
    pub fn replace(&mut self, entries: Vec<HistoryEntry>) {
        self.entries = entries;
    }

    pub fn newest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_entries() {
        let raw = r#"[
            {"type": "document_analysis", "task": "summary", "document_preview": "IN THE SUPREME COURT...", "result": "Analysis text"},
            {"type": "similar_cases", "query": "property dispute", "result": "Cases text", "timestamp": 1700000000000},
            {"type": "follow_up", "query": "What about appeals?", "result": "Answer text"}
        ]"#;
        let entries: Vec<HistoryEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind, HistoryKind::DocumentAnalysis);
        assert_eq!(entries[0].preview(), "IN THE SUPREME COURT...");
        assert_eq!(entries[1].preview(), "property dispute");
        assert_eq!(entries[1].timestamp, Some(1_700_000_000_000));
        assert_eq!(entries[2].kind.workflow(), WorkflowKind::FollowUp);
    }

    #[test]
    fn test_unknown_kind_falls_back_to_history() {
        let raw = r#"{"type": "case_prediction", "result": "..."}"#;
        let entry: HistoryEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.kind, HistoryKind::Unknown);
        assert_eq!(entry.kind.workflow(), WorkflowKind::History);
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut ledger = HistoryLedger::default();
        ledger.replace(vec![HistoryEntry {
            kind: HistoryKind::SimilarCases,
            document_preview: None,
            query: Some("old".into()),
            result: "old result".into(),
            timestamp: None,
        }]);
        assert_eq!(ledger.len(), 1);

        ledger.replace(Vec::new());
        assert!(ledger.is_empty());
        assert!(ledger.newest().is_none());
    }
}
