//! 结果存储
//!
//! 每个工作流一个 ResultSlot（主结果 + 追问结果）。写主结果会同时清空该槽位的
//! 追问结果——这是存储层不变量，任何调用方都绕不过去：旧追问是针对旧主结果的，
//! 主结果换了之后继续展示会误导用户。

use serde::Serialize;

use super::WorkflowKind;

/// 单个工作流的结果槽位
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSlot {
    /// 主结果（分析 / 检索 / 回放文本），空串表示尚无结果
    pub primary: String,
    /// 追问结果，仅对 DocumentAnalysis / SimilarCases 有意义
    pub follow_up: String,
}

impl ResultSlot {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.follow_up.is_empty()
    }
}

/// 四个工作流的结果存储（按具名字段持有，不做序号索引）
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultStore {
    document: ResultSlot,
    similar: ResultSlot,
    follow_up: ResultSlot,
    history: ResultSlot,
}

impl ResultStore {
    fn slot_mut(&mut self, kind: WorkflowKind) -> &mut ResultSlot {
        match kind {
            WorkflowKind::DocumentAnalysis => &mut self.document,
            WorkflowKind::SimilarCases => &mut self.similar,
            WorkflowKind::FollowUp => &mut self.follow_up,
            WorkflowKind::History => &mut self.history,
        }
    }

    /// 读取某工作流的槽位
    pub fn read(&self, kind: WorkflowKind) -> &ResultSlot {
        match kind {
            WorkflowKind::DocumentAnalysis => &self.document,
            WorkflowKind::SimilarCases => &self.similar,
            WorkflowKind::FollowUp => &self.follow_up,
            WorkflowKind::History => &self.history,
        }
    }

    /// 写入主结果，并清空该槽位的追问结果（存储层不变量）
    pub fn write_primary(&mut self, kind: WorkflowKind, text: impl Into<String>) {
        let slot = self.slot_mut(kind);
        slot.primary = text.into();
        slot.follow_up.clear();
    }

    /// 写入追问结果，主结果保持不变
    pub fn write_follow_up(&mut self, kind: WorkflowKind, text: impl Into<String>) {
        self.slot_mut(kind).follow_up = text.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_primary_clears_follow_up() {
        let mut store = ResultStore::default();
        store.write_primary(WorkflowKind::DocumentAnalysis, "first analysis");
        store.write_follow_up(WorkflowKind::DocumentAnalysis, "first answer");
        assert_eq!(store.read(WorkflowKind::DocumentAnalysis).follow_up, "first answer");

        store.write_primary(WorkflowKind::DocumentAnalysis, "second analysis");
        let slot = store.read(WorkflowKind::DocumentAnalysis);
        assert_eq!(slot.primary, "second analysis");
        assert!(slot.follow_up.is_empty());
    }

    #[test]
    fn test_follow_up_keeps_primary() {
        let mut store = ResultStore::default();
        store.write_primary(WorkflowKind::SimilarCases, "cases found");
        store.write_follow_up(WorkflowKind::SimilarCases, "appeals are possible");
        let slot = store.read(WorkflowKind::SimilarCases);
        assert_eq!(slot.primary, "cases found");
        assert_eq!(slot.follow_up, "appeals are possible");
    }

    #[test]
    fn test_slots_are_independent() {
        let mut store = ResultStore::default();
        store.write_primary(WorkflowKind::DocumentAnalysis, "doc");
        store.write_primary(WorkflowKind::SimilarCases, "cases");
        assert_eq!(store.read(WorkflowKind::DocumentAnalysis).primary, "doc");
        assert_eq!(store.read(WorkflowKind::SimilarCases).primary, "cases");
        assert!(store.read(WorkflowKind::History).is_empty());
    }
}
