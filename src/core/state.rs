//! 状态定义：UiState 投影与忙碌标记
//!
//! UI 只持有轻量的 UiState（当前工作流、槽位、历史、忙碌标记、错误）；
//! 完整状态由 RequestCoordinator 维护并在每次变更后投影到 UiState。

use serde::Serialize;

use crate::engines::TemplateInfo;
use crate::workflow::{HistoryEntry, ResultStore, WorkflowKind};

/// 各工作流的忙碌标记（每个槽位至多一个在途请求）
///
/// 追问请求占用其目标槽位的标记：对同一结果的主提交与追问不会并行，
/// 但 DocumentAnalysis 与 SimilarCases 互不相干、可以同时在途。
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct BusyFlags {
    pub document: bool,
    pub similar: bool,
}

impl BusyFlags {
    pub fn get(&self, kind: WorkflowKind) -> bool {
        match kind {
            WorkflowKind::DocumentAnalysis => self.document,
            WorkflowKind::SimilarCases => self.similar,
            // FollowUp/History 不接受提交，永远空闲
            WorkflowKind::FollowUp | WorkflowKind::History => false,
        }
    }

    pub fn set(&mut self, kind: WorkflowKind, busy: bool) {
        match kind {
            WorkflowKind::DocumentAnalysis => self.document = busy,
            WorkflowKind::SimilarCases => self.similar = busy,
            WorkflowKind::FollowUp | WorkflowKind::History => {}
        }
    }

    pub fn any(&self) -> bool {
        self.document || self.similar
    }
}

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    /// 当前展示的工作流（由导航或历史回放切换；与在途请求解耦）
    pub active: WorkflowKind,
    /// 四个结果槽位的快照
    pub store: ResultStore,
    /// 历史账本快照（最新在前）
    pub history: Vec<HistoryEntry>,
    pub busy: BusyFlags,
    /// 横幅错误（引擎/传输错误）
    pub banner_error: Option<String>,
    /// 输入框旁的内联提示（校验失败、重复提交）
    pub inline_notice: Option<String>,
    /// 一次性状态消息（如文书已保存）
    pub notice: Option<String>,
    /// 文书模板目录（按模板 ID 排序；None 表示尚未拉取）
    pub templates: Option<Vec<(String, TemplateInfo)>>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active: WorkflowKind::DocumentAnalysis,
            store: ResultStore::default(),
            history: Vec::new(),
            busy: BusyFlags::default(),
            banner_error: None,
            inline_notice: None,
            notice: None,
            templates: None,
        }
    }
}
