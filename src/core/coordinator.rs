//! 请求协调器：会话/工作流状态的唯一写入方
//!
//! 负责：校验输入、按工作流维护忙碌标记（至多一个在途请求）、发起引擎调用
//! （带超时与取消令牌）、把结果写入结果槽位、成功后刷新历史账本，并在每次
//! 状态变更后通过 watch 通道向 UI 投影 UiState。
//!
//! 每个工作流的状态机：Idle → Submitting → {Success, Failed} → Idle；
//! 进入 Submitting 置忙碌标记，任何终态（含超时/取消）都会清除它。

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::core::{BusyFlags, SubmitError, UiState};
use crate::engines::{AnalysisEngine, EngineCallError, TemplateInfo};
use crate::session::SessionIdentity;
use crate::workflow::{DocumentPayload, HistoryLedger, ResultStore, WorkflowKind};

/// 主结果提交的载荷：与目标工作流一一对应
#[derive(Debug, Clone)]
pub enum PrimaryPayload {
    /// DocumentAnalysis：PDF 文件或纯文本
    Document(DocumentPayload),
    /// SimilarCases：法律情形描述
    CaseQuery(String),
}

/// 成功结果写入槽位的哪个字段
enum SlotWrite {
    Primary,
    FollowUp,
}

/// 协调器内部状态（单把锁保护，锁内不做 await）
struct CoordinatorState {
    store: ResultStore,
    ledger: HistoryLedger,
    active: WorkflowKind,
    busy: BusyFlags,
    banner_error: Option<String>,
    inline_notice: Option<String>,
    notice: Option<String>,
    templates: Option<Vec<(String, TemplateInfo)>>,
    /// 在途请求的取消令牌（按目标工作流）
    cancel_tokens: HashMap<WorkflowKind, CancellationToken>,
}

/// 请求协调器
///
/// 所有方法取 `&self`，可从多个任务并发调用：不同工作流的提交并行执行，
/// 同一工作流的重复提交被忙碌标记直接拒绝。ResultStore 与 HistoryLedger
/// 只能经由这里修改，展示层是纯读者。
pub struct RequestCoordinator {
    session: SessionIdentity,
    engine: Arc<dyn AnalysisEngine>,
    request_timeout: Duration,
    state: Mutex<CoordinatorState>,
    state_tx: watch::Sender<UiState>,
}

impl RequestCoordinator {
    pub fn new(
        session: SessionIdentity,
        engine: Arc<dyn AnalysisEngine>,
        request_timeout: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(UiState::default());
        Self {
            session,
            engine,
            request_timeout,
            state: Mutex::new(CoordinatorState {
                store: ResultStore::default(),
                ledger: HistoryLedger::default(),
                active: WorkflowKind::DocumentAnalysis,
                busy: BusyFlags::default(),
                banner_error: None,
                inline_notice: None,
                notice: None,
                templates: None,
                cancel_tokens: HashMap::new(),
            }),
            state_tx,
        }
    }

    /// 订阅 UiState 投影（展示层入口）
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state_tx.subscribe()
    }

    /// 最近一次发布的 UiState 快照
    pub fn snapshot(&self) -> UiState {
        self.state_tx.borrow().clone()
    }

    pub fn session(&self) -> &SessionIdentity {
        &self.session
    }

    fn publish(&self, st: &CoordinatorState) {
        let _ = self.state_tx.send_replace(UiState {
            active: st.active,
            store: st.store.clone(),
            history: st.ledger.entries().to_vec(),
            busy: st.busy,
            banner_error: st.banner_error.clone(),
            inline_notice: st.inline_notice.clone(),
            notice: st.notice.clone(),
            templates: st.templates.clone(),
        });
    }

    /// 提交主结果请求（文书分析 / 类案检索）
    pub async fn submit_primary(
        &self,
        workflow: WorkflowKind,
        payload: PrimaryPayload,
    ) -> Result<(), SubmitError> {
        if let Err(msg) = validate_primary(workflow, &payload) {
            return self.reject_inline(SubmitError::Validation(msg)).await;
        }

        let token = self.begin(workflow).await?;
        let outcome = match &payload {
            PrimaryPayload::Document(doc) => {
                self.guarded_call(token, self.engine.analyze_document(&self.session, doc))
                    .await
            }
            PrimaryPayload::CaseQuery(query) => {
                self.guarded_call(token, self.engine.find_similar_cases(&self.session, query))
                    .await
            }
        };
        self.settle(workflow, outcome, SlotWrite::Primary).await
    }

    /// 追问提交：目标工作流在调用点显式指定，不从共享输入态推断
    pub async fn submit_follow_up(
        &self,
        target: WorkflowKind,
        question: &str,
    ) -> Result<(), SubmitError> {
        if !target.accepts_follow_up() {
            return self
                .reject_inline(SubmitError::Validation(
                    "Follow-up questions can only target Document Analysis or Similar Cases"
                        .to_string(),
                ))
                .await;
        }
        if question.trim().is_empty() {
            return self
                .reject_inline(SubmitError::Validation(
                    "Please enter a follow-up question".to_string(),
                ))
                .await;
        }

        let token = self.begin(target).await?;
        let outcome = self
            .guarded_call(token, self.engine.ask_follow_up(&self.session, question))
            .await;
        self.settle(target, outcome, SlotWrite::FollowUp).await
    }

    /// 拉取历史并整体替换本地账本；失败仅记日志，旧快照保持可见
    pub async fn refresh_history(&self) {
        match self.engine.fetch_history(&self.session).await {
            Ok(entries) => {
                let mut st = self.state.lock().await;
                st.ledger.replace(entries);
                self.publish(&st);
            }
            Err(e) => {
                tracing::warn!("History refresh failed: {}", e);
            }
        }
    }

    /// 用户导航切换展示的工作流（不影响在途请求）
    pub async fn select_workflow(&self, kind: WorkflowKind) {
        let mut st = self.state.lock().await;
        st.active = kind;
        st.inline_notice = None;
        self.publish(&st);
    }

    /// 历史回放：把已算好的结果写回映射槽位并切换展示，不触发引擎调用
    pub async fn load_history_entry(&self, index: usize) {
        let mut st = self.state.lock().await;
        let Some(entry) = st.ledger.get(index).cloned() else {
            tracing::warn!("History entry {} not found", index);
            return;
        };
        let target = entry.kind.workflow();
        st.store.write_primary(target, entry.result);
        st.active = target;
        st.inline_notice = None;
        self.publish(&st);
    }

    /// 取消某工作流的在途请求（提交路径会以传输错误收尾并释放忙碌标记）
    pub async fn cancel(&self, workflow: WorkflowKind) {
        let st = self.state.lock().await;
        if let Some(token) = st.cancel_tokens.get(&workflow) {
            token.cancel();
        }
    }

    /// 取消当前展示工作流的在途请求
    pub async fn cancel_active(&self) {
        let st = self.state.lock().await;
        if let Some(token) = st.cancel_tokens.get(&st.active) {
            token.cancel();
        }
    }

    /// 缓存文书模板目录并投影给 UI（文书生成旁路流程）
    pub async fn set_templates(&self, templates: Vec<(String, TemplateInfo)>) {
        let mut st = self.state.lock().await;
        st.templates = Some(templates);
        self.publish(&st);
    }

    /// 发布一次性状态消息（旁路流程用，如文书已保存）
    pub async fn notify(&self, message: impl Into<String>) {
        let mut st = self.state.lock().await;
        st.notice = Some(message.into());
        self.publish(&st);
    }

    /// 发布横幅错误（旁路流程的失败也走横幅）
    pub async fn report_error(&self, message: impl Into<String>) {
        let mut st = self.state.lock().await;
        st.banner_error = Some(message.into());
        self.publish(&st);
    }

    /// 校验失败/重复提交：内联提示 + 返回错误，请求不出网
    async fn reject_inline(&self, err: SubmitError) -> Result<(), SubmitError> {
        let mut st = self.state.lock().await;
        st.inline_notice = Some(err.to_string());
        self.publish(&st);
        Err(err)
    }

    /// Idle → Submitting：占用忙碌标记并登记取消令牌；已忙则拒绝
    async fn begin(&self, workflow: WorkflowKind) -> Result<CancellationToken, SubmitError> {
        let mut st = self.state.lock().await;
        if st.busy.get(workflow) {
            let err = SubmitError::Busy(workflow);
            st.inline_notice = Some(err.to_string());
            self.publish(&st);
            return Err(err);
        }
        st.busy.set(workflow, true);
        st.inline_notice = None;
        st.banner_error = None;
        st.notice = None;
        let token = CancellationToken::new();
        st.cancel_tokens.insert(workflow, token.clone());
        self.publish(&st);
        Ok(token)
    }

    /// 引擎调用包一层超时与取消：两者都按传输错误收尾，忙碌标记不会卡死
    async fn guarded_call<F>(
        &self,
        token: CancellationToken,
        call: F,
    ) -> Result<String, EngineCallError>
    where
        F: Future<Output = Result<String, EngineCallError>>,
    {
        tokio::select! {
            _ = token.cancelled() => Err(EngineCallError::Transport("Request cancelled".to_string())),
            res = tokio::time::timeout(self.request_timeout, call) => match res {
                Ok(inner) => inner,
                Err(_) => Err(EngineCallError::Transport("Request timed out".to_string())),
            },
        }
    }

    /// 终态处理：清忙碌标记，成功写槽位、失败挂横幅；成功后再刷新历史
    async fn settle(
        &self,
        workflow: WorkflowKind,
        outcome: Result<String, EngineCallError>,
        write: SlotWrite,
    ) -> Result<(), SubmitError> {
        {
            let mut st = self.state.lock().await;
            st.cancel_tokens.remove(&workflow);
            st.busy.set(workflow, false);
            match &outcome {
                Ok(text) => {
                    match write {
                        SlotWrite::Primary => st.store.write_primary(workflow, text.clone()),
                        SlotWrite::FollowUp => st.store.write_follow_up(workflow, text.clone()),
                    }
                    st.banner_error = None;
                }
                Err(e) => {
                    // 引擎/传输错误不写槽位，旧结果保持可见
                    st.banner_error = Some(e.to_string());
                }
            }
            self.publish(&st);
        }

        match outcome {
            Ok(_) => {
                self.refresh_history().await;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// 主提交的前置校验：目标必须接受提交，且载荷与目标匹配
fn validate_primary(workflow: WorkflowKind, payload: &PrimaryPayload) -> Result<(), String> {
    if !workflow.accepts_primary() {
        return Err(format!("{} is not a submission target", workflow.title()));
    }
    match (workflow, payload) {
        (WorkflowKind::DocumentAnalysis, PrimaryPayload::Document(doc)) => doc.validate(),
        (WorkflowKind::SimilarCases, PrimaryPayload::CaseQuery(query)) => {
            if query.trim().is_empty() {
                Err("Please enter a legal query".to_string())
            } else {
                Ok(())
            }
        }
        _ => Err("Payload does not match the target workflow".to_string()),
    }
}
