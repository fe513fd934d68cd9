//! 客户端编排器：命令循环
//!
//! 负责：加载配置、获取会话标识、按配置创建引擎（HTTP / Mock）、建立
//! cmd/state 双通道，并在后台任务中消费 UI 命令。提交类命令 spawn 到协调器上
//! 执行，循环本身从不阻塞在单个请求上——不同工作流的请求因此可以并行在途。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::config::{load_config, AppConfig};
use crate::core::{PrimaryPayload, RequestCoordinator, UiState};
use crate::engines::{
    AnalysisEngine, DocumentRenderer, HttpDocumentRenderer, HttpEngine, MockEngine,
};
use crate::session::SessionIdentity;
use crate::workflow::{DocumentPayload, WorkflowKind};

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交文书分析（PDF 或文本）
    AnalyzeDocument(DocumentPayload),
    /// 提交类案检索
    FindSimilarCases(String),
    /// 追问：目标工作流在发起处显式给定
    AskFollowUp {
        target: WorkflowKind,
        question: String,
    },
    /// 切换展示的工作流
    SelectWorkflow(WorkflowKind),
    /// 回放历史条目（账本下标，最新为 0）
    LoadHistoryEntry(usize),
    /// 手动刷新历史
    RefreshHistory,
    /// 拉取文书模板目录（结果经 UiState.templates 投影给选择器）
    ListTemplates,
    /// 生成文书（模板 ID + 字段值）
    GenerateDocument {
        template: String,
        fields: HashMap<String, String>,
    },
    /// 取消当前展示工作流的在途请求
    Cancel,
    /// 退出应用
    Quit,
}

/// 根据配置选择引擎后端（HTTP / Mock）
pub(crate) fn create_engine_from_config(cfg: &AppConfig) -> Arc<dyn AnalysisEngine> {
    if cfg.api.mock {
        tracing::warn!("Mock engine enabled, no requests will leave this process");
        Arc::new(MockEngine::new())
    } else {
        tracing::info!("Using analysis service at {}", cfg.api.base_url);
        Arc::new(HttpEngine::new(&cfg.api.base_url, cfg.api.request_timeout_secs))
    }
}

/// 创建客户端运行时：返回命令发送端与状态接收端；后台任务消费命令并更新状态
pub async fn create_client(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(mpsc::UnboundedSender<Command>, watch::Receiver<UiState>)> {
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let session = SessionIdentity::obtain(&cfg.app.session_file)?;
    let engine = create_engine_from_config(&cfg);
    let coordinator = Arc::new(RequestCoordinator::new(
        session,
        engine,
        std::time::Duration::from_secs(cfg.api.request_timeout_secs),
    ));
    let renderer: Arc<dyn DocumentRenderer> = Arc::new(HttpDocumentRenderer::new(
        &cfg.api.docgen_base_url,
        cfg.api.request_timeout_secs,
    ));
    let output_dir = cfg.app.output_dir.clone();

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
    let state_rx = coordinator.subscribe();
    spawn_command_loop(coordinator, renderer, output_dir, cmd_rx);

    Ok((cmd_tx, state_rx))
}

/// 启动命令循环后台任务（create_client 与测试共用的装配点）
pub fn spawn_command_loop(
    coordinator: Arc<RequestCoordinator>,
    renderer: Arc<dyn DocumentRenderer>,
    output_dir: PathBuf,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // 启动即拉一次历史（对应原型页面挂载时的 fetchHistory）
        coordinator.refresh_history().await;

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::AnalyzeDocument(payload) => {
                    let c = coordinator.clone();
                    tokio::spawn(async move {
                        if let Err(e) = c
                            .submit_primary(
                                WorkflowKind::DocumentAnalysis,
                                PrimaryPayload::Document(payload),
                            )
                            .await
                        {
                            tracing::warn!("Document analysis failed: {}", e);
                        }
                    });
                }
                Command::FindSimilarCases(query) => {
                    let c = coordinator.clone();
                    tokio::spawn(async move {
                        if let Err(e) = c
                            .submit_primary(
                                WorkflowKind::SimilarCases,
                                PrimaryPayload::CaseQuery(query),
                            )
                            .await
                        {
                            tracing::warn!("Similar-case search failed: {}", e);
                        }
                    });
                }
                Command::AskFollowUp { target, question } => {
                    let c = coordinator.clone();
                    tokio::spawn(async move {
                        if let Err(e) = c.submit_follow_up(target, &question).await {
                            tracing::warn!("Follow-up failed: {}", e);
                        }
                    });
                }
                Command::SelectWorkflow(kind) => {
                    coordinator.select_workflow(kind).await;
                }
                Command::LoadHistoryEntry(index) => {
                    coordinator.load_history_entry(index).await;
                }
                Command::RefreshHistory => {
                    let c = coordinator.clone();
                    tokio::spawn(async move { c.refresh_history().await });
                }
                Command::ListTemplates => {
                    let c = coordinator.clone();
                    let r = renderer.clone();
                    tokio::spawn(async move {
                        match r.list_templates().await {
                            Ok(catalog) => {
                                let mut templates: Vec<_> = catalog.into_iter().collect();
                                templates.sort_by(|a, b| a.0.cmp(&b.0));
                                c.set_templates(templates).await;
                            }
                            Err(e) => c.report_error(e.to_string()).await,
                        }
                    });
                }
                Command::GenerateDocument { template, fields } => {
                    let c = coordinator.clone();
                    let r = renderer.clone();
                    let dir = output_dir.clone();
                    tokio::spawn(async move {
                        generate_document(c, r, dir, template, fields).await;
                    });
                }
                Command::Cancel => {
                    coordinator.cancel_active().await;
                }
                Command::Quit => break,
            }
        }
    })
}

/// 文书生成旁路流程：渲染、落盘、结果以通知/横幅呈现
async fn generate_document(
    coordinator: Arc<RequestCoordinator>,
    renderer: Arc<dyn DocumentRenderer>,
    output_dir: PathBuf,
    template: String,
    fields: HashMap<String, String>,
) {
    match renderer.render(&template, &fields).await {
        Ok(doc) => {
            let path = output_dir.join(&doc.filename);
            if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
                coordinator
                    .report_error(format!("Failed to create {}: {}", output_dir.display(), e))
                    .await;
                return;
            }
            match tokio::fs::write(&path, &doc.bytes).await {
                Ok(()) => {
                    coordinator
                        .notify(format!("Document saved: {}", path.display()))
                        .await;
                }
                Err(e) => {
                    coordinator
                        .report_error(format!("Failed to save document: {}", e))
                        .await;
                }
            }
        }
        Err(e) => {
            coordinator.report_error(e.to_string()).await;
        }
    }
}
