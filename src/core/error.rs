//! 提交错误分类
//!
//! 四类错误对应四种呈现方式：Validation/Busy 在输入框旁内联提示（请求未出网），
//! Engine/Transport 以横幅展示。任何错误都不自动重试，由用户重新提交。

use thiserror::Error;

use crate::engines::EngineCallError;
use crate::workflow::WorkflowKind;

/// 一次提交可能失败的全部方式
#[derive(Error, Debug, Clone)]
pub enum SubmitError {
    /// 输入缺失或不合法，在任何网络调用之前拦截
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 目标工作流已有在途请求，重复提交被直接拒绝（不排队、不顶替）
    #[error("{} is busy with a previous request", .0.title())]
    Busy(WorkflowKind),

    /// 引擎返回了错误载荷
    #[error("Engine error: {0}")]
    Engine(String),

    /// 请求未能完成（连接失败、超时、取消）
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<EngineCallError> for SubmitError {
    fn from(err: EngineCallError) -> Self {
        match err {
            EngineCallError::Engine(msg) => SubmitError::Engine(msg),
            EngineCallError::Transport(msg) => SubmitError::Transport(msg),
        }
    }
}
