//! Mitra - LegalMitra 终端客户端
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 请求协调器、客户端编排、提交错误与 UiState 投影
//! - **engines**: 分析引擎抽象（HTTP / Mock）与文书模板渲染
//! - **session**: 会话标识的获取与持久化
//! - **workflow**: 工作流枚举、结果槽位与历史账本
//! - **ui**: Ratatui TUI 界面

pub mod config;
pub mod core;
pub mod engines;
pub mod session;
pub mod ui;
pub mod workflow;
