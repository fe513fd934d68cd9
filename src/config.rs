//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MITRA__*` 覆盖（双下划线表示嵌套，
//! 如 `MITRA__API__BASE_URL=http://10.0.0.2:5000`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub api: ApiSection,
}

/// [app] 段：会话 ID 文件与生成文书的输出目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 会话 ID 持久化路径
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    /// 生成文书的保存目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            session_file: default_session_file(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_session_file() -> PathBuf {
    PathBuf::from("config/session_id")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("documents")
}

/// [api] 段：分析服务与文书生成服务的地址、请求超时、Mock 开关
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// 分析服务地址（analyze-document / find-similar-cases / ask-follow-up / user-history）
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 文书生成服务地址（templates / generate-document）
    #[serde(default = "default_docgen_base_url")]
    pub docgen_base_url: String,
    /// 单次请求超时（秒）；到期按传输错误处理并释放忙碌标记
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// true 时使用内置 Mock 引擎（离线演示/调试用）
    #[serde(default)]
    pub mock: bool,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            docgen_base_url: default_docgen_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            mock: false,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_docgen_base_url() -> String {
    "http://localhost:5005".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            api: ApiSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 MITRA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MITRA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MITRA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.base_url, "http://localhost:5000");
        assert_eq!(cfg.api.request_timeout_secs, 60);
        assert!(!cfg.api.mock);
        assert_eq!(cfg.app.session_file, PathBuf::from("config/session_id"));
    }
}
