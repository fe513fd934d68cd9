//! 会话标识
//!
//! 每个安装实例一个不透明 ID（`user-<uuid>`），首次使用时生成并落盘一次，
//! 之后整个进程生命周期内只读。原型把它放在浏览器 localStorage 里到处取用；
//! 这里改为在构造协调器时显式注入，所有外呼与历史查询都带上它。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// 会话标识：创建后不可变，可被所有请求安全共享
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    /// 读取持久化的会话 ID；不存在时生成新 ID 并写入（恰好一次）
    pub fn obtain(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Ok(existing) = fs::read_to_string(path) {
            let existing = existing.trim();
            if !existing.is_empty() {
                return Ok(Self(existing.to_string()));
            }
        }

        let id = format!("user-{}", uuid::Uuid::new_v4().simple());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create session dir {}", parent.display()))?;
        }
        fs::write(path, &id)
            .with_context(|| format!("Failed to persist session id to {}", path.display()))?;
        tracing::info!("Created new session identity");
        Ok(Self(id))
    }

    /// 仅用于测试/内嵌场景：直接使用给定 ID，不落盘
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 默认持久化路径（config 目录下，与配置文件同级）
pub fn default_session_file() -> PathBuf {
    PathBuf::from("config/session_id")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obtain_creates_and_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_id");

        let first = SessionIdentity::obtain(&path).unwrap();
        assert!(first.as_str().starts_with("user-"));
        assert!(path.exists());

        let second = SessionIdentity::obtain(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_blank_file_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_id");
        std::fs::write(&path, "  \n").unwrap();

        let id = SessionIdentity::obtain(&path).unwrap();
        assert!(id.as_str().starts_with("user-"));
    }
}
