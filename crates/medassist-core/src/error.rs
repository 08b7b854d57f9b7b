//! 错误定义模块

use thiserror::Error;

/// 决策支持系统统一错误类型
#[derive(Error, Debug)]
pub enum MedError {
    #[error("配置错误: {0}")]
    Config(String),

    /// 持久化服务不可用（真实故障或故障模拟），与“未找到”严格区分
    #[error("数据源不可用: {0}")]
    DataUnavailable(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("文档索引错误: {0}")]
    Index(String),

    #[error("模型生成失败: {0}")]
    Generation(String),

    #[error("系统内部错误: {0}")]
    Internal(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

impl MedError {
    /// 是否属于“数据源不可用”类错误，调用方据此进入降级模式
    pub fn is_unavailable(&self) -> bool {
        matches!(self, MedError::DataUnavailable(_))
    }
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, MedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_distinct() {
        assert!(MedError::DataUnavailable("down".into()).is_unavailable());
        assert!(!MedError::Generation("超时".into()).is_unavailable());
        assert!(!MedError::Database("syntax".into()).is_unavailable());
    }

    #[test]
    fn test_display_is_localized() {
        let err = MedError::DataUnavailable("连接超时".into());
        assert_eq!(err.to_string(), "数据源不可用: 连接超时");
    }
}
