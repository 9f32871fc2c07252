//! 规则引擎错误类型
//!
//! 规则内容不合法、决策表指针无法解析都不是错误，只会降级为“未命中”；
//! 这里只定义会让一次评估不完整的错误。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则解析失败: {0}")]
    ParseError(String),

    #[error("外部数据源不可用: {source_name} - {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    #[error("触发器未找到: {0}")]
    TriggerNotFound(String),

    #[error("规则目录无效: {0}")]
    InvalidCatalog(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;

impl RuleError {
    /// 构造外部数据源错误
    pub fn source_unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::ParseError(_) => "RULE_PARSE_FAILED",
            Self::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            Self::TriggerNotFound(_) => "TRIGGER_NOT_FOUND",
            Self::InvalidCatalog(_) => "INVALID_CATALOG",
            Self::JsonError(_) => "JSON_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 引擎内部不重试，由调用方决定是否整体重新派发。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = RuleError::TriggerNotFound("auth.submitted".to_string());
        assert_eq!(err.code(), "TRIGGER_NOT_FOUND");
        assert_eq!(err.to_string(), "触发器未找到: auth.submitted");
    }

    #[test]
    fn test_is_retryable() {
        let err = RuleError::source_unavailable("decision_tables", "connection refused");
        assert!(err.is_retryable());
        assert_eq!(err.code(), "SOURCE_UNAVAILABLE");

        let parse = RuleError::ParseError("bad json".to_string());
        assert!(!parse.is_retryable());
    }
}
