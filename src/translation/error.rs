//! 翻译模块统一错误处理
//!
//! 定义翻译流程中的错误类型，区分可重试错误和永久性错误。

use thiserror::Error;

/// 翻译模块的统一错误类型
#[derive(Error, Debug)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 翻译请求超时
    #[error("翻译超时: {0}")]
    Timeout(String),

    /// 命中速率限制
    #[error("速率限制: {0}")]
    RateLimited(String),

    /// 后端服务返回错误
    #[error("[{service}] 后端错误: {message}")]
    Backend { service: String, message: String },

    /// 后端服务不可用（未配置凭据等）
    #[error("[{service}] 服务不可用")]
    Unavailable { service: String },

    /// 缓存操作失败
    #[error("缓存错误: {0}")]
    Cache(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl TranslationError {
    /// 创建带服务名的后端错误
    pub fn backend(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            service: service.into(),
            message: message.into(),
        }
    }

    /// 判断错误是否可以通过切换后端或重试恢复
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(_)
                | Self::RateLimited(_)
                | Self::Backend { .. }
                | Self::Unavailable { .. }
        )
    }

    /// 返回产生此错误的服务名（如果有）
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Backend { service, .. } | Self::Unavailable { service } => Some(service),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON处理失败: {}", err))
    }
}

/// 翻译模块结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;
