//! 客户端统一错误类型

use super::code::ErrorCode;
use super::remote_error::{RegistryError, RemoteError};
use thiserror::Error;

/// 调用链对外暴露的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// 构造阶段订阅注册中心失败（导致整个客户端构造失败）
    #[error("subscribe to service `{service}` failed: {source}")]
    SubscribeFailed {
        service: String,
        #[source]
        source: RegistryError,
    },

    /// 为某个实例构建操作句柄失败（记录日志并跳过该实例）
    #[error("build `{operation}` for instance `{instance}` failed: {reason}")]
    BuildFailed {
        operation: String,
        instance: String,
        reason: String,
    },

    /// 当前没有任何健康实例可供选择
    #[error("no healthy instances available")]
    NoHealthyInstances,

    /// 单次尝试失败（仅在重试耗尽时被包装后暴露）
    #[error("attempt {attempt} against `{instance}` failed: {source}")]
    AttemptFailed {
        attempt: usize,
        instance: String,
        #[source]
        source: RemoteError,
    },

    /// 所有尝试都失败，包装最后一次 `AttemptFailed`
    #[error("retries exhausted after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        last: Box<ClientError>,
    },

    /// 调用方取消
    #[error("call cancelled")]
    Cancelled,

    /// 客户端构造时未声明该操作
    #[error("operation `{0}` is not configured on this client")]
    OperationNotConfigured(String),

    /// 响应类型与操作不匹配
    #[error("unexpected response for `{operation}`")]
    UnexpectedResponse { operation: String },

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// 创建订阅失败错误
    pub fn subscribe_failed(service: impl Into<String>, source: RegistryError) -> Self {
        ClientError::SubscribeFailed {
            service: service.into(),
            source,
        }
    }

    /// 创建句柄构建失败错误
    pub fn build_failed(
        operation: impl Into<String>,
        instance: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ClientError::BuildFailed {
            operation: operation.into(),
            instance: instance.into(),
            reason: reason.into(),
        }
    }

    /// 创建配置错误
    pub fn config(reason: impl Into<String>) -> Self {
        ClientError::Config(reason.into())
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::SubscribeFailed { .. } => ErrorCode::SubscribeFailed,
            ClientError::BuildFailed { .. } => ErrorCode::BuildFailed,
            ClientError::NoHealthyInstances => ErrorCode::NoHealthyInstances,
            ClientError::AttemptFailed { .. } => ErrorCode::AttemptFailed,
            ClientError::RetriesExhausted { .. } => ErrorCode::RetriesExhausted,
            ClientError::Cancelled => ErrorCode::Cancelled,
            ClientError::OperationNotConfigured(_) => ErrorCode::OperationNotConfigured,
            ClientError::UnexpectedResponse { .. } => ErrorCode::UnexpectedResponse,
            ClientError::Config(_) => ErrorCode::ConfigurationError,
        }
    }

    /// 最后一次远程失败原因（如果有）
    pub fn remote_cause(&self) -> Option<&RemoteError> {
        match self {
            ClientError::AttemptFailed { source, .. } => Some(source),
            ClientError::RetriesExhausted { last, .. } => last.remote_cause(),
            _ => None,
        }
    }

    /// 判断调用方是否值得稍后重试整个调用
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RetriesExhausted { last, .. } => last.is_retryable(),
            ClientError::AttemptFailed { source, .. } => source.is_retryable(),
            other => other.code().is_retryable(),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ClientError>;
