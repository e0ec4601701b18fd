//! 外部协作方错误：注册中心与远程调用

use super::code::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// 注册中心错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// 注册中心不可达
    #[error("registry unreachable: {0}")]
    Unreachable(String),

    /// 注册中心返回了无法解析的数据
    #[error("invalid registry response: {0}")]
    InvalidResponse(String),
}

impl RegistryError {
    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::Unreachable(_) => ErrorCode::RegistryUnavailable,
            RegistryError::InvalidResponse(_) => ErrorCode::RegistryResponseInvalid,
        }
    }
}

/// 单次远程调用的失败原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// 网络/传输层错误（连接失败、连接被重置等）
    #[error("transport error: {0}")]
    Transport(String),

    /// 单次尝试超时
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// 远端返回非成功状态码
    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// 远端在成功响应中携带业务错误
    #[error("remote application error: {0}")]
    Application(String),

    /// 请求编码失败
    #[error("encode request failed: {0}")]
    Encode(String),

    /// 响应解码失败
    #[error("decode response failed: {0}")]
    Decode(String),
}

impl RemoteError {
    /// 创建传输错误
    pub fn transport(reason: impl Into<String>) -> Self {
        RemoteError::Transport(reason.into())
    }

    /// 创建状态码错误
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        RemoteError::Status {
            status,
            message: message.into(),
        }
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            RemoteError::Transport(_) => ErrorCode::TransportError,
            RemoteError::Timeout(_) => ErrorCode::OperationTimeout,
            RemoteError::Status { .. } => ErrorCode::RemoteStatus,
            RemoteError::Application(_) => ErrorCode::RemoteApplicationError,
            RemoteError::Encode(_) => ErrorCode::EncodeFailed,
            RemoteError::Decode(_) => ErrorCode::DecodeFailed,
        }
    }

    /// 判断是否为可重试的错误
    ///
    /// 5xx 与 429 视为实例侧的瞬时故障，其余状态码视为请求本身的问题。
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Status { status, .. } => *status >= 500 || *status == 429,
            other => other.code().is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(RemoteError::transport("connection reset").is_retryable());
        assert!(RemoteError::Timeout(Duration::from_millis(500)).is_retryable());
        assert!(RemoteError::status(503, "unavailable").is_retryable());
        assert!(RemoteError::status(429, "slow down").is_retryable());
        assert!(!RemoteError::status(404, "not found").is_retryable());
        assert!(!RemoteError::Decode("eof".into()).is_retryable());
    }

    #[test]
    fn registry_error_codes() {
        assert_eq!(
            RegistryError::Unreachable("refused".into()).code(),
            ErrorCode::RegistryUnavailable
        );
        assert_eq!(
            RegistryError::InvalidResponse("bad json".into()).code(),
            ErrorCode::RegistryResponseInvalid
        );
    }
}
