//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 服务发现相关错误
/// - 2000-2999: 调用链相关错误
/// - 3000-3999: 远程调用相关错误
/// - 6000-6999: 配置相关错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 服务发现相关错误 (1000-1999)
    // ============================================================
    SubscribeFailed = 1000,
    RegistryUnavailable = 1001,
    RegistryResponseInvalid = 1002,
    BuildFailed = 1003,
    NoHealthyInstances = 1004,

    // ============================================================
    // 调用链相关错误 (2000-2999)
    // ============================================================
    AttemptFailed = 2000,
    RetriesExhausted = 2001,
    Cancelled = 2002,
    OperationNotConfigured = 2003,
    UnexpectedResponse = 2004,

    // ============================================================
    // 远程调用相关错误 (3000-3999)
    // ============================================================
    TransportError = 3000,
    OperationTimeout = 3001,
    RemoteStatus = 3002,
    RemoteApplicationError = 3003,
    EncodeFailed = 3004,
    DecodeFailed = 3005,

    // ============================================================
    // 配置相关错误 (6000-6999)
    // ============================================================
    ConfigurationError = 6000,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数字值创建错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::SubscribeFailed),
            1001 => Some(ErrorCode::RegistryUnavailable),
            1002 => Some(ErrorCode::RegistryResponseInvalid),
            1003 => Some(ErrorCode::BuildFailed),
            1004 => Some(ErrorCode::NoHealthyInstances),
            2000 => Some(ErrorCode::AttemptFailed),
            2001 => Some(ErrorCode::RetriesExhausted),
            2002 => Some(ErrorCode::Cancelled),
            2003 => Some(ErrorCode::OperationNotConfigured),
            2004 => Some(ErrorCode::UnexpectedResponse),
            3000 => Some(ErrorCode::TransportError),
            3001 => Some(ErrorCode::OperationTimeout),
            3002 => Some(ErrorCode::RemoteStatus),
            3003 => Some(ErrorCode::RemoteApplicationError),
            3004 => Some(ErrorCode::EncodeFailed),
            3005 => Some(ErrorCode::DecodeFailed),
            6000 => Some(ErrorCode::ConfigurationError),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SubscribeFailed => "SUBSCRIBE_FAILED",
            ErrorCode::RegistryUnavailable => "REGISTRY_UNAVAILABLE",
            ErrorCode::RegistryResponseInvalid => "REGISTRY_RESPONSE_INVALID",
            ErrorCode::BuildFailed => "BUILD_FAILED",
            ErrorCode::NoHealthyInstances => "NO_HEALTHY_INSTANCES",
            ErrorCode::AttemptFailed => "ATTEMPT_FAILED",
            ErrorCode::RetriesExhausted => "RETRIES_EXHAUSTED",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::OperationNotConfigured => "OPERATION_NOT_CONFIGURED",
            ErrorCode::UnexpectedResponse => "UNEXPECTED_RESPONSE",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::OperationTimeout => "OPERATION_TIMEOUT",
            ErrorCode::RemoteStatus => "REMOTE_STATUS",
            ErrorCode::RemoteApplicationError => "REMOTE_APPLICATION_ERROR",
            ErrorCode::EncodeFailed => "ENCODE_FAILED",
            ErrorCode::DecodeFailed => "DECODE_FAILED",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }

    /// 获取错误代码的类别
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Discovery,
            2000..=2999 => ErrorCategory::Invocation,
            3000..=3999 => ErrorCategory::Remote,
            _ => ErrorCategory::Configuration,
        }
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RegistryUnavailable
                | ErrorCode::TransportError
                | ErrorCode::OperationTimeout
                | ErrorCode::NoHealthyInstances
        )
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Discovery,
    Invocation,
    Remote,
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Discovery => write!(f, "DISCOVERY"),
            ErrorCategory::Invocation => write!(f, "INVOCATION"),
            ErrorCategory::Remote => write!(f, "REMOTE"),
            ErrorCategory::Configuration => write!(f, "CONFIGURATION"),
        }
    }
}
