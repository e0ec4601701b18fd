//! 错误类型转换实现

use super::{ClientError, RemoteError};

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(format!("JSON 解析错误: {}", err))
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::config(format!("TOML 解析错误: {}", err))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::config(format!("IO 错误: {}", err))
    }
}

#[cfg(any(feature = "http", feature = "consul"))]
impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::status(status.as_u16(), err.to_string())
        } else {
            RemoteError::transport(err.to_string())
        }
    }
}

#[cfg(any(feature = "http", feature = "consul"))]
impl From<reqwest::Error> for super::RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            super::RegistryError::InvalidResponse(err.to_string())
        } else {
            super::RegistryError::Unreachable(err.to_string())
        }
    }
}
