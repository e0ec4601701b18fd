//! 注册中心配置

use serde::{Deserialize, Serialize};

/// 注册中心配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryConfig {
    /// 后端类型：consul, static
    pub backend: BackendType,

    /// Consul 配置（backend = consul 时使用）
    pub consul: ConsulConfig,

    /// 静态实例列表（backend = static 时使用）
    pub addresses: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Consul,
            consul: ConsulConfig::default(),
            addresses: Vec::new(),
        }
    }
}

/// 后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    Consul,
    Static,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "consul" => Ok(BackendType::Consul),
            "static" | "memory" => Ok(BackendType::Static),
            _ => Err(format!("Unknown backend type: {}", s)),
        }
    }
}

/// Consul 连接配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsulConfig {
    /// Consul HTTP 地址
    pub url: String,

    /// 数据中心
    pub datacenter: Option<String>,

    /// ACL token
    pub token: Option<String>,

    /// 阻塞查询最长等待时间（毫秒）
    pub wait_ms: u64,

    /// 查询失败后的重试间隔（毫秒）
    pub retry_interval_ms: u64,

    /// 连接超时（毫秒）
    pub connect_timeout_ms: u64,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8500".to_string(),
            datacenter: None,
            token: None,
            wait_ms: 30_000,
            retry_interval_ms: 1_000,
            connect_timeout_ms: 2_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_parses_aliases() {
        assert_eq!("Consul".parse::<BackendType>(), Ok(BackendType::Consul));
        assert_eq!("memory".parse::<BackendType>(), Ok(BackendType::Static));
        assert!("etcd".parse::<BackendType>().is_err());
    }
}
