//! 客户端配置
//!
//! TOML 配置文件示例：
//!
//! ```toml
//! [service]
//! name = "profileservice"
//! tags = ["prod"]
//! passing_only = true
//!
//! [registry]
//! backend = "consul"
//!
//! [registry.consul]
//! url = "http://localhost:8500"
//!
//! [retry]
//! max_attempts = 4
//! timeout_ms = 500
//!
//! [balancer]
//! strategy = "round_robin"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::discovery::RegistryConfig;
use crate::error::{ClientError, Result};
use crate::load_balancer::LoadBalanceStrategy;
use crate::retry::{BackoffKind, RetryPolicy, policy_for};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub service: ServiceConfig,
    pub registry: RegistryConfig,
    pub retry: RetryConfig,
    pub balancer: BalancerConfig,
}

/// 目标服务
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    /// 实例必须携带的全部标签
    pub tags: Vec<String>,
    pub passing_only: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "profileservice".to_string(),
            tags: vec!["prod".to_string()],
            passing_only: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    /// 单次尝试超时（毫秒）
    pub timeout_ms: u64,
    pub backoff: BackoffKind,
    /// 退避基础间隔（毫秒）
    pub base_delay_ms: u64,
    /// 退避最大间隔（毫秒）
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            timeout_ms: 500,
            backoff: BackoffKind::None,
            base_delay_ms: 50,
            max_delay_ms: 1_000,
        }
    }
}

impl RetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 构建对应的重试策略
    pub fn policy(&self) -> Arc<dyn RetryPolicy> {
        policy_for(
            self.backoff,
            self.max_attempts,
            self.timeout(),
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BalancerConfig {
    pub strategy: LoadBalanceStrategy,
}

impl ClientConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_service(mut self, name: impl Into<String>) -> Self {
        self.service.name = name.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.service.tags = tags;
        self
    }

    pub fn with_passing_only(mut self, passing_only: bool) -> Self {
        self.service.passing_only = passing_only;
        self
    }

    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.retry.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_strategy(mut self, strategy: LoadBalanceStrategy) -> Self {
        self.balancer.strategy = strategy;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.service.name.trim().is_empty() {
            return Err(ClientError::config("service.name must not be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ClientError::config("retry.max_attempts must be at least 1"));
        }
        if self.retry.timeout_ms == 0 {
            return Err(ClientError::config("retry.timeout_ms must be greater than 0"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ClientError::config(
                "retry.base_delay_ms must not exceed retry.max_delay_ms",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::BackendType;

    #[test]
    fn defaults_match_profile_service_deployment() {
        let config = ClientConfig::default();
        assert_eq!(config.service.name, "profileservice");
        assert_eq!(config.service.tags, vec!["prod".to_string()]);
        assert!(config.service.passing_only);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.timeout(), Duration::from_millis(500));
        assert_eq!(config.balancer.strategy, LoadBalanceStrategy::RoundRobin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml_over_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            [service]
            name = "profilesvc"
            tags = ["prod", "eu"]

            [registry]
            backend = "static"
            addresses = ["10.0.0.1:8080"]

            [retry]
            max_attempts = 2
            backoff = "exponential"

            [balancer]
            strategy = "random"
            "#,
        )
        .expect("parse config");

        assert_eq!(config.service.tags.len(), 2);
        assert!(config.service.passing_only);
        assert_eq!(config.registry.backend, BackendType::Static);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.timeout_ms, 500);
        assert_eq!(config.retry.backoff, BackoffKind::Exponential);
        assert_eq!(config.balancer.strategy, LoadBalanceStrategy::Random);
        assert_eq!(config.retry.policy().max_attempts(), 2);
    }

    #[test]
    fn rejects_zero_attempts_and_timeout() {
        let err = ClientConfig::default().with_max_attempts(0).validate();
        assert!(matches!(err, Err(ClientError::Config(_))));

        let err = ClientConfig::default()
            .with_timeout(Duration::ZERO)
            .validate();
        assert!(matches!(err, Err(ClientError::Config(_))));

        assert!(matches!(
            ClientConfig::from_toml("[retry]\nmax_attempts = \"many\""),
            Err(ClientError::Config(_))
        ));
    }
}
