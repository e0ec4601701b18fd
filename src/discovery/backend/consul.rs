//! Consul 注册中心后端
//!
//! 通过 `/v1/health/service/:service` 的阻塞查询（blocking query）持续拉取实例，
//! 每次返回都作为完整快照推送给订阅者。

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::discovery::backend::{Registry, Subscription, SubscriptionFeed};
use crate::discovery::config::ConsulConfig;
use crate::discovery::instance::{HealthStatus, InstanceFilter, RegistryEntry};
use crate::error::RegistryError;

/// 阻塞查询之外额外留给 HTTP 请求的时间
const REQUEST_SLACK: Duration = Duration::from_secs(5);

/// Consul 注册中心后端
#[derive(Clone)]
pub struct ConsulRegistry {
    http_client: HttpClient,
    consul_url: String,
    datacenter: Option<String>,
    token: Option<String>,
    wait: Duration,
    retry_interval: Duration,
}

impl ConsulRegistry {
    /// 创建新的 Consul 后端
    pub fn new(config: &ConsulConfig) -> Result<Self, RegistryError> {
        let http_client = HttpClient::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| RegistryError::Unreachable(format!("build http client: {}", e)))?;

        Ok(Self {
            http_client,
            consul_url: config.url.trim_end_matches('/').to_string(),
            datacenter: config.datacenter.clone(),
            token: config.token.clone(),
            wait: Duration::from_millis(config.wait_ms),
            retry_interval: Duration::from_millis(config.retry_interval_ms),
        })
    }

    /// 查询一次服务实例
    ///
    /// `index` 为 0 时立即返回；否则阻塞直到实例变化或 `wait` 到期。
    /// 返回实例快照与新的 `X-Consul-Index`。
    pub async fn query(
        &self,
        service: &str,
        filter: &InstanceFilter,
        index: u64,
    ) -> Result<(Vec<RegistryEntry>, u64), RegistryError> {
        let url = format!("{}/v1/health/service/{}", self.consul_url, service);

        let mut query_params: Vec<(&str, String)> = filter
            .tags
            .iter()
            .map(|tag| ("tag", tag.clone()))
            .collect();
        if filter.passing_only {
            query_params.push(("passing", "true".to_string()));
        }
        if index > 0 {
            query_params.push(("index", index.to_string()));
            query_params.push(("wait", format!("{}ms", self.wait.as_millis())));
        }
        if let Some(dc) = &self.datacenter {
            query_params.push(("dc", dc.clone()));
        }

        let mut request = self
            .http_client
            .get(&url)
            .query(&query_params)
            .timeout(self.wait + REQUEST_SLACK);
        if let Some(token) = &self.token {
            request = request.header("X-Consul-Token", token);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(RegistryError::Unreachable(format!(
                "consul returned status {}",
                resp.status()
            )));
        }

        let new_index = resp
            .headers()
            .get("X-Consul-Index")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let body = resp.bytes().await?;
        let entries = decode_health_entries(&body)?;
        Ok((entries, new_index))
    }

    async fn watch_loop(
        self,
        service: String,
        filter: InstanceFilter,
        mut index: u64,
        feed: SubscriptionFeed,
    ) {
        loop {
            let result = tokio::select! {
                _ = feed.closed() => break,
                result = self.query(&service, &filter, index) => result,
            };

            match result {
                Ok((entries, new_index)) => {
                    // 索引回退时按 Consul 约定重置
                    index = if new_index < index { 0 } else { new_index };
                    if !feed.send(Ok(entries)) {
                        break;
                    }
                    if index == 0 && !self.pause(&feed).await {
                        break;
                    }
                }
                Err(e) => {
                    debug!(service = %service, error = %e, "Consul query failed, retrying");
                    if !feed.send(Err(e)) || !self.pause(&feed).await {
                        break;
                    }
                }
            }
        }
        debug!(service = %service, "Consul watch stopped");
    }

    /// 等待一个重试间隔，订阅关闭时返回 false
    async fn pause(&self, feed: &SubscriptionFeed) -> bool {
        tokio::select! {
            _ = feed.closed() => false,
            _ = tokio::time::sleep(self.retry_interval) => true,
        }
    }
}

#[async_trait]
impl Registry for ConsulRegistry {
    async fn subscribe(
        &self,
        service: &str,
        filter: &InstanceFilter,
    ) -> Result<Subscription, RegistryError> {
        // 首次查询同步完成，Consul 不可达时订阅直接失败
        let (entries, index) = self.query(service, filter, 0).await?;

        let (feed, subscription) = Subscription::channel(service);
        feed.send(Ok(entries));

        tokio::spawn(self.clone().watch_loop(
            service.to_string(),
            filter.clone(),
            index,
            feed,
        ));
        Ok(subscription)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceEntry {
    node: ConsulNode,
    service: AgentService,
    #[serde(default)]
    checks: Vec<HealthCheck>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulNode {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AgentService {
    #[serde(default)]
    address: String,
    port: u16,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthCheck {
    status: String,
}

/// 解析 `/v1/health/service/:service` 的响应体
pub(crate) fn decode_health_entries(body: &[u8]) -> Result<Vec<RegistryEntry>, RegistryError> {
    let entries: Vec<ServiceEntry> = serde_json::from_slice(body)
        .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

    Ok(entries.into_iter().map(into_registry_entry).collect())
}

fn into_registry_entry(entry: ServiceEntry) -> RegistryEntry {
    // 服务未单独声明地址时使用节点地址
    let host = if entry.service.address.is_empty() {
        entry.node.address
    } else {
        entry.service.address
    };
    let address = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, entry.service.port)
    } else {
        format!("{}:{}", host, entry.service.port)
    };

    let status = entry
        .checks
        .iter()
        .map(|check| HealthStatus::from_check_status(&check.status))
        .fold(HealthStatus::Passing, HealthStatus::worst);

    RegistryEntry {
        address,
        tags: entry.service.tags.unwrap_or_default(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEALTH_RESPONSE: &str = r#"[
        {
            "Node": {"Node": "node-1", "Address": "10.0.0.1"},
            "Service": {"ID": "profilesvc-1", "Service": "profilesvc", "Address": "", "Port": 8080, "Tags": ["prod"]},
            "Checks": [{"CheckID": "serfHealth", "Status": "passing"}, {"CheckID": "service:profilesvc-1", "Status": "passing"}]
        },
        {
            "Node": {"Node": "node-2", "Address": "10.0.0.2"},
            "Service": {"ID": "profilesvc-2", "Service": "profilesvc", "Address": "192.168.1.7", "Port": 9090, "Tags": null},
            "Checks": [{"CheckID": "serfHealth", "Status": "passing"}, {"CheckID": "service:profilesvc-2", "Status": "critical"}]
        },
        {
            "Node": {"Node": "node-3", "Address": "10.0.0.3"},
            "Service": {"ID": "profilesvc-3", "Service": "profilesvc", "Address": "fd00::3", "Port": 8080, "Tags": ["prod", "canary"]},
            "Checks": [{"CheckID": "service:profilesvc-3", "Status": "warning"}]
        }
    ]"#;

    #[test]
    fn decodes_addresses_tags_and_health() {
        let entries = decode_health_entries(HEALTH_RESPONSE.as_bytes()).expect("decode");

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].address, "10.0.0.1:8080");
        assert_eq!(entries[0].tags, vec!["prod".to_string()]);
        assert_eq!(entries[0].status, HealthStatus::Passing);

        assert_eq!(entries[1].address, "192.168.1.7:9090");
        assert!(entries[1].tags.is_empty());
        assert_eq!(entries[1].status, HealthStatus::Critical);

        assert_eq!(entries[2].address, "[fd00::3]:8080");
        assert_eq!(entries[2].status, HealthStatus::Warning);
    }

    #[test]
    fn malformed_body_is_invalid_response() {
        let err = decode_health_entries(b"{\"not\": \"a list\"}").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidResponse(_)));
    }
}
