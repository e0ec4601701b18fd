//! 注册中心工厂

use std::sync::Arc;
use tracing::info;

#[cfg(feature = "consul")]
use crate::discovery::backend::consul::ConsulRegistry;
use crate::config::ServiceConfig;
use crate::discovery::backend::Registry;
use crate::discovery::backend::memory::MemoryRegistry;
use crate::discovery::config::{BackendType, RegistryConfig};
use crate::discovery::instance::RegistryEntry;
use crate::error::{ClientError, Result};

/// 注册中心工厂
pub struct RegistryFactory;

impl RegistryFactory {
    /// 从配置创建注册中心后端
    ///
    /// `service` 用于静态后端：配置中的地址全部登记到该服务下，并带上
    /// 服务配置要求的全部标签，使静态实例总能通过标签过滤。
    pub fn create(config: &RegistryConfig, service: &ServiceConfig) -> Result<Arc<dyn Registry>> {
        match config.backend {
            BackendType::Consul => Self::create_consul(config),
            BackendType::Static => {
                if config.addresses.is_empty() {
                    return Err(ClientError::config(
                        "static registry requires at least one address",
                    ));
                }
                info!(
                    service = %service.name,
                    instances = config.addresses.len(),
                    tags = ?service.tags,
                    "Using static registry"
                );
                let registry = MemoryRegistry::new();
                registry.set_instances(
                    service.name.as_str(),
                    config
                        .addresses
                        .iter()
                        .map(|addr| RegistryEntry {
                            tags: service.tags.clone(),
                            ..RegistryEntry::new(addr.as_str())
                        })
                        .collect(),
                );
                Ok(Arc::new(registry))
            }
        }
    }

    #[cfg(feature = "consul")]
    fn create_consul(config: &RegistryConfig) -> Result<Arc<dyn Registry>> {
        info!(url = %config.consul.url, "Using consul registry");
        let registry = ConsulRegistry::new(&config.consul)
            .map_err(|e| ClientError::config(format!("consul registry: {}", e)))?;
        Ok(Arc::new(registry))
    }

    #[cfg(not(feature = "consul"))]
    fn create_consul(_config: &RegistryConfig) -> Result<Arc<dyn Registry>> {
        Err(ClientError::config(
            "consul backend requires the `consul` feature",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::instance::InstanceFilter;
    use futures::StreamExt;

    #[tokio::test]
    async fn static_backend_serves_configured_addresses() {
        let config = RegistryConfig {
            backend: BackendType::Static,
            addresses: vec!["10.0.0.1:8080".into(), "10.0.0.2:8080".into()],
            ..Default::default()
        };

        let service = ServiceConfig::default();
        let registry = RegistryFactory::create(&config, &service).expect("create");
        let mut subscription = registry
            .subscribe(&service.name, &InstanceFilter::default())
            .await
            .expect("subscribe");
        let entries = subscription.next().await.expect("snapshot").expect("entries");
        assert_eq!(entries.len(), 2);
        // 静态实例带上服务要求的标签
        let filter = InstanceFilter::new(service.tags.clone(), true);
        assert_eq!(filter.apply(&entries).len(), 2);
    }

    #[test]
    fn static_backend_without_addresses_is_rejected() {
        let config = RegistryConfig {
            backend: BackendType::Static,
            ..Default::default()
        };
        assert!(matches!(
            RegistryFactory::create(&config, &ServiceConfig::default()),
            Err(ClientError::Config(_))
        ));
    }
}
