//! 服务发现模块
//!
//! 订阅注册中心（Consul 或内存/静态），把注册中心推送的实例快照
//! 转换为过滤后的实例集合变化流。

pub mod backend;
pub mod config;
pub mod factory;
pub mod instance;
pub mod watcher;

#[cfg(feature = "consul")]
pub use backend::consul::ConsulRegistry;
pub use backend::memory::MemoryRegistry;
pub use backend::{Registry, RegistryUpdate, Subscription, SubscriptionFeed};
pub use config::{BackendType, ConsulConfig, RegistryConfig};
pub use factory::RegistryFactory;
pub use instance::{HealthStatus, InstanceFilter, InstanceSetChange, RegistryEntry};
pub use watcher::InstanceWatcher;
