//! Profile Service Client Library
//!
//! Service-discovery aware client for the profile service. Every remote method
//! gets its own invocation chain:
//!
//! ```text
//! registry ──▶ InstanceWatcher ──▶ EndpointResolver ──▶ LoadBalancer ──▶ Retry ──▶ caller
//!  (consul)     (filtered sets)     (handle snapshot)    (round robin)    (bounded)
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod load_balancer;
pub mod logging;
pub mod profile;
pub mod retry;

// Re-exports
pub use client::{ClientBuilder, ServiceClient};
pub use config::{BalancerConfig, ClientConfig, RetryConfig, ServiceConfig};
pub use context::CallContext;
pub use discovery::{
    BackendType, ConsulConfig, HealthStatus, InstanceFilter, InstanceSetChange, InstanceWatcher,
    MemoryRegistry, Registry, RegistryConfig, RegistryEntry, RegistryFactory, Subscription,
    SubscriptionFeed,
};
#[cfg(feature = "consul")]
pub use discovery::ConsulRegistry;
pub use endpoint::{
    EndpointResolver, HandleSnapshot, HandleSource, Operation, OperationDescriptor,
    OperationFactory, OperationHandle, ResolverState, factory_fn, operation_fn,
};
pub use error::{ClientError, ErrorCategory, ErrorCode, RegistryError, RemoteError, Result};
pub use load_balancer::{LoadBalanceStrategy, LoadBalancer};
pub use profile::{
    Address, Profile, ProfileClient, ProfileOperation, ProfileRequest, ProfileResponse,
    ProfileService,
};
#[cfg(feature = "http")]
pub use profile::HttpOperationFactory;
pub use retry::{BackoffKind, ExponentialBackoffPolicy, FixedRetryPolicy, Retry, RetryPolicy};
