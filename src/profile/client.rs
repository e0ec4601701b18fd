//! 基于服务发现的 profile 客户端

use async_trait::async_trait;
use std::sync::Arc;

use crate::client::{ClientBuilder, ServiceClient};
use crate::context::CallContext;
use crate::discovery::Registry;
use crate::endpoint::OperationFactory;
use crate::error::{ClientError, Result};
use crate::profile::{
    Address, Profile, ProfileOperation, ProfileRequest, ProfileResponse, ProfileService,
};

/// profile 客户端
///
/// 每个方法委托给对应操作的调用链。
pub struct ProfileClient {
    inner: ServiceClient<ProfileRequest, ProfileResponse>,
}

impl ProfileClient {
    /// 为全部 profile 方法建立调用链
    pub async fn connect(
        builder: ClientBuilder,
        registry: &dyn Registry,
        factory: Arc<dyn OperationFactory<ProfileRequest, ProfileResponse>>,
    ) -> Result<Self> {
        Self::connect_only(builder, registry, factory, ProfileOperation::ALL).await
    }

    /// 只为指定方法建立调用链，其余方法返回 [`ClientError::OperationNotConfigured`]
    pub async fn connect_only(
        builder: ClientBuilder,
        registry: &dyn Registry,
        factory: Arc<dyn OperationFactory<ProfileRequest, ProfileResponse>>,
        operations: impl IntoIterator<Item = ProfileOperation>,
    ) -> Result<Self> {
        let descriptors = operations.into_iter().map(ProfileOperation::descriptor);
        let inner = builder.build(registry, factory, descriptors).await?;
        Ok(Self { inner })
    }

    pub fn service_client(&self) -> &ServiceClient<ProfileRequest, ProfileResponse> {
        &self.inner
    }

    /// 关闭全部调用链
    pub async fn shutdown(self) {
        self.inner.shutdown().await;
    }

    async fn call(&self, ctx: &CallContext, request: ProfileRequest) -> Result<ProfileResponse> {
        let descriptor = request.operation().descriptor();
        self.inner.invoke(ctx, &descriptor, request).await
    }
}

fn unexpected(operation: ProfileOperation) -> ClientError {
    ClientError::UnexpectedResponse {
        operation: operation.name().to_string(),
    }
}

fn expect_ack(operation: ProfileOperation, response: ProfileResponse) -> Result<()> {
    match response {
        ProfileResponse::Ack => Ok(()),
        _ => Err(unexpected(operation)),
    }
}

#[async_trait]
impl ProfileService for ProfileClient {
    async fn post_profile(&self, ctx: &CallContext, profile: Profile) -> Result<()> {
        let response = self.call(ctx, ProfileRequest::PostProfile { profile }).await?;
        expect_ack(ProfileOperation::PostProfile, response)
    }

    async fn get_profile(&self, ctx: &CallContext, id: &str) -> Result<Profile> {
        let request = ProfileRequest::GetProfile { id: id.to_string() };
        match self.call(ctx, request).await? {
            ProfileResponse::Profile(profile) => Ok(profile),
            _ => Err(unexpected(ProfileOperation::GetProfile)),
        }
    }

    async fn put_profile(&self, ctx: &CallContext, id: &str, profile: Profile) -> Result<()> {
        let request = ProfileRequest::PutProfile {
            id: id.to_string(),
            profile,
        };
        let response = self.call(ctx, request).await?;
        expect_ack(ProfileOperation::PutProfile, response)
    }

    async fn patch_profile(&self, ctx: &CallContext, id: &str, profile: Profile) -> Result<()> {
        let request = ProfileRequest::PatchProfile {
            id: id.to_string(),
            profile,
        };
        let response = self.call(ctx, request).await?;
        expect_ack(ProfileOperation::PatchProfile, response)
    }

    async fn delete_profile(&self, ctx: &CallContext, id: &str) -> Result<()> {
        let request = ProfileRequest::DeleteProfile { id: id.to_string() };
        let response = self.call(ctx, request).await?;
        expect_ack(ProfileOperation::DeleteProfile, response)
    }

    async fn get_addresses(&self, ctx: &CallContext, profile_id: &str) -> Result<Vec<Address>> {
        let request = ProfileRequest::GetAddresses {
            profile_id: profile_id.to_string(),
        };
        match self.call(ctx, request).await? {
            ProfileResponse::Addresses(addresses) => Ok(addresses),
            _ => Err(unexpected(ProfileOperation::GetAddresses)),
        }
    }

    async fn get_address(
        &self,
        ctx: &CallContext,
        profile_id: &str,
        address_id: &str,
    ) -> Result<Address> {
        let request = ProfileRequest::GetAddress {
            profile_id: profile_id.to_string(),
            address_id: address_id.to_string(),
        };
        match self.call(ctx, request).await? {
            ProfileResponse::Address(address) => Ok(address),
            _ => Err(unexpected(ProfileOperation::GetAddress)),
        }
    }

    async fn post_address(
        &self,
        ctx: &CallContext,
        profile_id: &str,
        address: Address,
    ) -> Result<()> {
        let request = ProfileRequest::PostAddress {
            profile_id: profile_id.to_string(),
            address,
        };
        let response = self.call(ctx, request).await?;
        expect_ack(ProfileOperation::PostAddress, response)
    }

    async fn delete_address(
        &self,
        ctx: &CallContext,
        profile_id: &str,
        address_id: &str,
    ) -> Result<()> {
        let request = ProfileRequest::DeleteAddress {
            profile_id: profile_id.to_string(),
            address_id: address_id.to_string(),
        };
        let response = self.call(ctx, request).await?;
        expect_ack(ProfileOperation::DeleteAddress, response)
    }
}
