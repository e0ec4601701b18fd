//! 注册中心实例条目与实例集合

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 实例健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// 所有检查通过
    #[default]
    Passing,
    /// 存在告警检查
    Warning,
    /// 存在失败检查
    Critical,
}

impl HealthStatus {
    /// 按 Consul 检查状态字符串解析
    pub fn from_check_status(status: &str) -> Self {
        match status {
            "passing" => HealthStatus::Passing,
            "warning" => HealthStatus::Warning,
            _ => HealthStatus::Critical,
        }
    }

    /// 多个检查合并后的最差状态
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        use HealthStatus::*;
        match (self, other) {
            (Critical, _) | (_, Critical) => Critical,
            (Warning, _) | (_, Warning) => Warning,
            _ => Passing,
        }
    }
}

/// 注册中心推送的一条实例记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// 实例地址（host:port 或 URI）
    pub address: String,

    /// 实例标签
    pub tags: Vec<String>,

    /// 健康状态
    pub status: HealthStatus,
}

impl RegistryEntry {
    /// 创建健康的实例记录
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            tags: Vec::new(),
            status: HealthStatus::Passing,
        }
    }

    /// 添加标签
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// 设置健康状态
    pub fn with_status(mut self, status: HealthStatus) -> Self {
        self.status = status;
        self
    }

    /// 是否健康
    pub fn is_passing(&self) -> bool {
        self.status == HealthStatus::Passing
    }

    /// 检查是否包含全部要求的标签
    pub fn matches_tags(&self, required: &[String]) -> bool {
        required.iter().all(|tag| self.tags.iter().any(|t| t == tag))
    }
}

/// 实例过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceFilter {
    /// 实例必须携带的标签
    pub tags: Vec<String>,

    /// 是否只保留健康实例
    pub passing_only: bool,
}

impl InstanceFilter {
    pub fn new(tags: Vec<String>, passing_only: bool) -> Self {
        Self { tags, passing_only }
    }

    /// 判断实例是否满足过滤条件
    pub fn matches(&self, entry: &RegistryEntry) -> bool {
        entry.matches_tags(&self.tags) && (!self.passing_only || entry.is_passing())
    }

    /// 从注册中心快照计算实例地址集合
    pub fn apply(&self, entries: &[RegistryEntry]) -> BTreeSet<String> {
        entries
            .iter()
            .filter(|entry| self.matches(entry))
            .map(|entry| entry.address.clone())
            .collect()
    }
}

/// 实例集合变化事件
///
/// 总是携带完整快照，重复应用同一事件不会产生额外效果。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstanceSetChange {
    pub instances: BTreeSet<String>,
}

impl InstanceSetChange {
    pub fn new(instances: BTreeSet<String>) -> Self {
        Self { instances }
    }

    pub fn contains(&self, instance: &str) -> bool {
        self.instances.contains(instance)
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for InstanceSetChange {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            instances: iter.into_iter().map(Into::into).collect(),
        }
    }
}
