//! 负载均衡模块
//!
//! 从当前句柄快照中为每次调用选择一个端点

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ClientError, Result};

/// 负载均衡策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategy {
    /// 轮询（Round Robin）
    #[default]
    RoundRobin,
    /// 随机（Random）
    Random,
}

impl std::str::FromStr for LoadBalanceStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round_robin" | "roundrobin" | "rr" => Ok(LoadBalanceStrategy::RoundRobin),
            "random" => Ok(LoadBalanceStrategy::Random),
            _ => Err(format!("Unknown load balance strategy: {}", s)),
        }
    }
}

/// 负载均衡器
///
/// 轮询计数器在每次选择时递增（不论调用结果），空快照不会推进计数器。
#[derive(Debug)]
pub struct LoadBalancer {
    strategy: LoadBalanceStrategy,
    round_robin_index: AtomicUsize,
}

impl LoadBalancer {
    /// 创建新的负载均衡器
    pub fn new(strategy: LoadBalanceStrategy) -> Self {
        Self {
            strategy,
            round_robin_index: AtomicUsize::new(0),
        }
    }

    pub fn strategy(&self) -> LoadBalanceStrategy {
        self.strategy
    }

    /// 选择一个端点
    ///
    /// 快照为空时返回 [`ClientError::NoHealthyInstances`]。
    pub fn select<'a, T>(&self, endpoints: &'a [T]) -> Result<&'a T> {
        if endpoints.is_empty() {
            return Err(ClientError::NoHealthyInstances);
        }

        let index = match self.strategy {
            LoadBalanceStrategy::RoundRobin => self.next_round_robin(endpoints.len()),
            LoadBalanceStrategy::Random => rand::thread_rng().gen_range(0..endpoints.len()),
        };
        Ok(&endpoints[index])
    }

    /// 轮询选择
    fn next_round_robin(&self, len: usize) -> usize {
        let index = self.round_robin_index.fetch_add(1, Ordering::Relaxed);
        index % len
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new(LoadBalanceStrategy::RoundRobin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn round_robin_visits_each_endpoint_once_per_cycle() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::RoundRobin);
        let endpoints = ["a", "b", "c"];

        let first: Vec<_> = (0..3).map(|_| *balancer.select(&endpoints).unwrap()).collect();
        let second: Vec<_> = (0..3).map(|_| *balancer.select(&endpoints).unwrap()).collect();

        assert_eq!(first.iter().collect::<HashSet<_>>().len(), 3);
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_snapshot_is_no_healthy_instances() {
        let balancer = LoadBalancer::default();
        let endpoints: [&str; 0] = [];

        assert_eq!(
            balancer.select(&endpoints),
            Err(ClientError::NoHealthyInstances)
        );
        // 空选择不推进计数器
        assert_eq!(balancer.select(&["a", "b"]), Ok(&"a"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_selections_are_evenly_distributed() {
        const ROUNDS: usize = 50;
        let balancer = std::sync::Arc::new(LoadBalancer::default());
        let endpoints = std::sync::Arc::new(["a", "b", "c", "d"]);

        let tasks: Vec<_> = (0..endpoints.len() * ROUNDS)
            .map(|_| {
                let balancer = balancer.clone();
                let endpoints = endpoints.clone();
                tokio::spawn(async move { *balancer.select(endpoints.as_slice()).unwrap() })
            })
            .collect();

        let mut hits = std::collections::HashMap::new();
        for task in tasks {
            *hits.entry(task.await.unwrap()).or_insert(0) += 1;
        }
        assert_eq!(hits.len(), endpoints.len());
        assert!(hits.values().all(|&count| count == ROUNDS));
    }

    #[test]
    fn random_stays_in_range() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::Random);
        let endpoints = [1, 2, 3];
        for _ in 0..100 {
            assert!(endpoints.contains(balancer.select(&endpoints).unwrap()));
        }
    }

    #[test]
    fn strategy_parses_from_config_strings() {
        assert_eq!(
            "round_robin".parse::<LoadBalanceStrategy>(),
            Ok(LoadBalanceStrategy::RoundRobin)
        );
        assert_eq!(
            "Random".parse::<LoadBalanceStrategy>(),
            Ok(LoadBalanceStrategy::Random)
        );
        assert!("least_conn".parse::<LoadBalanceStrategy>().is_err());
    }
}
