//! Usage Metrics
//!
//! Process-wide request and estimated cost counters, shared by every handler.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::router::Tier;

/// Point-in-time view of the gateway's usage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetrics {
    /// Requests that completed an upstream exchange
    pub total_requests: u64,

    /// Accrued estimated cost
    pub total_cost_usd: f64,

    /// Requests per tier
    #[serde(rename = "modelUsageCount")]
    pub model_usage: BTreeMap<Tier, u64>,
}

impl UsageMetrics {
    fn seeded() -> Self {
        Self {
            total_requests: 0,
            total_cost_usd: 0.0,
            model_usage: Tier::ALL.into_iter().map(|tier| (tier, 0)).collect(),
        }
    }

    /// Requests recorded for one tier
    pub fn requests_for(&self, tier: Tier) -> u64 {
        self.model_usage.get(&tier).copied().unwrap_or(0)
    }
}

impl Default for UsageMetrics {
    fn default() -> Self {
        Self::seeded()
    }
}

/// Thread-safe usage aggregator
///
/// `record` and `snapshot` each run in a single critical section, so a
/// snapshot never sees `total_requests` and `model_usage` disagree.
#[derive(Debug, Default)]
pub struct UsageAggregator {
    inner: Mutex<UsageMetrics>,
}

impl UsageAggregator {
    /// Create an aggregator with every tier seeded at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one routed request and its estimated cost
    pub fn record(&self, tier: Tier, cost: f64) {
        let mut metrics = self.inner.lock();
        metrics.total_requests += 1;
        metrics.total_cost_usd += cost.max(0.0);
        *metrics.model_usage.entry(tier).or_insert(0) += 1;
    }

    /// Consistent copy of the current counters
    pub fn snapshot(&self) -> UsageMetrics {
        self.inner.lock().clone()
    }
}
