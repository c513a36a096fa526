//! Tier Routing Policy
//!
//! Maps a prompt length onto one of the two backend tiers and its cost rate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{GatewayConfig, TierEndpoint};

/// Prompts up to and including this many characters go to the cheap tier
pub const DEFAULT_PROMPT_LENGTH_THRESHOLD: usize = 150;

/// $0.10 per million characters
pub const DEFAULT_CHEAP_COST_PER_CHAR: f64 = 0.000_000_1;

/// $1.50 per million characters
pub const DEFAULT_EXPENSIVE_COST_PER_CHAR: f64 = 0.000_001_5;

/// Backend tier a request is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    CheapModel,
    ExpensiveModel,
}

impl Tier {
    /// Every tier, in reporting order
    pub const ALL: [Tier; 2] = [Tier::CheapModel, Tier::ExpensiveModel];

    /// Label used in logs and in the metrics report
    pub fn label(self) -> &'static str {
        match self {
            Tier::CheapModel => "CheapModel",
            Tier::ExpensiveModel => "ExpensiveModel",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a single request goes and what it is estimated to cost
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    /// Full URL of the backend completions endpoint
    pub endpoint: String,

    /// Selected tier
    pub tier: Tier,

    /// Cost rate of the selected tier
    pub cost_per_char: f64,
}

impl RoutingDecision {
    /// Estimated cost of a prompt of the given length on this tier
    pub fn estimated_cost(&self, prompt_length: usize) -> f64 {
        prompt_length as f64 * self.cost_per_char
    }
}

/// Length-threshold routing between a cheap and an expensive backend
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingPolicy {
    threshold: usize,
    cheap: TierEndpoint,
    expensive: TierEndpoint,
}

impl RoutingPolicy {
    /// Create a policy from explicit tier endpoints
    pub fn new(threshold: usize, cheap: TierEndpoint, expensive: TierEndpoint) -> Self {
        Self {
            threshold,
            cheap,
            expensive,
        }
    }

    /// Build the policy described by a gateway configuration
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.prompt_length_threshold,
            config.cheap.clone(),
            config.expensive.clone(),
        )
    }

    /// Inclusive upper bound of the cheap tier
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Pick the tier for a prompt length
    pub fn tier_for(&self, prompt_length: usize) -> Tier {
        if prompt_length <= self.threshold {
            Tier::CheapModel
        } else {
            Tier::ExpensiveModel
        }
    }

    /// Route a prompt length to its backend
    pub fn route(&self, prompt_length: usize) -> RoutingDecision {
        let tier = self.tier_for(prompt_length);
        let endpoint = match tier {
            Tier::CheapModel => &self.cheap,
            Tier::ExpensiveModel => &self.expensive,
        };

        RoutingDecision {
            endpoint: endpoint.url.clone(),
            tier,
            cost_per_char: endpoint.cost_per_char,
        }
    }
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}
