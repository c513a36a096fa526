//! Router Module
//!
//! Prompt-length tier selection and per-tier cost rates.

pub mod policy;

pub use policy::{
    RoutingDecision, RoutingPolicy, Tier, DEFAULT_CHEAP_COST_PER_CHAR,
    DEFAULT_EXPENSIVE_COST_PER_CHAR, DEFAULT_PROMPT_LENGTH_THRESHOLD,
};
