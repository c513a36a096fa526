//! Configuration Module
//!
//! Handles gateway configuration loading and validation.

pub mod gateway;
pub mod loader;

pub use gateway::{GatewayConfig, TierEndpoint, DEFAULT_API_KEY_ENV};
pub use loader::ConfigLoader;
