//! Gateway Configuration
//!
//! Defines the configuration schema for the gateway and its two backend tiers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GatewayError, Result};
use crate::router::{
    DEFAULT_CHEAP_COST_PER_CHAR, DEFAULT_EXPENSIVE_COST_PER_CHAR, DEFAULT_PROMPT_LENGTH_THRESHOLD,
};

/// Environment variable holding the default upstream API key
pub const DEFAULT_API_KEY_ENV: &str = "LLM_GATEWAY_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Socket address the gateway listens on
    pub listen: String,

    /// Backend used for prompts at or below the threshold
    pub cheap: TierEndpoint,

    /// Backend used for prompts above the threshold
    pub expensive: TierEndpoint,

    /// Inclusive upper bound (in characters) of the cheap tier
    pub prompt_length_threshold: usize,

    /// Seconds to wait for an upstream response
    pub upstream_timeout_secs: u64,

    /// Largest inbound body the gateway buffers
    pub max_body_bytes: usize,

    /// Environment variable name for the default API key
    pub api_key_env: String,

    /// Default API key, resolved from `api_key_env` at load time
    #[serde(skip)]
    pub default_api_key: Option<String>,
}

/// A single backend tier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierEndpoint {
    /// Full URL of the chat completions endpoint
    pub url: String,

    /// Estimated cost per prompt character
    pub cost_per_char: f64,
}

impl TierEndpoint {
    pub fn new(url: impl Into<String>, cost_per_char: f64) -> Self {
        Self {
            url: url.into(),
            cost_per_char,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        reqwest::Url::parse(&self.url).map_err(|e| {
            GatewayError::Config(format!("Invalid {} url '{}': {}", name, self.url, e))
        })?;

        if !self.cost_per_char.is_finite() || self.cost_per_char < 0.0 {
            return Err(GatewayError::Config(format!(
                "{} cost_per_char must be a non-negative number, got {}",
                name, self.cost_per_char
            )));
        }

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            cheap: TierEndpoint::new(
                "http://localhost:8081/v1/chat/completions",
                DEFAULT_CHEAP_COST_PER_CHAR,
            ),
            expensive: TierEndpoint::new(
                "http://localhost:8082/v1/chat/completions",
                DEFAULT_EXPENSIVE_COST_PER_CHAR,
            ),
            prompt_length_threshold: DEFAULT_PROMPT_LENGTH_THRESHOLD,
            upstream_timeout_secs: 30,
            max_body_bytes: 10 * 1024 * 1024,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            default_api_key: None,
        }
    }
}

impl GatewayConfig {
    /// Upstream timeout as a duration
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Set the default API key, treating blank values as unset
    pub fn with_default_api_key(mut self, key: Option<String>) -> Self {
        self.default_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        self.cheap.validate("cheap")?;
        self.expensive.validate("expensive")?;

        if self.upstream_timeout_secs == 0 {
            return Err(GatewayError::Config(
                "upstream_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(GatewayError::Config(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.upstream_timeout(), Duration::from_secs(30));
        assert_eq!(config.prompt_length_threshold, 150);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{ "prompt_length_threshold": 40, "cheap": { "url": "http://cheap:9000/v1/chat/completions", "cost_per_char": 0.0 } }"#,
        )
        .unwrap();

        assert_eq!(config.prompt_length_threshold, 40);
        assert_eq!(config.cheap.cost_per_char, 0.0);
        assert_eq!(config.expensive, GatewayConfig::default().expensive);
        assert_eq!(config.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = GatewayConfig::default();
        config.cheap.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));

        let mut config = GatewayConfig::default();
        config.expensive.cost_per_char = -1.0;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.expensive.cost_per_char = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.upstream_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let config = GatewayConfig::default().with_default_api_key(Some("  ".to_string()));
        assert_eq!(config.default_api_key, None);

        let config = GatewayConfig::default().with_default_api_key(Some("sk-1".to_string()));
        assert_eq!(config.default_api_key.as_deref(), Some("sk-1"));
    }
}
