//! Upstream Credential Resolution
//!
//! Chooses the `Authorization` value forwarded to a backend.

use reqwest::header::HeaderValue;

use crate::error::{GatewayError, Result};

/// Build a `Bearer` header value from a raw API key
pub fn bearer(api_key: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
        .map_err(|e| GatewayError::Config(format!("Invalid API key format: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Resolve the forwarded credential
///
/// The caller's own `Authorization` header wins verbatim; an empty one counts
/// as absent. Otherwise the configured default is used, and with neither no
/// header is forwarded at all.
pub fn resolve_authorization(
    inbound: Option<&HeaderValue>,
    default: Option<&HeaderValue>,
) -> Option<HeaderValue> {
    inbound
        .filter(|value| !value.is_empty())
        .or(default)
        .cloned()
}
