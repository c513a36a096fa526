//! Gateway Error Types
//!
//! Every failure a request can hit, and how each one is surfaced to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;

use crate::router::Tier;

/// Main error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration errors (invalid JSON, bad URLs, out of range values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No route matches the request path
    #[error("No route for {0}")]
    NotFound(String),

    /// The inbound body could not be read
    #[error("Failed to read request body: {0}")]
    ReadBody(String),

    /// The inbound body declares more bytes than the gateway accepts
    #[error("Request body of {size} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { size: u64, limit: usize },

    /// The inbound body is not a chat completion payload
    #[error("Invalid request format: must be a valid chat completion JSON payload ({0})")]
    MalformedPayload(#[source] serde_json::Error),

    /// The upstream could not be reached or the transport failed
    #[error("Error connecting to {tier} endpoint: {message}")]
    UpstreamUnavailable { tier: Tier, message: String },

    /// The upstream did not answer within the configured timeout
    #[error("{tier} endpoint did not respond within {}s", .timeout.as_secs())]
    UpstreamTimeout { tier: Tier, timeout: Duration },

    /// JSON encoding of a gateway-generated body failed
    #[error("Failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status surfaced to the caller
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamUnavailable { .. } | GatewayError::UpstreamTimeout { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Config(_)
            | GatewayError::ReadBody(_)
            | GatewayError::Encode(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotFound(_)
            | GatewayError::BodyTooLarge { .. }
            | GatewayError::MalformedPayload(_) => "invalid_request_error",
            GatewayError::UpstreamUnavailable { .. } | GatewayError::UpstreamTimeout { .. } => {
                "upstream_error"
            }
            _ => "api_error",
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            GatewayError::NotFound(_) => Some("not_found"),
            GatewayError::BodyTooLarge { .. } => Some("body_too_large"),
            GatewayError::MalformedPayload(_) => Some("invalid_json"),
            GatewayError::UpstreamTimeout { .. } => Some("upstream_timeout"),
            GatewayError::UpstreamUnavailable { .. } => Some("upstream_unavailable"),
            _ => None,
        }
    }
}

/// OpenAI-style error envelope
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                kind: self.kind(),
                code: self.code(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Internal(format!("IO error: {}", err))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
