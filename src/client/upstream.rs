//! Upstream HTTP Client
//!
//! Forwards a buffered chat completion body to the backend picked by the router.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::time::Duration;

use crate::error::{GatewayError, Result};
use crate::router::RoutingDecision;

/// HTTP client for the backend tiers
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    /// Inner reqwest client
    client: Client,

    /// Bound on connecting, receiving the response head, and each body read
    timeout: Duration,
}

impl UpstreamClient {
    /// Create a new client with a fixed upstream timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// The configured upstream timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST the body, unchanged, to the decision's endpoint
    ///
    /// Only `Content-Type` and `Authorization` are forwarded. Any response,
    /// whatever its status, is returned as-is with its body still unread; only
    /// transport failures and timeouts are errors. A body that stalls for
    /// longer than the timeout between chunks fails while it is being read.
    pub async fn forward(
        &self,
        decision: &RoutingDecision,
        body: Bytes,
        content_type: Option<HeaderValue>,
        authorization: Option<HeaderValue>,
    ) -> Result<Response> {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, content_type);
        }
        if let Some(authorization) = authorization {
            headers.insert(AUTHORIZATION, authorization);
        }

        let request = self
            .client
            .post(&decision.endpoint)
            .headers(headers)
            .body(body)
            .send();

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_timeout() => Err(GatewayError::UpstreamTimeout {
                tier: decision.tier,
                timeout: self.timeout,
            }),
            Ok(Err(e)) => Err(GatewayError::UpstreamUnavailable {
                tier: decision.tier,
                message: e.to_string(),
            }),
            Err(_) => Err(GatewayError::UpstreamTimeout {
                tier: decision.tier,
                timeout: self.timeout,
            }),
        }
    }
}
