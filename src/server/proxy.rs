//! Chat Completions Proxy
//!
//! read → analyze → route → forward → stream back → record.

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, State};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName};
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::api::analyze;
use crate::client::resolve_authorization;
use crate::error::{GatewayError, Result};
use crate::server::stream::{metered_body, UsageGuard};
use crate::server::AppState;

/// Headers scoped to a single connection; the server sets its own framing
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy every (name, values) pair from an upstream response, in order
pub(crate) fn copy_response_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for name in from.keys() {
        if is_hop_by_hop(name) {
            continue;
        }
        for value in from.get_all(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// `POST /v1/chat/completions`
pub async fn chat_completions(
    State(state): State<AppState>,
    remote: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response> {
    let started = Instant::now();
    let remote = remote
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if let Some(size) = declared_length(&headers) {
        if size > state.max_body_bytes as u64 {
            tracing::warn!(remote = %remote, size, "Rejecting oversized request body");
            return Err(GatewayError::BodyTooLarge {
                size,
                limit: state.max_body_bytes,
            });
        }
    }

    // Buffered once: analyzed here, forwarded byte-for-byte below
    let body = to_bytes(body, state.max_body_bytes).await.map_err(|e| {
        tracing::error!(remote = %remote, error = %e, "Failed to read request body");
        GatewayError::ReadBody(e.to_string())
    })?;

    let prompt_length = analyze(&body).map_err(|e| {
        tracing::warn!(remote = %remote, error = %e, "Failed to analyze prompt body");
        e
    })?;

    let decision = state.policy.route(prompt_length);
    let estimated_cost = decision.estimated_cost(prompt_length);

    tracing::info!(
        "-> REQ: Received request from {} | Prompt Size: {} chars",
        remote,
        prompt_length
    );
    tracing::info!(
        "-> ROUTE: Prompt size ({}) <= {}? {}. Routing to {} (Est. Cost: ${:.6})",
        prompt_length,
        state.policy.threshold(),
        prompt_length <= state.policy.threshold(),
        decision.tier,
        estimated_cost
    );

    let authorization = resolve_authorization(
        headers.get(AUTHORIZATION),
        state.default_authorization.as_ref(),
    );
    let content_type = headers.get(CONTENT_TYPE).cloned();

    let upstream = state
        .upstream
        .forward(&decision, body, content_type, authorization)
        .await
        .map_err(|e| {
            tracing::error!(
                endpoint = %decision.endpoint,
                error = %e,
                "Failed to execute upstream request"
            );
            e
        })?;

    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();
    let guard = UsageGuard::new(
        Arc::clone(&state.metrics),
        decision.tier,
        estimated_cost,
        status,
        started,
    );

    let mut response = Response::new(metered_body(upstream, guard));
    *response.status_mut() = status;
    copy_response_headers(&upstream_headers, response.headers_mut());

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_copy_keeps_multi_values_in_order() {
        let mut from = HeaderMap::new();
        from.append("set-cookie", HeaderValue::from_static("a=1"));
        from.append("set-cookie", HeaderValue::from_static("b=2"));
        from.insert("x-request-id", HeaderValue::from_static("req-9"));

        let mut to = HeaderMap::new();
        copy_response_headers(&from, &mut to);

        let cookies: Vec<_> = to.get_all("set-cookie").iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
        assert_eq!(to["x-request-id"], "req-9");
    }

    #[test]
    fn test_copy_skips_hop_by_hop() {
        let mut from = HeaderMap::new();
        from.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        from.insert("connection", HeaderValue::from_static("keep-alive"));
        from.insert("content-type", HeaderValue::from_static("text/event-stream"));

        let mut to = HeaderMap::new();
        copy_response_headers(&from, &mut to);

        assert_eq!(to.len(), 1);
        assert_eq!(to[CONTENT_TYPE], "text/event-stream");
    }

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(declared_length(&headers), Some(42));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(declared_length(&headers), None);
    }
}
