//! Server Module
//!
//! HTTP surface of the gateway: the proxied completions route and the usage report.

pub mod proxy;
pub mod stream;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::client::UpstreamClient;
use crate::error::{GatewayError, Result};
use crate::metrics::UsageAggregator;
use crate::router::RoutingPolicy;

/// Proxied chat completions route
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Usage report route
pub const METRICS_PATH: &str = "/metrics";

/// State shared by every request handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub(crate) policy: Arc<RoutingPolicy>,
    pub(crate) upstream: UpstreamClient,
    pub(crate) metrics: Arc<UsageAggregator>,
    pub(crate) default_authorization: Option<HeaderValue>,
    pub(crate) max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        policy: RoutingPolicy,
        upstream: UpstreamClient,
        metrics: Arc<UsageAggregator>,
        default_authorization: Option<HeaderValue>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            upstream,
            metrics,
            default_authorization,
            max_body_bytes,
        }
    }
}

/// Build the gateway router
///
/// Wrong methods on a known path get 405 and unknown paths 404, both before
/// any body is read.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(COMPLETIONS_PATH, post(proxy::chat_completions))
        .route(METRICS_PATH, get(report_metrics))
        .fallback(not_found)
        .with_state(state)
}

/// `GET /metrics`
async fn report_metrics(State(state): State<AppState>) -> Result<Response> {
    let snapshot = state.metrics.snapshot();
    let body = serde_json::to_vec(&snapshot).map_err(|e| {
        tracing::error!(error = %e, "Failed to encode metrics JSON");
        GatewayError::Encode(e)
    })?;

    Ok((
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}

async fn not_found(uri: Uri) -> GatewayError {
    GatewayError::NotFound(uri.path().to_string())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
