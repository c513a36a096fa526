//! tiergate - Prompt-Size LLM Gateway
//!
//! An OpenAI-compatible chat completions gateway that sends short prompts to a
//! cheap backend and long ones to an expensive backend, streams the backend's
//! answer back untouched, and keeps a running estimate of what it all cost.

use axum::http::HeaderValue;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod router;
pub mod server;

use client::{bearer, UpstreamClient};
use config::GatewayConfig;
use error::Result;
use metrics::{UsageAggregator, UsageMetrics};
use router::RoutingPolicy;
use server::AppState;

/// The gateway: routing policy, upstream client and usage counters
pub struct Gateway {
    /// Validated configuration
    config: GatewayConfig,

    /// Handler state, cloned into every request
    state: AppState,
}

impl Gateway {
    /// Create a gateway from a configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let default_authorization: Option<HeaderValue> =
            config.default_api_key.as_deref().map(bearer).transpose()?;
        let upstream = UpstreamClient::new(config.upstream_timeout())?;

        let state = AppState::new(
            RoutingPolicy::from_config(&config),
            upstream,
            Arc::new(UsageAggregator::new()),
            default_authorization,
            config.max_body_bytes,
        );

        Ok(Self { config, state })
    }

    /// The configuration this gateway runs with
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handle to the shared usage counters
    pub fn metrics(&self) -> Arc<UsageAggregator> {
        Arc::clone(&self.state.metrics)
    }

    /// Current usage snapshot
    pub fn usage(&self) -> UsageMetrics {
        self.state.metrics.snapshot()
    }

    /// The HTTP router, ready to be served or driven directly in tests
    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    /// Bind the configured address and serve until Ctrl-C / SIGTERM
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen).await?;
        self.serve_with_shutdown(listener, server::shutdown_signal())
            .await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            cheap = %self.config.cheap.url,
            expensive = %self.config.expensive.url,
            threshold = self.config.prompt_length_threshold,
            default_credential = self.state.default_authorization.is_some(),
            "LLM Gateway (Prompt-Size Router & Metrics) starting on http://{}",
            addr
        );

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}
