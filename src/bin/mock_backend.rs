//! Stand-in model backend for running the gateway locally.

use std::time::Duration;

use anyhow::Context;
use axum::http::{header, Uri};
use axum::response::IntoResponse;
use axum::Router;
use clap::{Parser, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Flavor {
    Cheap,
    Expensive,
}

impl Flavor {
    fn default_listen(self) -> &'static str {
        match self {
            Flavor::Cheap => "0.0.0.0:8081",
            Flavor::Expensive => "0.0.0.0:8082",
        }
    }

    fn default_delay(self) -> Duration {
        match self {
            Flavor::Cheap => Duration::ZERO,
            Flavor::Expensive => Duration::from_millis(500),
        }
    }

    fn body(self) -> serde_json::Value {
        match self {
            Flavor::Cheap => json!({
                "model": "SLM-7B-cheap",
                "response": "Summary: a small model answered this short prompt.",
                "cost_estimate": 0.0001
            }),
            Flavor::Expensive => json!({
                "model": "LLM-150B-expensive",
                "response": "Detailed analysis: a large model answered this long prompt.",
                "cost_estimate": 0.0125
            }),
        }
    }
}

/// Fixed-response chat completions backend
#[derive(Debug, Parser)]
#[command(name = "mock-backend", version, about)]
struct Cli {
    /// Which backend to imitate
    #[arg(long, value_enum, default_value = "cheap")]
    tier: Flavor,

    /// Address to listen on (8081 for cheap, 8082 for expensive by default)
    #[arg(long)]
    listen: Option<String>,

    /// Artificial latency before answering, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let flavor = cli.tier;
    let delay = cli
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| flavor.default_delay());
    let listen = cli
        .listen
        .unwrap_or_else(|| flavor.default_listen().to_string());
    let body = flavor.body().to_string();

    let app = Router::new().fallback(move |uri: Uri| {
        let body = body.clone();
        async move {
            tokio::time::sleep(delay).await;
            tracing::info!(path = %uri.path(), ?delay, "-> Served request for {:?} model", flavor);
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
    });

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;
    tracing::info!("Starting {:?} LLM server on http://{}", flavor, listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(tiergate::server::shutdown_signal())
        .await?;

    Ok(())
}
