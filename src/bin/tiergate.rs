use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tiergate::config::ConfigLoader;
use tiergate::Gateway;
use tracing_subscriber::EnvFilter;

/// Prompt-size LLM gateway
#[derive(Debug, Parser)]
#[command(name = "tiergate", version, about)]
struct Cli {
    /// JSON config file (defaults: $LLM_GATEWAY_CONFIG, ./tiergate.json, user config dir)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long, alias = "addr")]
    listen: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json_logs: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    if json_logs {
        builder.json().with_target(false).init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let loader = match &cli.config {
        Some(path) => ConfigLoader::from_path(path)?,
        None => ConfigLoader::new()?,
    };
    if let Some(source) = loader.source() {
        tracing::info!(path = %source.display(), "Loaded configuration file");
    }

    let config = loader
        .apply_env()
        .with_listen(cli.listen)
        .into_config()
        .context("invalid gateway configuration")?;

    Gateway::new(config)?
        .serve()
        .await
        .context("gateway server failed")?;

    Ok(())
}
