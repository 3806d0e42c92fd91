//! ul-resolver - Universal Location resolver

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ul_resolver::{
    config::{Args, ResolverConfig},
    server,
    services::{HttpFetcher, JsonRpcReader, Resolver},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("ul_resolver={},info", log_level).into()),
    );
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let config = match ResolverConfig::load(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("======================================");
    info!("  ul-resolver {}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Config: {}", args.config.display());
    info!("Networks: {}", config.registry.len());
    info!("Gateways: {}", config.gateways.len());
    for (i, gateway) in config.gateways.gateways().iter().enumerate() {
        info!(
            "  gateway-{}: {}{}",
            i,
            gateway.base_url,
            if gateway.token_suffix.is_empty() { "" } else { " (token)" }
        );
    }
    info!("RPC backoff: {:?}", config.rpc_backoff);
    info!("Request timeout: {:?}", config.request_timeout);
    info!("Unrecognized token URIs: {}", config.unrecognized_pointer);
    info!("======================================");

    let reader = Arc::new(JsonRpcReader::new(config.request_timeout));
    let fetcher = Arc::new(HttpFetcher::new(config.request_timeout));
    let resolver = Resolver::new(Arc::new(config), reader, fetcher);

    let state = Arc::new(server::AppState::new(args, resolver));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
