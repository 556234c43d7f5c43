use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use advisor_core::{AdvisorConfig, PrometheusMetrics};
use advisor_server::{build_orchestrator, start_server, weather_client_from_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    fmt()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AdvisorConfig::from_env();
    let addr: SocketAddr = config.listen_addr.parse()?;

    // Process-owned metrics; the orchestrator only records into them
    let metrics = Arc::new(PrometheusMetrics::new()?);
    let weather = weather_client_from_config(&config.weather).await?;
    let orchestrator = Arc::new(build_orchestrator(&config, weather, metrics.clone())?);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutdown signal received");
    };

    start_server(addr, orchestrator, shutdown).await?;

    match metrics.encode() {
        Ok(snapshot) => tracing::info!("Final metrics:\n{}", snapshot),
        Err(e) => tracing::warn!("Failed to encode metrics: {}", e),
    }
    Ok(())
}
