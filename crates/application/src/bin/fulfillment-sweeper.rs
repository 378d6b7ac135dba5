//! Reservation sweeper entry point.

use application::{Config, Fulfillment, telemetry};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// A signal that cannot be listened for is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    telemetry::init_tracing(&config.log_level, config.log_format)?;

    // 2. Install Prometheus recorder with its scrape listener
    PrometheusBuilder::new()
        .with_http_listener(config.metrics_addr)
        .install()?;

    // 3. Wire the services
    let (fulfillment, _backends) = Fulfillment::in_memory(&config);

    // 4. Sweep until shutdown
    tracing::info!(
        interval_secs = config.sweep_interval.as_secs(),
        reservation_ttl_hours = config.reservation_ttl_hours,
        metrics_addr = %config.metrics_addr,
        "starting reservation sweeper"
    );
    fulfillment
        .sweeper
        .run(config.sweep_interval, shutdown_signal())
        .await;

    tracing::info!("sweeper shut down gracefully");
    Ok(())
}
