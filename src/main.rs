use clap::Parser;
use edutrack::app::build_state;
use edutrack::config::Config;
use edutrack::interfaces::http;
use edutrack::telemetry::init_tracing;
use miette::{IntoDiagnostic, Result};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    let state = build_state(&config).into_diagnostic()?;
    let app = http::router(state).layer(http::cors_layer(&config.cors_origin).into_diagnostic()?);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.into_diagnostic()?;
    info!(%addr, "server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await;
}

/// Resolves when `signal` fires. If the listener could not be installed the
/// server keeps running instead of shutting down at once.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_waits_on_signal() {
        let signal = async { Ok(()) };
        let fired = tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(signal));
        assert!(fired.await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_signal_listener_keeps_serving() {
        let broken = async { Err(std::io::Error::other("signal driver unavailable")) };
        let fired = tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(broken));
        assert!(fired.await.is_err());
    }
}
