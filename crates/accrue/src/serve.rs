// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `accrue serve`: the cron runner until SIGINT or SIGTERM.

use std::net::SocketAddr;

use accrue_config::AccrueConfig;
use accrue_config::model::MetricsConfig;
use accrue_core::AccrueError;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::wiring::build_service;

pub async fn run_serve(config: AccrueConfig) -> Result<(), AccrueError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "accrue starting");

    if config.metrics.enabled {
        install_metrics(&config.metrics)?;
    }

    let service = build_service(config).await?;
    let runner = service.cron_runner();
    let cancel = install_signal_handler();
    runner.run(cancel).await;
    info!("accrue stopped");
    Ok(())
}

fn install_metrics(config: &MetricsConfig) -> Result<(), AccrueError> {
    let addr: SocketAddr = config.listen_address.parse().map_err(|e| {
        AccrueError::Config(format!(
            "invalid metrics.listen_address `{}`: {e}",
            config.listen_address
        ))
    })?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AccrueError::Internal(format!("failed to install Prometheus exporter: {e}")))?;
    accrue_core::metrics::register_metrics();
    info!(%addr, "prometheus exporter listening");
    Ok(())
}

/// Returns a token cancelled on SIGINT or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT, shutting down"),
                        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, waiting for SIGINT only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, shutting down");
        }

        trigger.cancel();
        debug!("signal handler finished");
    });

    token
}

/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("accrue={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
