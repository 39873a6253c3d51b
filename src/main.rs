use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use market_indices::api::{create_router, ApiState};
use market_indices::config::AppConfig;
use market_indices::context::AppContext;
use market_indices::observability;
use market_indices::utils::TaskSupervisor;
use market_indices::{HEALTH_CHECK_INTERVAL_SECS, SHUTDOWN_GRACE_SECS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("loading configuration")?;

    observability::tracing::init(config.logging.format);
    observability::metrics::register_metrics().context("registering metrics")?;

    // Configuration errors stop the process here, before any traffic is served.
    let context = AppContext::from_config(&config).context("building application context")?;
    tracing::info!(
        "Tracking {} indices: {}",
        context.registry.len(),
        context.registry.names().join(", ")
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut supervisor = TaskSupervisor::new();
    let scheduler = context.scheduler.clone();
    supervisor.spawn("refresh_scheduler", async move {
        scheduler.run(shutdown_rx).await;
    });

    let state = Arc::new(ApiState::from_context(&context));
    let app = create_router(state, config.server.cors_allow_any_origin);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    tracing::info!("Listening on {}", address);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::select! {
        served = server => served.context("serving HTTP")?,
        _ = monitor_tasks(&mut supervisor) => {}
    }

    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    supervisor.shutdown(Duration::from_secs(SHUTDOWN_GRACE_SECS)).await;

    Ok(())
}

/// Logs background tasks that ended while the server is still up.
async fn monitor_tasks(supervisor: &mut TaskSupervisor) {
    let mut ticker = tokio::time::interval(Duration::from_secs(HEALTH_CHECK_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        if let Err(e) = supervisor.check_health() {
            tracing::error!("Health check failed: {}", e);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
}
