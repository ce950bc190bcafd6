//! HTTP server bootstrap: store, worker, router, and shutdown ordering.

use std::sync::Arc;

use anyhow::Context;

use taskq_infra::config::JobsConfig;
use taskq_infra::jobs::{HandlerRegistry, JobCoordinator, SqliteJobStore};

use crate::app;

/// Run until SIGINT/SIGTERM, then drain HTTP and stop the worker.
///
/// The worker finishes the job it is running before this returns; queued jobs
/// stay `PENDING` in the database.
pub async fn run(config: JobsConfig) -> anyhow::Result<()> {
    let store = SqliteJobStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open job database {}", config.database_url))?;

    let coordinator = JobCoordinator::start(
        Arc::new(store),
        HandlerRegistry::with_builtins(config.simulated_work),
        &config.worker_name,
    )
    .await
    .context("failed to start job system")?;

    let app = app::build_app(coordinator.service());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    coordinator.stop().await.context("job worker failed")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
