// src/bin/api_server.rs

use catalog_api::infra::telemetry;
use catalog_api::transport;
use catalog_api::{AppConfig, DatabaseService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    telemetry::init_tracing();

    // --- Store connection (process-wide, closed on shutdown) ---
    let db_service = DatabaseService::connect(&config.store).await?;

    // --- Model Registry Initialization ---
    let registry = db_service.open_registry().await?;
    tracing::info!(models = ?registry.list_models(), "model registry ready");

    let app_state = transport::http::AppState::new(registry, db_service);
    let db_for_shutdown = app_state.db.clone();

    // --- API Server Initialization ---
    let app = transport::http::build_app(app_state);
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_for_shutdown.close().await;
    tracing::info!("Graceful shutdown complete.");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
