//! HTTP server facade for bookshelf with Axum and error handling.

use anyhow::Context;
use axum::{extract::State, routing::get, Router};

use bookshelf_db::DbPool;
use bookshelf_kernel::{settings::ServerSettings, InitCtx, ModuleRegistry};

pub mod error;
pub mod router;

use error::AppError;
use router::RouterBuilder;

/// Serve `app` until Ctrl-C or SIGTERM, then drain in-flight requests.
pub async fn start_server(app: Router, settings: &ServerSettings) -> anyhow::Result<()> {
    tracing::info!("starting HTTP server on {}:{}", settings.host, settings.port);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", settings.host, settings.port))
        .await
        .context("failed to bind to address")?;

    tracing::info!(
        "HTTP server listening on http://{}:{}",
        settings.host,
        settings.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, ctx: &InitCtx<'_>) -> Router {
    let mut router_builder = RouterBuilder::new()
        .route("/healthz", get(health_check))
        .route("/readyz", get(readiness_check).with_state(ctx.db.clone()));

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under /{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes(ctx));
    }

    // Layers wrap only the routes added before them.
    router_builder
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(ctx.settings.server.request_timeout_ms)
        .build()
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Readiness endpoint: succeeds only when the database answers
async fn readiness_check(State(pool): State<DbPool>) -> Result<&'static str, AppError> {
    bookshelf_db::health_check(&pool).await.map_err(|e| {
        tracing::warn!(error = %e, "readiness check failed");
        AppError::unavailable("database unavailable")
    })?;
    Ok("ok")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
