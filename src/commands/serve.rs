//! Serve command - Starts the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::infra::{
    Cache, CredentialVerifier, Database, FirebaseIdentity, FirebaseTokenVerifier,
    IdentityProvider, PlaceStore, UserStore,
};
use crate::services::Services;
use common::{AppError, AppResult};

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: Config) -> AppResult<()> {
    config.service.host = args.host;
    config.service.port = args.port;

    // Provider misconfiguration is fatal: never serve without identity
    config.validate().map_err(AppError::internal)?;

    tracing::info!(environment = ?config.service.environment, "Starting server...");

    let db = Database::connect(&config.database).await?;

    let cache = if config.rate_limit.enabled {
        Some(Cache::connect(&config.cache).await?)
    } else {
        tracing::warn!("Rate limiting disabled");
        None
    };

    let identity = Arc::new(
        FirebaseIdentity::new(&config.identity)
            .map_err(|e| AppError::internal(format!("Identity provider setup failed: {}", e)))?,
    );

    let mut verifier = FirebaseTokenVerifier::new(identity.client().clone(), &config.identity);
    if config.identity.check_revoked {
        verifier = verifier.with_revocation_check(identity.clone());
    }

    let provider: Arc<dyn IdentityProvider> = identity;
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(verifier);

    let services = Services::from_parts(
        Arc::new(UserStore::new(db.get_connection())),
        Arc::new(PlaceStore::new(db.get_connection())),
        provider,
        verifier,
    );

    let addr = config.server_addr();

    let mut app_state = AppState::new(&services, config).with_database(db);
    if let Some(cache) = cache {
        app_state = app_state.with_cache(cache);
    }

    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
