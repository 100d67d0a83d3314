// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vestwise_server::{
    api::{cors_layer, router},
    auth::{JwksCache, TokenVerifier},
    config::{Config, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    state::AppState,
    storage::Database,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!(
        jwks_url = %config.jwks_url,
        audience = %config.audience,
        debug = config.debug,
        "Configuration loaded"
    );

    let db = Database::connect(&config.database_url, config.database_max_connections).await?;

    let keys = JwksCache::new(config.jwks_url.as_str(), config.jwks_fetch_timeout)?
        .with_cache_ttl(config.jwks_cache_ttl);
    let verifier = TokenVerifier::new(keys, config.audience.clone()).with_leeway(config.leeway_secs);

    // Warm the key cache; requests retry the fetch if this fails.
    if let Err(e) = verifier.keys().refresh().await {
        tracing::warn!(error_code = e.error_code(), "Initial JWKS fetch failed");
    }

    let state = AppState::new(db.clone(), verifier);
    let app = router(state, cors_layer(config.debug, &config.cors_allowed_origins));

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    tracing::info!(
        "Vestwise server listening on http://{} (docs at /docs)",
        config.bind_address
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// `LOG_FORMAT=json` for structured output, pretty otherwise. Filtered by
/// `RUST_LOG`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Graceful shutdown initiated");
}
