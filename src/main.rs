// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing_subscriber::EnvFilter;

use chronohub_server::{
    api::router,
    auth::{GoogleIdentityVerifier, TokenIssuer},
    config::{LogFormat, ServerConfig, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::DocumentStore,
};

/// Time given to in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal(handle: Handle<SocketAddr>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(LogFormat::from_env());

    let config = ServerConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let store = DocumentStore::open_in(&config.data_dir)?;
    tracing::info!(data_dir = %config.data_dir.display(), "Database opened");

    let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl);
    let mut state = AppState::new(store, tokens, config.frontend_url.clone())
        .with_reset_ttl(config.reset_ttl);

    match &config.google_client_id {
        Some(client_id) => {
            let verifier = GoogleIdentityVerifier::new(client_id.clone())?;
            state = state.with_identity_verifier(Arc::new(verifier));
            tracing::info!("Google sign-in enabled");
        }
        None => tracing::info!("GOOGLE_CLIENT_ID not set, Google sign-in disabled"),
    }

    let app = router(state);
    let addr = config.bind_addr()?;

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider before any TLS operations
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                tracing::warn!("A rustls crypto provider was already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            tracing::info!(%addr, "ChronoHub listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!(%addr, "ChronoHub listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
