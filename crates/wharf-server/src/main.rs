//! wharf: issues scoped bearer tokens for registry-style services.
//!
//! A client asks `GET /token?service=...&scope=...` with optional Basic
//! credentials. The service:
//!
//! 1. Parses and validates the request.
//! 2. Authenticates the caller against the configured users.
//! 3. Runs the authorization chain to decide which scopes are granted.
//! 4. Signs a JWT carrying exactly the granted scopes.
//!
//! Requests asking for any scope nobody granted are refused with the list
//! of forbidden scopes.

mod app;
mod config;
mod error;
mod jwt;
mod providers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use crate::app::{router, AppState};
use crate::config::AppConfig;

/// wharf token service.
#[derive(Parser, Debug)]
#[command(name = "wharf", about = "Scoped bearer-token service")]
struct Args {
    /// Listen port (overrides `WHARF_PORT`).
    #[arg(long)]
    port: Option<u16>,
    /// Token issuer (overrides `WHARF_ISSUER`).
    #[arg(long)]
    issuer: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging (controlled via RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.listen_port = port;
    }
    if let Some(issuer) = args.issuer {
        config.issuer = issuer;
    }

    if config.uses_dev_secret() {
        warn!("using the development signing secret (set WHARF_SIGNING_SECRET in production)");
    }
    info!(
        issuer = %config.issuer,
        lifetime_secs = config.token_lifetime.as_secs(),
        users = config.users.len(),
        acl_rules = config.acl.len(),
        anonymous = config.allow_anonymous,
        "configuration loaded"
    );

    let listen_port = config.listen_port;
    let state = Arc::new(AppState::from_config(&config)?);
    let app = router(state);

    let addr = format!("0.0.0.0:{listen_port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(address = %addr, "token service listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;

    Ok(())
}
