//! vortex-axum - Vortex invitations for Axum applications
//!
//! Mounts the Vortex invitation API behind your own authentication and
//! receives signed Vortex webhooks.
//!
//! # Features
//!
//! - **Webhooks**: HMAC-SHA256 verification over the exact request bytes,
//!   typed events, ordered dispatch to async handlers
//! - **Invitation routes**: token minting, lookup, revoke, reinvite and accept,
//!   each gated by a pluggable [`AccessPolicy`](auth::AccessPolicy)
//! - **Configuration**: builder with `VORTEX_`-prefixed environment variables
//! - **Testing**: Alba-style in-process request scenarios
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vortex_axum::webhooks::{VortexWebhooks, capture_raw_body, handler_fn, webhook_router};
//! use vortex_axum::{InvitationsState, VortexConfig, vortex_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = VortexConfig::builder().from_env().build()?;
//!     vortex_axum::init_tracing_with_config(&config);
//!
//!     let webhooks = VortexWebhooks::from_config(&config)?
//!         .on("invitation.accepted", handler_fn(|event| async move {
//!             tracing::info!(event_id = %event.id, "invitation accepted");
//!             Ok(())
//!         }))
//!         .build();
//!
//!     let app = vortex_router(&config, InvitationsState::new(MyVortexClient::new(), MyPolicy))
//!         .merge(webhook_router("/webhooks/vortex", webhooks))
//!         .layer(axum::middleware::from_fn(capture_raw_body));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
mod config;
mod error;
pub mod invitations;
pub mod testing;
mod utils;
pub mod webhooks;

// Re-exports for public API
pub use config::{LoggingConfig, VortexConfig, VortexConfigBuilder};
pub use error::{ErrorResponse, Result, VortexError};
pub use invitations::{InvitationsApi, InvitationsState, vortex_router};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "vortex::webhooks=debug")
/// - `VORTEX_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("VORTEX_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install(env_filter, json_logs);
}

/// Initialize tracing from [`LoggingConfig`]
pub fn init_tracing_with_config(config: &VortexConfig) {
    install(EnvFilter::new(&config.logging.level), config.logging.json);
}

fn install(env_filter: EnvFilter, json: bool) {
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
