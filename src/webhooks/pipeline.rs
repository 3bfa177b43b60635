//! Framework-neutral webhook pipeline.
//!
//! [`VortexWebhooks::handle`] takes one delivery through header checks,
//! payload resolution, verification, parsing and dispatch, and always ends in
//! a [`WebhookResponse`]. Nothing here depends on how the request arrived.

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use secrecy::SecretString;
use serde_json::{Value, json};

use super::dispatch::{HandlerRegistry, WebhookErrorHook, WebhookHandler};
use super::error::WebhookError;
use super::event::{WebhookEvent, WebhookEventKind, construct_event};
use super::payload::{SignatureHeader, WebhookRequest};
use super::signature::{HmacSha256Verifier, WebhookVerifier};
use crate::config::VortexConfig;
use crate::error::{Result, VortexError};

/// Status and JSON body for one delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl WebhookResponse {
    pub fn received() -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "received": true }),
        }
    }

    pub fn from_error(error: &WebhookError) -> Self {
        Self {
            status: error.status_code(),
            body: json!({ "error": error.public_message() }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

struct Inner {
    verifier: Box<dyn WebhookVerifier>,
    handlers: HandlerRegistry,
}

/// Verified webhook receiver with its registered handlers.
///
/// Cheap to clone; clones share the verifier and handlers.
///
/// # Example
///
/// ```rust,ignore
/// use vortex_axum::webhooks::{VortexWebhooks, WebhookEventKind, handler_fn, webhook_router};
///
/// let webhooks = VortexWebhooks::builder("whsec_...")
///     .on(WebhookEventKind::InvitationAccepted, handler_fn(|event| async move {
///         tracing::info!(event_id = %event.id, "invitation accepted");
///         Ok(())
///     }))
///     .build();
///
/// let app = Router::new().merge(webhook_router("/webhooks/vortex", webhooks));
/// ```
#[derive(Clone)]
pub struct VortexWebhooks {
    inner: Arc<Inner>,
}

impl VortexWebhooks {
    /// Start building a receiver that verifies with HMAC-SHA256 under `secret`.
    pub fn builder(secret: impl Into<SecretString>) -> VortexWebhooksBuilder {
        VortexWebhooksBuilder::new(HmacSha256Verifier::new(secret))
    }

    /// Start building a receiver from the configured webhook secret.
    ///
    /// # Errors
    ///
    /// Returns an error if no webhook secret is configured.
    pub fn from_config(config: &VortexConfig) -> Result<VortexWebhooksBuilder> {
        let secret = config.webhook_secret().ok_or_else(|| {
            VortexError::internal("Webhook secret is not configured (set VORTEX_WEBHOOK_SECRET)")
        })?;
        Ok(Self::builder(secret.to_owned()))
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    /// Process one delivery and produce its response.
    ///
    /// Header arity is checked before the body is looked at, verification
    /// before parsing, and parsing before any handler runs. The error hook is
    /// told about signature, payload and handler failures once each.
    pub async fn handle(&self, request: WebhookRequest) -> WebhookResponse {
        match self.process(&request).await {
            Ok(event) => {
                tracing::debug!(
                    target: "vortex::webhooks",
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "Webhook delivery processed"
                );
                WebhookResponse::received()
            }
            Err(error) => {
                self.report(&error);
                if error.notifies_hook() {
                    self.inner.handlers.notify_error(&error).await;
                }
                WebhookResponse::from_error(&error)
            }
        }
    }

    async fn process(&self, request: &WebhookRequest) -> std::result::Result<WebhookEvent, WebhookError> {
        let signature = match request.signature() {
            SignatureHeader::Missing => return Err(WebhookError::MissingSignature),
            SignatureHeader::Multiple(count) => {
                return Err(WebhookError::MultipleSignatures { count });
            }
            SignatureHeader::Single(signature) => signature,
        };

        let payload = request.resolve_payload()?;
        let event = construct_event(payload, signature, self.inner.verifier.as_ref())?;

        tracing::info!(
            target: "vortex::webhooks",
            event_id = %event.id,
            event_type = %event.event_type,
            "Received webhook event"
        );

        self.inner.handlers.dispatch(&event).await?;
        Ok(event)
    }

    fn report(&self, error: &WebhookError) {
        match error {
            WebhookError::RawBodyUnavailable => {
                tracing::error!(
                    target: "vortex::webhooks",
                    "Raw request body unavailable; add capture_raw_body in front of the webhook route"
                );
            }
            WebhookError::HandlerFailed {
                event_id,
                event_type,
                source,
            } => {
                tracing::error!(
                    target: "vortex::webhooks",
                    event_id = %event_id,
                    event_type = %event_type,
                    error = %source,
                    "Webhook handler failed"
                );
            }
            other => {
                tracing::warn!(
                    target: "vortex::webhooks",
                    error = %other,
                    "Rejected webhook delivery"
                );
            }
        }
    }
}

impl std::fmt::Debug for VortexWebhooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VortexWebhooks")
            .field("handlers", &self.inner.handlers)
            .finish_non_exhaustive()
    }
}

/// Builder for [`VortexWebhooks`].
#[must_use = "builder does nothing until you call build()"]
pub struct VortexWebhooksBuilder {
    verifier: Box<dyn WebhookVerifier>,
    handlers: HandlerRegistry,
}

impl VortexWebhooksBuilder {
    pub fn new(verifier: impl WebhookVerifier + 'static) -> Self {
        Self {
            verifier: Box::new(verifier),
            handlers: HandlerRegistry::new(),
        }
    }

    /// Replace the signature verifier.
    pub fn with_verifier(mut self, verifier: impl WebhookVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    /// Handler invoked for every verified event, before any type-specific one.
    pub fn on_event(mut self, handler: impl WebhookHandler + 'static) -> Self {
        self.handlers = self.handlers.with_any(handler);
        self
    }

    /// Handler for one event type. A second registration for the same type
    /// replaces the first.
    pub fn on(
        mut self,
        kind: impl Into<WebhookEventKind>,
        handler: impl WebhookHandler + 'static,
    ) -> Self {
        self.handlers = self.handlers.with_handler(kind, handler);
        self
    }

    pub fn on_error(mut self, hook: impl WebhookErrorHook + 'static) -> Self {
        self.handlers = self.handlers.with_error_hook(hook);
        self
    }

    pub fn build(self) -> VortexWebhooks {
        VortexWebhooks {
            inner: Arc::new(Inner {
                verifier: self.verifier,
                handlers: self.handlers,
            }),
        }
    }
}
