//! Verified webhook deliveries from Vortex.
//!
//! A delivery is accepted only if its `X-Vortex-Signature` header carries the
//! HMAC-SHA256 of the exact request bytes under the shared secret. Verified
//! events go to a generic handler first, then to the handler registered for
//! their type.
//!
//! ```rust,ignore
//! use vortex_axum::webhooks::{VortexWebhooks, capture_raw_body, handler_fn, webhook_router};
//!
//! let webhooks = VortexWebhooks::builder(std::env::var("VORTEX_WEBHOOK_SECRET")?)
//!     .on_event(handler_fn(|event| async move {
//!         tracing::info!(event_id = %event.id, event_type = %event.event_type, "vortex event");
//!         Ok(())
//!     }))
//!     .build();
//!
//! let app = Router::new()
//!     .merge(webhook_router("/webhooks/vortex", webhooks))
//!     .layer(axum::middleware::from_fn(capture_raw_body));
//! ```

mod dispatch;
mod error;
mod event;
mod payload;
mod pipeline;
mod signature;
mod transport;

/// Header carrying the hex signature, as documented to senders.
pub const SIGNATURE_HEADER_NAME: &str = "X-Vortex-Signature";

/// Lowercase form used for header map lookups.
pub const SIGNATURE_HEADER: &str = "x-vortex-signature";

pub use dispatch::{
    FnErrorHook, FnHandler, HandlerRegistry, WebhookErrorHook, WebhookHandler, error_hook_fn,
    handler_fn,
};
pub use error::{RAW_BODY_UNAVAILABLE_MESSAGE, WebhookError};
pub use event::{WebhookEvent, WebhookEventKind, construct_event};
pub use payload::{RawPayload, RequestBody, SignatureHeader, WebhookRequest};
pub use pipeline::{VortexWebhooks, VortexWebhooksBuilder, WebhookResponse};
pub use signature::{HmacSha256Verifier, WebhookVerifier, sign, verify};
pub use transport::{
    BodyTooLarge, ParsedBody, RAW_BODY_LIMIT, RawBody, capture_raw_body, webhook_handler,
    webhook_router,
};
