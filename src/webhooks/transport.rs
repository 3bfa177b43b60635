//! Axum entry point for webhook deliveries.
//!
//! Mount [`webhook_router`] and, if anything in front of it reads the body,
//! put [`capture_raw_body`] outermost so the signed bytes survive.

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
};

use super::SIGNATURE_HEADER;
use super::payload::{RawPayload, RequestBody, WebhookRequest};
use super::pipeline::VortexWebhooks;

/// Upper bound on buffered webhook bodies.
pub const RAW_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// The request body exactly as received, stored as a request extension by
/// [`capture_raw_body`].
#[derive(Debug, Clone)]
pub struct RawBody(pub RawPayload);

/// Marker for a body an earlier layer already parsed into JSON.
///
/// Layers that consume the body should insert this so the webhook handler can
/// tell the bytes are gone instead of verifying an empty body.
#[derive(Debug, Clone)]
pub struct ParsedBody(pub serde_json::Value);

/// Marker left by [`capture_raw_body`] when the body could not be buffered
/// within [`RAW_BODY_LIMIT`]. The request continues with an empty body.
#[derive(Debug, Clone, Copy)]
pub struct BodyTooLarge {
    pub limit: usize,
}

/// Buffer the request body, keep a copy as [`RawBody`], and pass the request on
/// with the body restored.
///
/// Never rejects a request itself. A body that cannot be buffered is replaced
/// by an empty one and marked with [`BodyTooLarge`], so the route behind it
/// decides how to answer.
///
/// ```rust,ignore
/// let app = webhook_router("/webhooks/vortex", webhooks)
///     .layer(axum::middleware::from_fn(parse_json_bodies))
///     .layer(axum::middleware::from_fn(capture_raw_body));
/// ```
pub async fn capture_raw_body(request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let request = match axum::body::to_bytes(body, RAW_BODY_LIMIT).await {
        Ok(bytes) => {
            parts
                .extensions
                .insert(RawBody(RawPayload::Bytes(bytes.clone())));
            Request::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::warn!(
                target: "vortex::webhooks",
                error = %e,
                limit = RAW_BODY_LIMIT,
                "Failed to buffer request body"
            );
            parts.extensions.insert(BodyTooLarge {
                limit: RAW_BODY_LIMIT,
            });
            Request::from_parts(parts, Body::empty())
        }
    };

    next.run(request).await
}

/// Axum handler that runs a delivery through [`VortexWebhooks::handle`].
pub async fn webhook_handler(State(webhooks): State<VortexWebhooks>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let mut delivery = WebhookRequest::new(request_body(&parts.extensions, body).await)
        .with_signatures(signature_values(&parts.headers));
    if let Some(RawBody(raw)) = parts.extensions.get::<RawBody>() {
        delivery = delivery.with_raw(raw.clone());
    }

    webhooks.handle(delivery).await.into_response()
}

/// Router with a single `POST` route for webhook deliveries.
pub fn webhook_router(path: &str, webhooks: VortexWebhooks) -> Router {
    Router::new()
        .route(path, post(webhook_handler))
        .with_state(webhooks)
}

fn signature_values(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SIGNATURE_HEADER)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .collect()
}

async fn request_body(extensions: &axum::http::Extensions, body: Body) -> RequestBody {
    if let Some(BodyTooLarge { limit }) = extensions.get::<BodyTooLarge>() {
        return RequestBody::TooLarge { limit: *limit };
    }
    if let Some(ParsedBody(value)) = extensions.get::<ParsedBody>() {
        return RequestBody::Parsed(value.clone());
    }

    match axum::body::to_bytes(body, RAW_BODY_LIMIT).await {
        Ok(bytes) => unparsed(bytes),
        Err(e) => {
            tracing::warn!(
                target: "vortex::webhooks",
                error = %e,
                limit = RAW_BODY_LIMIT,
                "Failed to read webhook body"
            );
            RequestBody::TooLarge {
                limit: RAW_BODY_LIMIT,
            }
        }
    }
}

fn unparsed(bytes: Bytes) -> RequestBody {
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => RequestBody::Unparsed(text),
        Err(_) => RequestBody::Unavailable,
    }
}
