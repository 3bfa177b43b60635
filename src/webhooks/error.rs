//! Webhook delivery errors.

use axum::http::StatusCode;

use super::SIGNATURE_HEADER_NAME;

/// Operator-facing hint returned when the signed bytes cannot be recovered.
pub const RAW_BODY_UNAVAILABLE_MESSAGE: &str = "Raw request body is unavailable for webhook \
     signature verification. The body was consumed or parsed before the webhook handler ran; \
     add the `capture_raw_body` middleware in front of the webhook route so the exact signed \
     bytes are preserved.";

/// Everything that can end a webhook delivery without a `200`.
///
/// Every variant is converted to a response at the transport boundary. None of
/// them propagate to the hosting server.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// No `X-Vortex-Signature` value was sent.
    #[error("Missing X-Vortex-Signature header")]
    MissingSignature,

    /// More than one signature value was sent, as repeated headers or as a
    /// single comma-folded value.
    #[error("Multiple X-Vortex-Signature headers are not allowed ({count} values)")]
    MultipleSignatures { count: usize },

    /// The exact signed bytes could not be recovered from the request.
    #[error("Raw request body unavailable")]
    RawBodyUnavailable,

    /// The body could not be buffered within the size limit.
    #[error("Webhook payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The signature does not match the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The payload verified but is not a well-formed event.
    #[error("Invalid webhook payload: {message}")]
    InvalidPayload { message: String },

    /// A registered handler returned an error.
    #[error("Webhook handler failed for event {event_id} ({event_type})")]
    HandlerFailed {
        event_id: String,
        event_type: String,
        #[source]
        source: anyhow::Error,
    },
}

impl WebhookError {
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingSignature | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::MultipleSignatures { .. } | Self::InvalidPayload { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RawBodyUnavailable | Self::HandlerFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The `error` string written to the response body.
    ///
    /// Only the raw-body variant carries detail, since it points the operator
    /// at a deployment mistake rather than describing the request.
    pub fn public_message(&self) -> String {
        match self {
            Self::MissingSignature => format!("Missing {SIGNATURE_HEADER_NAME} header"),
            Self::MultipleSignatures { .. } => {
                format!("Multiple {SIGNATURE_HEADER_NAME} headers are not allowed")
            }
            Self::RawBodyUnavailable => RAW_BODY_UNAVAILABLE_MESSAGE.to_string(),
            Self::PayloadTooLarge { .. } => "Webhook payload too large".to_string(),
            Self::InvalidSignature => "Invalid signature".to_string(),
            Self::InvalidPayload { .. } => "Invalid webhook payload".to_string(),
            Self::HandlerFailed { .. } => "Webhook handler error".to_string(),
        }
    }

    /// Whether the registered error hook is told about this error.
    ///
    /// Header, body size and deployment problems are answered directly; verification,
    /// payload and handler failures are reported to the hook.
    pub fn notifies_hook(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature | Self::InvalidPayload { .. } | Self::HandlerFailed { .. }
        )
    }
}
