use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::WebhookError;
use super::signature::WebhookVerifier;

/// A verified webhook delivery.
///
/// Built once per delivery by [`construct_event`] and handed to handlers by
/// reference. `data` is event specific; interpret it according to
/// [`WebhookEvent::kind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub id: String,
    /// Dotted event type, e.g. `invitation.accepted`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// ISO-8601 time the event was generated upstream.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub source_table: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEvent {
    pub fn kind(&self) -> WebhookEventKind {
        WebhookEventKind::from(self.event_type.as_str())
    }

    /// Upstream generation time, if present and valid RFC 3339.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        let timestamp = self.timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Event types this crate knows by name.
///
/// Anything else lands in [`WebhookEventKind::Other`], so newly introduced
/// upstream types still dispatch to generic handlers without breaking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebhookEventKind {
    InvitationCreated,
    InvitationAccepted,
    InvitationRevoked,
    InvitationReinvited,
    InvitationExpired,
    Other(String),
}

impl WebhookEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvitationCreated => "invitation.created",
            Self::InvitationAccepted => "invitation.accepted",
            Self::InvitationRevoked => "invitation.revoked",
            Self::InvitationReinvited => "invitation.reinvited",
            Self::InvitationExpired => "invitation.expired",
            Self::Other(event_type) => event_type.as_str(),
        }
    }
}

impl From<&str> for WebhookEventKind {
    fn from(event_type: &str) -> Self {
        match event_type {
            "invitation.created" => Self::InvitationCreated,
            "invitation.accepted" => Self::InvitationAccepted,
            "invitation.revoked" => Self::InvitationRevoked,
            "invitation.reinvited" => Self::InvitationReinvited,
            "invitation.expired" => Self::InvitationExpired,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for WebhookEventKind {
    fn from(event_type: String) -> Self {
        Self::from(event_type.as_str())
    }
}

impl fmt::Display for WebhookEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verify `payload` against `signature`, then parse it into an event.
///
/// Parsing only starts after the signature checks out, so nothing learned from
/// an unverified body is ever acted on or reported.
///
/// # Errors
///
/// - [`WebhookError::InvalidSignature`] if verification fails
/// - [`WebhookError::InvalidPayload`] if the verified body is not JSON or has an
///   empty `id` or `type`
pub fn construct_event(
    payload: &[u8],
    signature: &str,
    verifier: &dyn WebhookVerifier,
) -> Result<WebhookEvent, WebhookError> {
    if !verifier.verify_signature(payload, signature) {
        return Err(WebhookError::InvalidSignature);
    }

    // Log the serde detail, return a generic message
    let event: WebhookEvent = serde_json::from_slice(payload).map_err(|e| {
        tracing::warn!(
            target: "vortex::webhooks",
            error = %e,
            "Failed to parse verified webhook payload"
        );
        WebhookError::invalid_payload("malformed JSON payload")
    })?;

    if event.id.trim().is_empty() {
        return Err(WebhookError::invalid_payload("missing event id"));
    }
    if event.event_type.trim().is_empty() {
        return Err(WebhookError::invalid_payload("missing event type"));
    }

    Ok(event)
}
