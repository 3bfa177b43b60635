use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::VortexUser;
use crate::error::{Result, VortexError};

/// How an invitation reaches its recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Email,
    Phone,
    Share,
    Internal,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Share => "share",
            Self::Internal => "internal",
        }
    }
}

impl FromStr for TargetType {
    type Err = VortexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "share" => Ok(Self::Share),
            "internal" => Ok(Self::Internal),
            _ => Err(VortexError::bad_request(
                "Invalid target type. Expected one of: email, phone, share, internal",
            )),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recipient of an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationTarget {
    #[serde(rename = "type")]
    pub target_type: TargetType,
    pub value: String,
}

/// The person accepting one or more invitations.
///
/// At least one of `email` or `phone` is set once request parameters have been
/// sanitized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An invitation as returned by the Vortex API.
///
/// Fields this crate does not interpret are kept in `extra` and passed back to
/// the client unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target: Vec<InvitationTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Client for the remote Vortex invitation API.
///
/// The HTTP client itself lives outside this crate; routes only call through
/// this trait after the access policy has allowed the operation. Errors map to
/// responses through [`VortexError`], so an upstream outage should surface as
/// [`VortexError::ServiceUnavailable`].
#[async_trait]
pub trait InvitationsApi: Send + Sync {
    /// Mint a widget token for `user`.
    async fn generate_jwt(&self, user: &VortexUser) -> Result<String>;

    async fn get_invitations_by_target(&self, target: &InvitationTarget)
    -> Result<Vec<Invitation>>;

    async fn get_invitation(&self, invitation_id: &str) -> Result<Invitation>;

    async fn revoke_invitation(&self, invitation_id: &str) -> Result<()>;

    /// Send the invitation again.
    async fn reinvite(&self, invitation_id: &str) -> Result<Invitation>;

    async fn accept_invitations(
        &self,
        invitation_ids: &[String],
        user: &AcceptUser,
    ) -> Result<Invitation>;
}
