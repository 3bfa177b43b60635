//! Request parameter sanitization.
//!
//! Everything a client sends is checked here before it reaches the access
//! policy or the invitation API. Failures are `400 Bad Request`.

use serde::Deserialize;

use super::api::{AcceptUser, InvitationTarget, TargetType};
use crate::error::{Result, VortexError};

pub const MAX_INVITATION_ID_LEN: usize = 128;
pub const MAX_ACCEPT_INVITATIONS: usize = 100;

/// Check an invitation id from a path or body.
///
/// Ids are 1 to 128 characters of ASCII letters, digits, `_` and `-`.
pub fn sanitize_invitation_id(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(VortexError::bad_request("Invitation ID is required"));
    }
    if raw.len() > MAX_INVITATION_ID_LEN {
        return Err(VortexError::bad_request(format!(
            "Invitation ID must be at most {} characters",
            MAX_INVITATION_ID_LEN
        )));
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(VortexError::bad_request(
            "Invitation ID may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(raw.to_string())
}

/// Build a target from its raw parts.
///
/// The value is trimmed; email targets must look like an email address.
pub fn parse_target(target_type: &str, value: &str) -> Result<InvitationTarget> {
    let target_type: TargetType = target_type.parse()?;

    let value = value.trim();
    if value.is_empty() {
        return Err(VortexError::bad_request("Target value is required"));
    }
    if target_type == TargetType::Email && !is_valid_email(value) {
        return Err(VortexError::bad_request("Target value is not a valid email address"));
    }

    Ok(InvitationTarget {
        target_type,
        value: value.to_string(),
    })
}

/// Query string for `GET /invitations`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetQuery {
    pub target_type: Option<String>,
    pub target_value: Option<String>,
}

impl TargetQuery {
    pub fn into_target(self) -> Result<InvitationTarget> {
        match (self.target_type, self.target_value) {
            (Some(target_type), Some(target_value)) => parse_target(&target_type, &target_value),
            _ => Err(VortexError::bad_request(
                "Both targetType and targetValue query parameters are required",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TargetBody {
    #[serde(rename = "type")]
    pub target_type: String,
    pub value: String,
}

/// Body for `POST /invitations/accept`.
///
/// Accepts the current `user` shape and the older `target` shape. When both
/// are present `user` wins.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationsBody {
    #[serde(default)]
    pub invitation_ids: Vec<String>,
    pub user: Option<AcceptUser>,
    pub target: Option<TargetBody>,
}

impl AcceptInvitationsBody {
    /// Sanitize ids and normalize the accepting user.
    pub fn into_parts(self) -> Result<(Vec<String>, AcceptUser)> {
        if self.invitation_ids.is_empty() {
            return Err(VortexError::bad_request("invitationIds must not be empty"));
        }
        if self.invitation_ids.len() > MAX_ACCEPT_INVITATIONS {
            return Err(VortexError::bad_request(format!(
                "At most {} invitations can be accepted at once",
                MAX_ACCEPT_INVITATIONS
            )));
        }

        let mut invitation_ids = Vec::with_capacity(self.invitation_ids.len());
        for id in &self.invitation_ids {
            let id = sanitize_invitation_id(id)?;
            if !invitation_ids.contains(&id) {
                invitation_ids.push(id);
            }
        }

        let user = match (self.user, self.target) {
            (Some(user), _) => sanitize_accept_user(user)?,
            (None, Some(target)) => {
                tracing::debug!("Accept request uses legacy target shape");
                accept_user_from_target(parse_target(&target.target_type, &target.value)?)?
            }
            (None, None) => {
                return Err(VortexError::bad_request("Either user or target is required"));
            }
        };

        Ok((invitation_ids, user))
    }
}

fn sanitize_accept_user(user: AcceptUser) -> Result<AcceptUser> {
    let trimmed = |field: Option<String>| {
        field
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let user = AcceptUser {
        email: trimmed(user.email),
        phone: trimmed(user.phone),
        name: trimmed(user.name),
    };

    if user.email.is_none() && user.phone.is_none() {
        return Err(VortexError::bad_request("user must have an email or phone"));
    }
    if let Some(email) = &user.email {
        if !is_valid_email(email) {
            return Err(VortexError::bad_request("user.email is not a valid email address"));
        }
    }

    Ok(user)
}

fn accept_user_from_target(target: InvitationTarget) -> Result<AcceptUser> {
    match target.target_type {
        TargetType::Email => Ok(AcceptUser {
            email: Some(target.value),
            ..Default::default()
        }),
        TargetType::Phone => Ok(AcceptUser {
            phone: Some(target.value),
            ..Default::default()
        }),
        TargetType::Share | TargetType::Internal => Err(VortexError::bad_request(
            "Only email or phone targets can accept invitations",
        )),
    }
}

/// Basic email format validation.
///
/// Checks that the email:
/// - Contains exactly one `@` symbol
/// - Has at least one character before `@`
/// - Has a dot-separated domain with no empty labels at either end
///
/// This is not RFC 5322 compliant but catches obvious formatting errors.
pub(crate) fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') || local.contains(char::is_whitespace) {
        return false;
    }

    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
