use async_trait::async_trait;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::invitations::{AcceptUser, InvitationTarget};

/// The signed-in user of the host application, as Vortex sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VortexUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Scopes that grant admin rights inside the Vortex widget.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_scopes: Vec<String>,
}

impl VortexUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            admin_scopes: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_admin_scope(mut self, scope: impl Into<String>) -> Self {
        self.admin_scopes.push(scope.into());
        self
    }
}

/// Authentication and authorization decisions for the invitation routes.
///
/// Every method has a default, so an implementation only overrides what it
/// needs. Left alone, the defaults require a signed-in user for minting tokens
/// and accepting invitations, and deny reading, revoking and re-sending.
///
/// # Example
///
/// ```rust,ignore
/// use vortex_axum::auth::{AccessPolicy, TokenExtractor, VortexUser};
///
/// struct AppPolicy {
///     sessions: SessionStore,
/// }
///
/// #[async_trait]
/// impl AccessPolicy for AppPolicy {
///     async fn current_user(&self, parts: &Parts) -> Result<Option<VortexUser>> {
///         let Ok(token) = TokenExtractor::from_header(parts) else {
///             return Ok(None);
///         };
///         let user = self.sessions.lookup(&token).await?;
///         Ok(user.map(|u| VortexUser::new(u.id).with_email(u.email)))
///     }
///
///     async fn can_get_invitation(&self, user: Option<&VortexUser>, _id: &str) -> bool {
///         user.is_some_and(|u| !u.admin_scopes.is_empty())
///     }
/// }
/// ```
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Resolve the user making the request, if any.
    ///
    /// Errors abort the request; return `Ok(None)` for anonymous callers.
    async fn current_user(&self, _parts: &Parts) -> Result<Option<VortexUser>> {
        Ok(None)
    }

    async fn can_access_jwt(&self, user: Option<&VortexUser>) -> bool {
        user.is_some()
    }

    async fn can_get_invitations_by_target(
        &self,
        _user: Option<&VortexUser>,
        _target: &InvitationTarget,
    ) -> bool {
        false
    }

    async fn can_get_invitation(&self, _user: Option<&VortexUser>, _invitation_id: &str) -> bool {
        false
    }

    async fn can_revoke_invitation(
        &self,
        _user: Option<&VortexUser>,
        _invitation_id: &str,
    ) -> bool {
        false
    }

    async fn can_reinvite(&self, _user: Option<&VortexUser>, _invitation_id: &str) -> bool {
        false
    }

    async fn can_accept_invitations(
        &self,
        user: Option<&VortexUser>,
        _invitation_ids: &[String],
        _accepting: &AcceptUser,
    ) -> bool {
        user.is_some()
    }
}

/// Policy that uses every default: no user is ever resolved, so only
/// unauthenticated outcomes are possible until replaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

#[async_trait]
impl AccessPolicy for DefaultPolicy {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invitations::TargetType;
    use axum::http::Request;

    fn target() -> InvitationTarget {
        InvitationTarget {
            target_type: TargetType::Email,
            value: "a@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_default_policy_decisions() {
        let policy = DefaultPolicy;
        let user = VortexUser::new("user_1");

        let (parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert!(policy.current_user(&parts).await.unwrap().is_none());

        assert!(!policy.can_access_jwt(None).await);
        assert!(policy.can_access_jwt(Some(&user)).await);

        assert!(!policy.can_accept_invitations(None, &[], &AcceptUser::default()).await);
        assert!(
            policy
                .can_accept_invitations(Some(&user), &["inv_1".to_string()], &AcceptUser::default())
                .await
        );

        assert!(!policy.can_get_invitations_by_target(Some(&user), &target()).await);
        assert!(!policy.can_get_invitation(Some(&user), "inv_1").await);
        assert!(!policy.can_revoke_invitation(Some(&user), "inv_1").await);
        assert!(!policy.can_reinvite(Some(&user), "inv_1").await);
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = VortexUser::new("user_1")
            .with_email("a@example.com")
            .with_admin_scope("autojoin");
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["adminScopes"][0], "autojoin");
        assert_eq!(value["email"], "a@example.com");
    }
}
