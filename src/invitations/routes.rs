use std::future::Future;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequestParts, Path, Query, State},
    http::request::Parts,
    routing::{get, post},
};
use serde_json::{Value, json};

use super::api::{Invitation, InvitationsApi};
use super::params::{AcceptInvitationsBody, TargetQuery, sanitize_invitation_id};
use crate::auth::{AccessPolicy, VortexUser};
use crate::error::{Result, VortexError};

/// Shared state for the invitation routes.
#[derive(Clone)]
pub struct InvitationsState {
    api: Arc<dyn InvitationsApi>,
    policy: Arc<dyn AccessPolicy>,
}

impl InvitationsState {
    pub fn new(api: impl InvitationsApi + 'static, policy: impl AccessPolicy + 'static) -> Self {
        Self {
            api: Arc::new(api),
            policy: Arc::new(policy),
        }
    }

    /// Build from collaborators that are already shared elsewhere.
    pub fn from_shared(api: Arc<dyn InvitationsApi>, policy: Arc<dyn AccessPolicy>) -> Self {
        Self { api, policy }
    }
}

/// The user resolved by the access policy for this request, if any.
pub struct Caller(pub Option<VortexUser>);

impl FromRequestParts<InvitationsState> for Caller {
    type Rejection = VortexError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &InvitationsState,
    ) -> impl Future<Output = Result<Self>> + Send {
        let policy = state.policy.clone();
        async move { policy.current_user(parts).await.map(Caller) }
    }
}

/// Turn a policy decision into a response.
///
/// A denied anonymous caller gets `401` so clients know to sign in; a denied
/// signed-in caller gets `403`.
fn authorize(allowed: bool, user: Option<&VortexUser>, operation: &str) -> Result<()> {
    if allowed {
        return Ok(());
    }

    match user {
        None => Err(VortexError::unauthorized("Authentication required")),
        Some(user) => {
            tracing::debug!(user_id = %user.id, operation, "Access policy denied request");
            Err(VortexError::forbidden(format!("Not allowed to {}", operation)))
        }
    }
}

async fn generate_jwt(
    State(state): State<InvitationsState>,
    Caller(user): Caller,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| VortexError::unauthorized("Authentication required"))?;
    authorize(
        state.policy.can_access_jwt(Some(&user)).await,
        Some(&user),
        "generate a token",
    )?;

    let jwt = state.api.generate_jwt(&user).await?;
    Ok(Json(json!({ "jwt": jwt })))
}

async fn get_invitations_by_target(
    State(state): State<InvitationsState>,
    Caller(user): Caller,
    Query(query): Query<TargetQuery>,
) -> Result<Json<Value>> {
    let target = query.into_target()?;
    authorize(
        state
            .policy
            .can_get_invitations_by_target(user.as_ref(), &target)
            .await,
        user.as_ref(),
        "list invitations",
    )?;

    let invitations = state.api.get_invitations_by_target(&target).await?;
    Ok(Json(json!({ "invitations": invitations })))
}

async fn get_invitation(
    State(state): State<InvitationsState>,
    Caller(user): Caller,
    Path(invitation_id): Path<String>,
) -> Result<Json<Invitation>> {
    let invitation_id = sanitize_invitation_id(&invitation_id)?;
    authorize(
        state
            .policy
            .can_get_invitation(user.as_ref(), &invitation_id)
            .await,
        user.as_ref(),
        "read this invitation",
    )?;

    Ok(Json(state.api.get_invitation(&invitation_id).await?))
}

async fn revoke_invitation(
    State(state): State<InvitationsState>,
    Caller(user): Caller,
    Path(invitation_id): Path<String>,
) -> Result<Json<Value>> {
    let invitation_id = sanitize_invitation_id(&invitation_id)?;
    authorize(
        state
            .policy
            .can_revoke_invitation(user.as_ref(), &invitation_id)
            .await,
        user.as_ref(),
        "revoke this invitation",
    )?;

    state.api.revoke_invitation(&invitation_id).await?;
    tracing::info!(invitation_id = %invitation_id, "Invitation revoked");
    Ok(Json(json!({ "success": true })))
}

async fn reinvite(
    State(state): State<InvitationsState>,
    Caller(user): Caller,
    Path(invitation_id): Path<String>,
) -> Result<Json<Invitation>> {
    let invitation_id = sanitize_invitation_id(&invitation_id)?;
    authorize(
        state.policy.can_reinvite(user.as_ref(), &invitation_id).await,
        user.as_ref(),
        "resend this invitation",
    )?;

    Ok(Json(state.api.reinvite(&invitation_id).await?))
}

async fn accept_invitations(
    State(state): State<InvitationsState>,
    Caller(user): Caller,
    body: Bytes,
) -> Result<Json<Invitation>> {
    let body: AcceptInvitationsBody = serde_json::from_slice(&body)?;
    let (invitation_ids, accepting) = body.into_parts()?;
    authorize(
        state
            .policy
            .can_accept_invitations(user.as_ref(), &invitation_ids, &accepting)
            .await,
        user.as_ref(),
        "accept these invitations",
    )?;

    let invitation = state
        .api
        .accept_invitations(&invitation_ids, &accepting)
        .await?;
    tracing::info!(count = invitation_ids.len(), "Invitations accepted");
    Ok(Json(invitation))
}

/// Invitation routes, relative to the configured base path.
///
/// | Method | Path | Policy check |
/// |---|---|---|
/// | `POST` | `/jwt` | `can_access_jwt` |
/// | `GET` | `/invitations?targetType=&targetValue=` | `can_get_invitations_by_target` |
/// | `GET` | `/invitations/{invitation_id}` | `can_get_invitation` |
/// | `DELETE` | `/invitations/{invitation_id}` | `can_revoke_invitation` |
/// | `POST` | `/invitations/{invitation_id}/reinvite` | `can_reinvite` |
/// | `POST` | `/invitations/accept` | `can_accept_invitations` |
pub fn router(state: InvitationsState) -> Router {
    Router::new()
        .route("/jwt", post(generate_jwt))
        .route("/invitations", get(get_invitations_by_target))
        .route("/invitations/accept", post(accept_invitations))
        .route(
            "/invitations/{invitation_id}",
            get(get_invitation).delete(revoke_invitation),
        )
        .route("/invitations/{invitation_id}/reinvite", post(reinvite))
        .with_state(state)
}
