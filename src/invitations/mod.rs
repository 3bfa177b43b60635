//! Invitation API routes for the Vortex widget.
//!
//! Every route sanitizes its parameters, resolves the caller through the
//! [`AccessPolicy`](crate::auth::AccessPolicy), asks the policy for permission,
//! and only then calls the [`InvitationsApi`] collaborator.

mod api;
mod params;
mod routes;

pub use api::{AcceptUser, Invitation, InvitationTarget, InvitationsApi, TargetType};
pub use params::{
    AcceptInvitationsBody, MAX_ACCEPT_INVITATIONS, MAX_INVITATION_ID_LEN, TargetQuery,
    parse_target, sanitize_invitation_id,
};
pub use routes::{Caller, InvitationsState, router};

use axum::Router;

use crate::config::VortexConfig;

/// Invitation routes mounted under the configured base path.
pub fn vortex_router(config: &VortexConfig, state: InvitationsState) -> Router {
    let routes = router(state);
    match config.base_path() {
        "/" => routes,
        base_path => Router::new().nest(base_path, routes),
    }
}
