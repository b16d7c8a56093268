mod handlers;
mod model;
mod state;
mod workflow;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use model::Invitation;
pub use state::{InvitationEvent, InvitationStatus};
pub use workflow::{
    expire_stale_invitations, invite, pending_invitations, respond_to_invitation, InviteMembers,
};

/// Routes under `/invitations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::pending))
        .route("/{invitation_id}/respond", post(handlers::respond))
}

/// Routes nested under `/families`.
pub fn family_router() -> Router<AppState> {
    Router::new().route("/{family_id}/invitations", post(handlers::invite))
}
