mod activity;
mod authority;
mod handlers;
mod model;
mod registry;

use axum::{routing::{delete, get, post, put}, Router};

use crate::AppState;

pub use activity::{family_activities, Activity, ActivityKind, ActivityPage, PageQuery};
pub(crate) use activity::join_content;
pub use authority::Authority;
pub use model::{Family, Membership, Role};
pub use registry::{
    create_family, delete_family, get_family, join_by_code, leave_family, list_families,
    list_members, remove_member, set_member_role, update_family, CreateFamily, MemberView,
    UpdateFamily,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_families).post(handlers::create_family))
        .route("/join-by-code", post(handlers::join_by_code))
        .route(
            "/{family_id}",
            get(handlers::get_family)
                .put(handlers::update_family)
                .delete(handlers::delete_family),
        )
        .route("/{family_id}/members", get(handlers::list_members))
        .route("/{family_id}/members/{member_id}", delete(handlers::remove_member))
        .route("/{family_id}/members/{member_id}/role", put(handlers::set_member_role))
        .route("/{family_id}/leave", post(handlers::leave_family))
        .route("/{family_id}/activities", get(handlers::list_activities))
}
