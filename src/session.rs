use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::appresult::AppError;

/// Session key the identity provider writes the authenticated user id under.
pub const USER_ID: &str = "user_id";

/// The authenticated caller, resolved from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthenticated)?;

        match session.get::<String>(USER_ID).await? {
            Some(user_id) if !user_id.is_empty() => Ok(CurrentUser(user_id)),
            _ => Err(AppError::Unauthenticated),
        }
    }
}
