use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::error::{CoreError, ErrorKind};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Unauthenticated,
    Core(CoreError),
    Other(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Core(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Unauthenticated => "authentication required".to_owned(),
            AppError::Core(CoreError::Internal(err)) => {
                tracing::error!(error = %err, "storage failure");
                "internal error".to_owned()
            }
            AppError::Core(err) => err.to_string(),
            AppError::Other(err) => {
                tracing::error!(error = %err, backtrace = %err.backtrace(), "unhandled error");
                "internal error".to_owned()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Other(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        let cases = [
            (CoreError::NotFound("family"), StatusCode::NOT_FOUND),
            (CoreError::forbidden("creator"), StatusCode::FORBIDDEN),
            (CoreError::conflict("member"), StatusCode::CONFLICT),
            (CoreError::validation("role"), StatusCode::UNPROCESSABLE_ENTITY),
            (CoreError::Internal(sqlx::Error::PoolClosed), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn missing_session_is_unauthorized() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
    }
}
