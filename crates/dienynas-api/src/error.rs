use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use dienynas_types::api::FieldError;

use crate::avatar::AvatarError;
use crate::session::LOGIN_PATH;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Field-level form failures, duplicate name/email included.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// One generic message for unknown email and wrong password alike.
    #[error("invalid credentials")]
    BadCredentials,

    /// No valid session; the client gets sent to the login page.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Authenticated, but not the administrator.
    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }
}

/// Storage-level duplicates (a concurrent writer beating the pre-check)
/// render the same field errors the pre-check would.
impl From<dienynas_db::StoreError> for ApiError {
    fn from(err: dienynas_db::StoreError) -> Self {
        use dienynas_db::StoreError;
        match err {
            StoreError::DuplicateName => ApiError::validation("name", "this name is already taken"),
            StoreError::DuplicateEmail => {
                ApiError::validation("email", "this email address is already in use")
            }
            StoreError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl From<AvatarError> for ApiError {
    fn from(err: AvatarError) -> Self {
        match err {
            AvatarError::UnsupportedType => {
                ApiError::validation("avatar", "only jpg and png images are accepted")
            }
            AvatarError::Malformed(_) => {
                ApiError::validation("avatar", "the uploaded file is not a readable image")
            }
            AvatarError::Io(e) => ApiError::Internal(e.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            ApiError::BadCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid email or password" })),
            )
                .into_response(),
            ApiError::NotAuthenticated => Redirect::to(LOGIN_PATH).into_response(),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "forbidden" })),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
