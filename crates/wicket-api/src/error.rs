use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use wicket_core::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => match err {
                AuthError::MissingCredentials
                | AuthError::InvalidFormat(_)
                | AuthError::CaptchaFailed => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::Unauthenticated
                | AuthError::TokenExpired
                | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                AuthError::Configuration(_) | AuthError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Auth(err) => err.code(),
            ApiError::Internal(_) => "SERVER_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!("API internal error: {self:#}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "code": self.code(), "message": message }))).into_response()
    }
}
