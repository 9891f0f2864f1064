use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Unauthorized. Please log in.")]
    Unauthorized,
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Logs the underlying failure and hides it behind `message`.
    pub fn internal(message: &'static str, err: impl std::fmt::Display) -> Self {
        error!(error = %err, "{}", message);
        ApiError::Internal(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "rejected request body");
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
