use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::models::ErrorResponse;
use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Failure produced on purpose by the `error` query parameter
    #[error("Random demo error")]
    InjectedFailure,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::InjectedFailure => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingParameter(param) =>
                ApiError::BadRequest(format!("Missing parameter: {}", param)),
            other => ApiError::InvalidParameter(other.to_string()),
        }
    }
}
