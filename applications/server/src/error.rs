/// Server error types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clinic_core::{ClinicError, ValidationError};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Permission denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    #[error("Invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Database integrity error: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(ClinicError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

impl From<ClinicError> for ServerError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::Validation(e) => ServerError::Validation(e),
            ClinicError::InvalidFilter { field, message } => {
                ServerError::InvalidField { field, message }
            }
            ClinicError::NotFound { entity, .. } => {
                ServerError::NotFound(format!("{entity} not found."))
            }
            ClinicError::Forbidden => ServerError::Forbidden,
            ClinicError::InvalidInput(msg) => ServerError::BadRequest(msg),
            ClinicError::Integrity(msg) => ServerError::Integrity(msg),
            other => ServerError::Database(other),
        }
    }
}

impl From<clinic_storage::StorageError> for ServerError {
    fn from(err: clinic_storage::StorageError) -> Self {
        ClinicError::from(err).into()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(rejection: PathRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ServerError::Auth(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ServerError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "error": "You do not have permission to perform this action." }),
            ),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ServerError::Validation(e) => {
                let message = e.to_string();
                (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": message,
                        "fields": { e.field(): [message] },
                    }),
                )
            }
            ServerError::InvalidField { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": format!("Invalid {field}."),
                    "fields": { field: [message] },
                }),
            ),
            ServerError::Integrity(ref msg) => {
                tracing::warn!("Integrity violation: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Database integrity error." }),
                )
            }
            ServerError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Database error" }),
                )
            }
            ServerError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Configuration error" }),
                )
            }
            ServerError::Jwt(ref e) => {
                tracing::warn!("JWT error: {:?}", e);
                (StatusCode::UNAUTHORIZED, json!({ "error": "Invalid token" }))
            }
            ServerError::Bcrypt(ref e) => {
                tracing::error!("Bcrypt error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Password error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
