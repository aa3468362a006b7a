use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid Client ID or Mobile Number")]
    InvalidClientLogin,

    #[error("credential hashing failed: {0}")]
    Hash(argon2::password_hash::Error),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidClientLogin => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Hash(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "success": false, "message": self.to_string() }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("Client ID is missing"), 400),
            (AppError::InvalidCredentials, 401),
            (AppError::InvalidClientLogin, 401),
            (AppError::Store(StoreError::Api("boom".to_string())), 500),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status().as_u16(), expected);
        }
    }

    #[test]
    fn test_store_message_passes_through() {
        let error = AppError::Store(StoreError::Api("duplicate key value".to_string()));
        assert_eq!(error.to_string(), "duplicate key value");
    }

    #[test]
    fn test_fixed_messages() {
        assert_eq!(AppError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(
            AppError::InvalidClientLogin.to_string(),
            "Invalid Client ID or Mobile Number"
        );
    }
}
