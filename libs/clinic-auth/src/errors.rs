use axum::response::{IntoResponse, Response};
use clinic_errors::Problem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Token encoding failed: {0}")]
    Encoding(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::TokenExpired,
            _ => Self::InvalidToken(err.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidToken(_) | Self::TokenExpired => {
                tracing::debug!(error = %self, "rejecting bearer token");
                Problem::unauthorized().into_response()
            }
            Self::Encoding(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "auth failure");
                Problem::internal().into_response()
            }
        }
    }
}
