use clinic_db::secure::ScopeError;
use clinic_security::SecurityError;
use sea_orm::DbErr;
use thiserror::Error;

/// Errors returned by CRM services.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Missing, owned by another clinic, or soft-deleted.
    #[error("not found")]
    NotFound,

    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<ScopeError> for DomainError {
    fn from(e: ScopeError) -> Self {
        match e {
            ScopeError::Unauthenticated => Self::Unauthenticated,
            ScopeError::NotFound => Self::NotFound,
            ScopeError::Invalid(msg) => Self::Internal(msg.to_owned()),
            ScopeError::Db(db) => Self::Database(db),
        }
    }
}

impl From<SecurityError> for DomainError {
    fn from(e: SecurityError) -> Self {
        match e {
            SecurityError::Unauthenticated => Self::Unauthenticated,
            SecurityError::Forbidden(permission) => {
                Self::Forbidden(format!("missing permission '{permission}'"))
            }
            SecurityError::UnknownRole(role) => {
                Self::validation("role", format!("unknown role '{role}'"))
            }
        }
    }
}
