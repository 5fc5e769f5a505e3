/// Errors raised by scoped data access.
#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    /// No actor on the context. Always reported before any lookup.
    #[error("authentication required")]
    Unauthenticated,

    /// Absent, soft-deleted or owned by another clinic. The three cases are
    /// reported identically.
    #[error("record not found")]
    NotFound,

    /// Invalid scope configuration.
    #[error("invalid scope: {0}")]
    Invalid(&'static str),

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

impl From<clinic_security::SecurityError> for ScopeError {
    fn from(err: clinic_security::SecurityError) -> Self {
        match err {
            clinic_security::SecurityError::Unauthenticated => Self::Unauthenticated,
            // Any other security failure at this layer hides the record.
            _ => Self::NotFound,
        }
    }
}
