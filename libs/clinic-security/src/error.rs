use crate::Permission;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    /// No actor is attached to the request.
    #[error("authentication required")]
    Unauthenticated,

    #[error("missing permission '{0}'")]
    Forbidden(Permission),

    #[error("unknown role '{0}'")]
    UnknownRole(String),
}
