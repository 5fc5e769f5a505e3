#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! HS256 bearer tokens in, [`SecurityContext`](clinic_security::SecurityContext) out.
//!
//! The middleware never rejects a request for lacking a token: it inserts an
//! anonymous context and leaves the decision to the service layer, which
//! answers 401 before touching data. A token that is present but invalid is
//! rejected immediately, and so is a token whose user has since been
//! deactivated or removed. Roles are always read from the user store.

pub mod axum_ext;
pub mod claims;
pub mod config;
pub mod errors;
pub mod token;
pub mod traits;

pub use axum_ext::{AuthState, Authz, auth_middleware};
pub use claims::Claims;
pub use config::AuthConfig;
pub use errors::AuthError;
pub use token::JwtCodec;
pub use traits::{ActorResolver, ClaimsActorResolver};
