use async_trait::async_trait;
use clinic_security::Actor;

use crate::{AuthError, Claims};

/// Turns verified claims into the caller's current actor.
#[async_trait]
pub trait ActorResolver: Send + Sync {
    /// `None` when the user no longer exists or is deactivated. The returned
    /// role is the stored one, not the one minted into the token.
    async fn resolve(&self, claims: &Claims) -> Result<Option<Actor>, AuthError>;
}

/// Trusts the claims as signed. For tools and tests without a user store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsActorResolver;

#[async_trait]
impl ActorResolver for ClaimsActorResolver {
    async fn resolve(&self, claims: &Claims) -> Result<Option<Actor>, AuthError> {
        Ok(Some(claims.actor()))
    }
}
