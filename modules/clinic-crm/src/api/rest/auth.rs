use std::sync::Arc;

use async_trait::async_trait;
use clinic_auth::{ActorResolver, AuthError, Claims};
use clinic_security::Actor;

use crate::domain::service::Service;

/// Resolves bearer tokens against the `users` table on every request, so
/// deactivation and role changes apply to tokens already handed out.
pub struct UserStoreResolver {
    service: Arc<Service>,
}

impl UserStoreResolver {
    #[must_use]
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ActorResolver for UserStoreResolver {
    async fn resolve(&self, claims: &Claims) -> Result<Option<Actor>, AuthError> {
        self.service
            .current_actor(claims.sub, claims.clinic_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, user_id = %claims.sub, "user lookup failed");
                AuthError::Internal("user lookup failed".to_owned())
            })
    }
}
