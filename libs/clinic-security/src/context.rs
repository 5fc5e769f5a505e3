use uuid::Uuid;

use crate::{AccessScope, Permission, Role, SecurityError};

/// An authenticated user. Belongs to exactly one clinic.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(id: Uuid, clinic_id: Uuid, role: Role) -> Self {
        Self { id, clinic_id, role }
    }
}

/// `SecurityContext` carries the caller of a request or operation.
///
/// It is built once per request by the HTTP auth layer and passed explicitly
/// to every service call. An anonymous context has no actor and can never
/// reach tenant-owned data.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SecurityContext {
    actor: Option<Actor>,
    environment: Vec<(String, String)>,
}

impl SecurityContext {
    /// Create a new `SecurityContext` builder
    #[must_use]
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    /// Create an anonymous `SecurityContext` with no actor
    #[must_use]
    pub fn anonymous() -> Self {
        SecurityContextBuilder::default().build()
    }

    #[must_use]
    pub fn for_actor(actor: Actor) -> Self {
        SecurityContextBuilder::default().actor(actor).build()
    }

    #[must_use]
    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.actor.is_some()
    }

    /// Get the actor or fail before anything else is checked.
    ///
    /// # Errors
    /// Returns `SecurityError::Unauthenticated` for anonymous contexts.
    pub fn require_actor(&self) -> Result<&Actor, SecurityError> {
        self.actor.as_ref().ok_or(SecurityError::Unauthenticated)
    }

    /// Check the static role mapping for `permission`.
    ///
    /// # Errors
    /// `Unauthenticated` when anonymous (always checked first), `Forbidden`
    /// when the actor's role lacks the permission.
    pub fn require_permission(&self, permission: Permission) -> Result<&Actor, SecurityError> {
        let actor = self.require_actor()?;
        if permission.is_granted_to(actor.role) {
            Ok(actor)
        } else {
            Err(SecurityError::Forbidden(permission))
        }
    }

    /// Get the environmental attributes associated with the security context
    /// (e.g., masked IP hash, user agent)
    #[must_use]
    pub fn environment(&self) -> &[(String, String)] {
        &self.environment
    }

    #[must_use]
    pub fn environment_attribute(&self, key: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Scope covering the actor's own clinic; deny-all when anonymous.
    #[must_use]
    pub fn scope(&self) -> AccessScope {
        self.actor
            .as_ref()
            .map(|actor| AccessScope::clinic(actor.clinic_id))
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct SecurityContextBuilder {
    actor: Option<Actor>,
    environment: Vec<(String, String)>,
}

impl SecurityContextBuilder {
    #[must_use]
    pub fn actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    #[must_use]
    pub fn add_environment_attribute(mut self, key: &str, value: &str) -> Self {
        self.environment.push((key.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityContext {
        SecurityContext {
            actor: self.actor,
            environment: self.environment,
        }
    }
}
