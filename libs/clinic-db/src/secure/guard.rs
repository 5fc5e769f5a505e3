use sea_orm::{ColumnTrait, ConnectionTrait};
use uuid::Uuid;

use crate::secure::{
    Actor, ScopableEntity, ScopeError, Scoped, SecureEntityExt, SecureSelect, SecurityContext,
    Visibility,
};

/// Clinic isolation bound to one caller.
///
/// Built per request from the caller's [`SecurityContext`]. Holds no
/// connection and starts no transaction; the views it hands out run on
/// whatever connection or transaction the caller passes in.
#[derive(Debug, Clone, Copy)]
pub struct TenantGuard<'a> {
    ctx: &'a SecurityContext,
}

impl<'a> TenantGuard<'a> {
    #[must_use]
    pub fn new(ctx: &'a SecurityContext) -> Self {
        Self { ctx }
    }

    /// # Errors
    /// `Unauthenticated` when the context has no actor.
    pub fn actor(&self) -> Result<&'a Actor, ScopeError> {
        self.ctx.actor().ok_or(ScopeError::Unauthenticated)
    }

    /// All rows of `E` owned by the actor's clinic, live ones only unless
    /// `visibility` says otherwise. Further filters narrow, never widen.
    ///
    /// # Errors
    /// `Unauthenticated` when the context has no actor.
    pub fn scoped_collection<E>(&self, visibility: Visibility) -> Result<SecureSelect<E, Scoped>, ScopeError>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
    {
        self.actor()?;
        Ok(E::find().secure().scope_with(&self.ctx.scope(), visibility))
    }

    /// One row by primary id within the actor's clinic.
    ///
    /// # Errors
    /// `Unauthenticated` first, then `NotFound` for a missing id, a row owned
    /// by another clinic or a soft-deleted row under `Visibility::Live`.
    pub async fn get_by_id_or_not_found<E, C>(
        &self,
        conn: &C,
        id: Uuid,
        visibility: Visibility,
    ) -> Result<E::Model, ScopeError>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
        C: ConnectionTrait + Send + Sync,
    {
        self.scoped_collection::<E>(visibility)?
            .and_id(id)?
            .one(conn)
            .await?
            .ok_or(ScopeError::NotFound)
    }

    /// Confirm that `clinic_id` is the actor's own clinic.
    ///
    /// # Errors
    /// `Unauthenticated` when anonymous, `NotFound` when the clinic differs.
    pub fn require_actor_tenant(&self, clinic_id: Uuid) -> Result<&'a Actor, ScopeError> {
        let actor = self.actor()?;
        if actor.clinic_id == clinic_id {
            Ok(actor)
        } else {
            Err(ScopeError::NotFound)
        }
    }
}
