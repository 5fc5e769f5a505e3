use std::marker::PhantomData;

use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::Expr};
use uuid::Uuid;

use crate::secure::cond::build_scope_condition;
use crate::secure::error::ScopeError;
use crate::secure::{
    AccessScope, ScopableEntity, Scoped, SecurityContext, SoftDeletable, TenantGuard, Unscoped,
    Visibility,
};

/// Check a clinic id picked for a new row against the caller's scope.
///
/// # Errors
/// Returns `ScopeError::Invalid` if the clinic is not in the scope.
pub fn validate_tenant_in_scope(clinic_id: Uuid, scope: &AccessScope) -> Result<(), ScopeError> {
    if scope.contains_clinic(clinic_id) {
        Ok(())
    } else {
        Err(ScopeError::Invalid("clinic_id not present in security scope"))
    }
}

/// `SeaORM` `UpdateMany` that refuses to run until it has been scoped.
///
/// ```ignore
/// let res = lead::Entity::update_many()
///     .col_expr(lead::Column::AssignedTo, Expr::value(agent_id))
///     .secure()
///     .scope_with(&ctx.scope(), Visibility::Live)
///     .and_id(lead_id)?
///     .exec(&txn)
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct SecureUpdateMany<E: EntityTrait, S> {
    pub(crate) inner: sea_orm::UpdateMany<E>,
    pub(crate) _state: PhantomData<S>,
}

pub trait SecureUpdateExt<E: EntityTrait>: Sized {
    /// Wrap the update. `.scope_with()` must be called before executing.
    fn secure(self) -> SecureUpdateMany<E, Unscoped>;
}

impl<E> SecureUpdateExt<E> for sea_orm::UpdateMany<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureUpdateMany<E, Unscoped> {
        SecureUpdateMany {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E> SecureUpdateMany<E, Unscoped>
where
    E: ScopableEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    #[must_use]
    pub fn scope_with(self, scope: &AccessScope, visibility: Visibility) -> SecureUpdateMany<E, Scoped> {
        let cond = build_scope_condition::<E>(scope, visibility);
        SecureUpdateMany {
            inner: self.inner.filter(cond),
            _state: PhantomData,
        }
    }
}

impl<E> SecureUpdateMany<E, Scoped>
where
    E: EntityTrait,
{
    /// # Errors
    /// Returns `ScopeError::Invalid` if the entity has no resource column.
    pub fn and_id(mut self, id: Uuid) -> Result<Self, ScopeError>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
    {
        let id_col = E::resource_col().ok_or(ScopeError::Invalid(
            "entity must have a resource_col to use and_id()",
        ))?;
        self.inner = QueryFilter::filter(self.inner, Expr::col((E::default(), id_col)).eq(id));
        Ok(self)
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the database operation fails.
    pub async fn exec<C: ConnectionTrait + Send + Sync>(
        self,
        conn: &C,
    ) -> Result<sea_orm::UpdateResult, ScopeError> {
        Ok(self.inner.exec(conn).await?)
    }
}

/// Retire a live row: stamp `deleted_at = now` and `deleted_by = actor`.
///
/// The update carries the same scope as a guarded read, so a row from another
/// clinic, an already deleted row and a missing id all come back as
/// `NotFound`.
///
/// # Errors
/// `Unauthenticated` for anonymous contexts, `NotFound` when no live row in
/// the actor's clinic matches, `Db` on storage failure.
pub async fn soft_delete<E, C>(conn: &C, ctx: &SecurityContext, id: Uuid) -> Result<(), ScopeError>
where
    E: SoftDeletable,
    E::Column: ColumnTrait + Copy,
    C: ConnectionTrait + Send + Sync,
{
    let actor = TenantGuard::new(ctx).actor()?;

    let res = E::update_many()
        .col_expr(E::deleted_at_column(), Expr::value(Utc::now()))
        .col_expr(E::deleted_by_column(), Expr::value(actor.id))
        .secure()
        .scope_with(&ctx.scope(), Visibility::Live)
        .and_id(id)?
        .exec(conn)
        .await?;

    if res.rows_affected == 0 {
        return Err(ScopeError::NotFound);
    }
    tracing::debug!(%id, clinic_id = %actor.clinic_id, "row soft-deleted");
    Ok(())
}
