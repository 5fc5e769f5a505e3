use std::marker::PhantomData;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, IntoSimpleExpr, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr, sea_query::IntoCondition,
};

use crate::secure::cond::build_scope_condition;
use crate::secure::error::ScopeError;
use crate::secure::{AccessScope, ScopableEntity, Visibility};

/// Typestate marker: no clinic filter attached yet, cannot execute.
#[derive(Debug, Clone, Copy)]
pub struct Unscoped;

/// Typestate marker: clinic filter attached, safe to execute.
#[derive(Debug, Clone, Copy)]
pub struct Scoped;

/// `SeaORM` `Select` that refuses to run until it has been scoped.
///
/// Extra filters added after scoping are AND-ed with the scope, so no
/// chaining order can widen the result set. There is no way
/// to get the inner `Select` back out.
#[must_use]
#[derive(Clone, Debug)]
pub struct SecureSelect<E: EntityTrait, S> {
    pub(crate) inner: sea_orm::Select<E>,
    pub(crate) _state: PhantomData<S>,
}

pub trait SecureEntityExt<E: EntityTrait>: Sized {
    /// Wrap the select. `.scope_with()` must be called before executing.
    fn secure(self) -> SecureSelect<E, Unscoped>;
}

impl<E> SecureEntityExt<E> for sea_orm::Select<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureSelect<E, Unscoped> {
        SecureSelect {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Unscoped>
where
    E: ScopableEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    /// Attach the scope filter, see [`build_scope_condition`].
    pub fn scope_with(self, scope: &AccessScope, visibility: Visibility) -> SecureSelect<E, Scoped> {
        let cond = build_scope_condition::<E>(scope, visibility);
        SecureSelect {
            inner: self.inner.filter(cond),
            _state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Scoped>
where
    E: EntityTrait,
{
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn all<C>(self, conn: &C) -> Result<Vec<E::Model>, ScopeError>
    where
        C: ConnectionTrait + Send + Sync,
    {
        Ok(self.inner.all(conn).await?)
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn one<C>(self, conn: &C) -> Result<Option<E::Model>, ScopeError>
    where
        C: ConnectionTrait + Send + Sync,
    {
        Ok(self.inner.one(conn).await?)
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn count<C>(self, conn: &C) -> Result<u64, ScopeError>
    where
        C: ConnectionTrait + Send + Sync,
        E::Model: sea_orm::FromQueryResult + Send + Sync,
    {
        Ok(self.inner.count(conn).await?)
    }

    /// Narrow to a single row by primary identifier.
    ///
    /// # Errors
    /// Returns `ScopeError::Invalid` if the entity has no resource column.
    pub fn and_id(self, id: uuid::Uuid) -> Result<Self, ScopeError>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
    {
        let id_col = E::resource_col().ok_or(ScopeError::Invalid(
            "entity must have a resource_col to use and_id()",
        ))?;
        Ok(self.filter(Expr::col((E::default(), id_col)).eq(id)))
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: IntoCondition,
    {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    pub fn order_by<C>(mut self, col: C, order: Order) -> Self
    where
        C: IntoSimpleExpr,
    {
        self.inner = QueryOrder::order_by(self.inner, col, order);
        self
    }

    pub fn order_by_desc<C>(self, col: C) -> Self
    where
        C: IntoSimpleExpr,
    {
        self.order_by(col, Order::Desc)
    }

    pub fn order_by_asc<C>(self, col: C) -> Self
    where
        C: IntoSimpleExpr,
    {
        self.order_by(col, Order::Asc)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.inner = QuerySelect::limit(self.inner, limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.inner = QuerySelect::offset(self.inner, offset);
        self
    }
}
