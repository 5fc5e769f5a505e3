//! Tenant-scoped data access.
//!
//! Clinic isolation is enforced here rather than in each handler:
//!
//! - [`ScopableEntity`] declares which column holds the owning clinic, which
//!   is the primary key and which marks soft deletion.
//! - [`SecureSelect`] and [`SecureUpdateMany`] are typestate wrappers. A query
//!   cannot run until `.scope_with()` has attached the clinic filter.
//! - [`TenantGuard`] binds those wrappers to a [`SecurityContext`] so callers
//!   only ever say *what* they want, never *which clinic* it belongs to.
//!
//! An empty [`AccessScope`] compiles to `WHERE false`, so an anonymous caller
//! reads nothing even if a check upstream was forgotten.
//!
//! ```rust,ignore
//! let guard = TenantGuard::new(&ctx);
//! let open = guard
//!     .scoped_collection::<lead::Entity>(Visibility::Live)?
//!     .filter(lead::Column::Status.eq("new"))
//!     .all(&conn)
//!     .await?;
//! let one = guard.get_by_id_or_not_found::<lead::Entity, _>(&conn, id, Visibility::Live).await?;
//! ```

mod cond;
mod db_ops;
mod entity_traits;
mod error;
mod guard;
mod select;

pub use clinic_security::{AccessScope, Actor, SecurityContext};

pub use cond::build_scope_condition;
pub use db_ops::{SecureUpdateExt, SecureUpdateMany, soft_delete, validate_tenant_in_scope};
pub use entity_traits::{ScopableEntity, SoftDeletable, Visibility};
pub use error::ScopeError;
pub use guard::TenantGuard;
pub use select::{SecureEntityExt, SecureSelect, Scoped, Unscoped};
