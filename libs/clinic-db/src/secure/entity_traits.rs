use sea_orm::EntityTrait;

/// Declares the scope columns of a clinic-owned entity.
///
/// All three columns must be spelled out: `Some(Column::...)` or `None`.
/// There are no defaults, so adding a table forces a decision about how it
/// is isolated.
///
/// ```rust,ignore
/// impl ScopableEntity for lead::Entity {
///     fn tenant_col() -> Option<Self::Column> { Some(lead::Column::ClinicId) }
///     fn resource_col() -> Option<Self::Column> { Some(lead::Column::Id) }
///     fn deleted_at_col() -> Option<Self::Column> { Some(lead::Column::DeletedAt) }
/// }
/// ```
///
/// For the common shapes use [`crate::scopable_entity!`].
pub trait ScopableEntity: EntityTrait {
    /// Column holding the owning clinic id. `None` only for the clinic
    /// table's children that are reached through a scoped parent.
    fn tenant_col() -> Option<Self::Column>;

    /// Primary identifier, used by `and_id` and guarded lookups by id.
    fn resource_col() -> Option<Self::Column>;

    /// Soft-delete marker. Rows with a non-null value are hidden from
    /// [`Visibility::Live`] reads.
    fn deleted_at_col() -> Option<Self::Column>;
}

/// Entities whose rows are retired by stamping `deleted_at`/`deleted_by`
/// instead of being removed.
pub trait SoftDeletable: ScopableEntity {
    fn deleted_at_column() -> Self::Column;
    fn deleted_by_column() -> Self::Column;
}

/// Whether soft-deleted rows take part in a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Hide rows with `deleted_at` set.
    #[default]
    Live,
    /// Return soft-deleted rows too (exports, audits).
    IncludeDeleted,
}

/// Implement [`ScopableEntity`] (and optionally [`SoftDeletable`]) for the
/// `Entity` of the current module.
///
/// ```rust,ignore
/// clinic_db::scopable_entity!(tenant = ClinicId, resource = Id);
/// clinic_db::scopable_entity!(tenant = ClinicId, resource = Id, soft_delete = (DeletedAt, DeletedBy));
/// ```
#[macro_export]
macro_rules! scopable_entity {
    (tenant = $tenant:ident, resource = $resource:ident) => {
        impl $crate::secure::ScopableEntity for Entity {
            fn tenant_col() -> Option<Self::Column> {
                Some(Column::$tenant)
            }
            fn resource_col() -> Option<Self::Column> {
                Some(Column::$resource)
            }
            fn deleted_at_col() -> Option<Self::Column> {
                None
            }
        }
    };
    (tenant = $tenant:ident, resource = $resource:ident, soft_delete = ($deleted_at:ident, $deleted_by:ident)) => {
        impl $crate::secure::ScopableEntity for Entity {
            fn tenant_col() -> Option<Self::Column> {
                Some(Column::$tenant)
            }
            fn resource_col() -> Option<Self::Column> {
                Some(Column::$resource)
            }
            fn deleted_at_col() -> Option<Self::Column> {
                Some(Column::$deleted_at)
            }
        }

        impl $crate::secure::SoftDeletable for Entity {
            fn deleted_at_column() -> Self::Column {
                Column::$deleted_at
            }
            fn deleted_by_column() -> Self::Column {
                Column::$deleted_by
            }
        }
    };
}
