use sea_orm::{ColumnTrait, Condition, EntityTrait, sea_query::Expr};

use crate::secure::{AccessScope, ScopableEntity, Visibility};

/// Builds the `WHERE` fragment that confines a query to `scope`.
///
/// 1. Empty scope: `false`.
/// 2. Clinics: `clinic_col IN (...)`. An entity without a clinic column
///    cannot satisfy a clinic scope and is denied.
/// 3. `Visibility::Live` on a soft-deletable entity adds `deleted_at IS NULL`.
///
/// Columns are qualified with the table name so the fragment stays
/// unambiguous when the select is joined.
pub fn build_scope_condition<E>(scope: &AccessScope, visibility: Visibility) -> Condition
where
    E: ScopableEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    let deny_all = || Condition::all().add(Expr::value(false));

    if scope.is_empty() {
        return deny_all();
    }

    let Some(clinic_col) = E::tenant_col() else {
        return deny_all();
    };
    let mut cond =
        Condition::all().add(Expr::col((E::default(), clinic_col)).is_in(scope.clinic_ids().to_vec()));

    if visibility == Visibility::Live
        && let Some(deleted_col) = E::deleted_at_col()
    {
        cond = cond.add(Expr::col((E::default(), deleted_col)).is_null());
    }

    cond
}
