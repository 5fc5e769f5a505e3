use chrono::Utc;
use clinic_db::secure::{AccessScope, SecureEntityExt, Visibility};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::infra::storage::entities::{conversion_event, lead};

/// Record the offline conversion `name` for `lead` once.
///
/// A second call for the same lead and name returns the stored event
/// unchanged.
pub(super) async fn record<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    lead: &lead::Model,
    name: &str,
    value: Decimal,
    currency: &str,
) -> Result<conversion_event::Model, DomainError> {
    let existing = conversion_event::Entity::find()
        .secure()
        .scope_with(&AccessScope::clinic(lead.clinic_id), Visibility::Live)
        .filter(conversion_event::Column::LeadId.eq(lead.id))
        .filter(conversion_event::Column::ConversionName.eq(name))
        .order_by_desc(conversion_event::Column::CreatedAt)
        .one(conn)
        .await?;
    if let Some(existing) = existing {
        return Ok(existing);
    }

    let now = Utc::now();
    let event = conversion_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(lead.clinic_id),
        lead_id: Set(lead.id),
        gclid: Set(lead.gclid.clone()),
        conversion_name: Set(name.to_owned()),
        conversion_time: Set(now),
        conversion_value: Set(value),
        currency: Set(currency.to_owned()),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;
    tracing::info!(lead_id = %lead.id, conversion = name, "conversion recorded");
    Ok(event)
}
