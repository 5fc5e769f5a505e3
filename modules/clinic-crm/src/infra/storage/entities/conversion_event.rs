use sea_orm::entity::prelude::*;

/// Offline conversion, unique per (clinic, lead, name).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "conversion_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub lead_id: Uuid,
    pub gclid: Option<String>,
    pub conversion_name: String,
    pub conversion_time: DateTimeUtc,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub conversion_value: Decimal,
    pub currency: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

clinic_db::scopable_entity!(tenant = ClinicId, resource = Id);
