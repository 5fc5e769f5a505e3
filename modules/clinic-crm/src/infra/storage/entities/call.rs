use sea_orm::entity::prelude::*;

use crate::domain::model::{CallStatus, Direction};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "calls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub direction: Direction,
    pub from_number: String,
    pub to_number: String,
    pub started_at: Option<DateTimeUtc>,
    pub ended_at: Option<DateTimeUtc>,
    pub duration_seconds: Option<i32>,
    pub status: CallStatus,
    pub recording_url: Option<String>,
    pub provider_call_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

clinic_db::scopable_entity!(
    tenant = ClinicId,
    resource = Id,
    soft_delete = (DeletedAt, DeletedBy)
);
