use sea_orm::entity::prelude::*;

use crate::domain::model::CallOutcome;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "call_dispositions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub call_id: Uuid,
    pub outcome: CallOutcome,
    #[sea_orm(column_type = "Text")]
    pub notes: Option<String>,
    pub followup_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

clinic_db::scopable_entity!(tenant = ClinicId, resource = Id);
