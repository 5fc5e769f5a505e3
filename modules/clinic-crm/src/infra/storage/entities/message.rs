use sea_orm::entity::prelude::*;

use crate::domain::model::Direction;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub conversation_id: Uuid,
    pub direction: Direction,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub template_name: Option<String>,
    pub provider_message_id: Option<String>,
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
