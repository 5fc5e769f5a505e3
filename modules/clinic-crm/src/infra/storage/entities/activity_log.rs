use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub user_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub quote_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub action: String,
    #[sea_orm(column_type = "Text")]
    pub details: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

clinic_db::scopable_entity!(tenant = ClinicId, resource = Id);
