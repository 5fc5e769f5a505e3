use sea_orm::entity::prelude::*;

use crate::domain::model::LeadStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub assigned_agent_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    pub stage_key: String,
    pub language: String,
    pub country: String,
    #[sea_orm(column_type = "Text")]
    pub notes: Option<String>,
    pub next_action_date: Option<Date>,
    pub converted_to_patient: bool,
    pub landing_page_url: Option<String>,
    pub referrer_url: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub gclid: Option<String>,
    pub fbclid: Option<String>,
    pub user_agent: Option<String>,
    pub ip_hash: Option<String>,
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
