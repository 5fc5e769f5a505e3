use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::infra::storage::entities::{
    activity_log, assignment_rule, call, call_disposition, clinic, consent_event, conversation,
    conversion_event, lead, lead_payload, message, patient, payment, pipeline_stage, quote,
    treatment_plan, user, webhook_event,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create<E: EntityTrait>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr> {
    let schema = Schema::new(manager.get_database_backend());
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}

async fn drop<E: EntityTrait>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr> {
    manager
        .drop_table(Table::drop().table(entity).if_exists().to_owned())
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        create(manager, clinic::Entity).await?;
        create(manager, user::Entity).await?;
        create(manager, pipeline_stage::Entity).await?;
        create(manager, assignment_rule::Entity).await?;
        create(manager, lead::Entity).await?;
        create(manager, patient::Entity).await?;
        create(manager, treatment_plan::Entity).await?;
        create(manager, quote::Entity).await?;
        create(manager, payment::Entity).await?;
        create(manager, conversation::Entity).await?;
        create(manager, message::Entity).await?;
        create(manager, call::Entity).await?;
        create(manager, call_disposition::Entity).await?;
        create(manager, webhook_event::Entity).await?;
        create(manager, lead_payload::Entity).await?;
        create(manager, conversion_event::Entity).await?;
        create(manager, consent_event::Entity).await?;
        create(manager, activity_log::Entity).await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_user_clinic_email")
                    .table(user::Entity)
                    .col(user::Column::ClinicId)
                    .col(user::Column::Email)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_pipeline_stage_key")
                    .table(pipeline_stage::Entity)
                    .col(pipeline_stage::Column::ClinicId)
                    .col(pipeline_stage::Column::StageKey)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_conversion_clinic_lead_name")
                    .table(conversion_event::Entity)
                    .col(conversion_event::Column::ClinicId)
                    .col(conversion_event::Column::LeadId)
                    .col(conversion_event::Column::ConversionName)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_lead_clinic_status")
                    .table(lead::Entity)
                    .col(lead::Column::ClinicId)
                    .col(lead::Column::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_lead_clinic_created")
                    .table(lead::Entity)
                    .col(lead::Column::ClinicId)
                    .col(lead::Column::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_activity_clinic_lead")
                    .table(activity_log::Entity)
                    .col(activity_log::Column::ClinicId)
                    .col(activity_log::Column::LeadId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop(manager, activity_log::Entity).await?;
        drop(manager, consent_event::Entity).await?;
        drop(manager, conversion_event::Entity).await?;
        drop(manager, lead_payload::Entity).await?;
        drop(manager, webhook_event::Entity).await?;
        drop(manager, call_disposition::Entity).await?;
        drop(manager, call::Entity).await?;
        drop(manager, message::Entity).await?;
        drop(manager, conversation::Entity).await?;
        drop(manager, payment::Entity).await?;
        drop(manager, quote::Entity).await?;
        drop(manager, treatment_plan::Entity).await?;
        drop(manager, patient::Entity).await?;
        drop(manager, lead::Entity).await?;
        drop(manager, assignment_rule::Entity).await?;
        drop(manager, pipeline_stage::Entity).await?;
        drop(manager, user::Entity).await?;
        drop(manager, clinic::Entity).await
    }
}
