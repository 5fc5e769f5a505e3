use chrono::{DateTime, Utc};
use clinic_db::secure::{TenantGuard, Visibility};
use clinic_security::{Permission, SecurityContext};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Service, optional_text, require, required_text};
use crate::domain::activity::{self, Activity};
use crate::domain::error::DomainError;
use crate::domain::model::{AssignmentMode, LeadStatus};
use crate::infra::storage::entities::{
    activity_log, assignment_rule, clinic, consent_event, conversion_event, lead, patient, pipeline_stage,
};

const AUDIT_LIMIT: u64 = 300;
const CONVERSIONS_LIMIT: u64 = 200;

/// Partial clinic profile update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClinicPatch {
    pub name: Option<String>,
    pub logo_url: Option<String>,
    pub default_currency: Option<String>,
    pub timezone: Option<String>,
    pub default_language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStage {
    pub name: String,
    pub stage_key: String,
}

/// One offline conversion row in Google Ads upload format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoogleAdsRow {
    pub gclid: String,
    pub conversion_name: String,
    pub conversion_time: String,
    pub conversion_value: Decimal,
    pub currency: String,
    pub order_id: Uuid,
}

impl GoogleAdsRow {
    fn from_event(event: conversion_event::Model) -> Option<Self> {
        Some(Self {
            gclid: event.gclid?,
            conversion_name: event.conversion_name,
            conversion_time: upload_time(event.conversion_time),
            conversion_value: event.conversion_value,
            currency: event.currency,
            order_id: event.lead_id,
        })
    }
}

fn upload_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S+00:00").to_string()
}

/// Everything the clinic holds about one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GdprExport {
    pub patient_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: String,
    pub language: String,
    pub clinical_notes: Option<String>,
    pub lead_source: Option<String>,
    pub lead_status: Option<LeadStatus>,
}

impl Service {
    pub async fn clinic_profile(&self, ctx: &SecurityContext) -> Result<clinic::Model, DomainError> {
        let actor = require(ctx, Permission::SettingsManage)?;
        Ok(TenantGuard::new(ctx)
            .get_by_id_or_not_found::<clinic::Entity, _>(&self.db, actor.clinic_id, Visibility::Live)
            .await?)
    }

    #[instrument(skip(self, ctx, patch))]
    pub async fn update_clinic_profile(
        &self,
        ctx: &SecurityContext,
        patch: ClinicPatch,
    ) -> Result<clinic::Model, DomainError> {
        let actor = require(ctx, Permission::SettingsManage)?;

        let txn = self.db.begin().await?;
        let clinic = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<clinic::Entity, _>(&txn, actor.clinic_id, Visibility::Live)
            .await?;
        let mut am: clinic::ActiveModel = clinic.into();
        if let Some(name) = patch.name {
            am.name = Set(required_text("name", &name)?);
        }
        if patch.logo_url.is_some() {
            am.logo_url = Set(optional_text(patch.logo_url));
        }
        if let Some(currency) = patch.default_currency {
            am.default_currency = Set(required_text("default_currency", &currency)?.to_uppercase());
        }
        if let Some(timezone) = patch.timezone {
            am.timezone = Set(required_text("timezone", &timezone)?);
        }
        if let Some(language) = patch.default_language {
            am.default_language = Set(required_text("default_language", &language)?.to_lowercase());
        }
        am.updated_at = Set(Utc::now());
        let clinic = am.update(&txn).await?;

        Activity::new(actor.clinic_id, activity::SETTINGS_CLINIC_UPDATED)
            .by(actor.id)
            .details("Clinic profile updated")
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(clinic)
    }

    pub async fn pipeline_stages(&self, ctx: &SecurityContext) -> Result<Vec<pipeline_stage::Model>, DomainError> {
        require(ctx, Permission::SettingsManage)?;
        Ok(TenantGuard::new(ctx)
            .scoped_collection::<pipeline_stage::Entity>(Visibility::Live)?
            .order_by_asc(pipeline_stage::Column::SortOrder)
            .all(&self.db)
            .await?)
    }

    /// Append a stage after the existing ones.
    #[instrument(skip(self, ctx, input))]
    pub async fn add_pipeline_stage(
        &self,
        ctx: &SecurityContext,
        input: NewStage,
    ) -> Result<pipeline_stage::Model, DomainError> {
        let actor = require(ctx, Permission::SettingsManage)?;
        let name = required_text("name", &input.name)?;
        let stage_key = required_text("stage_key", &input.stage_key)?.to_lowercase();

        let txn = self.db.begin().await?;
        let guard = TenantGuard::new(ctx);
        let taken = guard
            .scoped_collection::<pipeline_stage::Entity>(Visibility::Live)?
            .filter(pipeline_stage::Column::StageKey.eq(stage_key.clone()))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(DomainError::Conflict(format!("stage '{stage_key}' already exists")));
        }
        let existing = guard
            .scoped_collection::<pipeline_stage::Entity>(Visibility::Live)?
            .count(&txn)
            .await?;
        let sort_order = i32::try_from(existing + 1).map_err(|e| DomainError::Internal(e.to_string()))?;

        let stage = pipeline_stage::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            name: Set(name),
            stage_key: Set(stage_key),
            sort_order: Set(sort_order),
            is_default: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        Activity::new(actor.clinic_id, activity::SETTINGS_STAGE_ADDED)
            .by(actor.id)
            .details(stage.stage_key.clone())
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(stage)
    }

    /// Switch lead distribution. The most recent rule wins.
    #[instrument(skip(self, ctx))]
    pub async fn set_assignment_mode(
        &self,
        ctx: &SecurityContext,
        mode: AssignmentMode,
    ) -> Result<assignment_rule::Model, DomainError> {
        let actor = require(ctx, Permission::SettingsManage)?;

        let txn = self.db.begin().await?;
        let rule = assignment_rule::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            mode: Set(mode),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        Activity::new(actor.clinic_id, activity::SETTINGS_ASSIGNMENT_UPDATED)
            .by(actor.id)
            .details(format!("mode={}", mode.as_str()))
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(rule)
    }

    /// Latest activity rows of the clinic.
    pub async fn audit_log(&self, ctx: &SecurityContext) -> Result<Vec<activity_log::Model>, DomainError> {
        require(ctx, Permission::SettingsManage)?;
        Ok(TenantGuard::new(ctx)
            .scoped_collection::<activity_log::Entity>(Visibility::Live)?
            .order_by_desc(activity_log::Column::CreatedAt)
            .limit(AUDIT_LIMIT)
            .all(&self.db)
            .await?)
    }

    pub async fn conversions(&self, ctx: &SecurityContext) -> Result<Vec<conversion_event::Model>, DomainError> {
        require(ctx, Permission::IntegrationsManage)?;
        Ok(TenantGuard::new(ctx)
            .scoped_collection::<conversion_event::Entity>(Visibility::Live)?
            .order_by_desc(conversion_event::Column::CreatedAt)
            .limit(CONVERSIONS_LIMIT)
            .all(&self.db)
            .await?)
    }

    /// Conversions that carry a click id, newest first.
    pub async fn google_ads_export(&self, ctx: &SecurityContext) -> Result<Vec<GoogleAdsRow>, DomainError> {
        require(ctx, Permission::IntegrationsManage)?;
        let events = TenantGuard::new(ctx)
            .scoped_collection::<conversion_event::Entity>(Visibility::Live)?
            .filter(conversion_event::Column::Gclid.is_not_null())
            .order_by_desc(conversion_event::Column::ConversionTime)
            .all(&self.db)
            .await?;
        Ok(events.into_iter().filter_map(GoogleAdsRow::from_event).collect())
    }

    #[instrument(skip(self, ctx))]
    pub async fn gdpr_export(&self, ctx: &SecurityContext, patient_id: Uuid) -> Result<GdprExport, DomainError> {
        let actor = require(ctx, Permission::GdprManage)?;
        let guard = TenantGuard::new(ctx);

        let txn = self.db.begin().await?;
        let patient = guard
            .get_by_id_or_not_found::<patient::Entity, _>(&txn, patient_id, Visibility::Live)
            .await?;
        let lead = match patient.lead_id {
            Some(lead_id) => {
                guard
                    .scoped_collection::<lead::Entity>(Visibility::Live)?
                    .and_id(lead_id)?
                    .one(&txn)
                    .await?
            }
            None => None,
        };

        let export = GdprExport {
            patient_id: patient.id,
            name: format!("{} {}", patient.first_name, patient.last_name),
            email: patient.email,
            phone: patient.phone,
            country: patient.country,
            language: patient.language,
            clinical_notes: patient.clinical_notes,
            lead_source: lead.as_ref().map(|l| l.source.clone()),
            lead_status: lead.map(|l| l.status),
        };
        Activity::new(actor.clinic_id, activity::GDPR_EXPORT)
            .by(actor.id)
            .patient(patient.id)
            .details("Patient data exported")
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(export)
    }

    /// Wipe a patient's personal data and record the withdrawn consent.
    #[instrument(skip(self, ctx))]
    pub async fn gdpr_anonymize(&self, ctx: &SecurityContext, patient_id: Uuid) -> Result<patient::Model, DomainError> {
        let actor = require(ctx, Permission::GdprManage)?;

        let txn = self.db.begin().await?;
        let patient = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<patient::Entity, _>(&txn, patient_id, Visibility::Live)
            .await?;
        let last_name = format!("Patient-{}", patient.id);
        let mut am: patient::ActiveModel = patient.into();
        am.first_name = Set("Anonymized".to_owned());
        am.last_name = Set(last_name);
        am.email = Set(None);
        am.phone = Set(None);
        am.clinical_notes = Set(None);
        am.updated_at = Set(Utc::now());
        let patient = am.update(&txn).await?;

        consent_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            lead_id: Set(None),
            patient_id: Set(Some(patient.id)),
            consent_type: Set("gdpr_anonymize".to_owned()),
            granted: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        Activity::new(actor.clinic_id, activity::GDPR_ANONYMIZE)
            .by(actor.id)
            .patient(patient.id)
            .details("Patient anonymized")
            .insert(&txn)
            .await?;
        txn.commit().await?;

        info!(patient_id = %patient.id, "patient anonymized");
        Ok(patient)
    }
}
