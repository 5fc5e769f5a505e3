use chrono::Utc;
use clinic_db::secure::{TenantGuard, Visibility};
use clinic_security::{Actor, Permission, Role, SecurityContext};
use sea_orm::{ActiveModelTrait, ColumnTrait, Set, TransactionTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Service, leads::set_status, require};
use crate::domain::activity::{self, Activity};
use crate::domain::error::DomainError;
use crate::domain::model::LeadStatus;
use crate::infra::storage::entities::{lead, patient, user};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOutcome {
    pub patient: patient::Model,
    /// `false` when the lead had already been converted.
    pub created: bool,
}

/// Doctors only reach unassigned patients and their own.
fn ensure_visible_to(actor: &Actor, patient: &patient::Model) -> Result<(), DomainError> {
    if actor.role == Role::Doctor && patient.assigned_doctor_id.is_some_and(|d| d != actor.id) {
        return Err(DomainError::forbidden("patient is assigned to another doctor"));
    }
    Ok(())
}

impl Service {
    pub async fn list_patients(&self, ctx: &SecurityContext) -> Result<Vec<patient::Model>, DomainError> {
        let guard = TenantGuard::new(ctx);
        let actor = guard.actor()?;

        let mut query = guard.scoped_collection::<patient::Entity>(Visibility::Live)?;
        if actor.role == Role::Doctor {
            query = query.filter(patient::Column::AssignedDoctorId.eq(actor.id));
        }
        Ok(query.order_by_desc(patient::Column::CreatedAt).all(&self.db).await?)
    }

    pub async fn get_patient(&self, ctx: &SecurityContext, id: Uuid) -> Result<patient::Model, DomainError> {
        let guard = TenantGuard::new(ctx);
        let actor = guard.actor()?;
        let patient = guard
            .get_by_id_or_not_found::<patient::Entity, _>(&self.db, id, Visibility::Live)
            .await?;
        ensure_visible_to(actor, &patient)?;
        Ok(patient)
    }

    #[instrument(skip(self, ctx, notes))]
    pub async fn update_clinical_notes(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        notes: &str,
    ) -> Result<patient::Model, DomainError> {
        let guard = TenantGuard::new(ctx);
        let actor = guard.actor()?;

        let txn = self.db.begin().await?;
        let patient = guard
            .get_by_id_or_not_found::<patient::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        ensure_visible_to(actor, &patient)?;
        if !matches!(actor.role, Role::Admin | Role::Doctor) {
            return Err(DomainError::forbidden("only admins and doctors edit clinical notes"));
        }

        let mut am: patient::ActiveModel = patient.into();
        am.clinical_notes = Set(Some(notes.trim().to_owned()));
        am.updated_at = Set(Utc::now());
        let patient = am.update(&txn).await?;
        Activity::new(actor.clinic_id, activity::PATIENT_NOTES_UPDATED)
            .by(actor.id)
            .patient(patient.id)
            .details("Clinical notes updated")
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(patient)
    }

    /// Assign (or with `None`, unassign) the treating doctor.
    #[instrument(skip(self, ctx))]
    pub async fn assign_doctor(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        doctor_id: Option<Uuid>,
    ) -> Result<patient::Model, DomainError> {
        let actor = require(ctx, Permission::PatientsManage)?;
        let guard = TenantGuard::new(ctx);

        let txn = self.db.begin().await?;
        let patient = guard
            .get_by_id_or_not_found::<patient::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        if let Some(doctor_id) = doctor_id {
            let doctor = guard
                .scoped_collection::<user::Entity>(Visibility::Live)?
                .and_id(doctor_id)?
                .one(&txn)
                .await?;
            if !doctor.is_some_and(|d| d.role == Role::Doctor.as_str()) {
                return Err(DomainError::validation("doctor_id", "not a doctor of this clinic"));
            }
        }

        let mut am: patient::ActiveModel = patient.into();
        am.assigned_doctor_id = Set(doctor_id);
        am.updated_at = Set(Utc::now());
        let patient = am.update(&txn).await?;
        let details = doctor_id.map_or_else(|| "doctor_id=none".to_owned(), |d| format!("doctor_id={d}"));
        Activity::new(actor.clinic_id, activity::PATIENT_DOCTOR_ASSIGNED)
            .by(actor.id)
            .patient(patient.id)
            .details(details)
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(patient)
    }

    /// Turn a lead into a patient. Converting twice returns the first patient.
    #[instrument(skip(self, ctx))]
    pub async fn convert_lead(&self, ctx: &SecurityContext, lead_id: Uuid) -> Result<ConvertOutcome, DomainError> {
        let actor = require(ctx, Permission::PatientsManage)?;
        let guard = TenantGuard::new(ctx);

        let txn = self.db.begin().await?;
        let lead = guard
            .get_by_id_or_not_found::<lead::Entity, _>(&txn, lead_id, Visibility::Live)
            .await?;

        let existing = guard
            .scoped_collection::<patient::Entity>(Visibility::IncludeDeleted)?
            .filter(patient::Column::LeadId.eq(lead.id))
            .one(&txn)
            .await?;

        let outcome = match existing {
            Some(patient) => ConvertOutcome { patient, created: false },
            None => {
                let now = Utc::now();
                let patient = patient::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    clinic_id: Set(lead.clinic_id),
                    lead_id: Set(Some(lead.id)),
                    assigned_doctor_id: Set(None),
                    first_name: Set(lead.first_name.clone()),
                    last_name: Set(lead.last_name.clone()),
                    email: Set(lead.email.clone()),
                    phone: Set(lead.phone.clone()),
                    country: Set(lead.country.clone()),
                    language: Set(lead.language.clone()),
                    clinical_notes: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    deleted_at: Set(None),
                    deleted_by: Set(None),
                }
                .insert(&txn)
                .await?;

                let promote = lead.status == LeadStatus::New;
                let mut am: lead::ActiveModel = lead.into();
                am.converted_to_patient = Set(true);
                am.updated_at = Set(now);
                let lead = am.update(&txn).await?;
                if promote {
                    set_status(&txn, lead, LeadStatus::Qualified).await?;
                }
                ConvertOutcome { patient, created: true }
            }
        };

        Activity::new(actor.clinic_id, activity::LEAD_CONVERT)
            .by(actor.id)
            .lead(lead_id)
            .patient(outcome.patient.id)
            .details("Lead converted")
            .insert(&txn)
            .await?;
        txn.commit().await?;

        info!(%lead_id, patient_id = %outcome.patient.id, created = outcome.created, "lead converted");
        Ok(outcome)
    }
}
