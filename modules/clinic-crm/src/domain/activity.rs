//! Activity log rows written by every mutating service call.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::infra::storage::entities::activity_log;

pub const LEAD_CREATED: &str = "lead.created";
pub const LEAD_API_CREATED: &str = "lead.api.created";
pub const LEAD_NOTE: &str = "lead.note";
pub const LEAD_FOLLOWUP: &str = "lead.followup";
pub const LEAD_STATUS: &str = "lead.status";
pub const LEAD_CONVERT: &str = "lead.convert";
pub const LEAD_SOFT_DELETE: &str = "lead.soft_delete";
pub const PATIENT_NOTES_UPDATED: &str = "patient.notes.updated";
pub const PATIENT_DOCTOR_ASSIGNED: &str = "patient.doctor.assigned";
pub const QUOTE_CREATED: &str = "quote.created";
pub const QUOTE_SENT: &str = "quote.sent";
pub const QUOTE_ACCEPTED: &str = "quote.accepted";
pub const PAYMENT_RECORDED: &str = "payment.recorded";
pub const PAYMENT_PAID: &str = "payment.paid";
pub const MESSAGE_SENT: &str = "message.sent";
pub const CALL_STARTED: &str = "call.started";
pub const CALL_DISPOSITION: &str = "call.disposition";
pub const QUEUE_ASSIGN_NEXT: &str = "queue.assign_next";
pub const SETTINGS_CLINIC_UPDATED: &str = "settings.clinic.updated";
pub const SETTINGS_STAGE_ADDED: &str = "settings.pipeline.stage_added";
pub const SETTINGS_ASSIGNMENT_UPDATED: &str = "settings.assignment.updated";
pub const GDPR_EXPORT: &str = "gdpr.export";
pub const GDPR_ANONYMIZE: &str = "gdpr.anonymize";
pub const USERS_CREATE: &str = "users.create";
pub const USERS_TOGGLE: &str = "users.toggle";
pub const USERS_ROLE_UPDATE: &str = "users.role_update";

/// Builder for one `activity_logs` row.
#[derive(Debug, Clone)]
#[must_use]
pub struct Activity {
    clinic_id: Uuid,
    action: &'static str,
    user_id: Option<Uuid>,
    lead_id: Option<Uuid>,
    patient_id: Option<Uuid>,
    quote_id: Option<Uuid>,
    payment_id: Option<Uuid>,
    details: Option<String>,
}

impl Activity {
    pub fn new(clinic_id: Uuid, action: &'static str) -> Self {
        Self {
            clinic_id,
            action,
            user_id: None,
            lead_id: None,
            patient_id: None,
            quote_id: None,
            payment_id: None,
            details: None,
        }
    }

    pub fn by(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn lead(mut self, lead_id: Uuid) -> Self {
        self.lead_id = Some(lead_id);
        self
    }

    pub fn patient(mut self, patient_id: Uuid) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn quote(mut self, quote_id: Uuid) -> Self {
        self.quote_id = Some(quote_id);
        self
    }

    pub fn payment(mut self, payment_id: Uuid) -> Self {
        self.payment_id = Some(payment_id);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub async fn insert<C: ConnectionTrait>(self, conn: &C) -> Result<activity_log::Model, DomainError> {
        tracing::debug!(action = self.action, clinic_id = %self.clinic_id, "activity");
        let row = activity_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(self.clinic_id),
            user_id: Set(self.user_id),
            lead_id: Set(self.lead_id),
            patient_id: Set(self.patient_id),
            quote_id: Set(self.quote_id),
            payment_id: Set(self.payment_id),
            action: Set(self.action.to_owned()),
            details: Set(self.details),
            created_at: Set(Utc::now()),
        };
        Ok(row.insert(conn).await?)
    }
}

/// Cut `text` to at most `max` characters.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
