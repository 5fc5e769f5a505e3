//! Wire shapes of the REST API. Storage rows never go out directly: ip
//! hashes, user agents and soft-delete columns stay server-side.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::model::{
    AssignmentMode, CallOutcome, CallStatus, Direction, LeadStatus, PaymentMethod, PaymentStatus, QuoteStatus,
};
use crate::domain::service::{AssignOutcome, ConvertOutcome, PaymentsOverview, QueueView, Thread};
use crate::infra::storage::entities::{
    activity_log, call, call_disposition, clinic, conversation, conversion_event, lead, message, patient, payment,
    pipeline_stage, quote, user,
};

#[derive(Debug, Clone, Serialize)]
pub struct LeadDto {
    pub id: Uuid,
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
    pub notes: Option<String>,
    pub next_action_date: Option<NaiveDate>,
    pub converted_to_patient: bool,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub gclid: Option<String>,
    pub fbclid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<lead::Model> for LeadDto {
    fn from(m: lead::Model) -> Self {
        Self {
            id: m.id,
            assigned_agent_id: m.assigned_agent_id,
            first_name: m.first_name,
            last_name: m.last_name,
            email: m.email,
            phone: m.phone,
            source: m.source,
            status: m.status,
            stage_key: m.stage_key,
            language: m.language,
            country: m.country,
            notes: m.notes,
            next_action_date: m.next_action_date,
            converted_to_patient: m.converted_to_patient,
            utm_source: m.utm_source,
            utm_medium: m.utm_medium,
            utm_campaign: m.utm_campaign,
            gclid: m.gclid,
            fbclid: m.fbclid,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadCreatedDto {
    pub lead_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowupsDto {
    pub today: NaiveDate,
    pub due: Vec<LeadDto>,
    pub upcoming: Vec<LeadDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityDto {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub quote_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub action: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<activity_log::Model> for ActivityDto {
    fn from(m: activity_log::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            lead_id: m.lead_id,
            patient_id: m.patient_id,
            quote_id: m.quote_id,
            payment_id: m.payment_id,
            action: m.action,
            details: m.details,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientDto {
    pub id: Uuid,
    pub lead_id: Option<Uuid>,
    pub assigned_doctor_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: String,
    pub language: String,
    pub clinical_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<patient::Model> for PatientDto {
    fn from(m: patient::Model) -> Self {
        Self {
            id: m.id,
            lead_id: m.lead_id,
            assigned_doctor_id: m.assigned_doctor_id,
            first_name: m.first_name,
            last_name: m.last_name,
            email: m.email,
            phone: m.phone,
            country: m.country,
            language: m.language,
            clinical_notes: m.clinical_notes,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertedDto {
    pub patient: PatientDto,
    pub created: bool,
}

impl From<ConvertOutcome> for ConvertedDto {
    fn from(o: ConvertOutcome) -> Self {
        Self {
            patient: o.patient.into(),
            created: o.created,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteDto {
    pub id: Uuid,
    pub lead_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub treatment_plan_id: Option<Uuid>,
    pub currency: String,
    pub total: Decimal,
    pub status: QuoteStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<quote::Model> for QuoteDto {
    fn from(m: quote::Model) -> Self {
        Self {
            id: m.id,
            lead_id: m.lead_id,
            patient_id: m.patient_id,
            treatment_plan_id: m.treatment_plan_id,
            currency: m.currency,
            total: m.total,
            status: m.status,
            sent_at: m.sent_at,
            accepted_at: m.accepted_at,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDto {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<payment::Model> for PaymentDto {
    fn from(m: payment::Model) -> Self {
        Self {
            id: m.id,
            quote_id: m.quote_id,
            patient_id: m.patient_id,
            amount: m.amount,
            currency: m.currency,
            method: m.method,
            status: m.status,
            due_date: m.due_date,
            paid_at: m.paid_at,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentsDto {
    pub payments: Vec<PaymentDto>,
    pub outstanding: Decimal,
}

impl From<PaymentsOverview> for PaymentsDto {
    fn from(o: PaymentsOverview) -> Self {
        Self {
            payments: o.payments.into_iter().map(Into::into).collect(),
            outstanding: o.outstanding,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDto {
    pub id: Uuid,
    pub lead_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub channel: String,
    pub external_id: Option<String>,
    pub status: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<conversation::Model> for ConversationDto {
    fn from(m: conversation::Model) -> Self {
        Self {
            id: m.id,
            lead_id: m.lead_id,
            patient_id: m.patient_id,
            channel: m.channel,
            external_id: m.external_id,
            status: m.status,
            last_message_at: m.last_message_at,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub direction: Direction,
    pub body: String,
    pub provider_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<message::Model> for MessageDto {
    fn from(m: message::Model) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            direction: m.direction,
            body: m.body,
            provider_message_id: m.provider_message_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallDto {
    pub id: Uuid,
    pub lead_id: Option<Uuid>,
    pub direction: Direction,
    pub from_number: String,
    pub to_number: String,
    pub status: CallStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i32>,
    pub recording_url: Option<String>,
    pub provider_call_id: Option<String>,
}

impl From<call::Model> for CallDto {
    fn from(m: call::Model) -> Self {
        Self {
            id: m.id,
            lead_id: m.lead_id,
            direction: m.direction,
            from_number: m.from_number,
            to_number: m.to_number,
            status: m.status,
            started_at: m.started_at,
            ended_at: m.ended_at,
            duration_seconds: m.duration_seconds,
            recording_url: m.recording_url,
            provider_call_id: m.provider_call_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispositionDto {
    pub id: Uuid,
    pub call_id: Uuid,
    pub outcome: CallOutcome,
    pub notes: Option<String>,
    pub followup_at: Option<DateTime<Utc>>,
}

impl From<call_disposition::Model> for DispositionDto {
    fn from(m: call_disposition::Model) -> Self {
        Self {
            id: m.id,
            call_id: m.call_id,
            outcome: m.outcome,
            notes: m.notes,
            followup_at: m.followup_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadDto {
    pub conversation: ConversationDto,
    pub messages: Vec<MessageDto>,
    pub calls: Vec<CallDto>,
}

impl From<Thread> for ThreadDto {
    fn from(t: Thread) -> Self {
        Self {
            conversation: t.conversation.into(),
            messages: t.messages.into_iter().map(Into::into).collect(),
            calls: t.calls.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueDto {
    pub new_leads: Vec<LeadDto>,
    pub followups: Vec<LeadDto>,
    pub missed_calls: Vec<CallDto>,
}

impl From<QueueView> for QueueDto {
    fn from(q: QueueView) -> Self {
        Self {
            new_leads: q.new_leads.into_iter().map(Into::into).collect(),
            followups: q.followups.into_iter().map(Into::into).collect(),
            missed_calls: q.missed_calls.into_iter().map(Into::into).collect(),
        }
    }
}

/// `outcome` is `assigned`, `manual` or `nothing`.
#[derive(Debug, Clone, Serialize)]
pub struct AssignDto {
    pub outcome: &'static str,
    pub lead: Option<LeadDto>,
    pub agent_id: Option<Uuid>,
}

impl From<AssignOutcome> for AssignDto {
    fn from(o: AssignOutcome) -> Self {
        match o {
            AssignOutcome::Assigned { lead, agent_id } => Self {
                outcome: "assigned",
                lead: Some(lead.into()),
                agent_id: Some(agent_id),
            },
            AssignOutcome::Manual { lead } => Self {
                outcome: "manual",
                lead: Some(lead.into()),
                agent_id: None,
            },
            AssignOutcome::Nothing => Self {
                outcome: "nothing",
                lead: None,
                agent_id: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub country: String,
    pub timezone: String,
    pub default_currency: String,
    pub default_language: String,
}

impl From<clinic::Model> for ClinicDto {
    fn from(m: clinic::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            logo_url: m.logo_url,
            country: m.country,
            timezone: m.timezone,
            default_currency: m.default_currency,
            default_language: m.default_language,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageDto {
    pub id: Uuid,
    pub name: String,
    pub stage_key: String,
    pub sort_order: i32,
    pub is_default: bool,
}

impl From<pipeline_stage::Model> for StageDto {
    fn from(m: pipeline_stage::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            stage_key: m.stage_key,
            sort_order: m.sort_order,
            is_default: m.is_default,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionDto {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub gclid: Option<String>,
    pub conversion_name: String,
    pub conversion_time: DateTime<Utc>,
    pub conversion_value: Decimal,
    pub currency: String,
}

impl From<conversion_event::Model> for ConversionDto {
    fn from(m: conversion_event::Model) -> Self {
        Self {
            id: m.id,
            lead_id: m.lead_id,
            gclid: m.gclid,
            conversion_name: m.conversion_name,
            conversion_time: m.conversion_time,
            conversion_value: m.conversion_value,
            currency: m.currency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserDto {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            full_name: m.full_name,
            email: m.email,
            role: m.role,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

// Request bodies that do not map one to one onto a service input.

#[derive(Debug, Clone, Deserialize)]
pub struct NoteReq {
    pub details: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowupReq {
    pub next_action_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusReq {
    pub status: LeadStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicalNotesReq {
    pub clinical_notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignDoctorReq {
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentModeDto {
    pub mode: AssignmentMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleReq {
    pub role: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub ok: bool,
}
