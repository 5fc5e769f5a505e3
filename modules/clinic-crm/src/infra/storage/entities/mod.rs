//! `SeaORM` entities. Every table carries its owning clinic.

pub mod activity_log;
pub mod assignment_rule;
pub mod call;
pub mod call_disposition;
pub mod clinic;
pub mod consent_event;
pub mod conversation;
pub mod conversion_event;
pub mod lead;
pub mod lead_payload;
pub mod message;
pub mod patient;
pub mod payment;
pub mod pipeline_stage;
pub mod quote;
pub mod treatment_plan;
pub mod user;
pub mod webhook_event;
