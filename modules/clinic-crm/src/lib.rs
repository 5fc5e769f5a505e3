#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Clinic CRM: leads through patients, quotes and payments, with the
//! WhatsApp/voice communication trail, for many clinics in one database.
//!
//! Every service call takes the caller's [`SecurityContext`](clinic_security::SecurityContext)
//! and reaches clinic-owned rows only through [`clinic_db::secure`].

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod module;

pub use config::CrmConfig;
pub use module::CrmModule;
