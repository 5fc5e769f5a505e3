#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Database access for the clinic CRM.
//!
//! Everything that reads or writes clinic-owned rows goes through
//! [`secure`]. The raw `SeaORM` connection is only handed to migrations.

pub mod options;
pub mod secure;

pub use options::{DbConfig, connect};
pub use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
