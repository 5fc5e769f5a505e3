#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Error responses shared by every HTTP surface of the clinic CRM.

pub mod error_layer;
pub mod extract;
pub mod problem;

pub use error_layer::problem_context_middleware;
pub use extract::{ApiJson, json_rejection_to_problem};
pub use problem::{APPLICATION_PROBLEM_JSON, Problem, ValidationViolation};
