//! HTTP surface of the CRM: JSON in, JSON or problem+json out.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
