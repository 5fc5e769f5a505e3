//! Axum handlers. Each one unwraps the request, calls exactly one service
//! operation and maps the result to a DTO.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub mod communications;
pub mod intake;
pub mod leads;
pub mod patients;
pub mod reports;
pub mod sales;
pub mod settings;
pub mod users;

/// 201 with a JSON body.
pub(crate) fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

pub(crate) fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
