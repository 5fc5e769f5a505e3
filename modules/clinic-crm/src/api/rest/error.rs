use clinic_errors::{Problem, ValidationViolation};

use crate::domain::error::DomainError;

pub type ApiResult<T> = Result<T, Problem>;

/// Map a domain error to an RFC 9457 problem.
pub fn domain_error_to_problem(e: &DomainError, instance: &str) -> Problem {
    let trace_id = tracing::Span::current()
        .id()
        .map(|id| id.into_u64().to_string());

    let problem = match e {
        DomainError::Unauthenticated => Problem::unauthorized(),
        DomainError::Forbidden(msg) => Problem::forbidden(msg.clone()),
        DomainError::NotFound => Problem::not_found(),
        DomainError::Validation { field, message } => Problem::unprocessable(format!("{field}: {message}"))
            .with_errors(vec![ValidationViolation::new(field.clone(), message.clone())]),
        DomainError::BadRequest(msg) => {
            Problem::new(http::StatusCode::BAD_REQUEST, "Bad Request", msg.clone()).with_code("BAD_REQUEST")
        }
        DomainError::RateLimited => Problem::too_many_requests(),
        DomainError::Conflict(msg) => {
            Problem::new(http::StatusCode::CONFLICT, "Conflict", msg.clone()).with_code("CONFLICT")
        }
        DomainError::Database(_) => {
            // Logged here, never sent to the client.
            tracing::error!(error = ?e, "Database error occurred");
            Problem::internal()
        }
        DomainError::Internal(_) => {
            tracing::error!(error = ?e, "Internal error occurred");
            Problem::internal()
        }
    };

    let problem = problem.with_instance(instance);
    match trace_id {
        Some(id) => problem.with_trace_id(id),
        None => problem,
    }
}

/// `instance` is left empty here and filled with the request path by
/// `problem_context_middleware`.
impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        domain_error_to_problem(&e, "")
    }
}
