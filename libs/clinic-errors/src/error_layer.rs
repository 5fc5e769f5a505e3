//! Request context for problem responses.

use axum::body::to_bytes;
use axum::extract::{OriginalUri, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{StatusCode, header};

use crate::{APPLICATION_PROBLEM_JSON, Problem};

const MAX_REJECTION_BODY: usize = 16 * 1024;

/// Sets `instance` on problem responses to the request path, and turns the
/// plain-text errors produced by the framework (bad path or query
/// parameters, unknown method, timeout) into problem responses.
pub async fn problem_context_middleware(request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| request.uri().path().to_owned(), |uri| uri.path().to_owned());

    let response = next.run(request).await;

    if let Some(problem) = response.extensions().get::<Problem>() {
        if problem.instance.is_empty() {
            return problem.clone().with_instance(path).into_response();
        }
        return response;
    }
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_problem_response(&response) {
        return response;
    }

    let detail = if status.is_client_error() {
        to_bytes(response.into_body(), MAX_REJECTION_BODY)
            .await
            .ok()
            .map(|b| String::from_utf8_lossy(&b).trim().to_owned())
            .filter(|s| !s.is_empty())
    } else {
        None
    };
    framework_problem(status, detail).with_instance(path).into_response()
}

fn is_problem_response(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(APPLICATION_PROBLEM_JSON))
}

fn framework_problem(status: StatusCode, detail: Option<String>) -> Problem {
    if status.is_server_error() {
        return Problem::internal();
    }
    let title = status.canonical_reason().unwrap_or("Error");
    let code = match status {
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::REQUEST_TIMEOUT => "REQUEST_TIMEOUT",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        StatusCode::UNPROCESSABLE_ENTITY => "VALIDATION_ERROR",
        _ => "BAD_REQUEST",
    };
    Problem::new(status, title, detail.unwrap_or_else(|| title.to_owned())).with_code(code)
}
