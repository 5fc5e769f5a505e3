//! Request body extraction that rejects with a [`Problem`].

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::Problem;

/// Drop-in replacement for `axum::Json` as an extractor. Malformed bodies
/// produce `application/problem+json` instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection_to_problem(&rejection)),
        }
    }
}

/// Wrong field types are a 422, unparsable JSON a 400, a missing
/// `Content-Type: application/json` a 415.
pub fn json_rejection_to_problem(rejection: &JsonRejection) -> Problem {
    match rejection {
        JsonRejection::JsonDataError(e) => Problem::unprocessable(e.body_text()),
        JsonRejection::JsonSyntaxError(e) => {
            Problem::new(StatusCode::BAD_REQUEST, "Bad Request", e.body_text()).with_code("MALFORMED_JSON")
        }
        JsonRejection::MissingJsonContentType(e) => Problem::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported Media Type",
            e.body_text(),
        )
        .with_code("UNSUPPORTED_MEDIA_TYPE"),
        other => Problem::new(other.status(), "Bad Request", other.body_text()).with_code("BAD_REQUEST"),
    }
}
