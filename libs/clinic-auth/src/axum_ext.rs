//! Axum extractor and middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use clinic_security::{SecurityContext, client_ip_hash};

use crate::{ActorResolver, AuthError, JwtCodec};

pub const ENV_IP_HASH: &str = "ip_hash";
pub const ENV_USER_AGENT: &str = "user_agent";

const MAX_USER_AGENT_LEN: usize = 300;

/// Extractor for the [`SecurityContext`] inserted by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct Authz(pub SecurityContext);

impl<S> FromRequestParts<S> for Authz
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .map(Authz)
            .ok_or(AuthError::Internal(
                "SecurityContext not found - auth middleware not configured".to_owned(),
            ))
    }
}

#[derive(Clone)]
pub struct AuthState {
    codec: Arc<JwtCodec>,
    resolver: Arc<dyn ActorResolver>,
    ip_hash_salt: Arc<str>,
}

impl AuthState {
    #[must_use]
    pub fn new(codec: Arc<JwtCodec>, resolver: Arc<dyn ActorResolver>, ip_hash_salt: &str) -> Self {
        Self {
            codec,
            resolver,
            ip_hash_salt: Arc::from(ip_hash_salt),
        }
    }
}

/// 1. No `Authorization` header: anonymous context.
/// 2. Valid bearer token of an active user: context for that user, with the
///    role currently stored for them.
/// 3. Anything else in the header, or a token of a deactivated or removed
///    user: 401.
///
/// In every case the masked client IP hash and user agent are attached as
/// environment attributes.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut builder = SecurityContext::builder();

    if let Some(raw) = request.headers().get(header::AUTHORIZATION) {
        let Some(token) = raw.to_str().ok().and_then(extract_bearer_token) else {
            return AuthError::InvalidToken("malformed Authorization header".to_owned())
                .into_response();
        };
        let claims = match state.codec.validate(token) {
            Ok(claims) => claims,
            Err(err) => return err.into_response(),
        };
        match state.resolver.resolve(&claims).await {
            Ok(Some(actor)) => builder = builder.actor(actor),
            Ok(None) => {
                return AuthError::InvalidToken("user is inactive or unknown".to_owned()).into_response();
            }
            Err(err) => return err.into_response(),
        }
    }

    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    if let Some(hash) = client_ip_hash(
        &state.ip_hash_salt,
        forwarded_for(request.headers()),
        remote.as_deref(),
    ) {
        builder = builder.add_environment_attribute(ENV_IP_HASH, &hash);
    }
    if let Some(ua) = user_agent(request.headers()) {
        builder = builder.add_environment_attribute(ENV_USER_AGENT, &ua);
    }

    request.extensions_mut().insert(builder.build());
    next.run(request).await
}

fn extract_bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-forwarded-for").and_then(|v| v.to_str().ok())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.chars().take(MAX_USER_AGENT_LEN).collect())
}
