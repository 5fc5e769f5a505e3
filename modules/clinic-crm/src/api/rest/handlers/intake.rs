//! Unauthenticated entry points: the website lead form and provider
//! webhooks. The tenant comes from the payload, never from a token.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::response::Response;
use axum::{Extension, Json};
use clinic_auth::Authz;
use clinic_errors::ApiJson;
use clinic_auth::axum_ext::{ENV_IP_HASH, ENV_USER_AGENT};
use clinic_security::SecurityContext;
use serde_json::Value;

use super::created;
use crate::api::rest::dto::{Ack, LeadCreatedDto};
use crate::api::rest::error::ApiResult;
use crate::domain::service::{IntakeMeta, PublicLead, Service};

pub const API_KEY_HEADER: &str = "x-api-key";

fn intake_meta(ctx: &SecurityContext, headers: &HeaderMap) -> IntakeMeta {
    IntakeMeta {
        api_key: headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        ip_hash: ctx.environment_attribute(ENV_IP_HASH).map(str::to_owned),
        user_agent: ctx.environment_attribute(ENV_USER_AGENT).map(str::to_owned),
    }
}

#[tracing::instrument(skip_all)]
pub async fn submit_lead(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<PublicLead>,
) -> ApiResult<Response> {
    let lead = svc.submit_public_lead(intake_meta(&ctx, &headers), payload).await?;
    Ok(created(LeadCreatedDto { lead_id: lead.id }))
}

#[tracing::instrument(skip_all)]
pub async fn meta_webhook(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<Value>,
) -> ApiResult<Json<Ack>> {
    svc.ingest_meta_lead(intake_meta(&ctx, &headers), payload).await?;
    Ok(Json(Ack { ok: true }))
}

#[tracing::instrument(skip_all)]
pub async fn whatsapp_webhook(
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(payload): ApiJson<Value>,
) -> ApiResult<Json<Ack>> {
    svc.ingest_whatsapp(payload).await?;
    Ok(Json(Ack { ok: true }))
}

#[tracing::instrument(skip_all)]
pub async fn voice_webhook(
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(payload): ApiJson<Value>,
) -> ApiResult<Json<Ack>> {
    svc.ingest_voice_event(payload).await?;
    Ok(Json(Ack { ok: true }))
}
