//! Inbox, calls, the agent queue and the softphone token.

use std::sync::Arc;

use axum::extract::Path;
use axum::response::Response;
use axum::{Extension, Json};
use clinic_auth::Authz;
use clinic_errors::ApiJson;
use uuid::Uuid;

use super::created;
use crate::api::rest::dto::{AssignDto, CallDto, ConversationDto, DispositionDto, MessageDto, QueueDto, ThreadDto};
use crate::api::rest::error::ApiResult;
use crate::domain::ports::ClientToken;
use crate::domain::service::{Disposition, NewCall, NewMessage, Service};

#[tracing::instrument(skip(svc, ctx))]
pub async fn inbox(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<ConversationDto>>> {
    let conversations = svc.inbox(&ctx).await?;
    Ok(Json(conversations.into_iter().map(ConversationDto::from).collect()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn thread(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ThreadDto>> {
    Ok(Json(svc.thread(&ctx, id).await?.into()))
}

#[tracing::instrument(skip(svc, ctx, input))]
pub async fn send_message(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<NewMessage>,
) -> ApiResult<Response> {
    Ok(created(MessageDto::from(svc.send_message(&ctx, id, input).await?)))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn start_call(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<NewCall>,
) -> ApiResult<Response> {
    Ok(created(CallDto::from(svc.start_call(&ctx, id, input).await?)))
}

#[tracing::instrument(skip(svc, ctx, input))]
pub async fn save_disposition(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<Disposition>,
) -> ApiResult<Response> {
    Ok(created(DispositionDto::from(svc.save_disposition(&ctx, id, input).await?)))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn queue(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<QueueDto>> {
    Ok(Json(svc.queue(&ctx).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn assign_next(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<AssignDto>> {
    Ok(Json(svc.assign_next(&ctx).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn voice_token(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<ClientToken>> {
    Ok(Json(svc.voice_token(&ctx)?))
}
