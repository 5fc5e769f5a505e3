use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::response::Response;
use axum::{Extension, Json};
use clinic_auth::Authz;
use clinic_errors::ApiJson;
use tracing::info;
use uuid::Uuid;

use super::{created, no_content};
use crate::api::rest::dto::{
    ActivityDto, ConvertedDto, FollowupReq, FollowupsDto, LeadDto, NoteReq, PageQuery, StatusReq,
};
use crate::api::rest::error::ApiResult;
use crate::domain::service::{LeadFilter, NewLead, Service, TimelinePage, WhatsAppTemplate};

#[tracing::instrument(skip(svc, ctx))]
pub async fn list_leads(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Query(filter): Query<LeadFilter>,
) -> ApiResult<Json<Vec<LeadDto>>> {
    let leads = svc.list_leads(&ctx, &filter).await?;
    Ok(Json(leads.into_iter().map(LeadDto::from).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn create_lead(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(input): ApiJson<NewLead>,
) -> ApiResult<Response> {
    let lead = svc.create_lead(&ctx, input).await?;
    info!(lead_id = %lead.id, "lead created over REST");
    Ok(created(LeadDto::from(lead)))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn get_lead(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LeadDto>> {
    Ok(Json(svc.get_lead(&ctx, id).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn delete_lead(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    svc.delete_lead(&ctx, id).await?;
    Ok(no_content())
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn lead_activities(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ActivityDto>>> {
    let log = svc.lead_activities(&ctx, id).await?;
    Ok(Json(log.into_iter().map(ActivityDto::from).collect()))
}

#[tracing::instrument(skip(svc, ctx, req))]
pub async fn add_note(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<NoteReq>,
) -> ApiResult<Response> {
    let entry = svc.add_lead_note(&ctx, id, &req.details).await?;
    Ok(created(ActivityDto::from(entry)))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn set_followup(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<FollowupReq>,
) -> ApiResult<Json<LeadDto>> {
    Ok(Json(svc.set_lead_followup(&ctx, id, req.next_action_date).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn change_status(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<StatusReq>,
) -> ApiResult<Json<LeadDto>> {
    Ok(Json(svc.change_lead_status(&ctx, id, req.status).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn convert_lead(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ConvertedDto>> {
    Ok(Json(svc.convert_lead(&ctx, id).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn followups(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<FollowupsDto>> {
    let f = svc.lead_followups(&ctx).await?;
    Ok(Json(FollowupsDto {
        today: f.today,
        due: f.due.into_iter().map(LeadDto::from).collect(),
        upcoming: f.upcoming.into_iter().map(LeadDto::from).collect(),
    }))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn templates(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<WhatsAppTemplate>>> {
    Ok(Json(svc.lead_templates(&ctx, id).await?))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn timeline(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<TimelinePage>> {
    let page = q.page.unwrap_or(1).max(1);
    Ok(Json(svc.lead_timeline(&ctx, id, page).await?))
}
