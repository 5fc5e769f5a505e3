//! Clinic settings, integrations exports and GDPR requests.

use std::sync::Arc;

use axum::extract::Path;
use axum::response::Response;
use axum::{Extension, Json};
use clinic_auth::Authz;
use clinic_errors::ApiJson;
use uuid::Uuid;

use super::created;
use crate::api::rest::dto::{ActivityDto, AssignmentModeDto, ClinicDto, ConversionDto, PatientDto, StageDto};
use crate::api::rest::error::ApiResult;
use crate::domain::service::{ClinicPatch, GdprExport, GoogleAdsRow, NewStage, Service};

#[tracing::instrument(skip(svc, ctx))]
pub async fn get_clinic(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<ClinicDto>> {
    Ok(Json(svc.clinic_profile(&ctx).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn update_clinic(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(patch): ApiJson<ClinicPatch>,
) -> ApiResult<Json<ClinicDto>> {
    Ok(Json(svc.update_clinic_profile(&ctx, patch).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn list_stages(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<StageDto>>> {
    let stages = svc.pipeline_stages(&ctx).await?;
    Ok(Json(stages.into_iter().map(StageDto::from).collect()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn add_stage(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(input): ApiJson<NewStage>,
) -> ApiResult<Response> {
    Ok(created(StageDto::from(svc.add_pipeline_stage(&ctx, input).await?)))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn set_assignment_mode(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(req): ApiJson<AssignmentModeDto>,
) -> ApiResult<Json<AssignmentModeDto>> {
    let rule = svc.set_assignment_mode(&ctx, req.mode).await?;
    Ok(Json(AssignmentModeDto { mode: rule.mode }))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn audit_log(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<ActivityDto>>> {
    let log = svc.audit_log(&ctx).await?;
    Ok(Json(log.into_iter().map(ActivityDto::from).collect()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn conversions(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<ConversionDto>>> {
    let events = svc.conversions(&ctx).await?;
    Ok(Json(events.into_iter().map(ConversionDto::from).collect()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn google_ads_export(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<GoogleAdsRow>>> {
    Ok(Json(svc.google_ads_export(&ctx).await?))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn gdpr_export(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GdprExport>> {
    Ok(Json(svc.gdpr_export(&ctx, id).await?))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn gdpr_anonymize(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PatientDto>> {
    Ok(Json(svc.gdpr_anonymize(&ctx, id).await?.into()))
}
