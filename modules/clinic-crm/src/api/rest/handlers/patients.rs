use std::sync::Arc;

use axum::extract::Path;
use axum::{Extension, Json};
use clinic_auth::Authz;
use clinic_errors::ApiJson;
use uuid::Uuid;

use crate::api::rest::dto::{AssignDoctorReq, ClinicalNotesReq, PatientDto};
use crate::api::rest::error::ApiResult;
use crate::domain::service::Service;

#[tracing::instrument(skip(svc, ctx))]
pub async fn list_patients(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<PatientDto>>> {
    let patients = svc.list_patients(&ctx).await?;
    Ok(Json(patients.into_iter().map(PatientDto::from).collect()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn get_patient(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PatientDto>> {
    Ok(Json(svc.get_patient(&ctx, id).await?.into()))
}

// Notes can hold clinical detail; keep them out of the span.
#[tracing::instrument(skip(svc, ctx, req))]
pub async fn update_notes(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<ClinicalNotesReq>,
) -> ApiResult<Json<PatientDto>> {
    Ok(Json(svc.update_clinical_notes(&ctx, id, &req.clinical_notes).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn assign_doctor(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<AssignDoctorReq>,
) -> ApiResult<Json<PatientDto>> {
    Ok(Json(svc.assign_doctor(&ctx, id, req.doctor_id).await?.into()))
}
