//! Dashboard KPIs and reports.

use std::sync::Arc;

use axum::{Extension, Json};
use clinic_auth::Authz;

use crate::api::rest::error::ApiResult;
use crate::domain::service::{Dashboard, Reports, Service};

#[tracing::instrument(skip(svc, ctx))]
pub async fn dashboard(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Dashboard>> {
    Ok(Json(svc.dashboard(&ctx).await?))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn reports(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Reports>> {
    Ok(Json(svc.reports(&ctx).await?))
}
