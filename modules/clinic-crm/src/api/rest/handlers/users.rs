use std::sync::Arc;

use axum::extract::Path;
use axum::response::Response;
use axum::{Extension, Json};
use clinic_auth::Authz;
use clinic_errors::ApiJson;
use uuid::Uuid;

use super::created;
use crate::api::rest::dto::{RoleReq, UserDto};
use crate::api::rest::error::ApiResult;
use crate::domain::service::{NewUser, Service};

#[tracing::instrument(skip(svc, ctx))]
pub async fn list_users(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<UserDto>>> {
    let users = svc.list_users(&ctx).await?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn create_user(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<Response> {
    Ok(created(UserDto::from(svc.create_user(&ctx, input).await?)))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn toggle_user(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserDto>> {
    Ok(Json(svc.toggle_user(&ctx, id).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn update_role(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<RoleReq>,
) -> ApiResult<Json<UserDto>> {
    Ok(Json(svc.update_user_role(&ctx, id, &req.role).await?.into()))
}
