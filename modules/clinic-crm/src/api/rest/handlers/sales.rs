//! Quotes and payments.

use std::sync::Arc;

use axum::extract::Path;
use axum::response::Response;
use axum::{Extension, Json};
use clinic_auth::Authz;
use clinic_errors::ApiJson;
use uuid::Uuid;

use super::created;
use crate::api::rest::dto::{PaymentDto, PaymentsDto, QuoteDto};
use crate::api::rest::error::ApiResult;
use crate::domain::service::{NewPayment, NewQuote, Service};

#[tracing::instrument(skip(svc, ctx))]
pub async fn list_quotes(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<QuoteDto>>> {
    let quotes = svc.list_quotes(&ctx).await?;
    Ok(Json(quotes.into_iter().map(QuoteDto::from).collect()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn create_quote(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(input): ApiJson<NewQuote>,
) -> ApiResult<Response> {
    Ok(created(QuoteDto::from(svc.create_quote(&ctx, input).await?)))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn send_quote(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QuoteDto>> {
    Ok(Json(svc.send_quote(&ctx, id).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn accept_quote(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QuoteDto>> {
    Ok(Json(svc.accept_quote(&ctx, id).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn list_payments(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<PaymentsDto>> {
    Ok(Json(svc.list_payments(&ctx).await?.into()))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn record_payment(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(input): ApiJson<NewPayment>,
) -> ApiResult<Response> {
    Ok(created(PaymentDto::from(svc.record_payment(&ctx, input).await?)))
}

#[tracing::instrument(skip(svc, ctx))]
pub async fn mark_paid(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PaymentDto>> {
    Ok(Json(svc.mark_payment_paid(&ctx, id).await?.into()))
}
