use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn;
use axum::routing::{get, patch, post, put};
use axum::{Extension, Router};
use clinic_errors::problem_context_middleware;
use http::StatusCode;
use tower_http::timeout::TimeoutLayer;

use crate::api::rest::handlers::{communications, intake, leads, patients, reports, sales, settings, users};
use crate::domain::service::Service;

const API_PREFIX: &str = "/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn staff_routes() -> Router {
    Router::new()
        .route("/leads", get(leads::list_leads).post(leads::create_lead))
        .route("/leads/followups", get(leads::followups))
        .route("/leads/{id}", get(leads::get_lead).delete(leads::delete_lead))
        .route("/leads/{id}/activities", get(leads::lead_activities))
        .route("/leads/{id}/notes", post(leads::add_note))
        .route("/leads/{id}/followup", put(leads::set_followup))
        .route("/leads/{id}/status", put(leads::change_status))
        .route("/leads/{id}/convert", post(leads::convert_lead))
        .route("/leads/{id}/templates", get(leads::templates))
        .route("/leads/{id}/timeline", get(leads::timeline))
        .route("/patients", get(patients::list_patients))
        .route("/patients/{id}", get(patients::get_patient))
        .route("/patients/{id}/notes", put(patients::update_notes))
        .route("/patients/{id}/doctor", put(patients::assign_doctor))
        .route("/quotes", get(sales::list_quotes).post(sales::create_quote))
        .route("/quotes/{id}/send", post(sales::send_quote))
        .route("/quotes/{id}/accept", post(sales::accept_quote))
        .route("/payments", get(sales::list_payments).post(sales::record_payment))
        .route("/payments/{id}/paid", post(sales::mark_paid))
        .route("/conversations", get(communications::inbox))
        .route("/conversations/{id}", get(communications::thread))
        .route("/conversations/{id}/messages", post(communications::send_message))
        .route("/conversations/{id}/calls", post(communications::start_call))
        .route("/calls/{id}/disposition", post(communications::save_disposition))
        .route("/queue", get(communications::queue))
        .route("/queue/assign-next", post(communications::assign_next))
        .route("/voice/token", get(communications::voice_token))
        .route("/settings/clinic", get(settings::get_clinic).patch(settings::update_clinic))
        .route("/settings/pipeline", get(settings::list_stages).post(settings::add_stage))
        .route("/settings/assignment", put(settings::set_assignment_mode))
        .route("/settings/audit", get(settings::audit_log))
        .route("/integrations/conversions", get(settings::conversions))
        .route("/integrations/google-ads-export", get(settings::google_ads_export))
        .route("/gdpr/patients/{id}/export", get(settings::gdpr_export))
        .route("/gdpr/patients/{id}/anonymize", post(settings::gdpr_anonymize))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}/toggle", post(users::toggle_user))
        .route("/users/{id}/role", patch(users::update_role))
        .route("/dashboard", get(reports::dashboard))
        .route("/reports", get(reports::reports))
}

fn public_routes() -> Router {
    Router::new()
        .route("/public/leads", post(intake::submit_lead))
        .route("/webhooks/meta-leads", post(intake::meta_webhook))
        .route("/webhooks/whatsapp", post(intake::whatsapp_webhook))
        .route("/webhooks/voice", post(intake::voice_webhook))
}

/// All CRM routes under `/api/v1`. The caller layers the auth middleware
/// on top so every handler sees a `SecurityContext`.
#[allow(clippy::needless_pass_by_value)]
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    let api = staff_routes()
        .merge(public_routes())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT))
        .layer(Extension(service))
        .layer(from_fn(problem_context_middleware));
    router.nest(API_PREFIX, api)
}
