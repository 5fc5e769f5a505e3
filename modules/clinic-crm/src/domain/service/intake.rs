//! Unauthenticated entry points: the public lead form and provider webhooks.
//!
//! There is no actor here. The tenant is resolved from the payload's clinic
//! slug and every later read is scoped to that clinic explicitly.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use clinic_db::secure::{AccessScope, SecureEntityExt, Visibility};
use clinic_security::SecurityContext;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{NewLead, Service};
use crate::domain::activity::{self, Activity, truncate_chars};
use crate::domain::error::DomainError;
use crate::domain::model::{CallStatus, Direction, LeadStatus};
use crate::domain::ports::ClientToken;
use crate::infra::storage::entities::{call, clinic, conversation, lead, lead_payload, message, webhook_event};

const PROVIDER_META: &str = "meta_leads";
const PROVIDER_WHATSAPP: &str = "whatsapp";
const PROVIDER_VOICE: &str = "voice";
const USER_AGENT_MAX: usize = 300;

/// Request facts gathered by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct IntakeMeta {
    pub api_key: Option<String>,
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
}

/// Website form submission. Every field is optional and lenient.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublicLead {
    pub clinic_slug: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub next_action_date: Option<String>,
    pub landing_page_url: Option<String>,
    pub referrer_url: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub gclid: Option<String>,
    pub fbclid: Option<String>,
    /// Honeypot. Humans never see it, so any value means a bot.
    pub company_website: Option<String>,
    pub captcha_token: Option<String>,
}

fn filled(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

impl PublicLead {
    fn into_new_lead(self, meta: &IntakeMeta) -> NewLead {
        NewLead {
            first_name: or_default(self.first_name, "Unknown"),
            last_name: or_default(self.last_name, "Lead"),
            email: self.email,
            phone: self.phone,
            source: Some("website_form".to_owned()),
            status: Some(LeadStatus::parse_or_new(self.status.as_deref().unwrap_or_default())),
            language: self.language,
            country: self.country,
            notes: self.notes,
            next_action_date: self
                .next_action_date
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
            landing_page_url: self.landing_page_url,
            referrer_url: self.referrer_url,
            utm_source: self.utm_source,
            utm_medium: self.utm_medium,
            utm_campaign: self.utm_campaign,
            utm_term: self.utm_term,
            utm_content: self.utm_content,
            gclid: self.gclid,
            fbclid: self.fbclid,
            user_agent: meta.user_agent.as_deref().map(|ua| truncate_chars(ua, USER_AGENT_MAX)),
            ip_hash: meta.ip_hash.clone(),
        }
    }
}

/// The single unscoped read: slug to tenant.
pub(super) async fn find_clinic_by_slug<C: ConnectionTrait>(conn: &C, slug: &str) -> Result<Option<clinic::Model>, DomainError> {
    let slug = slug.trim().to_lowercase();
    if slug.is_empty() {
        return Ok(None);
    }
    Ok(clinic::Entity::find()
        .filter(clinic::Column::Slug.eq(slug))
        .one(conn)
        .await?)
}

fn slug_of(payload: &Value) -> &str {
    payload.get("clinic_slug").and_then(Value::as_str).unwrap_or_default()
}

fn text_of(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

async fn record_webhook<C: ConnectionTrait>(
    conn: &C,
    clinic_id: Option<Uuid>,
    provider: &str,
    payload: &Value,
    signature_ok: bool,
) -> Result<webhook_event::Model, DomainError> {
    let now = Utc::now();
    Ok(webhook_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(clinic_id),
        provider: Set(provider.to_owned()),
        raw_json: Set(payload.clone()),
        signature_ok: Set(signature_ok),
        processed_at: Set(Some(now)),
        created_at: Set(now),
    }
    .insert(conn)
    .await?)
}

impl Service {
    /// Public website form. Checks run in order: rate limit, API key,
    /// honeypot, captcha, clinic slug.
    #[instrument(skip_all)]
    pub async fn submit_public_lead(&self, meta: IntakeMeta, payload: PublicLead) -> Result<lead::Model, DomainError> {
        let key = format!("lead_api:{}", meta.ip_hash.as_deref().unwrap_or("unknown"));
        let window = Duration::from_secs(self.config.api_rate_limit_window_secs);
        if self.limiter.is_limited(&key, self.config.api_rate_limit_count, window) {
            warn!("public lead rate limited");
            return Err(DomainError::RateLimited);
        }

        let configured = self.config.lead_api_key.as_str();
        if !configured.is_empty() && meta.api_key.as_deref() != Some(configured) {
            return Err(DomainError::Unauthenticated);
        }
        if filled(payload.company_website.as_ref()) {
            return Err(DomainError::bad_request("spam detected"));
        }
        if self.config.enable_captcha && !filled(payload.captcha_token.as_ref()) {
            return Err(DomainError::bad_request("captcha failed"));
        }

        let txn = self.db.begin().await?;
        let clinic = find_clinic_by_slug(&txn, payload.clinic_slug.as_deref().unwrap_or_default())
            .await?
            .ok_or(DomainError::NotFound)?;

        let lead = payload
            .into_new_lead(&meta)
            .into_active_model(clinic.id, None)?
            .insert(&txn)
            .await?;
        Activity::new(clinic.id, activity::LEAD_API_CREATED)
            .lead(lead.id)
            .details("Lead captured via website form API")
            .insert(&txn)
            .await?;
        txn.commit().await?;

        info!(lead_id = %lead.id, clinic_id = %clinic.id, "public lead captured");
        Ok(lead)
    }

    /// Meta lead ads webhook. The raw body is always kept; a lead is only
    /// created when the clinic slug resolves.
    #[instrument(skip_all)]
    pub async fn ingest_meta_lead(&self, meta: IntakeMeta, payload: Value) -> Result<Option<lead::Model>, DomainError> {
        let txn = self.db.begin().await?;
        let clinic = find_clinic_by_slug(&txn, slug_of(&payload)).await?;
        let clinic_id = clinic.as_ref().map(|c| c.id);

        record_webhook(&txn, clinic_id, PROVIDER_META, &payload, true).await?;
        let stored = lead_payload::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(clinic_id),
            provider: Set(PROVIDER_META.to_owned()),
            payload_json: Set(payload.clone()),
            lead_id: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        let Some(clinic) = clinic else {
            txn.commit().await?;
            debug!("meta webhook for unknown clinic stored");
            return Ok(None);
        };

        let mapped = NewLead {
            first_name: text_of(&payload, "first_name")
                .or_else(|| text_of(&payload, "full_name"))
                .unwrap_or_else(|| "Meta".to_owned()),
            last_name: text_of(&payload, "last_name").unwrap_or_else(|| "Lead".to_owned()),
            email: text_of(&payload, "email"),
            phone: text_of(&payload, "phone"),
            source: Some("meta_lead_ads".to_owned()),
            status: Some(LeadStatus::New),
            language: text_of(&payload, "language").or_else(|| Some(clinic.default_language.clone())),
            country: text_of(&payload, "country"),
            utm_source: text_of(&payload, "utm_source").or_else(|| Some("meta".to_owned())),
            utm_medium: text_of(&payload, "utm_medium").or_else(|| Some("paid_social".to_owned())),
            utm_campaign: text_of(&payload, "utm_campaign"),
            fbclid: text_of(&payload, "fbclid"),
            user_agent: meta.user_agent.as_deref().map(|ua| truncate_chars(ua, USER_AGENT_MAX)),
            ip_hash: meta.ip_hash,
            ..NewLead::default()
        };
        let lead = mapped.into_active_model(clinic.id, None)?.insert(&txn).await?;

        let mut am: lead_payload::ActiveModel = stored.into();
        am.lead_id = Set(Some(lead.id));
        am.update(&txn).await?;
        txn.commit().await?;

        info!(lead_id = %lead.id, clinic_id = %clinic.id, "meta lead captured");
        Ok(Some(lead))
    }

    /// Inbound `WhatsApp` message: find or open the conversation by external id.
    #[instrument(skip_all)]
    pub async fn ingest_whatsapp(&self, payload: Value) -> Result<Option<message::Model>, DomainError> {
        let txn = self.db.begin().await?;
        let clinic = find_clinic_by_slug(&txn, slug_of(&payload)).await?;
        record_webhook(&txn, clinic.as_ref().map(|c| c.id), PROVIDER_WHATSAPP, &payload, false).await?;

        let Some(clinic) = clinic else {
            txn.commit().await?;
            return Ok(None);
        };

        let parsed = self.whatsapp.parse_webhook(&payload);
        let scope = AccessScope::clinic(clinic.id);
        let now = Utc::now();

        let existing = conversation::Entity::find()
            .secure()
            .scope_with(&scope, Visibility::Live)
            .filter(conversation::Column::ExternalId.eq(parsed.external_conversation_id.clone()))
            .one(&txn)
            .await?;
        let conversation = match existing {
            Some(found) => found,
            None => {
                conversation::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    clinic_id: Set(clinic.id),
                    lead_id: Set(None),
                    patient_id: Set(None),
                    channel: Set("whatsapp".to_owned()),
                    external_id: Set(Some(parsed.external_conversation_id)),
                    last_message_at: Set(None),
                    status: Set("open".to_owned()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    deleted_at: Set(None),
                    deleted_by: Set(None),
                }
                .insert(&txn)
                .await?
            }
        };

        let message = message::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(clinic.id),
            conversation_id: Set(conversation.id),
            direction: Set(Direction::Inbound),
            body: Set(parsed.body),
            template_name: Set(None),
            provider_message_id: Set(text_of(&payload, "provider_message_id")),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            deleted_by: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut am: conversation::ActiveModel = conversation.into();
        am.last_message_at = Set(Some(now));
        am.updated_at = Set(now);
        am.update(&txn).await?;
        txn.commit().await?;

        debug!(message_id = %message.id, "inbound whatsapp stored");
        Ok(Some(message))
    }

    /// Call status callback. Unknown calls and unknown statuses are ignored.
    #[instrument(skip_all)]
    pub async fn ingest_voice_event(&self, payload: Value) -> Result<Option<call::Model>, DomainError> {
        let txn = self.db.begin().await?;
        let clinic = find_clinic_by_slug(&txn, slug_of(&payload)).await?;
        record_webhook(&txn, clinic.as_ref().map(|c| c.id), PROVIDER_VOICE, &payload, false).await?;

        let Some(clinic) = clinic else {
            txn.commit().await?;
            return Ok(None);
        };
        let event = self.voice.parse_call_event(&payload);
        let Some(provider_call_id) = event.provider_call_id else {
            txn.commit().await?;
            return Ok(None);
        };

        let found = call::Entity::find()
            .secure()
            .scope_with(&AccessScope::clinic(clinic.id), Visibility::Live)
            .filter(call::Column::ProviderCallId.eq(provider_call_id))
            .one(&txn)
            .await?;
        let Some(found) = found else {
            txn.commit().await?;
            return Ok(None);
        };

        let status = CallStatus::parse(&event.status).unwrap_or(found.status);
        let mut am: call::ActiveModel = found.clone().into();
        am.status = Set(status);
        if event.recording_url.is_some() {
            am.recording_url = Set(event.recording_url);
        }
        if let Some(duration) = event.duration_seconds.filter(|d| *d > 0) {
            am.duration_seconds = Set(Some(duration));
        }
        if status.is_final() {
            am.ended_at = Set(Some(Utc::now()));
        }
        am.updated_at = Set(Utc::now());
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        debug!(call_id = %updated.id, status = status.as_str(), "call status updated");
        Ok(Some(updated))
    }

    /// Softphone token for the signed-in user.
    pub fn voice_token(&self, ctx: &SecurityContext) -> Result<ClientToken, DomainError> {
        ctx.require_actor()?;
        Ok(self.voice.client_token())
    }
}
