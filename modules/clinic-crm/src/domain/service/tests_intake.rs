#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use clinic_db::secure::{AccessScope, SecureEntityExt, Visibility};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use uuid::Uuid;

use super::tests_support::{world, world_with};
use super::{IntakeMeta, LeadFilter, PublicLead};
use crate::config::CrmConfig;
use crate::domain::activity;
use crate::domain::error::DomainError;
use crate::domain::model::{CallStatus, Direction, LeadStatus};
use crate::infra::storage::entities::{call, lead_payload, message, webhook_event};

const KEY: &str = "change-this-key";

fn meta(ip_hash: &str) -> IntakeMeta {
    IntakeMeta {
        api_key: Some(KEY.to_owned()),
        ip_hash: Some(ip_hash.to_owned()),
        user_agent: Some("Mozilla/5.0".to_owned()),
    }
}

fn form(slug: &str) -> PublicLead {
    PublicLead {
        clinic_slug: Some(slug.to_owned()),
        first_name: Some("Giulia".to_owned()),
        email: Some("giulia@mail.test".to_owned()),
        status: Some("contacted".to_owned()),
        utm_source: Some("google".to_owned()),
        gclid: Some("gc-123".to_owned()),
        next_action_date: Some("2026-05-04".to_owned()),
        ..PublicLead::default()
    }
}

#[tokio::test]
async fn form_lead_lands_in_the_slug_clinic() {
    let w = world().await;
    let lead = w
        .svc
        .submit_public_lead(meta("h1"), form("  Smile-Tirana "))
        .await
        .unwrap();

    assert_eq!(lead.clinic_id, w.clinic_a.id);
    assert_eq!(lead.assigned_agent_id, None);
    assert_eq!(lead.last_name, "Lead");
    assert_eq!(lead.source, "website_form");
    assert_eq!(lead.status, LeadStatus::Contacted);
    assert_eq!(lead.gclid.as_deref(), Some("gc-123"));
    assert_eq!(lead.ip_hash.as_deref(), Some("h1"));
    assert_eq!(lead.next_action_date.map(|d| d.to_string()).as_deref(), Some("2026-05-04"));

    let log = w.svc.lead_activities(&w.admin_a.ctx, lead.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, activity::LEAD_API_CREATED);
    assert_eq!(log[0].user_id, None);

    assert!(w.svc.list_leads(&w.admin_b.ctx, &LeadFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_status_and_empty_names_fall_back() {
    let w = world().await;
    let payload = PublicLead {
        clinic_slug: Some("smile-tirana".to_owned()),
        status: Some("hot".to_owned()),
        ..PublicLead::default()
    };
    let lead = w.svc.submit_public_lead(meta("h1"), payload).await.unwrap();
    assert_eq!(lead.first_name, "Unknown");
    assert_eq!(lead.status, LeadStatus::New);
    assert_eq!(lead.country, "Italy");
}

#[tokio::test]
async fn wrong_api_key_is_unauthenticated() {
    let w = world().await;
    let mut bad = meta("h1");
    bad.api_key = Some("nope".to_owned());
    assert!(matches!(
        w.svc.submit_public_lead(bad, form("smile-tirana")).await,
        Err(DomainError::Unauthenticated)
    ));

    let mut missing = meta("h1");
    missing.api_key = None;
    assert!(matches!(
        w.svc.submit_public_lead(missing, form("smile-tirana")).await,
        Err(DomainError::Unauthenticated)
    ));
}

#[tokio::test]
async fn empty_configured_key_disables_the_check() {
    let w = world_with(CrmConfig {
        lead_api_key: String::new(),
        ..CrmConfig::default()
    })
    .await;
    let mut no_key = meta("h1");
    no_key.api_key = None;
    assert!(w.svc.submit_public_lead(no_key, form("smile-tirana")).await.is_ok());
}

#[tokio::test]
async fn honeypot_and_captcha_reject() {
    let w = world_with(CrmConfig {
        enable_captcha: true,
        ..CrmConfig::default()
    })
    .await;

    let mut bot = form("smile-tirana");
    bot.company_website = Some("http://spam.test".to_owned());
    bot.captcha_token = Some("ok".to_owned());
    assert!(matches!(
        w.svc.submit_public_lead(meta("h1"), bot).await,
        Err(DomainError::BadRequest(ref msg)) if msg == "spam detected"
    ));

    assert!(matches!(
        w.svc.submit_public_lead(meta("h1"), form("smile-tirana")).await,
        Err(DomainError::BadRequest(ref msg)) if msg == "captcha failed"
    ));

    let mut human = form("smile-tirana");
    human.captcha_token = Some("tok".to_owned());
    assert!(w.svc.submit_public_lead(meta("h1"), human).await.is_ok());
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let w = world().await;
    assert!(matches!(
        w.svc.submit_public_lead(meta("h1"), form("nowhere")).await,
        Err(DomainError::NotFound)
    ));
    assert!(matches!(
        w.svc.submit_public_lead(meta("h1"), PublicLead::default()).await,
        Err(DomainError::NotFound)
    ));
}

#[tokio::test]
async fn rate_limit_is_per_ip_hash() {
    let w = world_with(CrmConfig {
        api_rate_limit_count: 2,
        ..CrmConfig::default()
    })
    .await;
    for _ in 0..2 {
        w.svc.submit_public_lead(meta("busy"), form("smile-tirana")).await.unwrap();
    }
    assert!(matches!(
        w.svc.submit_public_lead(meta("busy"), form("smile-tirana")).await,
        Err(DomainError::RateLimited)
    ));
    assert!(w.svc.submit_public_lead(meta("calm"), form("smile-tirana")).await.is_ok());
}

#[tokio::test]
async fn meta_webhook_creates_lead_and_links_payload() {
    let w = world().await;
    let payload = json!({
        "clinic_slug": "smile-tirana",
        "full_name": "Giulia Bianchi",
        "email": "giulia@mail.test",
        "utm_campaign": "spring",
    });
    let lead = w
        .svc
        .ingest_meta_lead(meta("h1"), payload)
        .await
        .unwrap()
        .expect("lead created");

    assert_eq!(lead.first_name, "Giulia Bianchi");
    assert_eq!(lead.last_name, "Lead");
    assert_eq!(lead.source, "meta_lead_ads");
    assert_eq!(lead.language, w.clinic_a.default_language);
    assert_eq!(lead.utm_source.as_deref(), Some("meta"));
    assert_eq!(lead.utm_medium.as_deref(), Some("paid_social"));
    assert_eq!(lead.utm_campaign.as_deref(), Some("spring"));

    let payloads = lead_payload::Entity::find().all(w.db()).await.unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].lead_id, Some(lead.id));
    let events = webhook_event::Entity::find().all(w.db()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].signature_ok);
}

#[tokio::test]
async fn meta_webhook_for_unknown_clinic_only_stores_the_body() {
    let w = world().await;
    let stored = w
        .svc
        .ingest_meta_lead(IntakeMeta::default(), json!({"clinic_slug": "nowhere"}))
        .await
        .unwrap();
    assert!(stored.is_none());

    let payloads = lead_payload::Entity::find().all(w.db()).await.unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].clinic_id, None);
    assert_eq!(payloads[0].lead_id, None);
}

#[tokio::test]
async fn whatsapp_messages_share_a_conversation() {
    let w = world().await;
    for body in ["Ciao", "Quanto costa?"] {
        let msg = w
            .svc
            .ingest_whatsapp(json!({
                "clinic_slug": "smile-tirana",
                "conversation_id": "wa-42",
                "from_number": "+390600000",
                "body": body,
                "provider_message_id": "wamid-1",
            }))
            .await
            .unwrap()
            .expect("stored");
        assert_eq!(msg.direction, Direction::Inbound);
        assert_eq!(msg.clinic_id, w.clinic_a.id);
    }

    let inbox = w.svc.inbox(&w.agent_a.ctx).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].external_id.as_deref(), Some("wa-42"));
    assert!(inbox[0].last_message_at.is_some());

    let thread = w.svc.thread(&w.agent_a.ctx, inbox[0].id).await.unwrap();
    assert_eq!(
        thread.messages.iter().map(|m| m.body.as_str()).collect::<Vec<_>>(),
        vec!["Ciao", "Quanto costa?"]
    );
    assert!(w.svc.inbox(&w.admin_b.ctx).await.unwrap().is_empty());
    assert_eq!(
        message::Entity::find()
            .secure()
            .scope_with(&AccessScope::clinic(w.clinic_b.id), Visibility::Live)
            .count(w.db())
            .await
            .unwrap(),
        0
    );
}

async fn ringing_call(w: &super::tests_support::World, provider_call_id: &str) -> call::Model {
    let now = Utc::now();
    call::ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(w.clinic_a.id),
        lead_id: Set(None),
        patient_id: Set(None),
        direction: Set(Direction::Outbound),
        from_number: Set("+355690000001".to_owned()),
        to_number: Set("+390600000".to_owned()),
        started_at: Set(Some(now)),
        ended_at: Set(None),
        duration_seconds: Set(None),
        status: Set(CallStatus::Ringing),
        recording_url: Set(None),
        provider_call_id: Set(Some(provider_call_id.to_owned())),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        deleted_by: Set(None),
    }
    .insert(w.db())
    .await
    .unwrap()
}

#[tokio::test]
async fn voice_event_closes_the_call() {
    let w = world().await;
    ringing_call(&w, "call-7").await;

    let updated = w
        .svc
        .ingest_voice_event(json!({
            "clinic_slug": "smile-tirana",
            "provider_call_id": "call-7",
            "status": "no-answer",
            "duration_seconds": 0,
        }))
        .await
        .unwrap()
        .expect("call updated");
    assert_eq!(updated.status, CallStatus::NoAnswer);
    assert!(updated.ended_at.is_some());
    assert_eq!(updated.duration_seconds, None);

    let queue = w.svc.queue(&w.agent_a.ctx).await.unwrap();
    assert_eq!(queue.missed_calls.len(), 1);
}

#[tokio::test]
async fn voice_event_keeps_status_it_does_not_know() {
    let w = world().await;
    ringing_call(&w, "call-8").await;

    let updated = w
        .svc
        .ingest_voice_event(json!({
            "clinic_slug": "smile-tirana",
            "provider_call_id": "call-8",
            "status": "queued",
            "recording_url": "https://rec.test/8.mp3",
            "duration_seconds": 42,
        }))
        .await
        .unwrap()
        .expect("call updated");
    assert_eq!(updated.status, CallStatus::Ringing);
    assert!(updated.ended_at.is_none());
    assert_eq!(updated.duration_seconds, Some(42));
    assert_eq!(updated.recording_url.as_deref(), Some("https://rec.test/8.mp3"));
}

#[tokio::test]
async fn voice_event_cannot_reach_another_clinic() {
    let w = world().await;
    ringing_call(&w, "call-9").await;
    let untouched = w
        .svc
        .ingest_voice_event(json!({
            "clinic_slug": "dent-roma",
            "provider_call_id": "call-9",
            "status": "completed",
        }))
        .await
        .unwrap();
    assert!(untouched.is_none());
    assert_eq!(webhook_event::Entity::find().all(w.db()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn voice_token_needs_a_user() {
    let w = world().await;
    let token = w.svc.voice_token(&w.doctor_a.ctx).unwrap();
    assert_eq!(token.token, "stub-token");
    assert!(matches!(
        w.svc.voice_token(&clinic_security::SecurityContext::anonymous()),
        Err(DomainError::Unauthenticated)
    ));
}
