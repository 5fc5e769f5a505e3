#![allow(clippy::unwrap_used, clippy::expect_used)]

use clinic_db::secure::{AccessScope, SecureEntityExt, Visibility};
use sea_orm::EntityTrait;

use super::tests_support::{new_lead, world};
use super::{ClinicPatch, IntakeMeta, NewStage, NewUser, PublicLead};
use crate::domain::activity;
use crate::domain::error::DomainError;
use crate::domain::model::LeadStatus;
use crate::infra::storage::entities::consent_event;

#[tokio::test]
async fn profile_patch_keeps_absent_fields() {
    let w = world().await;
    let updated = w
        .svc
        .update_clinic_profile(
            &w.admin_a.ctx,
            ClinicPatch {
                name: Some("Smile Tirana Dental".to_owned()),
                default_currency: Some("usd".to_owned()),
                ..ClinicPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Smile Tirana Dental");
    assert_eq!(updated.default_currency, "USD");
    assert_eq!(updated.timezone, w.clinic_a.timezone);
    assert_eq!(updated.slug, w.clinic_a.slug);

    let other = w.svc.clinic_profile(&w.admin_b.ctx).await.unwrap();
    assert_eq!(other.name, "Dent Roma");

    assert!(matches!(
        w.svc.update_clinic_profile(&w.agent_a.ctx, ClinicPatch::default()).await,
        Err(DomainError::Forbidden(_))
    ));
    let audit = w.svc.audit_log(&w.admin_a.ctx).await.unwrap();
    assert_eq!(audit[0].action, activity::SETTINGS_CLINIC_UPDATED);
}

#[tokio::test]
async fn stages_append_in_order() {
    let w = world().await;
    let first = w
        .svc
        .add_pipeline_stage(
            &w.admin_a.ctx,
            NewStage {
                name: "Consultation".to_owned(),
                stage_key: " Consult ".to_owned(),
            },
        )
        .await
        .unwrap();
    let second = w
        .svc
        .add_pipeline_stage(
            &w.admin_a.ctx,
            NewStage {
                name: "Travel booked".to_owned(),
                stage_key: "travel".to_owned(),
            },
        )
        .await
        .unwrap();
    assert_eq!(first.stage_key, "consult");
    assert_eq!((first.sort_order, second.sort_order), (1, 2));

    let dup = w
        .svc
        .add_pipeline_stage(
            &w.admin_a.ctx,
            NewStage {
                name: "Again".to_owned(),
                stage_key: "CONSULT".to_owned(),
            },
        )
        .await;
    assert!(matches!(dup, Err(DomainError::Conflict(_))));

    let keys: Vec<String> = w
        .svc
        .pipeline_stages(&w.admin_a.ctx)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.stage_key)
        .collect();
    assert_eq!(keys, vec!["consult", "travel"]);
    assert!(w.svc.pipeline_stages(&w.admin_b.ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn google_ads_export_only_has_clicked_leads() {
    let w = world().await;
    let clicked = w
        .svc
        .submit_public_lead(
            IntakeMeta {
                api_key: Some(w.svc.config().lead_api_key.clone()),
                ..IntakeMeta::default()
            },
            PublicLead {
                clinic_slug: Some("smile-tirana".to_owned()),
                gclid: Some("gc-9".to_owned()),
                ..PublicLead::default()
            },
        )
        .await
        .unwrap();
    let organic = w.svc.create_lead(&w.admin_a.ctx, new_lead("Marco")).await.unwrap();
    for id in [clicked.id, organic.id] {
        w.svc
            .change_lead_status(&w.admin_a.ctx, id, LeadStatus::Completed)
            .await
            .unwrap();
    }

    assert_eq!(w.svc.conversions(&w.admin_a.ctx).await.unwrap().len(), 2);
    let rows = w.svc.google_ads_export(&w.admin_a.ctx).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].gclid, "gc-9");
    assert_eq!(rows[0].order_id, clicked.id);
    assert_eq!(rows[0].conversion_name, "Completed");

    assert!(matches!(
        w.svc.google_ads_export(&w.agent_a.ctx).await,
        Err(DomainError::Forbidden(_))
    ));
}

#[tokio::test]
async fn gdpr_export_then_anonymize() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    let patient = w.svc.convert_lead(&w.agent_a.ctx, lead.id).await.unwrap().patient;

    let export = w.svc.gdpr_export(&w.admin_a.ctx, patient.id).await.unwrap();
    assert_eq!(export.name, "Giulia Rossi");
    assert_eq!(export.email.as_deref(), Some("giulia@mail.test"));
    assert_eq!(export.lead_source.as_deref(), Some("website_form"));
    assert_eq!(export.lead_status, Some(LeadStatus::Qualified));

    let wiped = w.svc.gdpr_anonymize(&w.admin_a.ctx, patient.id).await.unwrap();
    assert_eq!(wiped.first_name, "Anonymized");
    assert_eq!(wiped.last_name, format!("Patient-{}", patient.id));
    assert_eq!(wiped.email, None);
    assert_eq!(wiped.phone, None);

    let consents = consent_event::Entity::find()
        .secure()
        .scope_with(&AccessScope::clinic(w.clinic_a.id), Visibility::Live)
        .all(w.db())
        .await
        .unwrap();
    assert_eq!(consents.len(), 1);
    assert_eq!(consents[0].consent_type, "gdpr_anonymize");
    assert!(!consents[0].granted);

    assert!(matches!(
        w.svc.gdpr_export(&w.admin_b.ctx, patient.id).await,
        Err(DomainError::NotFound)
    ));
    assert!(matches!(
        w.svc.gdpr_anonymize(&w.agent_a.ctx, patient.id).await,
        Err(DomainError::Forbidden(_))
    ));
}

fn user(email: &str, role: &str) -> NewUser {
    NewUser {
        full_name: "Sara Neri".to_owned(),
        email: email.to_owned(),
        role: role.to_owned(),
    }
}

#[tokio::test]
async fn emails_are_unique_per_clinic() {
    let w = world().await;
    let created = w
        .svc
        .create_user(&w.admin_a.ctx, user(" Sara@Smile.test ", "agent"))
        .await
        .unwrap();
    assert_eq!(created.email, "sara@smile.test");
    assert_eq!(created.role, "agent");
    assert!(created.is_active);

    assert!(matches!(
        w.svc.create_user(&w.admin_a.ctx, user("sara@smile.test", "doctor")).await,
        Err(DomainError::Conflict(_))
    ));
    assert!(w.svc.create_user(&w.admin_b.ctx, user("sara@smile.test", "doctor")).await.is_ok());

    assert!(matches!(
        w.svc.create_user(&w.admin_a.ctx, user("new@smile.test", "janitor")).await,
        Err(DomainError::Validation { ref field, .. }) if field == "role"
    ));
    assert!(matches!(
        w.svc.create_user(&w.agent_a.ctx, user("x@smile.test", "agent")).await,
        Err(DomainError::Forbidden(_))
    ));
}

#[tokio::test]
async fn toggle_and_role_change() {
    let w = world().await;
    assert!(matches!(
        w.svc.toggle_user(&w.admin_a.ctx, w.admin_a.user.id).await,
        Err(DomainError::BadRequest(_))
    ));

    let off = w.svc.toggle_user(&w.admin_a.ctx, w.agent_a.user.id).await.unwrap();
    assert!(!off.is_active);
    let on = w.svc.toggle_user(&w.admin_a.ctx, w.agent_a.user.id).await.unwrap();
    assert!(on.is_active);

    let promoted = w
        .svc
        .update_user_role(&w.admin_a.ctx, w.agent_a.user.id, "finance")
        .await
        .unwrap();
    assert_eq!(promoted.role, "finance");

    assert!(matches!(
        w.svc.toggle_user(&w.admin_b.ctx, w.agent_a.user.id).await,
        Err(DomainError::NotFound)
    ));
    let actions: Vec<String> = w
        .svc
        .audit_log(&w.admin_a.ctx)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.action)
        .collect();
    assert!(actions.iter().any(|a| a == activity::USERS_TOGGLE));
    assert!(actions.iter().any(|a| a == activity::USERS_ROLE_UPDATE));
    assert_eq!(w.svc.list_users(&w.admin_a.ctx).await.unwrap().len(), 4);
}

#[tokio::test]
async fn staff_actor_resolves_active_members_only() {
    let w = world().await;
    let actor = w.svc.staff_actor("smile-tirana", " Agent@Smile.test ").await.unwrap();
    assert_eq!(actor.id, w.agent_a.user.id);
    assert_eq!(actor.clinic_id, w.clinic_a.id);

    assert!(matches!(
        w.svc.staff_actor("dent-roma", "agent@smile.test").await,
        Err(DomainError::NotFound)
    ));
    assert!(matches!(
        w.svc.staff_actor("nowhere", "agent@smile.test").await,
        Err(DomainError::NotFound)
    ));

    w.svc.toggle_user(&w.admin_a.ctx, w.agent_a.user.id).await.unwrap();
    assert!(matches!(
        w.svc.staff_actor("smile-tirana", "agent@smile.test").await,
        Err(DomainError::Forbidden(_))
    ));
}
