#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, Utc};
use clinic_security::SecurityContext;
use uuid::Uuid;

use super::tests_support::{new_lead, world};
use super::LeadFilter;
use crate::domain::activity;
use crate::domain::error::DomainError;
use crate::domain::model::LeadStatus;

#[tokio::test]
async fn agent_owns_the_lead_they_create() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();

    assert_eq!(lead.clinic_id, w.clinic_a.id);
    assert_eq!(lead.assigned_agent_id, Some(w.agent_a.user.id));
    assert_eq!(lead.status, LeadStatus::New);
    assert_eq!(lead.stage_key, "new");
    assert_eq!(lead.source, "website_form");

    let log = w.svc.lead_activities(&w.agent_a.ctx, lead.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, activity::LEAD_CREATED);
    assert_eq!(log[0].user_id, Some(w.agent_a.user.id));
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let w = world().await;
    let mut input = new_lead("Giulia");
    input.first_name = "   ".to_owned();
    let err = w.svc.create_lead(&w.agent_a.ctx, input).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "first_name"));
}

#[tokio::test]
async fn other_clinic_cannot_see_the_lead() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();

    let err = w.svc.get_lead(&w.admin_b.ctx, lead.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound));
    let missing = w.svc.get_lead(&w.admin_b.ctx, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(missing, DomainError::NotFound));

    assert!(w.svc.list_leads(&w.admin_b.ctx, &LeadFilter::default()).await.unwrap().is_empty());
    assert!(matches!(
        w.svc.change_lead_status(&w.admin_b.ctx, lead.id, LeadStatus::Lost).await,
        Err(DomainError::NotFound)
    ));
}

#[tokio::test]
async fn anonymous_is_rejected_before_permissions() {
    let w = world().await;
    let err = w
        .svc
        .list_leads(&SecurityContext::anonymous(), &LeadFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthenticated));

    let err = w.svc.list_leads(&w.finance_a.ctx, &LeadFilter::default()).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
}

#[tokio::test]
async fn search_matches_any_contact_field_case_insensitively() {
    let w = world().await;
    w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    let marco = w.svc.create_lead(&w.agent_a.ctx, new_lead("Marco")).await.unwrap();
    w.svc
        .change_lead_status(&w.agent_a.ctx, marco.id, LeadStatus::Contacted)
        .await
        .unwrap();

    let by_name = LeadFilter {
        q: Some("GIUL".to_owned()),
        status: None,
    };
    let found = w.svc.list_leads(&w.agent_a.ctx, &by_name).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].first_name, "Giulia");

    let by_email = LeadFilter {
        q: Some("marco@mail".to_owned()),
        status: None,
    };
    assert_eq!(w.svc.list_leads(&w.agent_a.ctx, &by_email).await.unwrap().len(), 1);

    let by_status = LeadFilter {
        q: None,
        status: Some(LeadStatus::Contacted),
    };
    let contacted = w.svc.list_leads(&w.agent_a.ctx, &by_status).await.unwrap();
    assert_eq!(contacted.iter().map(|l| l.id).collect::<Vec<_>>(), vec![marco.id]);
}

#[tokio::test]
async fn status_change_mirrors_stage_and_records_conversion_once() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.admin_a.ctx, new_lead("Giulia")).await.unwrap();

    let accepted = w
        .svc
        .change_lead_status(&w.admin_a.ctx, lead.id, LeadStatus::Accepted)
        .await
        .unwrap();
    assert_eq!(accepted.stage_key, "accepted");
    w.svc
        .change_lead_status(&w.admin_a.ctx, lead.id, LeadStatus::Accepted)
        .await
        .unwrap();

    let conversions = w.svc.conversions(&w.admin_a.ctx).await.unwrap();
    assert_eq!(conversions.len(), 1);
    assert_eq!(conversions[0].conversion_name, "Quote Accepted");
    assert_eq!(conversions[0].currency, "EUR");

    w.svc
        .change_lead_status(&w.admin_a.ctx, lead.id, LeadStatus::Completed)
        .await
        .unwrap();
    assert_eq!(w.svc.conversions(&w.admin_a.ctx).await.unwrap().len(), 2);

    let statuses = w
        .svc
        .lead_activities(&w.admin_a.ctx, lead.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.action == activity::LEAD_STATUS)
        .count();
    assert_eq!(statuses, 3);
}

#[tokio::test]
async fn note_is_an_activity_row() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    let note = w
        .svc
        .add_lead_note(&w.agent_a.ctx, lead.id, "  Wants implants in May ")
        .await
        .unwrap();
    assert_eq!(note.action, activity::LEAD_NOTE);
    assert_eq!(note.details.as_deref(), Some("Wants implants in May"));

    assert!(matches!(
        w.svc.add_lead_note(&w.agent_a.ctx, lead.id, " ").await,
        Err(DomainError::Validation { .. })
    ));
}

#[tokio::test]
async fn followups_split_due_and_upcoming() {
    let w = world().await;
    let today = Utc::now().date_naive();
    let overdue = w.svc.create_lead(&w.agent_a.ctx, new_lead("Anna")).await.unwrap();
    let later = w.svc.create_lead(&w.agent_a.ctx, new_lead("Bruno")).await.unwrap();
    let lost = w.svc.create_lead(&w.agent_a.ctx, new_lead("Carla")).await.unwrap();

    w.svc
        .set_lead_followup(&w.agent_a.ctx, overdue.id, today - Duration::days(2))
        .await
        .unwrap();
    w.svc
        .set_lead_followup(&w.agent_a.ctx, later.id, today + Duration::days(3))
        .await
        .unwrap();
    w.svc.set_lead_followup(&w.agent_a.ctx, lost.id, today).await.unwrap();
    w.svc
        .change_lead_status(&w.agent_a.ctx, lost.id, LeadStatus::Lost)
        .await
        .unwrap();

    let followups = w.svc.lead_followups(&w.agent_a.ctx).await.unwrap();
    assert_eq!(followups.today, today);
    assert_eq!(followups.due.iter().map(|l| l.id).collect::<Vec<_>>(), vec![overdue.id]);
    assert_eq!(followups.upcoming.iter().map(|l| l.id).collect::<Vec<_>>(), vec![later.id]);
}

#[tokio::test]
async fn deleted_lead_disappears() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    w.svc.delete_lead(&w.agent_a.ctx, lead.id).await.unwrap();

    assert!(matches!(w.svc.get_lead(&w.agent_a.ctx, lead.id).await, Err(DomainError::NotFound)));
    assert!(w.svc.list_leads(&w.agent_a.ctx, &LeadFilter::default()).await.unwrap().is_empty());
    assert!(matches!(w.svc.delete_lead(&w.agent_a.ctx, lead.id).await, Err(DomainError::NotFound)));

    let audit = w.svc.audit_log(&w.admin_a.ctx).await.unwrap();
    assert!(audit.iter().any(|a| a.action == activity::LEAD_SOFT_DELETE && a.lead_id == Some(lead.id)));
}

#[tokio::test]
async fn templates_are_personalised() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    let templates = w.svc.lead_templates(&w.agent_a.ctx, lead.id).await.unwrap();

    assert_eq!(
        templates.iter().map(|t| t.key).collect::<Vec<_>>(),
        vec!["new", "contacted", "quoted", "appointment_reminder"]
    );
    assert!(templates[0].text.contains("Giulia"));
    assert!(templates[0].text.contains("Smile Tirana"));
}

#[tokio::test]
async fn converting_twice_returns_the_same_patient() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();

    let first = w.svc.convert_lead(&w.agent_a.ctx, lead.id).await.unwrap();
    assert!(first.created);
    assert_eq!(first.patient.first_name, "Giulia");
    assert_eq!(first.patient.lead_id, Some(lead.id));

    let lead = w.svc.get_lead(&w.agent_a.ctx, lead.id).await.unwrap();
    assert!(lead.converted_to_patient);
    assert_eq!(lead.status, LeadStatus::Qualified);

    let second = w.svc.convert_lead(&w.agent_a.ctx, lead.id).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.patient.id, first.patient.id);
    assert_eq!(w.svc.list_patients(&w.agent_a.ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn doctors_only_reach_their_patients() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    let patient = w.svc.convert_lead(&w.agent_a.ctx, lead.id).await.unwrap().patient;

    assert!(w.svc.list_patients(&w.doctor_a.ctx).await.unwrap().is_empty());

    let err = w
        .svc
        .assign_doctor(&w.agent_a.ctx, patient.id, Some(w.agent_a.user.id))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));

    w.svc
        .assign_doctor(&w.agent_a.ctx, patient.id, Some(w.doctor_a.user.id))
        .await
        .unwrap();
    let mine = w.svc.list_patients(&w.doctor_a.ctx).await.unwrap();
    assert_eq!(mine.len(), 1);

    let updated = w
        .svc
        .update_clinical_notes(&w.doctor_a.ctx, patient.id, "Bone graft needed")
        .await
        .unwrap();
    assert_eq!(updated.clinical_notes.as_deref(), Some("Bone graft needed"));

    let err = w
        .svc
        .update_clinical_notes(&w.agent_a.ctx, patient.id, "x")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
}

#[tokio::test]
async fn doctor_of_another_clinic_cannot_be_assigned() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    let patient = w.svc.convert_lead(&w.agent_a.ctx, lead.id).await.unwrap().patient;

    let err = w
        .svc
        .assign_doctor(&w.admin_a.ctx, patient.id, Some(w.admin_b.user.id))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
    assert!(matches!(
        w.svc.get_patient(&w.admin_b.ctx, patient.id).await,
        Err(DomainError::NotFound)
    ));
}
