#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, Duration, Utc};
use clinic_security::Role;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use super::tests_support::{base_time, insert_lead_at, insert_staff, new_lead, world};
use super::{AssignOutcome, Disposition, NewCall, NewMessage};
use crate::domain::activity;
use crate::domain::error::DomainError;
use crate::domain::model::{AssignmentMode, CallOutcome, CallStatus, Direction, LeadStatus};
use crate::infra::storage::entities::conversation;

async fn open_conversation(
    db: &DatabaseConnection,
    clinic_id: Uuid,
    lead_id: Option<Uuid>,
    last_message_at: Option<DateTime<Utc>>,
) -> conversation::Model {
    let now = Utc::now();
    conversation::ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(clinic_id),
        lead_id: Set(lead_id),
        patient_id: Set(None),
        channel: Set("whatsapp".to_owned()),
        external_id: Set(None),
        last_message_at: Set(last_message_at),
        status: Set("open".to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        deleted_by: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

#[tokio::test]
async fn inbox_puts_recent_first_and_silent_last() {
    let w = world().await;
    let t0 = base_time();
    let silent = open_conversation(w.db(), w.clinic_a.id, None, None).await;
    let older = open_conversation(w.db(), w.clinic_a.id, None, Some(t0)).await;
    let newer = open_conversation(w.db(), w.clinic_a.id, None, Some(t0 + Duration::minutes(5))).await;
    open_conversation(w.db(), w.clinic_b.id, None, Some(t0)).await;

    let inbox = w.svc.inbox(&w.agent_a.ctx).await.unwrap();
    assert_eq!(
        inbox.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![newer.id, older.id, silent.id]
    );
}

#[tokio::test]
async fn sending_stores_outbound_and_touches_conversation() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    let conv = open_conversation(w.db(), w.clinic_a.id, Some(lead.id), None).await;

    let message = w
        .svc
        .send_message(
            &w.agent_a.ctx,
            conv.id,
            NewMessage {
                body: "Ciao Giulia".to_owned(),
                to_number: Some("+390600000".to_owned()),
            },
        )
        .await
        .unwrap();
    assert_eq!(message.direction, Direction::Outbound);
    assert!(message.provider_message_id.as_deref().is_some_and(|id| id.starts_with("stub-msg-")));

    let thread = w.svc.thread(&w.agent_a.ctx, conv.id).await.unwrap();
    assert_eq!(thread.messages.len(), 1);
    assert!(thread.conversation.last_message_at.is_some());

    let log = w.svc.lead_activities(&w.agent_a.ctx, lead.id).await.unwrap();
    assert!(log.iter().any(|a| a.action == activity::MESSAGE_SENT));

    let err = w
        .svc
        .send_message(
            &w.admin_b.ctx,
            conv.id,
            NewMessage {
                body: "hi".to_owned(),
                to_number: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound));
}

#[tokio::test]
async fn disposition_moves_the_followup() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    let conv = open_conversation(w.db(), w.clinic_a.id, Some(lead.id), None).await;

    let call = w
        .svc
        .start_call(
            &w.agent_a.ctx,
            conv.id,
            NewCall {
                to_number: "+390600000".to_owned(),
            },
        )
        .await
        .unwrap();
    assert_eq!(call.status, CallStatus::Ringing);
    assert_eq!(call.from_number, w.svc.config().outbound_caller_id);
    assert_eq!(call.lead_id, Some(lead.id));

    let followup = Utc::now() + Duration::days(2);
    let disposition = w
        .svc
        .save_disposition(
            &w.agent_a.ctx,
            call.id,
            Disposition {
                outcome: CallOutcome::NoAnswer,
                notes: Some("voicemail".to_owned()),
                followup_at: Some(followup),
            },
        )
        .await
        .unwrap();
    assert_eq!(disposition.outcome, CallOutcome::NoAnswer);

    let lead = w.svc.get_lead(&w.agent_a.ctx, lead.id).await.unwrap();
    assert_eq!(lead.next_action_date, Some(followup.date_naive()));

    let thread = w.svc.thread(&w.agent_a.ctx, conv.id).await.unwrap();
    assert_eq!(thread.calls.len(), 1);
}

#[tokio::test]
async fn queue_lists_new_leads_and_due_followups() {
    let w = world().await;
    let fresh = w.svc.create_lead(&w.agent_a.ctx, new_lead("Anna")).await.unwrap();
    let due = w.svc.create_lead(&w.agent_a.ctx, new_lead("Bruno")).await.unwrap();
    w.svc
        .change_lead_status(&w.agent_a.ctx, due.id, LeadStatus::Contacted)
        .await
        .unwrap();
    w.svc
        .set_lead_followup(&w.agent_a.ctx, due.id, Utc::now().date_naive())
        .await
        .unwrap();

    let queue = w.svc.queue(&w.agent_a.ctx).await.unwrap();
    assert_eq!(queue.new_leads.iter().map(|l| l.id).collect::<Vec<_>>(), vec![fresh.id]);
    assert_eq!(queue.followups.iter().map(|l| l.id).collect::<Vec<_>>(), vec![due.id]);
    assert!(queue.missed_calls.is_empty());
}

#[tokio::test]
async fn round_robin_cycles_through_active_agents() {
    let w = world().await;
    let t0 = base_time();
    let second_agent = insert_staff(
        w.db(),
        w.clinic_a.id,
        Role::Agent,
        "agent2@smile.test",
        t0 + Duration::seconds(10),
    )
    .await;
    let leads = [
        insert_lead_at(w.db(), w.clinic_a.id, "Anna", t0 + Duration::minutes(1)).await,
        insert_lead_at(w.db(), w.clinic_a.id, "Bruno", t0 + Duration::minutes(2)).await,
        insert_lead_at(w.db(), w.clinic_a.id, "Carla", t0 + Duration::minutes(3)).await,
    ];

    let mut picks = Vec::new();
    for _ in 0..3 {
        match w.svc.assign_next(&w.admin_a.ctx).await.unwrap() {
            AssignOutcome::Assigned { lead, agent_id } => {
                assert_eq!(lead.assigned_agent_id, Some(agent_id));
                picks.push((lead.id, agent_id));
            }
            other => panic!("expected an assignment, got {other:?}"),
        }
    }
    assert_eq!(
        picks,
        vec![
            (leads[0].id, w.agent_a.user.id),
            (leads[1].id, second_agent.user.id),
            (leads[2].id, w.agent_a.user.id),
        ]
    );
    assert!(matches!(
        w.svc.assign_next(&w.admin_a.ctx).await.unwrap(),
        AssignOutcome::Nothing
    ));
}

#[tokio::test]
async fn manual_mode_leaves_the_lead_alone() {
    let w = world().await;
    let lead = insert_lead_at(w.db(), w.clinic_a.id, "Anna", base_time()).await;
    w.svc
        .set_assignment_mode(&w.admin_a.ctx, AssignmentMode::Manual)
        .await
        .unwrap();

    match w.svc.assign_next(&w.admin_a.ctx).await.unwrap() {
        AssignOutcome::Manual { lead: picked } => {
            assert_eq!(picked.id, lead.id);
            assert_eq!(picked.assigned_agent_id, None);
        }
        other => panic!("expected manual, got {other:?}"),
    }
    let log = w.svc.lead_activities(&w.admin_a.ctx, lead.id).await.unwrap();
    assert!(log.iter().any(|a| a.action == activity::QUEUE_ASSIGN_NEXT));
}

#[tokio::test]
async fn clinic_without_agents_assigns_nothing() {
    let w = world().await;
    insert_lead_at(w.db(), w.clinic_b.id, "Anna", base_time()).await;
    assert!(matches!(
        w.svc.assign_next(&w.admin_b.ctx).await.unwrap(),
        AssignOutcome::Nothing
    ));
}

#[tokio::test]
async fn timeline_merges_messages_calls_and_activity() {
    let w = world().await;
    let lead = w.svc.create_lead(&w.agent_a.ctx, new_lead("Giulia")).await.unwrap();
    let conv = open_conversation(w.db(), w.clinic_a.id, Some(lead.id), None).await;
    w.svc
        .send_message(
            &w.agent_a.ctx,
            conv.id,
            NewMessage {
                body: "Ciao".to_owned(),
                to_number: None,
            },
        )
        .await
        .unwrap();
    w.svc
        .start_call(
            &w.agent_a.ctx,
            conv.id,
            NewCall {
                to_number: "+390600000".to_owned(),
            },
        )
        .await
        .unwrap();

    let page = w.svc.lead_timeline(&w.agent_a.ctx, lead.id, 1).await.unwrap();
    assert_eq!(page.page, 1);
    assert!(!page.has_next);
    let kinds: Vec<&str> = page.items.iter().map(|i| i.kind).collect();
    assert!(kinds.contains(&"message"));
    assert!(kinds.contains(&"call"));
    assert!(kinds.contains(&"activity"));
    assert!(page.items.windows(2).all(|pair| pair[0].at >= pair[1].at));

    assert!(matches!(
        w.svc.lead_timeline(&w.admin_b.ctx, lead.id, 1).await,
        Err(DomainError::NotFound)
    ));
}
