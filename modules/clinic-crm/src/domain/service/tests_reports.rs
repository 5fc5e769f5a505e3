#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::str::FromStr;

use chrono::{Duration, Utc};
use clinic_security::SecurityContext;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use super::tests_support::{World, insert_lead_at, new_lead, world};
use super::{NewLead, NewPayment, NewQuote};
use crate::domain::error::DomainError;
use crate::domain::model::{CallStatus, Direction, LeadStatus, PaymentMethod, PaymentStatus};
use crate::infra::storage::entities::{call, payment};

fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap()
}

async fn insert_call(w: &World, status: CallStatus, duration_seconds: Option<i32>, age: Duration) {
    let at = Utc::now() - age;
    call::ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(w.clinic_a.id),
        lead_id: Set(None),
        patient_id: Set(None),
        direction: Set(Direction::Outbound),
        from_number: Set("+355400000".to_owned()),
        to_number: Set("+390600000".to_owned()),
        started_at: Set(Some(at)),
        ended_at: Set(None),
        duration_seconds: Set(duration_seconds),
        status: Set(status),
        recording_url: Set(None),
        provider_call_id: Set(None),
        created_at: Set(at),
        updated_at: Set(at),
        deleted_at: Set(None),
        deleted_by: Set(None),
    }
    .insert(w.db())
    .await
    .unwrap();
}

/// Clinic A gets five leads, a sent quote with one paid and one pending
/// payment, an old paid payment and a handful of calls.
async fn busy_clinic(w: &World) {
    let today = Utc::now().date_naive();
    let agent = &w.agent_a.ctx;

    let mut anna = new_lead("Anna");
    anna.next_action_date = Some(today);
    w.svc.create_lead(agent, anna).await.unwrap();

    let bruno = w
        .svc
        .create_lead(
            agent,
            NewLead {
                source: Some("google_ads".to_owned()),
                ..new_lead("Bruno")
            },
        )
        .await
        .unwrap();
    w.svc
        .create_lead(
            agent,
            NewLead {
                status: Some(LeadStatus::Completed),
                ..new_lead("Carla")
            },
        )
        .await
        .unwrap();
    w.svc
        .create_lead(
            agent,
            NewLead {
                status: Some(LeadStatus::Lost),
                next_action_date: Some(today - Duration::days(1)),
                ..new_lead("Dora")
            },
        )
        .await
        .unwrap();
    insert_lead_at(w.db(), w.clinic_a.id, "Elena", Utc::now() - Duration::days(10)).await;

    let quote = w
        .svc
        .create_quote(
            agent,
            NewQuote {
                lead_id: bruno.id,
                currency: "EUR".to_owned(),
                item_label: "Crown".to_owned(),
                quantity: Decimal::ONE,
                unit_price: dec("500"),
                notes: None,
            },
        )
        .await
        .unwrap();
    w.svc.send_quote(agent, quote.id).await.unwrap();

    let mut ids = Vec::new();
    for amount in ["100", "40"] {
        let payment = w
            .svc
            .record_payment(
                &w.finance_a.ctx,
                NewPayment {
                    quote_id: quote.id,
                    amount: dec(amount),
                    currency: None,
                    method: PaymentMethod::Card,
                    due_date: None,
                },
            )
            .await
            .unwrap();
        ids.push(payment.id);
    }
    w.svc.mark_payment_paid(&w.finance_a.ctx, ids[0]).await.unwrap();

    let long_ago = "2025-01-15T10:00:00Z".parse().unwrap();
    payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(w.clinic_a.id),
        quote_id: Set(quote.id),
        patient_id: Set(None),
        amount: Set(dec("25")),
        currency: Set("EUR".to_owned()),
        method: Set(PaymentMethod::Cash),
        status: Set(PaymentStatus::Paid),
        due_date: Set(None),
        paid_at: Set(Some(long_ago)),
        created_at: Set(long_ago),
        updated_at: Set(long_ago),
    }
    .insert(w.db())
    .await
    .unwrap();

    insert_call(w, CallStatus::Completed, Some(60), Duration::zero()).await;
    insert_call(w, CallStatus::Completed, Some(91), Duration::zero()).await;
    insert_call(w, CallStatus::Missed, None, Duration::zero()).await;
    insert_call(w, CallStatus::Completed, Some(600), Duration::days(2)).await;
}

#[tokio::test]
async fn dashboard_counts_only_the_callers_clinic() {
    let w = world().await;
    busy_clinic(&w).await;

    let kpis = w.svc.dashboard(&w.doctor_a.ctx).await.unwrap();
    assert_eq!(kpis.new_leads_7d, 4);
    assert_eq!(kpis.active_leads, 3);
    assert_eq!(kpis.quotes_sent, 1);
    assert_eq!(kpis.due_followups, 1);
    assert_eq!(kpis.revenue_this_month, dec("100.00"));
    assert_eq!(kpis.outstanding_balance, dec("40.00"));
    assert_eq!(kpis.calls_today, 3);
    assert_eq!(kpis.answer_rate, dec("66.67"));
    assert_eq!(kpis.avg_duration, dec("75.5"));
    assert_eq!(kpis.messages_today, 0);
    assert_eq!((kpis.funnel.new, kpis.funnel.quoted), (2, 1));
    assert_eq!((kpis.funnel.accepted, kpis.funnel.completed), (0, 1));
    assert_eq!(kpis.currency, "EUR");

    let other = w.svc.dashboard(&w.admin_b.ctx).await.unwrap();
    assert_eq!(other.new_leads_7d, 0);
    assert_eq!(other.active_leads, 0);
    assert_eq!(other.quotes_sent, 0);
    assert_eq!(other.revenue_this_month, Decimal::ZERO);
    assert_eq!(other.outstanding_balance, Decimal::ZERO);
    assert_eq!(other.calls_today, 0);
    assert_eq!(other.answer_rate, Decimal::ZERO);
    assert_eq!(other.avg_duration, Decimal::ZERO);
}

#[tokio::test]
async fn reports_group_sources_and_months() {
    let w = world().await;
    busy_clinic(&w).await;

    let report = w.svc.reports(&w.finance_a.ctx).await.unwrap();
    assert_eq!(report.total_leads, 5);
    assert_eq!(report.won_leads, 1);
    assert_eq!(report.conversion_rate, dec("20.00"));
    let sources: Vec<_> = report
        .leads_by_source
        .iter()
        .map(|s| (s.source.as_str(), s.count))
        .collect();
    assert_eq!(sources, [("website_form", 4), ("google_ads", 1)]);

    let this_month = Utc::now().format("%Y-%m").to_string();
    let months: Vec<_> = report
        .monthly_revenue
        .iter()
        .map(|m| (m.month.as_str(), m.revenue))
        .collect();
    assert_eq!(months, [(this_month.as_str(), dec("100")), ("2025-01", dec("25"))]);

    let other = w.svc.reports(&w.admin_b.ctx).await.unwrap();
    assert_eq!(other.total_leads, 0);
    assert_eq!(other.conversion_rate, Decimal::ZERO);
    assert!(other.leads_by_source.is_empty());
    assert!(other.monthly_revenue.is_empty());
}

#[tokio::test]
async fn reports_need_the_reports_permission() {
    let w = world().await;

    assert!(matches!(
        w.svc.reports(&w.doctor_a.ctx).await,
        Err(DomainError::Forbidden(_))
    ));
    assert!(matches!(
        w.svc.reports(&SecurityContext::anonymous()).await,
        Err(DomainError::Unauthenticated)
    ));
    assert!(matches!(
        w.svc.dashboard(&SecurityContext::anonymous()).await,
        Err(DomainError::Unauthenticated)
    ));
}
