//! Read-only aggregates over the caller's clinic.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use clinic_db::secure::{TenantGuard, Visibility};
use clinic_security::{Permission, SecurityContext};
use rust_decimal::Decimal;
use sea_orm::ColumnTrait;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{Service, checked_sum, require};
use crate::domain::error::DomainError;
use crate::domain::model::{CallStatus, Direction, LeadStatus, PaymentStatus, QuoteStatus};
use crate::infra::storage::entities::{call, clinic, lead, message, payment, quote};

const ACTIVE_STATUSES: [LeadStatus; 5] = [
    LeadStatus::New,
    LeadStatus::Contacted,
    LeadStatus::Qualified,
    LeadStatus::Quoted,
    LeadStatus::Accepted,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Funnel {
    pub new: u64,
    pub quoted: u64,
    pub accepted: u64,
    pub completed: u64,
}

/// Home screen KPIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub new_leads_7d: u64,
    pub active_leads: u64,
    pub quotes_sent: u64,
    pub due_followups: u64,
    pub revenue_this_month: Decimal,
    pub outstanding_balance: Decimal,
    pub calls_today: u64,
    /// Percent of today's calls that completed, two decimals.
    pub answer_rate: Decimal,
    /// Seconds, over today's calls that reported a duration.
    pub avg_duration: Decimal,
    pub messages_today: u64,
    pub funnel: Funnel,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reports {
    /// Most frequent source first.
    pub leads_by_source: Vec<SourceCount>,
    pub total_leads: u64,
    pub won_leads: u64,
    pub conversion_rate: Decimal,
    /// Newest month first.
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

fn midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn start_of_month(at: DateTime<Utc>) -> DateTime<Utc> {
    let today = at.date_naive();
    let first = today - Duration::days(i64::from(today.day0()));
    first.and_time(NaiveTime::MIN).and_utc()
}

/// `part / whole * 100` to two decimals; zero when `whole` is zero.
fn percent(part: u64, whole: u64) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)).round_dp(2)
}

fn too_large() -> DomainError {
    DomainError::validation("amount", "total too large")
}

impl Service {
    /// KPIs for any signed-in member of the clinic.
    #[instrument(skip(self, ctx))]
    pub async fn dashboard(&self, ctx: &SecurityContext) -> Result<Dashboard, DomainError> {
        let actor = ctx.require_actor()?;
        let guard = TenantGuard::new(ctx);
        let now = Utc::now();
        let today = now.date_naive();
        let today_start = midnight(now);

        let leads = || guard.scoped_collection::<lead::Entity>(Visibility::Live);
        let new_leads_7d = leads()?
            .filter(lead::Column::CreatedAt.gte(now - Duration::days(7)))
            .count(&self.db)
            .await?;
        let active_leads = leads()?
            .filter(lead::Column::Status.is_in(ACTIVE_STATUSES))
            .count(&self.db)
            .await?;
        let due_followups = leads()?
            .filter(lead::Column::NextActionDate.is_not_null())
            .filter(lead::Column::NextActionDate.lte(today))
            .filter(lead::Column::Status.is_not_in([LeadStatus::Lost, LeadStatus::Completed]))
            .count(&self.db)
            .await?;
        let by_status = |status: LeadStatus| {
            let query = leads().map(|q| q.filter(lead::Column::Status.eq(status)));
            async move { Ok::<_, DomainError>(query?.count(&self.db).await?) }
        };
        let funnel = Funnel {
            new: by_status(LeadStatus::New).await?,
            quoted: by_status(LeadStatus::Quoted).await?,
            accepted: by_status(LeadStatus::Accepted).await?,
            completed: by_status(LeadStatus::Completed).await?,
        };

        let quotes_sent = guard
            .scoped_collection::<quote::Entity>(Visibility::Live)?
            .filter(quote::Column::Status.eq(QuoteStatus::Sent))
            .count(&self.db)
            .await?;

        let payments = guard
            .scoped_collection::<payment::Entity>(Visibility::Live)?
            .filter(payment::Column::Status.is_in([PaymentStatus::Paid, PaymentStatus::Pending]))
            .all(&self.db)
            .await?;
        let month_start = start_of_month(now);
        let revenue_this_month = checked_sum(
            payments
                .iter()
                .filter(|p| p.status == PaymentStatus::Paid && p.paid_at.is_some_and(|at| at >= month_start))
                .map(|p| p.amount),
        )
        .ok_or_else(too_large)?;
        let outstanding_balance = checked_sum(
            payments
                .iter()
                .filter(|p| p.status == PaymentStatus::Pending)
                .map(|p| p.amount),
        )
        .ok_or_else(too_large)?;

        let calls = guard
            .scoped_collection::<call::Entity>(Visibility::Live)?
            .filter(call::Column::CreatedAt.gte(today_start))
            .all(&self.db)
            .await?;
        let calls_today = calls.len() as u64;
        let answered = calls.iter().filter(|c| c.status == CallStatus::Completed).count() as u64;
        let durations: Vec<i64> = calls.iter().filter_map(|c| c.duration_seconds).map(i64::from).collect();
        let avg_duration = if durations.is_empty() {
            Decimal::ZERO
        } else {
            (Decimal::from(durations.iter().sum::<i64>()) / Decimal::from(durations.len() as u64)).round_dp(2)
        };

        let messages_today = guard
            .scoped_collection::<message::Entity>(Visibility::Live)?
            .filter(message::Column::CreatedAt.gte(today_start))
            .filter(message::Column::Direction.eq(Direction::Outbound))
            .count(&self.db)
            .await?;

        let currency = guard
            .get_by_id_or_not_found::<clinic::Entity, _>(&self.db, actor.clinic_id, Visibility::Live)
            .await?
            .default_currency;

        debug!(new_leads_7d, active_leads, calls_today, "dashboard computed");
        Ok(Dashboard {
            new_leads_7d,
            active_leads,
            quotes_sent,
            due_followups,
            revenue_this_month,
            outstanding_balance,
            calls_today,
            answer_rate: percent(answered, calls_today),
            avg_duration,
            messages_today,
            funnel,
            currency,
        })
    }

    /// Lead sources, win rate and paid revenue per month.
    #[instrument(skip(self, ctx))]
    pub async fn reports(&self, ctx: &SecurityContext) -> Result<Reports, DomainError> {
        require(ctx, Permission::ReportsView)?;
        let guard = TenantGuard::new(ctx);

        let leads = guard
            .scoped_collection::<lead::Entity>(Visibility::Live)?
            .all(&self.db)
            .await?;
        let mut sources: BTreeMap<&str, u64> = BTreeMap::new();
        for lead in &leads {
            *sources.entry(lead.source.as_str()).or_default() += 1;
        }
        let mut leads_by_source: Vec<SourceCount> = sources
            .into_iter()
            .map(|(source, count)| SourceCount {
                source: source.to_owned(),
                count,
            })
            .collect();
        leads_by_source.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));

        let total_leads = leads.len() as u64;
        let won_leads = leads
            .iter()
            .filter(|l| matches!(l.status, LeadStatus::Accepted | LeadStatus::Completed))
            .count() as u64;

        let paid = guard
            .scoped_collection::<payment::Entity>(Visibility::Live)?
            .filter(payment::Column::Status.eq(PaymentStatus::Paid))
            .filter(payment::Column::PaidAt.is_not_null())
            .all(&self.db)
            .await?;
        let mut months: BTreeMap<String, Decimal> = BTreeMap::new();
        for payment in &paid {
            if let Some(at) = payment.paid_at {
                let slot = months.entry(at.format("%Y-%m").to_string()).or_default();
                *slot = slot.checked_add(payment.amount).ok_or_else(too_large)?;
            }
        }
        let monthly_revenue = months
            .into_iter()
            .rev()
            .map(|(month, revenue)| MonthlyRevenue { month, revenue })
            .collect();

        Ok(Reports {
            leads_by_source,
            total_leads,
            won_leads,
            conversion_rate: percent(won_leads, total_leads),
            monthly_revenue,
        })
    }
}
