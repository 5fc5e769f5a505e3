use chrono::{NaiveDate, Utc};
use clinic_db::secure::{TenantGuard, Visibility};
use clinic_security::{Permission, SecurityContext};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Service, checked_sum, require};
use crate::domain::activity::{self, Activity};
use crate::domain::error::DomainError;
use crate::domain::model::{PaymentMethod, PaymentStatus, QuoteStatus};
use crate::infra::storage::entities::{payment, quote};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub quote_id: Uuid,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentsOverview {
    pub payments: Vec<payment::Model>,
    /// Sum of all pending amounts, whatever their currency.
    pub outstanding: Decimal,
}

impl Service {
    pub async fn list_payments(&self, ctx: &SecurityContext) -> Result<PaymentsOverview, DomainError> {
        require(ctx, Permission::PaymentsManage)?;
        let payments = TenantGuard::new(ctx)
            .scoped_collection::<payment::Entity>(Visibility::Live)?
            .order_by_desc(payment::Column::CreatedAt)
            .all(&self.db)
            .await?;
        let outstanding = checked_sum(
            payments
                .iter()
                .filter(|p| p.status == PaymentStatus::Pending)
                .map(|p| p.amount),
        )
        .ok_or_else(|| DomainError::validation("amount", "outstanding balance too large"))?;
        Ok(PaymentsOverview { payments, outstanding })
    }

    /// Record a pending payment against a sent or accepted quote.
    #[instrument(skip(self, ctx, input), fields(quote_id = %input.quote_id))]
    pub async fn record_payment(&self, ctx: &SecurityContext, input: NewPayment) -> Result<payment::Model, DomainError> {
        let actor = require(ctx, Permission::PaymentsManage)?;
        if input.amount <= Decimal::ZERO {
            return Err(DomainError::validation("amount", "must be positive"));
        }

        let txn = self.db.begin().await?;
        let quote = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<quote::Entity, _>(&txn, input.quote_id, Visibility::Live)
            .await?;
        if !matches!(quote.status, QuoteStatus::Sent | QuoteStatus::Accepted) {
            return Err(DomainError::validation("quote_id", "quote must be sent or accepted"));
        }

        let now = Utc::now();
        let currency = input
            .currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| quote.currency.clone());
        let payment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            quote_id: Set(quote.id),
            patient_id: Set(quote.patient_id),
            amount: Set(input.amount.round_dp(2)),
            currency: Set(currency),
            method: Set(input.method),
            status: Set(PaymentStatus::Pending),
            due_date: Set(input.due_date),
            paid_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut entry = Activity::new(actor.clinic_id, activity::PAYMENT_RECORDED)
            .by(actor.id)
            .quote(quote.id)
            .payment(payment.id)
            .details(format!("Payment {} recorded", payment.id));
        if let Some(lead_id) = quote.lead_id {
            entry = entry.lead(lead_id);
        }
        entry.insert(&txn).await?;
        txn.commit().await?;

        info!(payment_id = %payment.id, amount = %payment.amount, "payment recorded");
        Ok(payment)
    }

    #[instrument(skip(self, ctx))]
    pub async fn mark_payment_paid(&self, ctx: &SecurityContext, id: Uuid) -> Result<payment::Model, DomainError> {
        let actor = require(ctx, Permission::PaymentsManage)?;

        let txn = self.db.begin().await?;
        let payment = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<payment::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        let mut am: payment::ActiveModel = payment.into();
        am.status = Set(PaymentStatus::Paid);
        am.paid_at = Set(Some(Utc::now()));
        am.updated_at = Set(Utc::now());
        let payment = am.update(&txn).await?;

        Activity::new(actor.clinic_id, activity::PAYMENT_PAID)
            .by(actor.id)
            .quote(payment.quote_id)
            .payment(payment.id)
            .details(format!("Payment {} marked paid", payment.id))
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(payment)
    }
}
