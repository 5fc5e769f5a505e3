use chrono::Utc;
use clinic_db::secure::{TenantGuard, Visibility};
use clinic_security::{Permission, SecurityContext};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Service, conversion, leads::set_status, optional_text, require, required_text};
use crate::domain::activity::{self, Activity};
use crate::domain::error::DomainError;
use crate::domain::model::{CONVERSION_QUOTE_ACCEPTED, LeadStatus, QuoteStatus};
use crate::infra::storage::entities::{lead, patient, quote, treatment_plan};

const CURRENCIES: [&str; 2] = ["EUR", "USD"];

/// One treatment plan line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub label: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuote {
    pub lead_id: Uuid,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub item_label: String,
    #[serde(default = "one")]
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_currency() -> String {
    "EUR".to_owned()
}

fn one() -> Decimal {
    Decimal::ONE
}

/// Sum of `unit_price * quantity`, rounded half-to-even to cents.
/// `None` when the total does not fit in a `Decimal`.
#[must_use]
pub fn calculate_total(items: &[QuoteItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| {
            acc.checked_add(item.unit_price.checked_mul(item.quantity)?)
        })
        .map(|total| total.round_dp(2))
}

impl Service {
    pub async fn list_quotes(&self, ctx: &SecurityContext) -> Result<Vec<quote::Model>, DomainError> {
        require(ctx, Permission::QuotesManage)?;
        Ok(TenantGuard::new(ctx)
            .scoped_collection::<quote::Entity>(Visibility::Live)?
            .order_by_desc(quote::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Create a draft quote with a one-line treatment plan; the lead moves to quoted.
    #[instrument(skip(self, ctx, input), fields(lead_id = %input.lead_id))]
    pub async fn create_quote(&self, ctx: &SecurityContext, input: NewQuote) -> Result<quote::Model, DomainError> {
        let actor = require(ctx, Permission::QuotesManage)?;
        let label = required_text("item_label", &input.item_label)?;
        let currency = input.currency.trim().to_uppercase();
        if !CURRENCIES.contains(&currency.as_str()) {
            return Err(DomainError::validation("currency", "must be EUR or USD"));
        }
        if input.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("quantity", "must be positive"));
        }
        if input.unit_price < Decimal::ZERO {
            return Err(DomainError::validation("unit_price", "must not be negative"));
        }

        let guard = TenantGuard::new(ctx);
        let txn = self.db.begin().await?;
        let lead = guard
            .get_by_id_or_not_found::<lead::Entity, _>(&txn, input.lead_id, Visibility::Live)
            .await?;
        if lead.status.is_closed() {
            return Err(DomainError::validation("lead_id", "lead is closed"));
        }
        let patient_id = guard
            .scoped_collection::<patient::Entity>(Visibility::Live)?
            .filter(patient::Column::LeadId.eq(lead.id))
            .one(&txn)
            .await?
            .map(|p| p.id);

        let items = vec![QuoteItem {
            label,
            quantity: input.quantity,
            unit_price: input.unit_price,
        }];
        let total = calculate_total(&items)
            .ok_or_else(|| DomainError::validation("unit_price", "too large"))?;
        let items_json =
            serde_json::to_value(&items).map_err(|e| DomainError::Internal(e.to_string()))?;

        let now = Utc::now();
        let plan = treatment_plan::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            patient_id: Set(patient_id),
            lead_id: Set(Some(lead.id)),
            items: Set(items_json),
            estimated_days: Set(None),
            notes: Set(optional_text(input.notes)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let quote = quote::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            lead_id: Set(Some(lead.id)),
            patient_id: Set(patient_id),
            treatment_plan_id: Set(Some(plan.id)),
            currency: Set(currency),
            total: Set(total),
            status: Set(QuoteStatus::Draft),
            sent_at: Set(None),
            accepted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            deleted_by: Set(None),
        }
        .insert(&txn)
        .await?;

        let lead_id = lead.id;
        set_status(&txn, lead, LeadStatus::Quoted).await?;
        Activity::new(actor.clinic_id, activity::QUOTE_CREATED)
            .by(actor.id)
            .lead(lead_id)
            .quote(quote.id)
            .details(format!("Quote {} created", quote.id))
            .insert(&txn)
            .await?;
        txn.commit().await?;

        info!(quote_id = %quote.id, %total, "quote created");
        Ok(quote)
    }

    /// Mark a quote sent. Email delivery is stubbed; the recipient is logged.
    #[instrument(skip(self, ctx))]
    pub async fn send_quote(&self, ctx: &SecurityContext, id: Uuid) -> Result<quote::Model, DomainError> {
        let actor = require(ctx, Permission::QuotesManage)?;
        let guard = TenantGuard::new(ctx);

        let txn = self.db.begin().await?;
        let quote = guard
            .get_by_id_or_not_found::<quote::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        let recipient = match quote.lead_id {
            Some(lead_id) => guard
                .scoped_collection::<lead::Entity>(Visibility::Live)?
                .and_id(lead_id)?
                .one(&txn)
                .await?
                .and_then(|l| l.email),
            None => None,
        }
        .unwrap_or_default();

        let mut am: quote::ActiveModel = quote.into();
        am.status = Set(QuoteStatus::Sent);
        am.sent_at = Set(Some(Utc::now()));
        am.updated_at = Set(Utc::now());
        let quote = am.update(&txn).await?;

        let mut entry = Activity::new(actor.clinic_id, activity::QUOTE_SENT)
            .by(actor.id)
            .quote(quote.id)
            .details(format!("email_stub=true recipient={recipient}"));
        if let Some(lead_id) = quote.lead_id {
            entry = entry.lead(lead_id);
        }
        entry.insert(&txn).await?;
        txn.commit().await?;
        Ok(quote)
    }

    /// Accept a quote: the lead moves to accepted and a valued conversion is recorded.
    #[instrument(skip(self, ctx))]
    pub async fn accept_quote(&self, ctx: &SecurityContext, id: Uuid) -> Result<quote::Model, DomainError> {
        let actor = require(ctx, Permission::QuotesManage)?;
        let guard = TenantGuard::new(ctx);

        let txn = self.db.begin().await?;
        let quote = guard
            .get_by_id_or_not_found::<quote::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        let mut am: quote::ActiveModel = quote.into();
        am.status = Set(QuoteStatus::Accepted);
        am.accepted_at = Set(Some(Utc::now()));
        am.updated_at = Set(Utc::now());
        let quote = am.update(&txn).await?;

        if let Some(lead_id) = quote.lead_id {
            let lead = guard
                .scoped_collection::<lead::Entity>(Visibility::Live)?
                .and_id(lead_id)?
                .one(&txn)
                .await?;
            if let Some(lead) = lead {
                let lead = set_status(&txn, lead, LeadStatus::Accepted).await?;
                conversion::record(&txn, &lead, CONVERSION_QUOTE_ACCEPTED, quote.total, &quote.currency)
                    .await?;
            }
        }

        let mut entry = Activity::new(actor.clinic_id, activity::QUOTE_ACCEPTED)
            .by(actor.id)
            .quote(quote.id)
            .details("Quote accepted");
        if let Some(lead_id) = quote.lead_id {
            entry = entry.lead(lead_id);
        }
        entry.insert(&txn).await?;
        txn.commit().await?;

        info!(quote_id = %quote.id, "quote accepted");
        Ok(quote)
    }
}
