use chrono::{NaiveDate, Utc};
use clinic_db::secure::{TenantGuard, Visibility, soft_delete};
use clinic_security::{Permission, SecurityContext};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{DEFAULT_CURRENCY, Service, conversion, optional_text, require, required_text};
use crate::domain::activity::{self, Activity};
use crate::domain::error::DomainError;
use crate::domain::model::LeadStatus;
use crate::domain::templates::{self, TemplateContext};
use crate::infra::storage::entities::{activity_log, clinic, lead};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeadFilter {
    /// Case-insensitive match on name, email or phone.
    pub q: Option<String>,
    pub status: Option<LeadStatus>,
}

/// Lead fields accepted from staff, public forms and webhooks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewLead {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub status: Option<LeadStatus>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub next_action_date: Option<NaiveDate>,
    pub landing_page_url: Option<String>,
    pub referrer_url: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub gclid: Option<String>,
    pub fbclid: Option<String>,
    #[serde(skip)]
    pub user_agent: Option<String>,
    #[serde(skip)]
    pub ip_hash: Option<String>,
}

impl NewLead {
    /// Build the row for `clinic_id`. The clinic never comes from the payload.
    pub(super) fn into_active_model(
        self,
        clinic_id: Uuid,
        assigned_agent_id: Option<Uuid>,
    ) -> Result<lead::ActiveModel, DomainError> {
        let first_name = required_text("first_name", &self.first_name)?;
        let last_name = required_text("last_name", &self.last_name)?;
        let status = self.status.unwrap_or(LeadStatus::New);
        let now = Utc::now();

        Ok(lead::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(clinic_id),
            assigned_agent_id: Set(assigned_agent_id),
            first_name: Set(first_name),
            last_name: Set(last_name),
            email: Set(optional_text(self.email)),
            phone: Set(optional_text(self.phone)),
            source: Set(optional_text(self.source).unwrap_or_else(|| "website_form".to_owned())),
            status: Set(status),
            stage_key: Set(status.stage_key().to_owned()),
            language: Set(optional_text(self.language).unwrap_or_else(|| "it".to_owned())),
            country: Set(optional_text(self.country).unwrap_or_else(|| "Italy".to_owned())),
            notes: Set(optional_text(self.notes)),
            next_action_date: Set(self.next_action_date),
            converted_to_patient: Set(false),
            landing_page_url: Set(optional_text(self.landing_page_url)),
            referrer_url: Set(optional_text(self.referrer_url)),
            utm_source: Set(optional_text(self.utm_source)),
            utm_medium: Set(optional_text(self.utm_medium)),
            utm_campaign: Set(optional_text(self.utm_campaign)),
            utm_term: Set(optional_text(self.utm_term)),
            utm_content: Set(optional_text(self.utm_content)),
            gclid: Set(optional_text(self.gclid)),
            fbclid: Set(optional_text(self.fbclid)),
            user_agent: Set(self.user_agent),
            ip_hash: Set(self.ip_hash),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            deleted_by: Set(None),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Followups {
    pub today: NaiveDate,
    pub due: Vec<lead::Model>,
    pub upcoming: Vec<lead::Model>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WhatsAppTemplate {
    pub label: &'static str,
    pub key: &'static str,
    pub text: String,
}

impl Service {
    #[instrument(skip(self, ctx, filter))]
    pub async fn list_leads(
        &self,
        ctx: &SecurityContext,
        filter: &LeadFilter,
    ) -> Result<Vec<lead::Model>, DomainError> {
        require(ctx, Permission::LeadsManage)?;

        let mut query = TenantGuard::new(ctx).scoped_collection::<lead::Entity>(Visibility::Live)?;
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let like = format!("%{}%", q.to_lowercase());
            let lower = |col: lead::Column| Expr::expr(Func::lower(Expr::col(col))).like(like.clone());
            query = query.filter(
                Condition::any()
                    .add(lower(lead::Column::FirstName))
                    .add(lower(lead::Column::LastName))
                    .add(lower(lead::Column::Email))
                    .add(lower(lead::Column::Phone)),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(lead::Column::Status.eq(status));
        }

        let leads = query.order_by_desc(lead::Column::CreatedAt).all(&self.db).await?;
        debug!(count = leads.len(), "listed leads");
        Ok(leads)
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn create_lead(&self, ctx: &SecurityContext, input: NewLead) -> Result<lead::Model, DomainError> {
        let actor = require(ctx, Permission::LeadsManage)?;
        let assigned = actor.role.works_leads().then_some(actor.id);
        let row = input.into_active_model(actor.clinic_id, assigned)?;

        let txn = self.db.begin().await?;
        let lead = row.insert(&txn).await?;
        Activity::new(actor.clinic_id, activity::LEAD_CREATED)
            .by(actor.id)
            .lead(lead.id)
            .details(format!("Lead {} {} created", lead.first_name, lead.last_name))
            .insert(&txn)
            .await?;
        txn.commit().await?;

        info!(lead_id = %lead.id, clinic_id = %lead.clinic_id, "lead created");
        Ok(lead)
    }

    pub async fn get_lead(&self, ctx: &SecurityContext, id: Uuid) -> Result<lead::Model, DomainError> {
        require(ctx, Permission::LeadsManage)?;
        Ok(TenantGuard::new(ctx)
            .get_by_id_or_not_found::<lead::Entity, _>(&self.db, id, Visibility::Live)
            .await?)
    }

    /// Activity rows of one lead, newest first.
    pub async fn lead_activities(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<Vec<activity_log::Model>, DomainError> {
        let lead = self.get_lead(ctx, id).await?;
        Ok(TenantGuard::new(ctx)
            .scoped_collection::<activity_log::Entity>(Visibility::Live)?
            .filter(activity_log::Column::LeadId.eq(lead.id))
            .order_by_desc(activity_log::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    #[instrument(skip(self, ctx, note))]
    pub async fn add_lead_note(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        note: &str,
    ) -> Result<activity_log::Model, DomainError> {
        let actor = require(ctx, Permission::LeadsManage)?;
        let note = required_text("details", note)?;

        let txn = self.db.begin().await?;
        let lead = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<lead::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        let row = Activity::new(actor.clinic_id, activity::LEAD_NOTE)
            .by(actor.id)
            .lead(lead.id)
            .details(note)
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(row)
    }

    #[instrument(skip(self, ctx))]
    pub async fn set_lead_followup(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        date: NaiveDate,
    ) -> Result<lead::Model, DomainError> {
        let actor = require(ctx, Permission::LeadsManage)?;

        let txn = self.db.begin().await?;
        let lead = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<lead::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        let mut am: lead::ActiveModel = lead.into();
        am.next_action_date = Set(Some(date));
        am.updated_at = Set(Utc::now());
        let lead = am.update(&txn).await?;
        Activity::new(actor.clinic_id, activity::LEAD_FOLLOWUP)
            .by(actor.id)
            .lead(lead.id)
            .details(format!("Follow-up set to {date}"))
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(lead)
    }

    /// Move a lead to `status`; accepted and completed record an offline conversion.
    #[instrument(skip(self, ctx))]
    pub async fn change_lead_status(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        status: LeadStatus,
    ) -> Result<lead::Model, DomainError> {
        let actor = require(ctx, Permission::LeadsManage)?;

        let txn = self.db.begin().await?;
        let lead = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<lead::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        let lead = set_status(&txn, lead, status).await?;
        if let Some(name) = status.conversion_name() {
            conversion::record(&txn, &lead, name, rust_decimal::Decimal::ZERO, DEFAULT_CURRENCY).await?;
        }
        Activity::new(actor.clinic_id, activity::LEAD_STATUS)
            .by(actor.id)
            .lead(lead.id)
            .details(format!("Status changed to {}", status.stage_key()))
            .insert(&txn)
            .await?;
        txn.commit().await?;

        info!(lead_id = %lead.id, status = status.stage_key(), "lead status changed");
        Ok(lead)
    }

    pub async fn lead_followups(&self, ctx: &SecurityContext) -> Result<Followups, DomainError> {
        require(ctx, Permission::LeadsManage)?;
        let today = Utc::now().date_naive();

        let scheduled = TenantGuard::new(ctx)
            .scoped_collection::<lead::Entity>(Visibility::Live)?
            .filter(lead::Column::NextActionDate.is_not_null())
            .filter(lead::Column::Status.is_not_in([LeadStatus::Lost, LeadStatus::Completed]))
            .order_by_asc(lead::Column::NextActionDate)
            .all(&self.db)
            .await?;

        let (due, upcoming): (Vec<_>, Vec<_>) = scheduled
            .into_iter()
            .partition(|l| l.next_action_date.is_some_and(|d| d <= today));
        Ok(Followups { today, due, upcoming })
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_lead(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), DomainError> {
        let actor = require(ctx, Permission::LeadsManage)?;

        let txn = self.db.begin().await?;
        soft_delete::<lead::Entity, _>(&txn, ctx, id).await?;
        Activity::new(actor.clinic_id, activity::LEAD_SOFT_DELETE)
            .by(actor.id)
            .lead(id)
            .details("Lead deleted")
            .insert(&txn)
            .await?;
        txn.commit().await?;

        info!(lead_id = %id, "lead archived");
        Ok(())
    }

    /// Quick-reply texts prefilled for one lead.
    pub async fn lead_templates(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<Vec<WhatsAppTemplate>, DomainError> {
        let actor = require(ctx, Permission::LeadsManage)?;
        let guard = TenantGuard::new(ctx);
        let lead = guard
            .get_by_id_or_not_found::<lead::Entity, _>(&self.db, id, Visibility::Live)
            .await?;
        let clinic = guard
            .get_by_id_or_not_found::<clinic::Entity, _>(&self.db, actor.clinic_id, Visibility::Live)
            .await?;

        let mut tctx = TemplateContext::new(&lead.first_name, &clinic.name, &clinic.default_currency);
        if let Some(date) = lead.next_action_date {
            tctx.appointment_date = date.to_string();
        }

        Ok([
            ("new lead", "new"),
            ("follow-up", "contacted"),
            ("quote sent", "quoted"),
            ("appointment reminder", "appointment_reminder"),
        ]
        .into_iter()
        .map(|(label, key)| WhatsAppTemplate {
            label,
            key,
            text: templates::render(key, &tctx),
        })
        .collect())
    }
}

/// Write `status` and its mirrored stage key on an already guarded row.
pub(super) async fn set_status<C: ConnectionTrait>(
    conn: &C,
    lead: lead::Model,
    status: LeadStatus,
) -> Result<lead::Model, DomainError> {
    let mut am: lead::ActiveModel = lead.into();
    am.status = Set(status);
    am.stage_key = Set(status.stage_key().to_owned());
    am.updated_at = Set(Utc::now());
    Ok(am.update(conn).await?)
}
