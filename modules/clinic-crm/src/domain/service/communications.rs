use chrono::{DateTime, Utc};
use clinic_db::secure::{AccessScope, SecureEntityExt, TenantGuard, Visibility};
use clinic_security::{Permission, Role, SecurityContext};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{Service, require, required_text};
use crate::domain::activity::{self, Activity, truncate_chars};
use crate::domain::error::DomainError;
use crate::domain::model::{AssignmentMode, CallOutcome, CallStatus, Direction, LeadStatus};
use crate::infra::storage::entities::{
    activity_log, assignment_rule, call, call_disposition, conversation, lead, message, user,
};

const MISSED_CALLS_LIMIT: u64 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub body: String,
    #[serde(default)]
    pub to_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCall {
    pub to_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Disposition {
    pub outcome: CallOutcome,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub followup_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub conversation: conversation::Model,
    /// Oldest first.
    pub messages: Vec<message::Model>,
    /// Calls of the conversation's lead, newest first.
    pub calls: Vec<call::Model>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueView {
    pub new_leads: Vec<lead::Model>,
    pub followups: Vec<lead::Model>,
    pub missed_calls: Vec<call::Model>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned { lead: lead::Model, agent_id: Uuid },
    /// The clinic assigns by hand; the next lead is only surfaced.
    Manual { lead: lead::Model },
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineItem {
    pub at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePage {
    pub page: u64,
    pub has_next: bool,
    pub items: Vec<TimelineItem>,
}

impl Service {
    /// Conversations with the most recent message first; silent ones last.
    pub async fn inbox(&self, ctx: &SecurityContext) -> Result<Vec<conversation::Model>, DomainError> {
        require(ctx, Permission::CommunicationsUse)?;
        let mut conversations = TenantGuard::new(ctx)
            .scoped_collection::<conversation::Entity>(Visibility::Live)?
            .all(&self.db)
            .await?;
        conversations.sort_by(|a, b| {
            match (a.last_message_at, b.last_message_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(conversations)
    }

    pub async fn thread(&self, ctx: &SecurityContext, conversation_id: Uuid) -> Result<Thread, DomainError> {
        require(ctx, Permission::CommunicationsUse)?;
        let guard = TenantGuard::new(ctx);
        let conversation = guard
            .get_by_id_or_not_found::<conversation::Entity, _>(&self.db, conversation_id, Visibility::Live)
            .await?;
        let messages = guard
            .scoped_collection::<message::Entity>(Visibility::Live)?
            .filter(message::Column::ConversationId.eq(conversation.id))
            .order_by_asc(message::Column::CreatedAt)
            .all(&self.db)
            .await?;
        let calls = match conversation.lead_id {
            Some(lead_id) => {
                guard
                    .scoped_collection::<call::Entity>(Visibility::Live)?
                    .filter(call::Column::LeadId.eq(lead_id))
                    .order_by_desc(call::Column::CreatedAt)
                    .all(&self.db)
                    .await?
            }
            None => Vec::new(),
        };
        Ok(Thread {
            conversation,
            messages,
            calls,
        })
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn send_message(
        &self,
        ctx: &SecurityContext,
        conversation_id: Uuid,
        input: NewMessage,
    ) -> Result<message::Model, DomainError> {
        let actor = require(ctx, Permission::CommunicationsUse)?;
        let body = required_text("body", &input.body)?;

        let txn = self.db.begin().await?;
        let conversation = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<conversation::Entity, _>(&txn, conversation_id, Visibility::Live)
            .await?;
        let sent = self
            .whatsapp
            .send_text(input.to_number.as_deref().unwrap_or_default(), &body)
            .await?;

        let now = Utc::now();
        let message = message::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            conversation_id: Set(conversation.id),
            direction: Set(Direction::Outbound),
            body: Set(body.clone()),
            template_name: Set(None),
            provider_message_id: Set(Some(sent.provider_message_id)),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            deleted_by: Set(None),
        }
        .insert(&txn)
        .await?;

        let (lead_id, patient_id) = (conversation.lead_id, conversation.patient_id);
        let mut am: conversation::ActiveModel = conversation.into();
        am.last_message_at = Set(Some(now));
        am.updated_at = Set(now);
        am.update(&txn).await?;

        with_contact(
            Activity::new(actor.clinic_id, activity::MESSAGE_SENT).by(actor.id),
            lead_id,
            patient_id,
        )
        .details(truncate_chars(&body, 200))
        .insert(&txn)
        .await?;
        txn.commit().await?;

        debug!(message_id = %message.id, "message sent");
        Ok(message)
    }

    /// Dial out from a conversation through the voice provider.
    #[instrument(skip(self, ctx, input))]
    pub async fn start_call(
        &self,
        ctx: &SecurityContext,
        conversation_id: Uuid,
        input: NewCall,
    ) -> Result<call::Model, DomainError> {
        let actor = require(ctx, Permission::CommunicationsUse)?;
        let to_number = required_text("to_number", &input.to_number)?;

        let txn = self.db.begin().await?;
        let conversation = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<conversation::Entity, _>(&txn, conversation_id, Visibility::Live)
            .await?;
        let from_number = self.config.outbound_caller_id.clone();
        let started = self.voice.initiate_call(&from_number, &to_number).await?;

        let now = Utc::now();
        let call = call::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            lead_id: Set(conversation.lead_id),
            patient_id: Set(conversation.patient_id),
            direction: Set(Direction::Outbound),
            from_number: Set(from_number),
            to_number: Set(to_number),
            started_at: Set(Some(started.started_at)),
            ended_at: Set(None),
            duration_seconds: Set(None),
            status: Set(started.status),
            recording_url: Set(None),
            provider_call_id: Set(Some(started.provider_call_id)),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            deleted_by: Set(None),
        }
        .insert(&txn)
        .await?;

        with_contact(
            Activity::new(actor.clinic_id, activity::CALL_STARTED).by(actor.id),
            call.lead_id,
            call.patient_id,
        )
        .details(format!("to={}", call.to_number))
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(call_id = %call.id, "call started");
        Ok(call)
    }

    /// Record how a call went. A follow-up moves the lead's next action date.
    #[instrument(skip(self, ctx, input))]
    pub async fn save_disposition(
        &self,
        ctx: &SecurityContext,
        call_id: Uuid,
        input: Disposition,
    ) -> Result<call_disposition::Model, DomainError> {
        let actor = require(ctx, Permission::CommunicationsUse)?;
        let guard = TenantGuard::new(ctx);

        let txn = self.db.begin().await?;
        let call = guard
            .get_by_id_or_not_found::<call::Entity, _>(&txn, call_id, Visibility::Live)
            .await?;
        let disposition = call_disposition::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            call_id: Set(call.id),
            outcome: Set(input.outcome),
            notes: Set(input.notes.filter(|n| !n.trim().is_empty())),
            followup_at: Set(input.followup_at),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        if let (Some(lead_id), Some(followup)) = (call.lead_id, input.followup_at) {
            let lead = guard
                .scoped_collection::<lead::Entity>(Visibility::Live)?
                .and_id(lead_id)?
                .one(&txn)
                .await?;
            if let Some(lead) = lead {
                let mut am: lead::ActiveModel = lead.into();
                am.next_action_date = Set(Some(followup.date_naive()));
                am.updated_at = Set(Utc::now());
                am.update(&txn).await?;
            }
        }

        with_contact(
            Activity::new(actor.clinic_id, activity::CALL_DISPOSITION).by(actor.id),
            call.lead_id,
            call.patient_id,
        )
        .details(input.outcome.as_str())
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(disposition)
    }

    /// Work queue: fresh leads, due follow-ups and recent missed calls.
    pub async fn queue(&self, ctx: &SecurityContext) -> Result<QueueView, DomainError> {
        require(ctx, Permission::CommunicationsUse)?;
        let guard = TenantGuard::new(ctx);
        let today = Utc::now().date_naive();

        let new_leads = guard
            .scoped_collection::<lead::Entity>(Visibility::Live)?
            .filter(lead::Column::Status.eq(LeadStatus::New))
            .order_by_asc(lead::Column::CreatedAt)
            .all(&self.db)
            .await?;
        let followups = guard
            .scoped_collection::<lead::Entity>(Visibility::Live)?
            .filter(lead::Column::NextActionDate.is_not_null())
            .filter(lead::Column::NextActionDate.lte(today))
            .filter(lead::Column::Status.is_not_in([LeadStatus::Lost, LeadStatus::Completed]))
            .order_by_asc(lead::Column::NextActionDate)
            .all(&self.db)
            .await?;
        let missed_calls = guard
            .scoped_collection::<call::Entity>(Visibility::Live)?
            .filter(call::Column::Status.is_in(CallStatus::MISSED))
            .order_by_desc(call::Column::CreatedAt)
            .limit(MISSED_CALLS_LIMIT)
            .all(&self.db)
            .await?;

        Ok(QueueView {
            new_leads,
            followups,
            missed_calls,
        })
    }

    /// Hand the oldest unassigned new lead to the next active agent.
    ///
    /// Round robin picks agent `lead_index % agents.len()`, where
    /// `lead_index` counts the clinic's leads created before this one.
    #[instrument(skip(self, ctx))]
    pub async fn assign_next(&self, ctx: &SecurityContext) -> Result<AssignOutcome, DomainError> {
        let actor = require(ctx, Permission::CommunicationsUse)?;
        let guard = TenantGuard::new(ctx);

        let txn = self.db.begin().await?;
        let mode = guard
            .scoped_collection::<assignment_rule::Entity>(Visibility::Live)?
            .order_by_desc(assignment_rule::Column::CreatedAt)
            .one(&txn)
            .await?
            .map(|rule| rule.mode)
            .unwrap_or_default();

        let Some(lead) = guard
            .scoped_collection::<lead::Entity>(Visibility::Live)?
            .filter(lead::Column::AssignedAgentId.is_null())
            .filter(lead::Column::Status.eq(LeadStatus::New))
            .order_by_asc(lead::Column::CreatedAt)
            .order_by_asc(lead::Column::Id)
            .one(&txn)
            .await?
        else {
            return Ok(AssignOutcome::Nothing);
        };

        let agents = guard
            .scoped_collection::<user::Entity>(Visibility::Live)?
            .filter(user::Column::Role.eq(Role::Agent.as_str()))
            .filter(user::Column::IsActive.eq(true))
            .order_by_asc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Id)
            .all(&txn)
            .await?;
        if agents.is_empty() {
            return Ok(AssignOutcome::Nothing);
        }

        let lead_id = lead.id;
        let (outcome, details) = match mode {
            AssignmentMode::Manual => (
                AssignOutcome::Manual { lead },
                "Manual assignment mode, lead left unassigned".to_owned(),
            ),
            AssignmentMode::RoundRobin => {
                let lead_index = lead::Entity::find()
                    .secure()
                    .scope_with(&AccessScope::clinic(lead.clinic_id), Visibility::IncludeDeleted)
                    .filter(lead::Column::CreatedAt.lt(lead.created_at))
                    .count(&txn)
                    .await?;
                let slot = usize::try_from(lead_index).unwrap_or_default() % agents.len();
                let agent_id = agents[slot].id;

                let mut am: lead::ActiveModel = lead.into();
                am.assigned_agent_id = Set(Some(agent_id));
                am.updated_at = Set(Utc::now());
                let lead = am.update(&txn).await?;
                (
                    AssignOutcome::Assigned { lead, agent_id },
                    format!("Assigned lead to agent {agent_id}"),
                )
            }
        };

        Activity::new(actor.clinic_id, activity::QUEUE_ASSIGN_NEXT)
            .by(actor.id)
            .lead(lead_id)
            .details(details)
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Messages, calls and activity of one lead merged newest first.
    /// `page` starts at 1.
    pub async fn lead_timeline(
        &self,
        ctx: &SecurityContext,
        lead_id: Uuid,
        page: u64,
    ) -> Result<TimelinePage, DomainError> {
        require(ctx, Permission::CommunicationsUse)?;
        let guard = TenantGuard::new(ctx);
        let lead = guard
            .get_by_id_or_not_found::<lead::Entity, _>(&self.db, lead_id, Visibility::Live)
            .await?;

        let conversation_ids: Vec<Uuid> = guard
            .scoped_collection::<conversation::Entity>(Visibility::Live)?
            .filter(conversation::Column::LeadId.eq(lead.id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let mut events = Vec::new();
        if !conversation_ids.is_empty() {
            let messages = guard
                .scoped_collection::<message::Entity>(Visibility::Live)?
                .filter(message::Column::ConversationId.is_in(conversation_ids))
                .all(&self.db)
                .await?;
            events.extend(messages.into_iter().map(|m| TimelineItem {
                at: m.created_at,
                kind: "message",
                title: m.direction.as_str().to_owned(),
                body: m.body,
            }));
        }

        let calls = guard
            .scoped_collection::<call::Entity>(Visibility::Live)?
            .filter(call::Column::LeadId.eq(lead.id))
            .all(&self.db)
            .await?;
        events.extend(calls.into_iter().map(|c| TimelineItem {
            at: c.created_at,
            kind: "call",
            title: c.status.as_str().to_owned(),
            body: format!("{} -> {}", c.from_number, c.to_number),
        }));

        let logs = guard
            .scoped_collection::<activity_log::Entity>(Visibility::Live)?
            .filter(activity_log::Column::LeadId.eq(lead.id))
            .all(&self.db)
            .await?;
        events.extend(logs.into_iter().map(|a| TimelineItem {
            at: a.created_at,
            kind: "activity",
            title: a.action,
            body: a.details.unwrap_or_default(),
        }));

        Ok(paginate(events, page, self.config.timeline_page_size))
    }
}

fn with_contact(mut entry: Activity, lead_id: Option<Uuid>, patient_id: Option<Uuid>) -> Activity {
    if let Some(lead_id) = lead_id {
        entry = entry.lead(lead_id);
    }
    if let Some(patient_id) = patient_id {
        entry = entry.patient(patient_id);
    }
    entry
}

/// Sort newest first and cut page `page` (1-based) of `per_page` items.
fn paginate(mut events: Vec<TimelineItem>, page: u64, per_page: usize) -> TimelinePage {
    events.sort_by(|a, b| b.at.cmp(&a.at));
    let page = page.max(1);
    let per_page = per_page.max(1);
    let start = usize::try_from(page - 1)
        .unwrap_or(usize::MAX)
        .saturating_mul(per_page);
    let end = start.saturating_add(per_page);
    let has_next = end < events.len();
    let items = events.into_iter().skip(start).take(per_page).collect();
    TimelinePage { page, has_next, items }
}
