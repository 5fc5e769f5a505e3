//! Domain services, one submodule per business area.
//!
//! Every call takes the caller's `SecurityContext` explicitly. Reads go
//! through `TenantGuard`; each mutating call runs in a single transaction
//! and writes one activity row before committing.

use std::sync::Arc;

use clinic_security::{Actor, Permission, SecurityContext, SlidingWindowLimiter};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

use crate::config::CrmConfig;
use crate::domain::error::DomainError;
use crate::domain::ports::{VoiceProvider, WhatsAppProvider};

mod communications;
mod conversion;
mod intake;
mod leads;
mod patients;
mod payments;
mod quotes;
mod reports;
mod settings;
mod users;

pub use communications::{
    AssignOutcome, Disposition, NewCall, NewMessage, QueueView, Thread, TimelineItem, TimelinePage,
};
pub use intake::{IntakeMeta, PublicLead};
pub use leads::{Followups, LeadFilter, NewLead, WhatsAppTemplate};
pub use patients::ConvertOutcome;
pub use payments::{NewPayment, PaymentsOverview};
pub use quotes::{NewQuote, QuoteItem, calculate_total};
pub use reports::{Dashboard, Funnel, MonthlyRevenue, Reports, SourceCount};
pub use settings::{ClinicPatch, GdprExport, GoogleAdsRow, NewStage};
pub use users::NewUser;

#[cfg(test)]
mod tests_support;

#[cfg(test)]
mod tests_leads;


#[cfg(test)]
mod tests_communications;

#[cfg(test)]
mod tests_intake;

#[cfg(test)]
mod tests_settings;

#[cfg(test)]
mod tests_reports;

/// Currency used for conversions recorded without a quote.
pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Clone)]
pub struct Service {
    db: DatabaseConnection,
    config: Arc<CrmConfig>,
    whatsapp: Arc<dyn WhatsAppProvider>,
    voice: Arc<dyn VoiceProvider>,
    limiter: Arc<SlidingWindowLimiter>,
}

impl Service {
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        config: Arc<CrmConfig>,
        whatsapp: Arc<dyn WhatsAppProvider>,
        voice: Arc<dyn VoiceProvider>,
    ) -> Self {
        Self {
            db,
            config,
            whatsapp,
            voice,
            limiter: Arc::new(SlidingWindowLimiter::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CrmConfig {
        &self.config
    }

    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Authentication first, then the role check.
fn require<'a>(ctx: &'a SecurityContext, permission: Permission) -> Result<&'a Actor, DomainError> {
    Ok(ctx.require_permission(permission)?)
}

fn required_text(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_owned())
}

/// Empty strings become `None`.
fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Decimal sum that reports overflow as `None` instead of panicking.
fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, Decimal::checked_add)
}
