use std::fmt;

use crate::Role;

/// A capability checked by request handlers before touching data.
///
/// Serializes to its dotted name, e.g. `"leads.manage"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Permission {
    #[serde(rename = "users.manage")]
    UsersManage,
    #[serde(rename = "settings.manage")]
    SettingsManage,
    #[serde(rename = "integrations.manage")]
    IntegrationsManage,
    #[serde(rename = "communications.use")]
    CommunicationsUse,
    #[serde(rename = "leads.manage")]
    LeadsManage,
    #[serde(rename = "patients.manage")]
    PatientsManage,
    #[serde(rename = "patients.assigned")]
    PatientsAssigned,
    #[serde(rename = "clinical_notes.manage")]
    ClinicalNotesManage,
    #[serde(rename = "quotes.manage")]
    QuotesManage,
    #[serde(rename = "appointments.manage")]
    AppointmentsManage,
    #[serde(rename = "payments.manage")]
    PaymentsManage,
    #[serde(rename = "invoices.manage")]
    InvoicesManage,
    #[serde(rename = "reports.view")]
    ReportsView,
    #[serde(rename = "gdpr.manage")]
    GdprManage,
}

const ADMIN: &[Permission] = &[
    Permission::UsersManage,
    Permission::SettingsManage,
    Permission::IntegrationsManage,
    Permission::CommunicationsUse,
    Permission::LeadsManage,
    Permission::PatientsManage,
    Permission::QuotesManage,
    Permission::AppointmentsManage,
    Permission::PaymentsManage,
    Permission::ReportsView,
    Permission::GdprManage,
];

const AGENT: &[Permission] = &[
    Permission::CommunicationsUse,
    Permission::LeadsManage,
    Permission::PatientsManage,
    Permission::QuotesManage,
    Permission::AppointmentsManage,
    Permission::ReportsView,
];

const DOCTOR: &[Permission] = &[
    Permission::PatientsAssigned,
    Permission::AppointmentsManage,
    Permission::ClinicalNotesManage,
    Permission::CommunicationsUse,
];

const FINANCE: &[Permission] = &[
    Permission::PaymentsManage,
    Permission::ReportsView,
    Permission::InvoicesManage,
    Permission::CommunicationsUse,
];

impl Permission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UsersManage => "users.manage",
            Self::SettingsManage => "settings.manage",
            Self::IntegrationsManage => "integrations.manage",
            Self::CommunicationsUse => "communications.use",
            Self::LeadsManage => "leads.manage",
            Self::PatientsManage => "patients.manage",
            Self::PatientsAssigned => "patients.assigned",
            Self::ClinicalNotesManage => "clinical_notes.manage",
            Self::QuotesManage => "quotes.manage",
            Self::AppointmentsManage => "appointments.manage",
            Self::PaymentsManage => "payments.manage",
            Self::InvoicesManage => "invoices.manage",
            Self::ReportsView => "reports.view",
            Self::GdprManage => "gdpr.manage",
        }
    }

    /// Static role to permission table.
    #[must_use]
    pub fn granted_to(role: Role) -> &'static [Permission] {
        match role {
            Role::Admin => ADMIN,
            Role::Agent => AGENT,
            Role::Doctor => DOCTOR,
            Role::Finance => FINANCE,
        }
    }

    #[must_use]
    pub fn is_granted_to(self, role: Role) -> bool {
        Self::granted_to(role).contains(&self)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
