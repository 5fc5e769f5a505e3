use std::fmt;
use std::str::FromStr;

use crate::error::SecurityError;

/// Clinic staff role. Every user has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
    Doctor,
    Finance,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agent => "agent",
            Self::Doctor => "doctor",
            Self::Finance => "finance",
        }
    }

    /// Roles that own the leads they create.
    #[must_use]
    pub fn works_leads(self) -> bool {
        matches!(self, Self::Admin | Self::Agent)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "agent" => Ok(Self::Agent),
            "doctor" => Ok(Self::Doctor),
            "finance" => Ok(Self::Finance),
            other => Err(SecurityError::UnknownRole(other.to_owned())),
        }
    }
}
