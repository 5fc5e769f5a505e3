use clinic_security::{Actor, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token payload. `sub` is the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub clinic_id: Uuid,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::new(self.sub, self.clinic_id, self.role)
    }
}
