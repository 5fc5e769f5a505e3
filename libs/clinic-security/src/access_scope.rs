use uuid::Uuid;

/// The clinics a request can reach.
///
/// An empty scope is a "deny all" scope: queries built from it match nothing.
#[derive(Clone, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct AccessScope {
    pub(crate) clinic_ids: Vec<Uuid>,
}

impl AccessScope {
    #[inline]
    #[must_use]
    pub fn clinic_ids(&self) -> &[Uuid] {
        &self.clinic_ids
    }

    /// An empty scope results in a "deny all" condition in queries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clinic_ids.is_empty()
    }

    #[must_use]
    pub fn clinic(clinic_id: Uuid) -> Self {
        Self {
            clinic_ids: vec![clinic_id],
        }
    }

    #[must_use]
    pub fn contains_clinic(&self, clinic_id: Uuid) -> bool {
        self.clinic_ids.contains(&clinic_id)
    }
}
