use serde::{Deserialize, Serialize};

use crate::types::{ExternalId, InternalId, ReservationStatus};

/// A single row of the identifier store: one external entity ever seen by a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    pub internal_id: InternalId,
    pub external_id: ExternalId,
}

/// A reservation row, which additionally tracks the last status observed externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationMapping {
    pub internal_id: InternalId,
    pub external_id: ExternalId,
    pub reservation_status: ReservationStatus,
}

impl From<ReservationMapping> for IdMapping {
    fn from(mapping: ReservationMapping) -> Self {
        IdMapping {
            internal_id: mapping.internal_id,
            external_id: mapping.external_id,
        }
    }
}
