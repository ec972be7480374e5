use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::{ExternalId, InternalId, ReservationStatus};

/// The canonical reservation record published to downstream services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    #[serde(rename = "_id")]
    pub id: InternalId,
    pub property_id: InternalId,
    pub owner_email: String,
    pub begin_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub cost: f64,
    pub reservation_status: ReservationStatus,
}

/// Reservation exactly as returned by a booking service's reservation listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalReservation {
    pub id: ExternalId,
    pub property_id: ExternalId,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(alias = "begin_datetime")]
    pub arrival: NaiveDateTime,
    #[serde(alias = "end_datetime")]
    pub departure: NaiveDateTime,
    #[serde(default)]
    pub cost: f64,
    pub reservation_status: ReservationStatus,
}

impl ExternalReservation {
    /// Builds the canonical record once both identities have been resolved.
    pub fn into_canonical(
        self,
        id: InternalId,
        property_id: InternalId,
        owner_email: &str,
    ) -> Reservation {
        Reservation {
            id,
            property_id,
            owner_email: owner_email.to_string(),
            begin_datetime: self.arrival,
            end_datetime: self.departure,
            client_email: self.client_email,
            client_name: self.client_name,
            client_phone: self.client_phone,
            cost: self.cost,
            reservation_status: self.reservation_status,
        }
    }
}

/// How a reservation compares with what the identifier store knew before the import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationChange {
    New,
    Changed,
    /// Only produced by full imports, which report every record.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledReservation {
    pub change: ReservationChange,
    #[serde(flatten)]
    pub reservation: Reservation,
}
