use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a stored or received label does not name a known variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

/// The external booking services a wrapper can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Zooking,
    Earthstayin,
    Clickandgo,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Zooking, Service::Earthstayin, Service::Clickandgo];

    /// Returns the lowercase label used on the wire, in the store and in topic names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Zooking => "zooking",
            Service::Earthstayin => "earthstayin",
            Service::Clickandgo => "clickandgo",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zooking" => Ok(Service::Zooking),
            "earthstayin" => Ok(Service::Earthstayin),
            "clickandgo" => Ok(Service::Clickandgo),
            _ => Err(ParseError {
                kind: "service",
                value: s.to_string(),
            }),
        }
    }
}

/// Kinds of entity whose identifiers are mapped between services and the internal schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Property,
    Reservation,
    /// A closed or blocked time frame on a property, not a guest reservation.
    ManagementEvent,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Property => "property",
            EntityKind::Reservation => "reservation",
            EntityKind::ManagementEvent => "management_event",
        }
    }

    /// Whether new internal ids for this kind are minted from a sequence counter.
    ///
    /// Management event ids are assigned upstream and only ever inserted verbatim.
    pub fn is_sequenced(&self) -> bool {
        !matches!(self, EntityKind::ManagementEvent)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "property" => Ok(EntityKind::Property),
            "reservation" => Ok(EntityKind::Reservation),
            "management_event" => Ok(EntityKind::ManagementEvent),
            _ => Err(ParseError {
                kind: "entity kind",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Pending,
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Pending => "pending",
            ReservationStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "pending" => Ok(ReservationStatus::Pending),
            "canceled" => Ok(ReservationStatus::Canceled),
            _ => Err(ParseError {
                kind: "reservation status",
                value: s.to_string(),
            }),
        }
    }
}
