//! # PropertEase Wrapper Shared
//! This crate defines the data structures shared by every booking-service wrapper:
//! service identities, entity kinds, identifier mappings, the canonical property and
//! reservation records, and the message envelopes exchanged over the queue.
pub mod messages;
pub mod types;

pub use messages::{InboundMessage, ManagementEvent, OutboundMessage};
pub use types::{
    EntityKind, ExternalId, ExternalReservation, IdMapping, InternalId, ParseError, Property,
    PropertyUpdate, ReconciledReservation, Reservation, ReservationChange, ReservationMapping,
    ReservationStatus, Service,
};
