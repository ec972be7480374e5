mod mapping;
mod property;
mod reservation;
mod service;

pub use mapping::{IdMapping, ReservationMapping};
pub use property::{
    Amenity, Bathroom, Bed, BedType, Bedroom, Contact, Fixture, HouseRules, Property,
    PropertyUpdate, TimeWindow,
};
pub use reservation::{ExternalReservation, ReconciledReservation, Reservation, ReservationChange};
pub use service::{EntityKind, ParseError, ReservationStatus, Service};

/// Identifier minted by the identifier store. Globally unique per entity kind.
pub type InternalId = i64;

/// Identifier assigned by an external booking service. Unique only within that service.
pub type ExternalId = i64;
