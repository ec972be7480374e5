//! Queue message envelopes.
//!
//! Every message travels as `{"message_type": "...", "body": {...}}`.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::{
    InternalId, Property, PropertyUpdate, ReconciledReservation, Reservation, Service,
};

/// A closed time frame on a property, addressed by internal ids only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementEvent {
    pub property_internal_id: InternalId,
    pub event_internal_id: InternalId,
    pub begin_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", content = "body", rename_all = "snake_case")]
pub enum InboundMessage {
    PropertyCreate(Property),
    PropertyUpdate {
        internal_id: InternalId,
        update_parameters: PropertyUpdate,
    },
    PropertyDelete(Property),
    PropertyImport {
        email: String,
    },
    PropertyImportDuplicate {
        old_internal_id: InternalId,
        new_internal_id: InternalId,
    },
    ReservationImportInitialRequest {
        email: String,
        /// Old to new internal property ids decided by the deduplication step.
        #[serde(default)]
        old_new_id_map: BTreeMap<InternalId, InternalId>,
    },
    ReservationImportRequest {
        /// User email to the labels of the services that user has connected.
        users_with_services: BTreeMap<String, Vec<String>>,
    },
    ReservationImportOverlap {
        old_reservation_internal_id: InternalId,
    },
    ReservationCancelMessage {
        old_reservation_internal_id: InternalId,
        property_internal_id: InternalId,
    },
    ReservationImportConfirm {
        reservation_internal_id: InternalId,
        property_internal_id: InternalId,
        begin_datetime: NaiveDateTime,
        end_datetime: NaiveDateTime,
    },
    ManagementEventCreate(ManagementEvent),
    ManagementEventUpdate(ManagementEvent),
    ManagementEventDelete {
        property_internal_id: InternalId,
        event_internal_id: InternalId,
    },
}

impl InboundMessage {
    pub fn message_type(&self) -> &'static str {
        match self {
            InboundMessage::PropertyCreate(_) => "property_create",
            InboundMessage::PropertyUpdate { .. } => "property_update",
            InboundMessage::PropertyDelete(_) => "property_delete",
            InboundMessage::PropertyImport { .. } => "property_import",
            InboundMessage::PropertyImportDuplicate { .. } => "property_import_duplicate",
            InboundMessage::ReservationImportInitialRequest { .. } => {
                "reservation_import_initial_request"
            }
            InboundMessage::ReservationImportRequest { .. } => "reservation_import_request",
            InboundMessage::ReservationImportOverlap { .. } => "reservation_import_overlap",
            InboundMessage::ReservationCancelMessage { .. } => "reservation_cancel_message",
            InboundMessage::ReservationImportConfirm { .. } => "reservation_import_confirm",
            InboundMessage::ManagementEventCreate(_) => "management_event_create",
            InboundMessage::ManagementEventUpdate(_) => "management_event_update",
            InboundMessage::ManagementEventDelete { .. } => "management_event_delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", content = "body", rename_all = "snake_case")]
pub enum OutboundMessage {
    ImportPropertiesResponse {
        service: Service,
        properties: Vec<Property>,
    },
    ImportReservationsResponse {
        service: Service,
        reservations: Vec<ReconciledReservation>,
    },
    /// Confirmed reservations found by an incremental import, so other services can block them.
    ReservationImportRequestOtherServicesConfirmedReservations {
        service: Service,
        reservations: Vec<Reservation>,
    },
}

impl OutboundMessage {
    pub fn message_type(&self) -> &'static str {
        match self {
            OutboundMessage::ImportPropertiesResponse { .. } => "import_properties_response",
            OutboundMessage::ImportReservationsResponse { .. } => "import_reservations_response",
            OutboundMessage::ReservationImportRequestOtherServicesConfirmedReservations {
                ..
            } => "reservation_import_request_other_services_confirmed_reservations",
        }
    }

    /// The service whose wrapper produced the message.
    pub fn service(&self) -> Service {
        match self {
            OutboundMessage::ImportPropertiesResponse { service, .. }
            | OutboundMessage::ImportReservationsResponse { service, .. }
            | OutboundMessage::ReservationImportRequestOtherServicesConfirmedReservations {
                service,
                ..
            } => *service,
        }
    }
}
