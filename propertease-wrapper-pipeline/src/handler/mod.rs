//! Inbound message handling.
//!
//! Each wrapper process runs in one [`HandlerRole`], which decides the message
//! types it reacts to. Everything else is ignored so that the role families
//! sharing a topic never act twice on the same message.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use propertease_wrapper_shared::{
    InboundMessage, OutboundMessage, ParseError, ReservationStatus, Service,
};
use tracing::{debug, info, instrument};

use crate::adapter::{AdapterOutcome, ServiceAdapter};
use crate::errors::HandlerError;
use crate::publisher::Publisher;
use crate::topics::{TO_APP_TOPIC, TO_CALENDAR_TOPIC};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerRole {
    /// Property changes, management events and initial reservation imports.
    Regular,
    /// Periodic reservation polling and reservation confirmations or cancellations.
    Scheduled,
    /// Property changes and imports that also bring in reservations.
    Property,
}

impl HandlerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerRole::Regular => "regular",
            HandlerRole::Scheduled => "scheduled",
            HandlerRole::Property => "property",
        }
    }

    pub fn accepts(&self, message: &InboundMessage) -> bool {
        use InboundMessage::*;

        match self {
            HandlerRole::Regular => matches!(
                message,
                PropertyCreate(_)
                    | PropertyUpdate { .. }
                    | PropertyDelete(_)
                    | PropertyImport { .. }
                    | PropertyImportDuplicate { .. }
                    | ReservationImportInitialRequest { .. }
                    | ManagementEventCreate(_)
                    | ManagementEventUpdate(_)
                    | ManagementEventDelete { .. }
            ),
            HandlerRole::Scheduled => matches!(
                message,
                ReservationImportRequest { .. }
                    | ReservationImportOverlap { .. }
                    | ReservationCancelMessage { .. }
                    | ReservationImportConfirm { .. }
            ),
            HandlerRole::Property => matches!(
                message,
                PropertyCreate(_)
                    | PropertyUpdate { .. }
                    | PropertyDelete(_)
                    | PropertyImport { .. }
                    | PropertyImportDuplicate { .. }
            ),
        }
    }
}

impl fmt::Display for HandlerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(HandlerRole::Regular),
            "scheduled" => Ok(HandlerRole::Scheduled),
            "property" => Ok(HandlerRole::Property),
            _ => Err(ParseError {
                kind: "handler role",
                value: s.to_string(),
            }),
        }
    }
}

pub struct MessageHandler {
    role: HandlerRole,
    adapter: Arc<ServiceAdapter>,
    publisher: Arc<dyn Publisher>,
}

impl MessageHandler {
    pub fn new(role: HandlerRole, adapter: Arc<ServiceAdapter>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            role,
            adapter,
            publisher,
        }
    }

    pub fn role(&self) -> HandlerRole {
        self.role
    }

    pub fn service(&self) -> Service {
        self.adapter.service()
    }

    /// Decodes a raw queue payload.
    pub fn decode(payload: &[u8]) -> Result<InboundMessage, HandlerError> {
        serde_json::from_slice(payload).map_err(|e| HandlerError::decode(e.to_string()))
    }

    /// Processes one message to completion, publishing any responses.
    ///
    /// Returns once every side effect is durable, so the caller may acknowledge.
    #[instrument(skip(self, message), fields(
        service = %self.service(),
        role = %self.role,
        message_type = message.message_type()
    ))]
    pub async fn handle(&self, message: InboundMessage) -> Result<(), HandlerError> {
        if !self.role.accepts(&message) {
            debug!("Message not handled by this role");
            return Ok(());
        }

        let outcome = match message {
            InboundMessage::PropertyCreate(property) => {
                self.adapter.create_property(&property).await?
            }
            InboundMessage::PropertyUpdate {
                internal_id,
                update_parameters,
            } => {
                self.adapter
                    .update_property(internal_id, &update_parameters)
                    .await?
            }
            InboundMessage::PropertyDelete(property) => {
                self.adapter.delete_property(&property).await?
            }
            InboundMessage::PropertyImport { email } => {
                self.import_properties(&email).await?;
                AdapterOutcome::Done
            }
            InboundMessage::PropertyImportDuplicate {
                old_internal_id,
                new_internal_id,
            } => {
                self.adapter
                    .reconciler()
                    .merge_duplicates(&BTreeMap::from([(old_internal_id, new_internal_id)]))
                    .await?;
                AdapterOutcome::Done
            }
            InboundMessage::ReservationImportInitialRequest {
                email,
                old_new_id_map,
            } => {
                // Merges must land before reservations are resolved against them.
                self.adapter
                    .reconciler()
                    .merge_duplicates(&old_new_id_map)
                    .await?;
                self.import_all_reservations(&email).await?;
                AdapterOutcome::Done
            }
            InboundMessage::ReservationImportRequest {
                users_with_services,
            } => {
                self.import_changed_reservations(&users_with_services).await?;
                AdapterOutcome::Done
            }
            InboundMessage::ReservationImportOverlap {
                old_reservation_internal_id,
            } => {
                self.adapter
                    .cancel_overlapping_reservation(old_reservation_internal_id)
                    .await?
            }
            InboundMessage::ReservationCancelMessage {
                old_reservation_internal_id,
                property_internal_id,
            } => {
                self.adapter
                    .cancel_reservation(old_reservation_internal_id, property_internal_id)
                    .await?
            }
            InboundMessage::ReservationImportConfirm {
                reservation_internal_id,
                property_internal_id,
                begin_datetime,
                end_datetime,
            } => {
                self.adapter
                    .confirm_reservation(
                        reservation_internal_id,
                        property_internal_id,
                        begin_datetime,
                        end_datetime,
                    )
                    .await?
            }
            InboundMessage::ManagementEventCreate(event) => {
                self.adapter.create_management_event(&event).await?
            }
            InboundMessage::ManagementEventUpdate(event) => {
                self.adapter.update_management_event(&event).await?
            }
            InboundMessage::ManagementEventDelete {
                property_internal_id,
                event_internal_id,
            } => {
                self.adapter
                    .delete_management_event(property_internal_id, event_internal_id)
                    .await?
            }
        };

        debug!(outcome = ?outcome, "Message handled");
        Ok(())
    }

    async fn import_properties(&self, email: &str) -> Result<(), HandlerError> {
        let properties = self.adapter.import_properties(email).await?;
        self.publisher
            .publish(
                TO_APP_TOPIC,
                &OutboundMessage::ImportPropertiesResponse {
                    service: self.service(),
                    properties,
                },
            )
            .await?;

        if self.role == HandlerRole::Property {
            self.import_all_reservations(email).await?;
        }
        Ok(())
    }

    async fn import_all_reservations(&self, email: &str) -> Result<(), HandlerError> {
        let reservations = self.adapter.import_reservations(email).await?;
        self.publisher
            .publish(
                TO_CALENDAR_TOPIC,
                &OutboundMessage::ImportReservationsResponse {
                    service: self.service(),
                    reservations,
                },
            )
            .await?;
        Ok(())
    }

    /// Polls every user connected to this service and publishes what changed.
    ///
    /// A user's statuses are stored only after both messages were accepted, so a
    /// failed publish leaves the changes to be announced again on redelivery.
    async fn import_changed_reservations(
        &self,
        users_with_services: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), HandlerError> {
        let service = self.service();

        for (email, services) in users_with_services {
            let connected = services
                .iter()
                .any(|label| label.trim().eq_ignore_ascii_case(service.as_str()));
            if !connected {
                continue;
            }

            let report = self
                .adapter
                .import_new_or_newly_changed_reservations(email)
                .await?;
            if report.emitted.is_empty() {
                debug!(email = %email, "No new or changed reservations");
                continue;
            }

            let confirmed: Vec<_> = report
                .emitted
                .iter()
                .filter(|r| r.reservation.reservation_status == ReservationStatus::Confirmed)
                .map(|r| r.reservation.clone())
                .collect();

            info!(
                email = %email,
                emitted = report.emitted.len(),
                confirmed = confirmed.len(),
                "Publishing reservation changes"
            );
            self.publisher
                .publish(
                    TO_CALENDAR_TOPIC,
                    &OutboundMessage::ImportReservationsResponse {
                        service,
                        reservations: report.emitted.clone(),
                    },
                )
                .await?;

            if !confirmed.is_empty() {
                self.publisher
                    .publish(
                        TO_CALENDAR_TOPIC,
                        &OutboundMessage::ReservationImportRequestOtherServicesConfirmedReservations {
                            service,
                            reservations: confirmed,
                        },
                    )
                    .await?;
            }

            self.adapter.reconciler().commit(&report).await?;
        }
        Ok(())
    }
}
