//! The service adapter: every call one wrapper makes to its booking service.
//!
//! A single generic adapter serves all three services. What differs between them
//! lives in a [`VendorConfig`] and a [`VendorConverter`].
mod config;

pub use config::{default_base_url, ManagementEventStyle, VendorConfig};

use std::sync::Arc;

use chrono::NaiveDateTime;
use propertease_wrapper_repository::IdMappingRepository;
use propertease_wrapper_shared::{
    EntityKind, ExternalId, ExternalReservation, InternalId, ManagementEvent, Property,
    PropertyUpdate, ReconciledReservation, ReservationStatus, Service,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{ApiResponse, BookingApi};
use crate::converter::{converter_for, VendorConverter};
use crate::errors::{AdapterError, ConversionError};
use crate::reconciler::{ReconcileReport, ReconciliationEngine};

const CLOSED_TIME_FRAMES: &str = "properties/closedtimeframes";

/// How a mutation ended when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterOutcome {
    Done,
    /// The target has no mapping on this service; nothing was sent.
    Unmapped(EntityKind),
    /// The booking service answered with a non-success status.
    Rejected { status: u16 },
    /// The entity was created on the booking service but could not be mapped.
    Orphaned,
}

pub struct ServiceAdapter {
    config: VendorConfig,
    api: Arc<dyn BookingApi>,
    converter: Arc<dyn VendorConverter>,
    repository: Arc<dyn IdMappingRepository>,
    reconciler: ReconciliationEngine,
}

impl ServiceAdapter {
    pub fn new(
        config: VendorConfig,
        api: Arc<dyn BookingApi>,
        repository: Arc<dyn IdMappingRepository>,
    ) -> Self {
        let converter = converter_for(config.service);
        let reconciler = ReconciliationEngine::new(config.service, repository.clone());
        Self {
            config,
            api,
            converter,
            repository,
            reconciler,
        }
    }

    pub fn service(&self) -> Service {
        self.config.service
    }

    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    pub fn reconciler(&self) -> &ReconciliationEngine {
        &self.reconciler
    }

    async fn property_external_id(
        &self,
        internal_id: InternalId,
    ) -> Result<Option<ExternalId>, AdapterError> {
        Ok(self
            .repository
            .external_id_for(self.config.service, EntityKind::Property, internal_id)
            .await?)
    }

    async fn event_external_id(
        &self,
        internal_id: InternalId,
    ) -> Result<Option<ExternalId>, AdapterError> {
        Ok(self
            .repository
            .external_id_for(self.config.service, EntityKind::ManagementEvent, internal_id)
            .await?)
    }

    fn unmapped(&self, kind: EntityKind, internal_id: InternalId) -> AdapterOutcome {
        warn!(
            service = %self.config.service,
            kind = %kind,
            internal_id = internal_id,
            "Target is not mapped on this service"
        );
        AdapterOutcome::Unmapped(kind)
    }

    fn rejected(&self, operation: &str, response: &ApiResponse) -> AdapterOutcome {
        warn!(
            service = %self.config.service,
            operation = operation,
            status = response.status,
            body = %response.body,
            "Booking service rejected the request"
        );
        AdapterOutcome::Rejected {
            status: response.status,
        }
    }

    /// Pushes a new property to the booking service.
    ///
    /// No mapping is created here; the property is mapped when it comes back
    /// through an import.
    #[instrument(skip(self, property), fields(service = %self.config.service))]
    pub async fn create_property(&self, property: &Property) -> Result<AdapterOutcome, AdapterError> {
        let payload = self.converter.export_property(property)?;
        let response = self.api.post("properties", &payload).await?;
        if !response.is_success() {
            return Ok(self.rejected("create_property", &response));
        }
        info!(title = %property.title, "Created property");
        Ok(AdapterOutcome::Done)
    }

    #[instrument(skip(self, update), fields(service = %self.config.service))]
    pub async fn update_property(
        &self,
        internal_id: InternalId,
        update: &PropertyUpdate,
    ) -> Result<AdapterOutcome, AdapterError> {
        let Some(external_id) = self.property_external_id(internal_id).await? else {
            return Ok(self.unmapped(EntityKind::Property, internal_id));
        };
        let payload = self.converter.export_update(update)?;
        let response = self
            .api
            .put(&format!("properties/{external_id}"), &payload)
            .await?;
        if !response.is_success() {
            return Ok(self.rejected("update_property", &response));
        }
        info!(internal_id, external_id, "Updated property");
        Ok(AdapterOutcome::Done)
    }

    /// Deletes the property on the booking service. Its mapping is kept so that
    /// late reservations for it can still be resolved.
    #[instrument(skip(self, property), fields(service = %self.config.service))]
    pub async fn delete_property(&self, property: &Property) -> Result<AdapterOutcome, AdapterError> {
        let Some(internal_id) = property.id else {
            warn!("Property to delete carries no internal id");
            return Ok(AdapterOutcome::Unmapped(EntityKind::Property));
        };
        let Some(external_id) = self.property_external_id(internal_id).await? else {
            return Ok(self.unmapped(EntityKind::Property, internal_id));
        };
        let response = self.api.delete(&format!("properties/{external_id}")).await?;
        if !response.is_success() {
            return Ok(self.rejected("delete_property", &response));
        }
        info!(internal_id, external_id, "Deleted property");
        Ok(AdapterOutcome::Done)
    }

    /// Blocks a time frame on a property and maps the new event.
    ///
    /// An event that is already mapped is left alone, so a redelivered create
    /// does not block the frame twice.
    #[instrument(skip(self, event), fields(
        service = %self.config.service,
        property_internal_id = event.property_internal_id,
        event_internal_id = event.event_internal_id
    ))]
    pub async fn create_management_event(
        &self,
        event: &ManagementEvent,
    ) -> Result<AdapterOutcome, AdapterError> {
        let Some(property_external_id) =
            self.property_external_id(event.property_internal_id).await?
        else {
            return Ok(self.unmapped(EntityKind::Property, event.property_internal_id));
        };
        if self.event_external_id(event.event_internal_id).await?.is_some() {
            debug!("Management event already mapped");
            return Ok(AdapterOutcome::Done);
        }

        let created = match self.config.management_events {
            ManagementEventStyle::ClosedTimeFrameResource => {
                let payload = json!({
                    "property_id": property_external_id,
                    "begin_datetime": event.begin_datetime,
                    "end_datetime": event.end_datetime,
                });
                let response = self.api.post(CLOSED_TIME_FRAMES, &payload).await?;
                if !response.is_success() {
                    return Ok(self.rejected("create_management_event", &response));
                }
                response.body.get("id").and_then(Value::as_i64)
            }
            ManagementEventStyle::EmbeddedInProperty => {
                let payload = json!({
                    "closed_time_frames": [{
                        "begin_datetime": event.begin_datetime,
                        "end_datetime": event.end_datetime,
                    }]
                });
                let response = self
                    .api
                    .put(&format!("properties/{property_external_id}"), &payload)
                    .await?;
                if !response.is_success() {
                    return Ok(self.rejected("create_management_event", &response));
                }
                find_embedded_time_frame(&response.body, event.begin_datetime, event.end_datetime)
            }
        };

        let Some(event_external_id) = created else {
            error!(
                inconsistency = true,
                "Management event created but the service returned no usable id"
            );
            return Ok(AdapterOutcome::Orphaned);
        };

        if let Err(e) = self
            .repository
            .insert_mapping(
                self.config.service,
                EntityKind::ManagementEvent,
                event.event_internal_id,
                event_external_id,
            )
            .await
        {
            error!(
                inconsistency = true,
                event_external_id,
                error = %e,
                "Management event created but its mapping could not be stored"
            );
            return Ok(AdapterOutcome::Orphaned);
        }

        info!(event_external_id, "Created management event");
        Ok(AdapterOutcome::Done)
    }

    #[instrument(skip(self, event), fields(
        service = %self.config.service,
        property_internal_id = event.property_internal_id,
        event_internal_id = event.event_internal_id
    ))]
    pub async fn update_management_event(
        &self,
        event: &ManagementEvent,
    ) -> Result<AdapterOutcome, AdapterError> {
        let Some(property_external_id) =
            self.property_external_id(event.property_internal_id).await?
        else {
            return Ok(self.unmapped(EntityKind::Property, event.property_internal_id));
        };
        let Some(event_external_id) = self.event_external_id(event.event_internal_id).await? else {
            return Ok(self.unmapped(EntityKind::ManagementEvent, event.event_internal_id));
        };

        let response = match self.config.management_events {
            ManagementEventStyle::ClosedTimeFrameResource => {
                let payload = json!({
                    "begin_datetime": event.begin_datetime,
                    "end_datetime": event.end_datetime,
                });
                self.api
                    .put(&format!("{CLOSED_TIME_FRAMES}/{event_external_id}"), &payload)
                    .await?
            }
            ManagementEventStyle::EmbeddedInProperty => {
                let payload = json!({
                    "closed_time_frames": [{
                        "id": event_external_id,
                        "begin_datetime": event.begin_datetime,
                        "end_datetime": event.end_datetime,
                    }]
                });
                self.api
                    .put(&format!("properties/{property_external_id}"), &payload)
                    .await?
            }
        };
        if !response.is_success() {
            return Ok(self.rejected("update_management_event", &response));
        }
        info!(event_external_id, "Updated management event");
        Ok(AdapterOutcome::Done)
    }

    /// Removes a blocked time frame, then its mapping once the service confirmed.
    ///
    /// A standalone time frame the service no longer knows counts as removed, so a
    /// delete whose mapping cleanup failed still finishes on redelivery.
    #[instrument(skip(self), fields(service = %self.config.service))]
    pub async fn delete_management_event(
        &self,
        property_internal_id: InternalId,
        event_internal_id: InternalId,
    ) -> Result<AdapterOutcome, AdapterError> {
        let Some(property_external_id) = self.property_external_id(property_internal_id).await?
        else {
            return Ok(self.unmapped(EntityKind::Property, property_internal_id));
        };
        let Some(event_external_id) = self.event_external_id(event_internal_id).await? else {
            return Ok(self.unmapped(EntityKind::ManagementEvent, event_internal_id));
        };

        let response = match self.config.management_events {
            ManagementEventStyle::ClosedTimeFrameResource => {
                self.api
                    .delete(&format!("{CLOSED_TIME_FRAMES}/{event_external_id}"))
                    .await?
            }
            ManagementEventStyle::EmbeddedInProperty => {
                let payload = json!({ "closed_time_frames": [{ "id": event_external_id }] });
                self.api
                    .put(&format!("properties/{property_external_id}"), &payload)
                    .await?
            }
        };
        let already_gone = response.status == 404
            && matches!(
                self.config.management_events,
                ManagementEventStyle::ClosedTimeFrameResource
            );
        if already_gone {
            warn!(
                event_internal_id,
                event_external_id, "Time frame already gone, removing its mapping"
            );
        } else if !response.is_success() {
            return Ok(self.rejected("delete_management_event", &response));
        }

        self.repository
            .delete_mapping(
                self.config.service,
                EntityKind::ManagementEvent,
                event_internal_id,
            )
            .await?;
        info!(event_external_id, "Deleted management event");
        Ok(AdapterOutcome::Done)
    }

    /// Sends a status to the booking service and stores the status it echoes back.
    async fn push_reservation_status(
        &self,
        internal_id: InternalId,
        external_id: ExternalId,
        status: ReservationStatus,
    ) -> Result<AdapterOutcome, AdapterError> {
        let response = self
            .api
            .put(
                &format!("reservations/{external_id}"),
                &json!({ "reservation_status": status }),
            )
            .await?;
        if !response.is_success() {
            return Ok(self.rejected("set_reservation_status", &response));
        }

        let stored = response
            .body
            .get("reservation_status")
            .and_then(|value| serde_json::from_value::<ReservationStatus>(value.clone()).ok())
            .unwrap_or(status);
        self.repository
            .set_reservation_status(self.config.service, internal_id, stored)
            .await?;
        info!(internal_id, external_id, status = %stored, "Updated reservation status");
        Ok(AdapterOutcome::Done)
    }

    async fn reservation_external_id(
        &self,
        internal_id: InternalId,
    ) -> Result<Option<ExternalId>, AdapterError> {
        Ok(self
            .repository
            .external_id_for(self.config.service, EntityKind::Reservation, internal_id)
            .await?)
    }

    /// Confirms a reservation made on this service, or blocks its time frame when
    /// the reservation belongs to another service.
    #[instrument(skip(self), fields(service = %self.config.service))]
    pub async fn confirm_reservation(
        &self,
        reservation_internal_id: InternalId,
        property_internal_id: InternalId,
        begin_datetime: NaiveDateTime,
        end_datetime: NaiveDateTime,
    ) -> Result<AdapterOutcome, AdapterError> {
        match self.reservation_external_id(reservation_internal_id).await? {
            Some(external_id) => {
                self.push_reservation_status(
                    reservation_internal_id,
                    external_id,
                    ReservationStatus::Confirmed,
                )
                .await
            }
            None => {
                self.create_management_event(&ManagementEvent {
                    property_internal_id,
                    event_internal_id: reservation_internal_id,
                    begin_datetime,
                    end_datetime,
                })
                .await
            }
        }
    }

    /// Cancels a reservation that lost an overlap against another service.
    #[instrument(skip(self), fields(service = %self.config.service))]
    pub async fn cancel_overlapping_reservation(
        &self,
        reservation_internal_id: InternalId,
    ) -> Result<AdapterOutcome, AdapterError> {
        match self.reservation_external_id(reservation_internal_id).await? {
            Some(external_id) => {
                self.push_reservation_status(
                    reservation_internal_id,
                    external_id,
                    ReservationStatus::Canceled,
                )
                .await
            }
            None => {
                debug!(
                    reservation_internal_id,
                    "Overlapping reservation was not made on this service"
                );
                Ok(AdapterOutcome::Unmapped(EntityKind::Reservation))
            }
        }
    }

    /// Cancels a reservation made on this service, or lifts the time frame that
    /// blocked it for another service.
    #[instrument(skip(self), fields(service = %self.config.service))]
    pub async fn cancel_reservation(
        &self,
        reservation_internal_id: InternalId,
        property_internal_id: InternalId,
    ) -> Result<AdapterOutcome, AdapterError> {
        match self.reservation_external_id(reservation_internal_id).await? {
            Some(external_id) => {
                self.push_reservation_status(
                    reservation_internal_id,
                    external_id,
                    ReservationStatus::Canceled,
                )
                .await
            }
            None => {
                self.delete_management_event(property_internal_id, reservation_internal_id)
                    .await
            }
        }
    }

    /// Fetches a listing filtered by owner email. The body must be a JSON array.
    async fn fetch_listing(&self, path: &str, email: &str) -> Result<Vec<Value>, AdapterError> {
        let response = self.api.get(path, &[("email", email)]).await?;
        if !response.is_success() {
            return Err(AdapterError::UnexpectedStatus {
                status: response.status,
                path: path.to_string(),
            });
        }
        match response.body {
            Value::Array(items) => Ok(items),
            other => Err(ConversionError::malformed(format!(
                "{path}: expected a list, got {other}"
            ))
            .into()),
        }
    }

    async fn fetch_reservations(
        &self,
        path: &str,
        email: &str,
    ) -> Result<Vec<ExternalReservation>, AdapterError> {
        let raw = self.fetch_listing(path, email).await?;
        let mut reservations = Vec::with_capacity(raw.len());
        for item in raw {
            match serde_json::from_value::<ExternalReservation>(item) {
                Ok(reservation) => reservations.push(reservation),
                Err(e) => warn!(error = %e, "Skipping malformed reservation"),
            }
        }
        Ok(reservations)
    }

    /// Imports every property the user owns on this service, mapping new ones.
    #[instrument(skip(self), fields(service = %self.config.service))]
    pub async fn import_properties(&self, email: &str) -> Result<Vec<Property>, AdapterError> {
        let raw = self.fetch_listing("properties", email).await?;
        let mut properties = Vec::with_capacity(raw.len());

        for item in raw {
            let imported = match self.converter.import_property(item) {
                Ok(imported) => imported,
                Err(e) => {
                    warn!(error = %e, "Skipping property that could not be converted");
                    continue;
                }
            };
            let internal_id = self
                .repository
                .get_or_create_mapping(
                    self.config.service,
                    EntityKind::Property,
                    imported.external_id,
                )
                .await?;

            let mut property = imported.property;
            property.id = Some(internal_id);
            if property.user_email.is_empty() {
                property.user_email = email.to_string();
            }
            properties.push(property);
        }

        info!(count = properties.len(), "Imported properties");
        Ok(properties)
    }

    /// Full reservation import: every reservation is tracked and reported.
    #[instrument(skip(self), fields(service = %self.config.service))]
    pub async fn import_reservations(
        &self,
        email: &str,
    ) -> Result<Vec<ReconciledReservation>, AdapterError> {
        let reservations = self.fetch_reservations("reservations", email).await?;
        Ok(self.reconciler.track_all(email, reservations).await?)
    }

    /// Incremental reservation import over the service's upcoming reservations.
    ///
    /// The report's statuses are stored only by [`ReconciliationEngine::commit`].
    #[instrument(skip(self), fields(service = %self.config.service))]
    pub async fn import_new_or_newly_changed_reservations(
        &self,
        email: &str,
    ) -> Result<ReconcileReport, AdapterError> {
        let reservations = self.fetch_reservations("reservations/upcoming", email).await?;
        Ok(self.reconciler.reconcile(email, reservations).await)
    }
}

/// Finds the id of the embedded time frame spanning exactly `begin`..`end`.
///
/// The service answers with the whole property, whose `closed_time_frames` maps
/// ids to frames.
fn find_embedded_time_frame(
    property: &Value,
    begin: NaiveDateTime,
    end: NaiveDateTime,
) -> Option<ExternalId> {
    let frames = property.get("closed_time_frames")?.as_object()?;
    frames.iter().find_map(|(id, frame)| {
        let parse = |field: &str| {
            frame
                .get(field)
                .and_then(|value| serde_json::from_value::<NaiveDateTime>(value.clone()).ok())
        };
        if parse("begin_datetime")? == begin && parse("end_datetime")? == end {
            id.parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, MockBookingApi};
    use chrono::NaiveDate;
    use propertease_wrapper_repository::InMemoryIdMappingRepository;

    const OWNER: &str = "owner@example.com";

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn event(property_internal_id: InternalId, event_internal_id: InternalId) -> ManagementEvent {
        ManagementEvent {
            property_internal_id,
            event_internal_id,
            begin_datetime: at(10, 14),
            end_datetime: at(12, 11),
        }
    }

    struct Fixture {
        adapter: ServiceAdapter,
        api: Arc<MockBookingApi>,
        repository: Arc<InMemoryIdMappingRepository>,
    }

    fn fixture(service: Service) -> Fixture {
        let api = Arc::new(MockBookingApi::new());
        let repository = Arc::new(InMemoryIdMappingRepository::new());
        let adapter = ServiceAdapter::new(
            VendorConfig::for_service(service),
            api.clone(),
            repository.clone(),
        );
        Fixture {
            adapter,
            api,
            repository,
        }
    }

    impl Fixture {
        async fn map(&self, kind: EntityKind, internal_id: InternalId, external_id: ExternalId) {
            self.repository
                .insert_mapping(self.adapter.service(), kind, internal_id, external_id)
                .await
                .unwrap();
        }

        async fn external_id(&self, kind: EntityKind, internal_id: InternalId) -> Option<ExternalId> {
            self.repository
                .external_id_for(self.adapter.service(), kind, internal_id)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_update_of_unmapped_property_sends_nothing() {
        let f = fixture(Service::Zooking);

        let outcome = f
            .adapter
            .update_property(9, &PropertyUpdate::default())
            .await
            .unwrap();

        assert_eq!(outcome, AdapterOutcome::Unmapped(EntityKind::Property));
        assert!(f.api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_forwards_translated_fields() {
        let f = fixture(Service::Clickandgo);
        f.map(EntityKind::Property, 3, 30).await;
        f.api
            .respond(Method::Put, "properties/30", ApiResponse::ok(json!({})))
            .await;
        let update = PropertyUpdate {
            number_guests: Some(6),
            ..Default::default()
        };

        let outcome = f.adapter.update_property(3, &update).await.unwrap();

        assert_eq!(outcome, AdapterOutcome::Done);
        let calls = f.api.calls().await;
        assert_eq!(calls[0].body, Some(json!({"guest_num": 6})));
    }

    #[tokio::test]
    async fn test_create_property_does_not_map() {
        let f = fixture(Service::Earthstayin);
        f.api
            .respond(Method::Post, "properties", ApiResponse::new(201, json!({"id": 5})))
            .await;
        let property = Property {
            user_email: OWNER.to_string(),
            title: "Cottage".to_string(),
            ..Default::default()
        };

        let outcome = f.adapter.create_property(&property).await.unwrap();

        assert_eq!(outcome, AdapterOutcome::Done);
        let calls = f.api.calls().await;
        let body = calls[0].body.as_ref().unwrap();
        assert_eq!(body["user_email"], OWNER);
        assert_eq!(body["name"], "Cottage");
        assert_eq!(f.repository.count(Service::Earthstayin, EntityKind::Property).await, 0);
    }

    #[tokio::test]
    async fn test_resource_event_is_mapped_after_creation() {
        let f = fixture(Service::Earthstayin);
        f.map(EntityKind::Property, 1, 10).await;
        f.api
            .respond(Method::Post, CLOSED_TIME_FRAMES, ApiResponse::ok(json!({"id": 77})))
            .await;

        let outcome = f.adapter.create_management_event(&event(1, 500)).await.unwrap();

        assert_eq!(outcome, AdapterOutcome::Done);
        assert_eq!(f.external_id(EntityKind::ManagementEvent, 500).await, Some(77));
        let calls = f.api.calls().await;
        assert_eq!(
            calls[0].body,
            Some(json!({
                "property_id": 10,
                "begin_datetime": "2024-07-10T14:00:00",
                "end_datetime": "2024-07-12T11:00:00"
            }))
        );

        let again = f.adapter.create_management_event(&event(1, 500)).await.unwrap();
        assert_eq!(again, AdapterOutcome::Done);
        assert_eq!(f.api.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_event_for_unmapped_property_is_not_sent() {
        let f = fixture(Service::Clickandgo);

        let outcome = f.adapter.create_management_event(&event(1, 500)).await.unwrap();

        assert_eq!(outcome, AdapterOutcome::Unmapped(EntityKind::Property));
        assert!(f.api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_embedded_event_id_is_found_in_returned_property() {
        let f = fixture(Service::Zooking);
        f.map(EntityKind::Property, 1, 10).await;
        f.api
            .respond(
                Method::Put,
                "properties/10",
                ApiResponse::ok(json!({
                    "id": 10,
                    "closed_time_frames": {
                        "3": {"begin_datetime": "2024-07-01T00:00:00", "end_datetime": "2024-07-02T00:00:00"},
                        "4": {"begin_datetime": "2024-07-10T14:00:00", "end_datetime": "2024-07-12T11:00:00"}
                    }
                })),
            )
            .await;

        let outcome = f.adapter.create_management_event(&event(1, 500)).await.unwrap();

        assert_eq!(outcome, AdapterOutcome::Done);
        assert_eq!(f.external_id(EntityKind::ManagementEvent, 500).await, Some(4));
    }

    #[tokio::test]
    async fn test_event_created_but_unmappable_is_orphaned() {
        let f = fixture(Service::Earthstayin);
        f.map(EntityKind::Property, 1, 10).await;
        f.map(EntityKind::ManagementEvent, 400, 77).await;
        f.api
            .respond(Method::Post, CLOSED_TIME_FRAMES, ApiResponse::ok(json!({"id": 77})))
            .await;

        let outcome = f.adapter.create_management_event(&event(1, 500)).await.unwrap();

        assert_eq!(outcome, AdapterOutcome::Orphaned);
        assert_eq!(f.external_id(EntityKind::ManagementEvent, 500).await, None);
    }

    #[tokio::test]
    async fn test_event_mapping_survives_failed_delete() {
        let f = fixture(Service::Clickandgo);
        f.map(EntityKind::Property, 1, 10).await;
        f.map(EntityKind::ManagementEvent, 500, 77).await;
        let path = format!("{CLOSED_TIME_FRAMES}/77");
        f.api
            .respond(Method::Delete, &path, ApiResponse::new(500, Value::Null))
            .await;
        f.api
            .respond(Method::Delete, &path, ApiResponse::new(204, Value::Null))
            .await;

        let failed = f.adapter.delete_management_event(1, 500).await.unwrap();
        assert_eq!(failed, AdapterOutcome::Rejected { status: 500 });
        assert_eq!(f.external_id(EntityKind::ManagementEvent, 500).await, Some(77));

        let deleted = f.adapter.delete_management_event(1, 500).await.unwrap();
        assert_eq!(deleted, AdapterOutcome::Done);
        assert_eq!(f.external_id(EntityKind::ManagementEvent, 500).await, None);
    }

    #[tokio::test]
    async fn test_event_already_deleted_by_service_drops_mapping() {
        let f = fixture(Service::Clickandgo);
        f.map(EntityKind::Property, 1, 10).await;
        f.map(EntityKind::ManagementEvent, 500, 77).await;
        f.api
            .respond(
                Method::Delete,
                &format!("{CLOSED_TIME_FRAMES}/77"),
                ApiResponse::new(404, json!({"detail": "Not found"})),
            )
            .await;

        let outcome = f.adapter.delete_management_event(1, 500).await.unwrap();

        assert_eq!(outcome, AdapterOutcome::Done);
        assert_eq!(f.external_id(EntityKind::ManagementEvent, 500).await, None);
    }

    #[tokio::test]
    async fn test_embedded_event_update_and_delete_go_through_property() {
        let f = fixture(Service::Zooking);
        f.map(EntityKind::Property, 1, 10).await;
        f.map(EntityKind::ManagementEvent, 500, 4).await;
        f.api
            .respond(Method::Put, "properties/10", ApiResponse::ok(json!({})))
            .await;

        f.adapter.update_management_event(&event(1, 500)).await.unwrap();
        f.adapter.delete_management_event(1, 500).await.unwrap();

        let calls = f.api.calls().await;
        assert_eq!(
            calls[0].body,
            Some(json!({"closed_time_frames": [{
                "id": 4,
                "begin_datetime": "2024-07-10T14:00:00",
                "end_datetime": "2024-07-12T11:00:00"
            }]}))
        );
        assert_eq!(calls[1].body, Some(json!({"closed_time_frames": [{"id": 4}]})));
        assert_eq!(f.external_id(EntityKind::ManagementEvent, 500).await, None);
    }

    #[tokio::test]
    async fn test_confirm_stores_echoed_status() {
        let f = fixture(Service::Earthstayin);
        let internal_id = f
            .repository
            .create_mapping(
                Service::Earthstayin,
                EntityKind::Reservation,
                17,
                Some(ReservationStatus::Pending),
            )
            .await
            .unwrap();
        f.api
            .respond(
                Method::Put,
                "reservations/17",
                ApiResponse::ok(json!({"id": 17, "reservation_status": "confirmed"})),
            )
            .await;

        let outcome = f
            .adapter
            .confirm_reservation(internal_id, 1, at(1, 12), at(3, 12))
            .await
            .unwrap();

        assert_eq!(outcome, AdapterOutcome::Done);
        let calls = f.api.calls().await;
        assert_eq!(calls[0].body, Some(json!({"reservation_status": "confirmed"})));
        let stored = f
            .repository
            .get_reservation(Service::Earthstayin, internal_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.reservation_status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_foreign_reservation_blocks_then_unblocks_time_frame() {
        let f = fixture(Service::Clickandgo);
        f.map(EntityKind::Property, 2, 20).await;
        f.api
            .respond(Method::Post, CLOSED_TIME_FRAMES, ApiResponse::ok(json!({"id": 88})))
            .await;
        f.api
            .respond(
                Method::Delete,
                &format!("{CLOSED_TIME_FRAMES}/88"),
                ApiResponse::new(204, Value::Null),
            )
            .await;

        let confirmed = f
            .adapter
            .confirm_reservation(42, 2, at(5, 12), at(6, 12))
            .await
            .unwrap();
        assert_eq!(confirmed, AdapterOutcome::Done);
        assert_eq!(f.external_id(EntityKind::ManagementEvent, 42).await, Some(88));

        let canceled = f.adapter.cancel_reservation(42, 2).await.unwrap();
        assert_eq!(canceled, AdapterOutcome::Done);
        assert_eq!(f.external_id(EntityKind::ManagementEvent, 42).await, None);
    }

    #[tokio::test]
    async fn test_overlap_on_foreign_reservation_is_unmapped() {
        let f = fixture(Service::Zooking);

        let outcome = f.adapter.cancel_overlapping_reservation(42).await.unwrap();

        assert_eq!(outcome, AdapterOutcome::Unmapped(EntityKind::Reservation));
        assert!(f.api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_import_properties_is_stable_across_runs() {
        let f = fixture(Service::Zooking);
        f.api
            .respond(
                Method::Get,
                "properties",
                ApiResponse::ok(json!([
                    {"id": 100, "name": "A", "curr_price": 10.0},
                    {"name": "no id"},
                    {"id": 101, "name": "B", "curr_price": 20.0}
                ])),
            )
            .await;

        let first = f.adapter.import_properties(OWNER).await.unwrap();
        let second = f.adapter.import_properties(OWNER).await.unwrap();

        let ids: Vec<_> = first.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
        assert_eq!(first, second);
        assert_eq!(first[0].user_email, OWNER);
        let calls = f.api.calls().await;
        assert_eq!(calls[0].query, vec![("email".to_string(), OWNER.to_string())]);
    }

    #[tokio::test]
    async fn test_listing_errors_are_classified() {
        let f = fixture(Service::Earthstayin);
        f.api
            .respond(Method::Get, "reservations", ApiResponse::new(503, Value::Null))
            .await;
        f.api.unreachable(Method::Get, "reservations/upcoming").await;

        let rejected = f.adapter.import_reservations(OWNER).await.unwrap_err();
        assert!(matches!(rejected, AdapterError::UnexpectedStatus { status: 503, .. }));
        assert!(!rejected.is_transient());

        let unreachable = f
            .adapter
            .import_new_or_newly_changed_reservations(OWNER)
            .await
            .unwrap_err();
        assert!(unreachable.is_transient());
    }

    #[tokio::test]
    async fn test_incremental_import_delegates_to_reconciler() {
        let f = fixture(Service::Clickandgo);
        f.map(EntityKind::Property, 4, 11).await;
        f.api
            .respond(
                Method::Get,
                "reservations/upcoming",
                ApiResponse::ok(json!([
                    {"id": 17, "property_id": 11, "arrival": "2024-07-01T12:00:00",
                     "departure": "2024-07-03T12:00:00", "cost": 90.0, "reservation_status": "confirmed"},
                    {"id": 18, "property_id": 12, "arrival": "2024-07-01T12:00:00",
                     "departure": "2024-07-03T12:00:00", "cost": 90.0, "reservation_status": "confirmed"}
                ])),
            )
            .await;

        let report = f
            .adapter
            .import_new_or_newly_changed_reservations(OWNER)
            .await
            .unwrap();

        assert_eq!(report.emitted.len(), 1);
        assert_eq!(report.emitted[0].reservation.property_id, 4);
        assert_eq!(report.dropped, 1);
    }
}
