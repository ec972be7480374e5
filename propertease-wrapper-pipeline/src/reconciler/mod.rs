//! Reservation reconciliation.
//!
//! Classifies every reservation a booking service reports against what the
//! identifier store already knows, and keeps the store in step with it.
use std::collections::BTreeMap;
use std::sync::Arc;

use propertease_wrapper_repository::{IdMappingError, IdMappingRepository, MergeOutcome};
use propertease_wrapper_shared::{
    EntityKind, ExternalId, ExternalReservation, InternalId, ReconciledReservation,
    ReservationChange, ReservationStatus, Service,
};
use tracing::{debug, info, instrument, warn};

/// Result of one incremental reconciliation batch.
///
/// The statuses behind `emitted` are not stored yet. Pass the report to
/// [`ReconciliationEngine::commit`] once the reservations have been announced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    /// New or changed reservations, in delivery order.
    pub emitted: Vec<ReconciledReservation>,
    /// Records whose property is not mapped yet.
    pub dropped: usize,
    /// Records already known with the same status.
    pub skipped: usize,
    /// Records whose store lookup failed.
    pub failed: usize,
    pending: Vec<(InternalId, ReservationStatus)>,
}

impl ReconcileReport {
    /// Status writes [`ReconciliationEngine::commit`] will apply, in order.
    pub fn pending(&self) -> &[(InternalId, ReservationStatus)] {
        &self.pending
    }
}

enum Step {
    Emit(ReconciledReservation),
    Drop,
    Skip,
}

pub struct ReconciliationEngine {
    service: Service,
    repository: Arc<dyn IdMappingRepository>,
}

impl ReconciliationEngine {
    pub fn new(service: Service, repository: Arc<dyn IdMappingRepository>) -> Self {
        Self {
            service,
            repository,
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    /// Classifies one poll of a user's reservations without recording any status.
    ///
    /// New reservations get their internal id here, but the store keeps treating
    /// them as unknown until [`commit`](Self::commit) runs, so a batch that is
    /// never committed is classified the same way, with the same ids, next time.
    /// A reservation reported twice in the same batch is compared against its
    /// earlier occurrence. A store failure aborts only the record it happened on.
    #[instrument(skip(self, reservations), fields(service = %self.service, email = %owner_email))]
    pub async fn reconcile(
        &self,
        owner_email: &str,
        reservations: Vec<ExternalReservation>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut seen: BTreeMap<ExternalId, (InternalId, ReservationStatus)> = BTreeMap::new();

        for reservation in reservations {
            let external_id = reservation.id;
            match self.reconcile_one(owner_email, reservation, &mut seen).await {
                Ok(Step::Emit(reconciled)) => {
                    let write = (reconciled.reservation.id, reconciled.reservation.reservation_status);
                    report.pending.push(write);
                    report.emitted.push(reconciled);
                }
                Ok(Step::Drop) => report.dropped += 1,
                Ok(Step::Skip) => report.skipped += 1,
                Err(e) => {
                    warn!(
                        external_id = external_id,
                        error = %e,
                        "Failed to reconcile reservation"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            emitted = report.emitted.len(),
            dropped = report.dropped,
            skipped = report.skipped,
            failed = report.failed,
            "Reconciled reservations"
        );
        report
    }

    async fn reconcile_one(
        &self,
        owner_email: &str,
        reservation: ExternalReservation,
        seen: &mut BTreeMap<ExternalId, (InternalId, ReservationStatus)>,
    ) -> Result<Step, IdMappingError> {
        let Some(property_id) = self
            .repository
            .internal_id_for(self.service, EntityKind::Property, reservation.property_id)
            .await?
        else {
            debug!(
                external_id = reservation.id,
                property_external_id = reservation.property_id,
                "Dropping reservation of unknown property"
            );
            return Ok(Step::Drop);
        };

        let status = reservation.reservation_status;
        let known = match seen.get(&reservation.id) {
            Some(&earlier) => Some(earlier),
            None => self
                .repository
                .get_reservation_by_external_id(self.service, reservation.id)
                .await?
                .map(|mapping| (mapping.internal_id, mapping.reservation_status)),
        };

        let (change, internal_id) = match known {
            None => {
                let internal_id = self
                    .repository
                    .get_or_create_mapping(self.service, EntityKind::Reservation, reservation.id)
                    .await?;
                (ReservationChange::New, internal_id)
            }
            Some((internal_id, previous)) if previous != status => {
                debug!(
                    internal_id = internal_id,
                    from = %previous,
                    to = %status,
                    "Reservation status changed"
                );
                (ReservationChange::Changed, internal_id)
            }
            Some(_) => return Ok(Step::Skip),
        };
        seen.insert(reservation.id, (internal_id, status));

        Ok(Step::Emit(ReconciledReservation {
            change,
            reservation: reservation.into_canonical(internal_id, property_id, owner_email),
        }))
    }

    /// Stores the statuses of an announced batch.
    ///
    /// Every write is attempted. The first failure is returned once all have run.
    pub async fn commit(&self, report: &ReconcileReport) -> Result<(), IdMappingError> {
        let mut first_error = None;
        for &(internal_id, status) in &report.pending {
            if let Err(e) = self
                .repository
                .set_reservation_status(self.service, internal_id, status)
                .await
            {
                warn!(
                    service = %self.service,
                    internal_id = internal_id,
                    error = %e,
                    "Failed to store reservation status"
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Tracks every reported reservation, used for full imports.
    ///
    /// Unlike [`reconcile`](Self::reconcile), unknown properties are mapped on the
    /// spot, unchanged reservations are still reported, and the first store failure
    /// aborts the whole import.
    #[instrument(skip(self, reservations), fields(service = %self.service, email = %owner_email))]
    pub async fn track_all(
        &self,
        owner_email: &str,
        reservations: Vec<ExternalReservation>,
    ) -> Result<Vec<ReconciledReservation>, IdMappingError> {
        let mut tracked = Vec::with_capacity(reservations.len());

        for reservation in reservations {
            let property_id = self
                .repository
                .get_or_create_mapping(self.service, EntityKind::Property, reservation.property_id)
                .await?;
            let status = reservation.reservation_status;

            let (change, internal_id) = match self
                .repository
                .get_reservation_by_external_id(self.service, reservation.id)
                .await?
            {
                None => {
                    let internal_id = self
                        .repository
                        .get_or_create_mapping(self.service, EntityKind::Reservation, reservation.id)
                        .await?;
                    self.repository
                        .set_reservation_status(self.service, internal_id, status)
                        .await?;
                    (ReservationChange::New, internal_id)
                }
                Some(mapping) if mapping.reservation_status != status => {
                    self.repository
                        .set_reservation_status(self.service, mapping.internal_id, status)
                        .await?;
                    (ReservationChange::Changed, mapping.internal_id)
                }
                Some(mapping) => (ReservationChange::Unchanged, mapping.internal_id),
            };

            tracked.push(ReconciledReservation {
                change,
                reservation: reservation.into_canonical(internal_id, property_id, owner_email),
            });
        }

        info!(count = tracked.len(), "Tracked reservations");
        Ok(tracked)
    }

    /// Collapses duplicate property ids, old onto new, in map order.
    pub async fn merge_duplicates(
        &self,
        old_new_id_map: &BTreeMap<InternalId, InternalId>,
    ) -> Result<Vec<(InternalId, InternalId, MergeOutcome)>, IdMappingError> {
        let mut outcomes = Vec::with_capacity(old_new_id_map.len());
        for (&old_internal_id, &new_internal_id) in old_new_id_map {
            let outcome = self
                .repository
                .repoint_or_delete(
                    self.service,
                    EntityKind::Property,
                    old_internal_id,
                    new_internal_id,
                )
                .await?;
            debug!(
                service = %self.service,
                old_internal_id = old_internal_id,
                new_internal_id = new_internal_id,
                outcome = ?outcome,
                "Merged duplicate property"
            );
            outcomes.push((old_internal_id, new_internal_id, outcome));
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use propertease_wrapper_repository::InMemoryIdMappingRepository;
    use propertease_wrapper_shared::{ExternalId, ReservationMapping, ReservationStatus};

    const OWNER: &str = "owner@example.com";

    fn reservation(id: ExternalId, property_id: ExternalId, status: ReservationStatus) -> ExternalReservation {
        let day = |d| {
            NaiveDate::from_ymd_opt(2024, 6, d)
                .and_then(|date| date.and_hms_opt(12, 0, 0))
                .unwrap()
        };
        ExternalReservation {
            id,
            property_id,
            client_email: Some("guest@example.com".to_string()),
            client_name: Some("Guest".to_string()),
            client_phone: None,
            arrival: day(1),
            departure: day(4),
            cost: 300.0,
            reservation_status: status,
        }
    }

    async fn engine_with_property(
        external_id: ExternalId,
        internal_id: InternalId,
    ) -> (ReconciliationEngine, Arc<InMemoryIdMappingRepository>) {
        let repository = Arc::new(InMemoryIdMappingRepository::new());
        repository
            .insert_mapping(Service::Zooking, EntityKind::Property, internal_id, external_id)
            .await
            .unwrap();
        let engine = ReconciliationEngine::new(Service::Zooking, repository.clone());
        (engine, repository)
    }

    #[tokio::test]
    async fn test_first_poll_creates_and_second_poll_is_silent() {
        let (engine, repository) = engine_with_property(11, 4).await;
        let batch = vec![
            reservation(17, 11, ReservationStatus::Confirmed),
            reservation(18, 11, ReservationStatus::Pending),
        ];

        let first = engine.reconcile(OWNER, batch.clone()).await;
        engine.commit(&first).await.unwrap();

        assert_eq!(first.emitted.len(), 2);
        let ids: Vec<_> = first.emitted.iter().map(|r| r.reservation.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(first
            .emitted
            .iter()
            .all(|r| r.change == ReservationChange::New && r.reservation.property_id == 4));
        assert_eq!(first.emitted[0].reservation.owner_email, OWNER);

        let second = engine.reconcile(OWNER, batch).await;

        assert!(second.emitted.is_empty());
        assert_eq!(second.skipped, 2);
        assert_eq!(repository.next_internal_id(EntityKind::Reservation).await, 3);
    }

    #[tokio::test]
    async fn test_unknown_property_is_dropped_without_mapping() {
        let (engine, repository) = engine_with_property(11, 4).await;

        let report = engine
            .reconcile(OWNER, vec![reservation(30, 99, ReservationStatus::Confirmed)])
            .await;

        assert!(report.emitted.is_empty());
        assert_eq!(report.dropped, 1);
        assert_eq!(repository.count(Service::Zooking, EntityKind::Reservation).await, 0);
    }

    #[tokio::test]
    async fn test_status_transitions_emit_changes() {
        let (engine, repository) = engine_with_property(11, 4).await;

        let created = engine
            .reconcile(OWNER, vec![reservation(17, 11, ReservationStatus::Pending)])
            .await;
        assert_eq!(created.emitted[0].change, ReservationChange::New);
        engine.commit(&created).await.unwrap();

        for status in [ReservationStatus::Confirmed, ReservationStatus::Canceled] {
            let report = engine.reconcile(OWNER, vec![reservation(17, 11, status)]).await;
            engine.commit(&report).await.unwrap();
            assert_eq!(report.emitted.len(), 1);
            assert_eq!(report.emitted[0].change, ReservationChange::Changed);
            assert_eq!(report.emitted[0].reservation.id, 1);
            assert_eq!(report.emitted[0].reservation.reservation_status, status);
        }

        let canceled_again = engine
            .reconcile(OWNER, vec![reservation(17, 11, ReservationStatus::Canceled)])
            .await;
        assert!(canceled_again.emitted.is_empty());
        assert_eq!(
            repository.get_reservation(Service::Zooking, 1).await.unwrap(),
            Some(ReservationMapping {
                internal_id: 1,
                external_id: 17,
                reservation_status: ReservationStatus::Canceled,
            })
        );
    }

    #[tokio::test]
    async fn test_duplicate_in_batch_is_created_once() {
        let (engine, repository) = engine_with_property(11, 4).await;

        let report = engine
            .reconcile(
                OWNER,
                vec![
                    reservation(17, 11, ReservationStatus::Pending),
                    reservation(17, 11, ReservationStatus::Confirmed),
                ],
            )
            .await;

        let changes: Vec<_> = report.emitted.iter().map(|r| r.change).collect();
        assert_eq!(changes, vec![ReservationChange::New, ReservationChange::Changed]);
        assert!(report.emitted.iter().all(|r| r.reservation.id == 1));
        assert_eq!(repository.count(Service::Zooking, EntityKind::Reservation).await, 1);

        engine.commit(&report).await.unwrap();
        let stored = repository.get_reservation(Service::Zooking, 1).await.unwrap();
        assert_eq!(
            stored.map(|mapping| mapping.reservation_status),
            Some(ReservationStatus::Confirmed)
        );
    }

    #[tokio::test]
    async fn test_uncommitted_batch_is_emitted_again_with_same_ids() {
        let (engine, repository) = engine_with_property(11, 4).await;
        let batch = vec![reservation(17, 11, ReservationStatus::Confirmed)];

        let announced = engine.reconcile(OWNER, batch.clone()).await;
        assert!(repository
            .get_reservation_by_external_id(Service::Zooking, 17)
            .await
            .unwrap()
            .is_none());

        let retried = engine.reconcile(OWNER, batch.clone()).await;
        assert_eq!(retried.emitted, announced.emitted);
        assert_eq!(retried.emitted[0].change, ReservationChange::New);
        assert_eq!(repository.next_internal_id(EntityKind::Reservation).await, 2);

        engine.commit(&retried).await.unwrap();
        let after_commit = engine.reconcile(OWNER, batch).await;
        assert!(after_commit.emitted.is_empty());
        assert_eq!(after_commit.skipped, 1);
    }

    #[tokio::test]
    async fn test_uncommitted_status_change_is_emitted_again() {
        let (engine, repository) = engine_with_property(11, 4).await;
        let created = engine
            .reconcile(OWNER, vec![reservation(17, 11, ReservationStatus::Pending)])
            .await;
        engine.commit(&created).await.unwrap();

        let confirmed = vec![reservation(17, 11, ReservationStatus::Confirmed)];
        let first = engine.reconcile(OWNER, confirmed.clone()).await;
        let second = engine.reconcile(OWNER, confirmed).await;

        assert_eq!(first.emitted, second.emitted);
        assert_eq!(second.emitted[0].change, ReservationChange::Changed);
        assert_eq!(second.pending(), &[(1, ReservationStatus::Confirmed)]);
        let stored = repository.get_reservation(Service::Zooking, 1).await.unwrap();
        assert_eq!(
            stored.map(|mapping| mapping.reservation_status),
            Some(ReservationStatus::Pending)
        );
    }

    /// Fails every reservation mint for one external id, as if the store had
    /// dropped the connection between the lookup and the insert.
    struct RacingRepository {
        inner: InMemoryIdMappingRepository,
        contested: ExternalId,
    }

    #[async_trait]
    impl IdMappingRepository for RacingRepository {
        async fn external_id_for(
            &self,
            service: Service,
            kind: EntityKind,
            internal_id: InternalId,
        ) -> Result<Option<ExternalId>, IdMappingError> {
            self.inner.external_id_for(service, kind, internal_id).await
        }

        async fn internal_id_for(
            &self,
            service: Service,
            kind: EntityKind,
            external_id: ExternalId,
        ) -> Result<Option<InternalId>, IdMappingError> {
            self.inner.internal_id_for(service, kind, external_id).await
        }

        async fn create_mapping(
            &self,
            service: Service,
            kind: EntityKind,
            external_id: ExternalId,
            status: Option<ReservationStatus>,
        ) -> Result<InternalId, IdMappingError> {
            self.inner.create_mapping(service, kind, external_id, status).await
        }

        async fn get_or_create_mapping(
            &self,
            service: Service,
            kind: EntityKind,
            external_id: ExternalId,
        ) -> Result<InternalId, IdMappingError> {
            if kind == EntityKind::Reservation && external_id == self.contested {
                return Err(IdMappingError::DuplicateExternalId {
                    service,
                    kind,
                    external_id,
                });
            }
            self.inner.get_or_create_mapping(service, kind, external_id).await
        }

        async fn insert_mapping(
            &self,
            service: Service,
            kind: EntityKind,
            internal_id: InternalId,
            external_id: ExternalId,
        ) -> Result<(), IdMappingError> {
            self.inner
                .insert_mapping(service, kind, internal_id, external_id)
                .await
        }

        async fn repoint_or_delete(
            &self,
            service: Service,
            kind: EntityKind,
            old_internal_id: InternalId,
            new_internal_id: InternalId,
        ) -> Result<MergeOutcome, IdMappingError> {
            self.inner
                .repoint_or_delete(service, kind, old_internal_id, new_internal_id)
                .await
        }

        async fn set_reservation_status(
            &self,
            service: Service,
            internal_id: InternalId,
            status: ReservationStatus,
        ) -> Result<Option<ReservationMapping>, IdMappingError> {
            self.inner
                .set_reservation_status(service, internal_id, status)
                .await
        }

        async fn get_reservation(
            &self,
            service: Service,
            internal_id: InternalId,
        ) -> Result<Option<ReservationMapping>, IdMappingError> {
            self.inner.get_reservation(service, internal_id).await
        }

        async fn get_reservation_by_external_id(
            &self,
            service: Service,
            external_id: ExternalId,
        ) -> Result<Option<ReservationMapping>, IdMappingError> {
            self.inner
                .get_reservation_by_external_id(service, external_id)
                .await
        }

        async fn delete_mapping(
            &self,
            service: Service,
            kind: EntityKind,
            internal_id: InternalId,
        ) -> Result<bool, IdMappingError> {
            self.inner.delete_mapping(service, kind, internal_id).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_only_skips_that_record() {
        let inner = InMemoryIdMappingRepository::new();
        inner
            .insert_mapping(Service::Zooking, EntityKind::Property, 4, 11)
            .await
            .unwrap();
        let engine = ReconciliationEngine::new(
            Service::Zooking,
            Arc::new(RacingRepository {
                inner,
                contested: 17,
            }),
        );

        let report = engine
            .reconcile(
                OWNER,
                vec![
                    reservation(17, 11, ReservationStatus::Confirmed),
                    reservation(18, 11, ReservationStatus::Confirmed),
                ],
            )
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.emitted.len(), 1);
        assert_eq!(report.emitted[0].reservation.id, 1);
        assert_eq!(report.pending(), &[(1, ReservationStatus::Confirmed)]);
    }

    #[tokio::test]
    async fn test_track_all_reports_every_record_and_maps_properties() {
        let repository = Arc::new(InMemoryIdMappingRepository::new());
        let engine = ReconciliationEngine::new(Service::Clickandgo, repository.clone());
        let batch = vec![
            reservation(5, 50, ReservationStatus::Confirmed),
            reservation(6, 51, ReservationStatus::Pending),
        ];

        let first = engine.track_all(OWNER, batch.clone()).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|r| r.change == ReservationChange::New));
        assert_eq!(repository.count(Service::Clickandgo, EntityKind::Property).await, 2);

        let mut updated = batch;
        updated[1].reservation_status = ReservationStatus::Confirmed;
        let second = engine.track_all(OWNER, updated).await.unwrap();

        let changes: Vec<_> = second.iter().map(|r| r.change).collect();
        assert_eq!(changes, vec![ReservationChange::Unchanged, ReservationChange::Changed]);
        assert_eq!(second[0].reservation.id, first[0].reservation.id);
        assert_eq!(repository.next_internal_id(EntityKind::Reservation).await, 3);
    }

    #[tokio::test]
    async fn test_track_all_adopts_unannounced_reservation() {
        let (engine, repository) = engine_with_property(11, 4).await;
        let batch = vec![reservation(17, 11, ReservationStatus::Pending)];
        let unannounced = engine.reconcile(OWNER, batch.clone()).await;

        let tracked = engine.track_all(OWNER, batch).await.unwrap();

        assert_eq!(tracked[0].change, ReservationChange::New);
        assert_eq!(tracked[0].reservation.id, unannounced.emitted[0].reservation.id);
        assert_eq!(repository.count(Service::Zooking, EntityKind::Reservation).await, 1);
        assert_eq!(
            repository
                .get_reservation(Service::Zooking, tracked[0].reservation.id)
                .await
                .unwrap()
                .map(|mapping| mapping.reservation_status),
            Some(ReservationStatus::Pending)
        );
    }

    #[tokio::test]
    async fn test_merge_duplicates_repoints_and_discards() {
        let repository = Arc::new(InMemoryIdMappingRepository::new());
        for (internal_id, external_id) in [(7, 70), (8, 80), (9, 90)] {
            repository
                .insert_mapping(Service::Earthstayin, EntityKind::Property, internal_id, external_id)
                .await
                .unwrap();
        }
        let engine = ReconciliationEngine::new(Service::Earthstayin, repository.clone());
        let merges = BTreeMap::from([(7, 3), (8, 9), (12, 1)]);

        let outcomes = engine.merge_duplicates(&merges).await.unwrap();

        assert_eq!(
            outcomes,
            vec![
                (7, 3, MergeOutcome::Repointed),
                (8, 9, MergeOutcome::DiscardedDuplicate),
                (12, 1, MergeOutcome::Missing),
            ]
        );
        let lookup = |external_id| {
            repository.internal_id_for(Service::Earthstayin, EntityKind::Property, external_id)
        };
        assert_eq!(lookup(70).await.unwrap(), Some(3));
        assert_eq!(lookup(80).await.unwrap(), None);
        assert_eq!(lookup(90).await.unwrap(), Some(9));
    }
}
