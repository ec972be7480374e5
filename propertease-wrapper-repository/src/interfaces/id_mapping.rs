//! This module defines the `IdMappingRepository` trait, the interface to the store
//! that correlates internal ids with the ids assigned by each booking service.
use async_trait::async_trait;
use propertease_wrapper_shared::{
    EntityKind, ExternalId, InternalId, ReservationMapping, ReservationStatus, Service,
};

use crate::errors::IdMappingError;

/// Result of collapsing a duplicate internal id into its canonical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The old row now carries the new internal id.
    Repointed,
    /// A row with the new internal id already existed, so the old row was deleted.
    DiscardedDuplicate,
    /// No row carried the old internal id; nothing changed.
    Missing,
}

/// A trait that defines the interface for interacting with the identifier store.
///
/// Every operation is scoped to one booking `service` and, unless the name says
/// otherwise, one entity `kind`. Lookups of rows that do not exist return `None`.
#[async_trait]
pub trait IdMappingRepository: Send + Sync {
    /// Returns the external id the service uses for `internal_id`.
    async fn external_id_for(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
    ) -> Result<Option<ExternalId>, IdMappingError>;

    /// Returns the internal id mapped to the service's `external_id`.
    async fn internal_id_for(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<Option<InternalId>, IdMappingError>;

    /// Mints the next internal id for `kind` and maps it to `external_id`.
    ///
    /// The counter increment and the row insert happen in one transaction, so
    /// concurrent callers never receive the same id. Fails with
    /// [`IdMappingError::DuplicateExternalId`] when the external id is already mapped.
    async fn create_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
        status: Option<ReservationStatus>,
    ) -> Result<InternalId, IdMappingError>;

    /// Returns the existing internal id for `external_id`, minting one only if absent.
    async fn get_or_create_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<InternalId, IdMappingError>;

    /// Maps a caller-supplied internal id, used for ids assigned upstream.
    ///
    /// Re-inserting the same internal id replaces its external id.
    async fn insert_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
        external_id: ExternalId,
    ) -> Result<(), IdMappingError>;

    /// Collapses `old_internal_id` into `new_internal_id` atomically.
    async fn repoint_or_delete(
        &self,
        service: Service,
        kind: EntityKind,
        old_internal_id: InternalId,
        new_internal_id: InternalId,
    ) -> Result<MergeOutcome, IdMappingError>;

    /// Stores the latest status observed for a reservation and returns the updated row.
    async fn set_reservation_status(
        &self,
        service: Service,
        internal_id: InternalId,
        status: ReservationStatus,
    ) -> Result<Option<ReservationMapping>, IdMappingError>;

    /// Returns a reservation row only once a status has been stored for it.
    ///
    /// A reservation minted through [`get_or_create_mapping`](Self::get_or_create_mapping)
    /// holds its internal id but no status until it has been announced, and reads as absent.
    async fn get_reservation(
        &self,
        service: Service,
        internal_id: InternalId,
    ) -> Result<Option<ReservationMapping>, IdMappingError>;

    async fn get_reservation_by_external_id(
        &self,
        service: Service,
        external_id: ExternalId,
    ) -> Result<Option<ReservationMapping>, IdMappingError>;

    /// Deletes a mapping row. Returns whether a row existed.
    async fn delete_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
    ) -> Result<bool, IdMappingError>;
}
