//! In-memory identifier store.
//!
//! Mirrors the PostgreSQL semantics behind a single async mutex. Used by pipeline
//! tests and for running a wrapper without a database.
use std::collections::HashMap;

use async_trait::async_trait;
use propertease_wrapper_shared::{
    EntityKind, ExternalId, InternalId, ReservationMapping, ReservationStatus, Service,
};
use tokio::sync::Mutex;

use crate::{IdMappingError, IdMappingRepository, MergeOutcome};

#[derive(Debug, Clone, Copy)]
struct Row {
    service: Service,
    kind: EntityKind,
    internal_id: InternalId,
    external_id: ExternalId,
    reservation_status: Option<ReservationStatus>,
}

impl Row {
    fn is(&self, service: Service, kind: EntityKind) -> bool {
        self.service == service && self.kind == kind
    }

    fn as_reservation(&self) -> Option<ReservationMapping> {
        Some(ReservationMapping {
            internal_id: self.internal_id,
            external_id: self.external_id,
            reservation_status: self.reservation_status?,
        })
    }
}

#[derive(Debug, Default)]
struct State {
    next_values: HashMap<EntityKind, InternalId>,
    rows: Vec<Row>,
}

impl State {
    fn find(&self, service: Service, kind: EntityKind, internal_id: InternalId) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.is(service, kind) && row.internal_id == internal_id)
    }

    fn find_external(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.is(service, kind) && row.external_id == external_id)
    }

    fn mint(
        &mut self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
        reservation_status: Option<ReservationStatus>,
    ) -> Result<InternalId, IdMappingError> {
        if !kind.is_sequenced() {
            return Err(IdMappingError::UnsequencedKind(kind));
        }
        let next_value = self.next_values.entry(kind).or_insert(1);
        let internal_id = *next_value;
        *next_value += 1;
        self.rows.push(Row {
            service,
            kind,
            internal_id,
            external_id,
            reservation_status,
        });
        Ok(internal_id)
    }
}

/// Identifier store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryIdMappingRepository {
    state: Mutex<State>,
}

impl InMemoryIdMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value the next minted id of `kind` will take.
    pub async fn next_internal_id(&self, kind: EntityKind) -> InternalId {
        let state = self.state.lock().await;
        state.next_values.get(&kind).copied().unwrap_or(1)
    }

    /// Number of rows stored for `service` and `kind`.
    pub async fn count(&self, service: Service, kind: EntityKind) -> usize {
        let state = self.state.lock().await;
        state.rows.iter().filter(|row| row.is(service, kind)).count()
    }
}

#[async_trait]
impl IdMappingRepository for InMemoryIdMappingRepository {
    async fn external_id_for(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
    ) -> Result<Option<ExternalId>, IdMappingError> {
        let state = self.state.lock().await;
        Ok(state
            .find(service, kind, internal_id)
            .map(|index| state.rows[index].external_id))
    }

    async fn internal_id_for(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<Option<InternalId>, IdMappingError> {
        let state = self.state.lock().await;
        Ok(state
            .find_external(service, kind, external_id)
            .map(|index| state.rows[index].internal_id))
    }

    async fn create_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
        status: Option<ReservationStatus>,
    ) -> Result<InternalId, IdMappingError> {
        let mut state = self.state.lock().await;
        if state.find_external(service, kind, external_id).is_some() {
            return Err(IdMappingError::DuplicateExternalId {
                service,
                kind,
                external_id,
            });
        }
        state.mint(service, kind, external_id, status)
    }

    async fn get_or_create_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<InternalId, IdMappingError> {
        let mut state = self.state.lock().await;
        match state.find_external(service, kind, external_id) {
            Some(index) => Ok(state.rows[index].internal_id),
            None => state.mint(service, kind, external_id, None),
        }
    }

    async fn insert_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
        external_id: ExternalId,
    ) -> Result<(), IdMappingError> {
        let mut state = self.state.lock().await;
        if let Some(index) = state.find_external(service, kind, external_id) {
            if state.rows[index].internal_id != internal_id {
                return Err(IdMappingError::DuplicateExternalId {
                    service,
                    kind,
                    external_id,
                });
            }
        }
        match state.find(service, kind, internal_id) {
            Some(index) => state.rows[index].external_id = external_id,
            None => state.rows.push(Row {
                service,
                kind,
                internal_id,
                external_id,
                reservation_status: None,
            }),
        }
        Ok(())
    }

    async fn repoint_or_delete(
        &self,
        service: Service,
        kind: EntityKind,
        old_internal_id: InternalId,
        new_internal_id: InternalId,
    ) -> Result<MergeOutcome, IdMappingError> {
        let mut state = self.state.lock().await;
        let Some(old_index) = state.find(service, kind, old_internal_id) else {
            return Ok(MergeOutcome::Missing);
        };
        if old_internal_id == new_internal_id {
            return Ok(MergeOutcome::Repointed);
        }
        if state.find(service, kind, new_internal_id).is_some() {
            state.rows.remove(old_index);
            Ok(MergeOutcome::DiscardedDuplicate)
        } else {
            state.rows[old_index].internal_id = new_internal_id;
            Ok(MergeOutcome::Repointed)
        }
    }

    async fn set_reservation_status(
        &self,
        service: Service,
        internal_id: InternalId,
        status: ReservationStatus,
    ) -> Result<Option<ReservationMapping>, IdMappingError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.find(service, EntityKind::Reservation, internal_id) else {
            return Ok(None);
        };
        let row = &mut state.rows[index];
        row.reservation_status = Some(status);
        Ok(row.as_reservation())
    }

    async fn get_reservation(
        &self,
        service: Service,
        internal_id: InternalId,
    ) -> Result<Option<ReservationMapping>, IdMappingError> {
        let state = self.state.lock().await;
        Ok(state
            .find(service, EntityKind::Reservation, internal_id)
            .and_then(|index| state.rows[index].as_reservation()))
    }

    async fn get_reservation_by_external_id(
        &self,
        service: Service,
        external_id: ExternalId,
    ) -> Result<Option<ReservationMapping>, IdMappingError> {
        let state = self.state.lock().await;
        Ok(state
            .find_external(service, EntityKind::Reservation, external_id)
            .and_then(|index| state.rows[index].as_reservation()))
    }

    async fn delete_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
    ) -> Result<bool, IdMappingError> {
        let mut state = self.state.lock().await;
        match state.find(service, kind, internal_id) {
            Some(index) => {
                state.rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
