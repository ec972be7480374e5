//! PostgreSQL implementation of the identifier store.
//!
//! ## Database Tables
//!
//! - `sequence_ids`: one counter row per sequenced entity kind, holding the next free internal id
//! - `id_mappings`: one row per external entity, keyed by `(service, entity_kind, internal_id)`
//!   with `(service, entity_kind, external_id)` unique
//!
//! Minting locks the kind's counter row with `SELECT ... FOR UPDATE` and inserts the
//! mapping in the same transaction, so processes sharing the database never mint the
//! same internal id.
use async_trait::async_trait;
use propertease_wrapper_shared::{
    EntityKind, ExternalId, InternalId, ReservationMapping, ReservationStatus, Service,
};

use crate::{IdMappingError, IdMappingRepository, MergeOutcome, MIGRATOR};

type PgTransaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

#[derive(sqlx::FromRow)]
struct ReservationRow {
    internal_id: i64,
    external_id: i64,
    reservation_status: Option<String>,
}

impl TryFrom<ReservationRow> for ReservationMapping {
    type Error = IdMappingError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let reservation_status = row
            .reservation_status
            .as_deref()
            .unwrap_or_default()
            .parse::<ReservationStatus>()?;
        Ok(ReservationMapping {
            internal_id: row.internal_id,
            external_id: row.external_id,
            reservation_status,
        })
    }
}

/// PostgreSQL-backed identifier store.
pub struct PostgresIdMappingRepository {
    pool: sqlx::PgPool,
}

impl PostgresIdMappingRepository {
    /// Creates a new repository over a configured connection pool.
    ///
    /// The schema is expected to exist; call [`Self::migrate`] first on a fresh database.
    pub async fn new(pool: sqlx::PgPool) -> Result<Self, IdMappingError> {
        Ok(Self { pool })
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), IdMappingError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Locks the counter row of `kind` for the rest of the transaction and returns its value.
    ///
    /// The row is created on first use so a counter always starts at 1.
    async fn lock_sequence_tx(
        &self,
        kind: EntityKind,
        tx: &mut PgTransaction<'_>,
    ) -> Result<InternalId, IdMappingError> {
        if !kind.is_sequenced() {
            return Err(IdMappingError::UnsequencedKind(kind));
        }

        sqlx::query(
            "INSERT INTO sequence_ids (entity_kind, next_value) VALUES ($1, 1) ON CONFLICT (entity_kind) DO NOTHING",
        )
        .bind(kind.as_str())
        .execute(&mut **tx)
        .await?;

        let next_value: i64 =
            sqlx::query_scalar("SELECT next_value FROM sequence_ids WHERE entity_kind = $1 FOR UPDATE")
                .bind(kind.as_str())
                .fetch_one(&mut **tx)
                .await?;

        Ok(next_value)
    }

    async fn internal_id_for_tx(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
        tx: &mut PgTransaction<'_>,
    ) -> Result<Option<InternalId>, IdMappingError> {
        let internal_id: Option<InternalId> = sqlx::query_scalar(
            "SELECT internal_id FROM id_mappings WHERE service = $1 AND entity_kind = $2 AND external_id = $3",
        )
        .bind(service.as_str())
        .bind(kind.as_str())
        .bind(external_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(internal_id)
    }

    /// Inserts the row under the locked counter value and advances the counter.
    async fn insert_minted_tx(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
        external_id: ExternalId,
        status: Option<ReservationStatus>,
        tx: &mut PgTransaction<'_>,
    ) -> Result<(), IdMappingError> {
        sqlx::query(
            "INSERT INTO id_mappings (service, entity_kind, internal_id, external_id, reservation_status) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(service.as_str())
        .bind(kind.as_str())
        .bind(internal_id)
        .bind(external_id)
        .bind(status.map(|status| status.as_str()))
        .execute(&mut **tx)
        .await?;

        sqlx::query("UPDATE sequence_ids SET next_value = next_value + 1 WHERE entity_kind = $1")
            .bind(kind.as_str())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn mapping_exists_tx(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
        tx: &mut PgTransaction<'_>,
    ) -> Result<bool, IdMappingError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT internal_id FROM id_mappings WHERE service = $1 AND entity_kind = $2 AND internal_id = $3 FOR UPDATE",
        )
        .bind(service.as_str())
        .bind(kind.as_str())
        .bind(internal_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(found.is_some())
    }
}

#[async_trait]
impl IdMappingRepository for PostgresIdMappingRepository {
    async fn external_id_for(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
    ) -> Result<Option<ExternalId>, IdMappingError> {
        let external_id: Option<ExternalId> = sqlx::query_scalar(
            "SELECT external_id FROM id_mappings WHERE service = $1 AND entity_kind = $2 AND internal_id = $3",
        )
        .bind(service.as_str())
        .bind(kind.as_str())
        .bind(internal_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(external_id)
    }

    async fn internal_id_for(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<Option<InternalId>, IdMappingError> {
        let internal_id: Option<InternalId> = sqlx::query_scalar(
            "SELECT internal_id FROM id_mappings WHERE service = $1 AND entity_kind = $2 AND external_id = $3",
        )
        .bind(service.as_str())
        .bind(kind.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(internal_id)
    }

    async fn create_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
        status: Option<ReservationStatus>,
    ) -> Result<InternalId, IdMappingError> {
        let mut tx = self.pool.begin().await?;
        let internal_id = self.lock_sequence_tx(kind, &mut tx).await?;

        if self
            .internal_id_for_tx(service, kind, external_id, &mut tx)
            .await?
            .is_some()
        {
            tx.rollback().await?;
            return Err(IdMappingError::DuplicateExternalId {
                service,
                kind,
                external_id,
            });
        }

        self.insert_minted_tx(service, kind, internal_id, external_id, status, &mut tx)
            .await?;
        tx.commit().await?;
        Ok(internal_id)
    }

    async fn get_or_create_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<InternalId, IdMappingError> {
        if let Some(internal_id) = self.internal_id_for(service, kind, external_id).await? {
            return Ok(internal_id);
        }

        // Re-check under the counter lock: another process may have mapped it meanwhile.
        let mut tx = self.pool.begin().await?;
        let next_value = self.lock_sequence_tx(kind, &mut tx).await?;
        if let Some(internal_id) = self
            .internal_id_for_tx(service, kind, external_id, &mut tx)
            .await?
        {
            tx.rollback().await?;
            return Ok(internal_id);
        }

        self.insert_minted_tx(service, kind, next_value, external_id, None, &mut tx)
            .await?;
        tx.commit().await?;
        Ok(next_value)
    }

    async fn insert_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
        external_id: ExternalId,
    ) -> Result<(), IdMappingError> {
        sqlx::query(
            "INSERT INTO id_mappings (service, entity_kind, internal_id, external_id) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (service, entity_kind, internal_id) DO UPDATE SET external_id = EXCLUDED.external_id",
        )
        .bind(service.as_str())
        .bind(kind.as_str())
        .bind(internal_id)
        .bind(external_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn repoint_or_delete(
        &self,
        service: Service,
        kind: EntityKind,
        old_internal_id: InternalId,
        new_internal_id: InternalId,
    ) -> Result<MergeOutcome, IdMappingError> {
        let mut tx = self.pool.begin().await?;

        if !self
            .mapping_exists_tx(service, kind, old_internal_id, &mut tx)
            .await?
        {
            tx.rollback().await?;
            return Ok(MergeOutcome::Missing);
        }

        // Already keyed under the canonical id.
        if old_internal_id == new_internal_id {
            tx.rollback().await?;
            return Ok(MergeOutcome::Repointed);
        }

        let outcome = if self
            .mapping_exists_tx(service, kind, new_internal_id, &mut tx)
            .await?
        {
            sqlx::query(
                "DELETE FROM id_mappings WHERE service = $1 AND entity_kind = $2 AND internal_id = $3",
            )
            .bind(service.as_str())
            .bind(kind.as_str())
            .bind(old_internal_id)
            .execute(&mut *tx)
            .await?;
            MergeOutcome::DiscardedDuplicate
        } else {
            sqlx::query(
                "UPDATE id_mappings SET internal_id = $4 WHERE service = $1 AND entity_kind = $2 AND internal_id = $3",
            )
            .bind(service.as_str())
            .bind(kind.as_str())
            .bind(old_internal_id)
            .bind(new_internal_id)
            .execute(&mut *tx)
            .await?;
            MergeOutcome::Repointed
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn set_reservation_status(
        &self,
        service: Service,
        internal_id: InternalId,
        status: ReservationStatus,
    ) -> Result<Option<ReservationMapping>, IdMappingError> {
        let row: Option<ReservationRow> = sqlx::query_as(
            "UPDATE id_mappings SET reservation_status = $3 \
             WHERE service = $1 AND entity_kind = 'reservation' AND internal_id = $2 \
             RETURNING internal_id, external_id, reservation_status",
        )
        .bind(service.as_str())
        .bind(internal_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReservationMapping::try_from).transpose()
    }

    async fn get_reservation(
        &self,
        service: Service,
        internal_id: InternalId,
    ) -> Result<Option<ReservationMapping>, IdMappingError> {
        let row: Option<ReservationRow> = sqlx::query_as(
            "SELECT internal_id, external_id, reservation_status FROM id_mappings \
             WHERE service = $1 AND entity_kind = 'reservation' AND internal_id = $2 \
             AND reservation_status IS NOT NULL",
        )
        .bind(service.as_str())
        .bind(internal_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReservationMapping::try_from).transpose()
    }

    async fn get_reservation_by_external_id(
        &self,
        service: Service,
        external_id: ExternalId,
    ) -> Result<Option<ReservationMapping>, IdMappingError> {
        let row: Option<ReservationRow> = sqlx::query_as(
            "SELECT internal_id, external_id, reservation_status FROM id_mappings \
             WHERE service = $1 AND entity_kind = 'reservation' AND external_id = $2 \
             AND reservation_status IS NOT NULL",
        )
        .bind(service.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReservationMapping::try_from).transpose()
    }

    async fn delete_mapping(
        &self,
        service: Service,
        kind: EntityKind,
        internal_id: InternalId,
    ) -> Result<bool, IdMappingError> {
        let result = sqlx::query(
            "DELETE FROM id_mappings WHERE service = $1 AND entity_kind = $2 AND internal_id = $3",
        )
        .bind(service.as_str())
        .bind(kind.as_str())
        .bind(internal_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
