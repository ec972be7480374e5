//! Integration tests for the PostgreSQL identifier store.
//!
//! These tests require a real PostgreSQL database and use SQLx test macros
//! to ensure proper test isolation and cleanup.
//!
//! Run with: `DATABASE_URL=... cargo test --test postgres_id_mappings -- --ignored`

use std::collections::HashSet;
use std::sync::Arc;

use propertease_wrapper_repository::{
    IdMappingError, IdMappingRepository, MergeOutcome, PostgresIdMappingRepository,
};
use propertease_wrapper_shared::{EntityKind, ReservationStatus, Service};

async fn next_value(pool: &sqlx::PgPool, kind: EntityKind) -> i64 {
    sqlx::query_scalar("SELECT next_value FROM sequence_ids WHERE entity_kind = $1")
        .bind(kind.as_str())
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn row_count(pool: &sqlx::PgPool, service: Service, kind: EntityKind) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM id_mappings WHERE service = $1 AND entity_kind = $2")
        .bind(service.as_str())
        .bind(kind.as_str())
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Minting
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_create_mapping_mints_from_one(pool: sqlx::PgPool) {
    let repository = PostgresIdMappingRepository::new(pool.clone()).await.unwrap();

    let first = repository
        .create_mapping(
            Service::Zooking,
            EntityKind::Reservation,
            17,
            Some(ReservationStatus::Confirmed),
        )
        .await
        .unwrap();
    let second = repository
        .create_mapping(
            Service::Zooking,
            EntityKind::Reservation,
            18,
            Some(ReservationStatus::Pending),
        )
        .await
        .unwrap();

    assert_eq!((first, second), (1, 2));
    assert_eq!(next_value(&pool, EntityKind::Reservation).await, 3);

    let stored = repository
        .get_reservation_by_external_id(Service::Zooking, 18)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.internal_id, 2);
    assert_eq!(stored.reservation_status, ReservationStatus::Pending);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_duplicate_external_id_leaves_counter_untouched(pool: sqlx::PgPool) {
    let repository = PostgresIdMappingRepository::new(pool.clone()).await.unwrap();
    repository
        .create_mapping(Service::Earthstayin, EntityKind::Property, 11, None)
        .await
        .unwrap();

    let err = repository
        .create_mapping(Service::Earthstayin, EntityKind::Property, 11, None)
        .await
        .unwrap_err();

    assert!(matches!(err, IdMappingError::DuplicateExternalId { external_id: 11, .. }));
    assert_eq!(next_value(&pool, EntityKind::Property).await, 2);
    assert_eq!(row_count(&pool, Service::Earthstayin, EntityKind::Property).await, 1);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_get_or_create_is_idempotent(pool: sqlx::PgPool) {
    let repository = PostgresIdMappingRepository::new(pool.clone()).await.unwrap();

    let first = repository
        .get_or_create_mapping(Service::Clickandgo, EntityKind::Property, 300)
        .await
        .unwrap();
    let again = repository
        .get_or_create_mapping(Service::Clickandgo, EntityKind::Property, 300)
        .await
        .unwrap();

    assert_eq!(first, again);
    assert_eq!(next_value(&pool, EntityKind::Property).await, 2);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_creates_never_share_an_id(pool: sqlx::PgPool) {
    let repository = Arc::new(PostgresIdMappingRepository::new(pool.clone()).await.unwrap());

    let mut handles = Vec::new();
    for external_id in 0..20 {
        let repository = repository.clone();
        let service = Service::ALL[external_id as usize % 3];
        handles.push(tokio::spawn(async move {
            repository
                .create_mapping(service, EntityKind::Reservation, external_id, Some(ReservationStatus::Pending))
                .await
                .unwrap()
        }));
    }

    let mut minted = HashSet::new();
    for handle in handles {
        assert!(minted.insert(handle.await.unwrap()));
    }
    assert_eq!(minted.len(), 20);
    assert_eq!(next_value(&pool, EntityKind::Reservation).await, 21);
}

// ============================================================================
// Lookups and deletes
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_lookups_are_scoped_per_service(pool: sqlx::PgPool) {
    let repository = PostgresIdMappingRepository::new(pool.clone()).await.unwrap();
    let internal_id = repository
        .create_mapping(Service::Zooking, EntityKind::Property, 5, None)
        .await
        .unwrap();

    assert_eq!(
        repository
            .external_id_for(Service::Zooking, EntityKind::Property, internal_id)
            .await
            .unwrap(),
        Some(5)
    );
    assert_eq!(
        repository
            .internal_id_for(Service::Earthstayin, EntityKind::Property, 5)
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        repository
            .internal_id_for(Service::Zooking, EntityKind::Reservation, 5)
            .await
            .unwrap(),
        None
    );
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_management_event_insert_and_delete(pool: sqlx::PgPool) {
    let repository = PostgresIdMappingRepository::new(pool.clone()).await.unwrap();
    let service = Service::Earthstayin;

    repository
        .insert_mapping(service, EntityKind::ManagementEvent, 30, 7)
        .await
        .unwrap();
    repository
        .insert_mapping(service, EntityKind::ManagementEvent, 30, 8)
        .await
        .unwrap();
    assert_eq!(
        repository
            .external_id_for(service, EntityKind::ManagementEvent, 30)
            .await
            .unwrap(),
        Some(8)
    );

    assert!(repository
        .delete_mapping(service, EntityKind::ManagementEvent, 30)
        .await
        .unwrap());
    assert!(!repository
        .delete_mapping(service, EntityKind::ManagementEvent, 30)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_set_reservation_status(pool: sqlx::PgPool) {
    let repository = PostgresIdMappingRepository::new(pool.clone()).await.unwrap();
    let internal_id = repository
        .create_mapping(
            Service::Clickandgo,
            EntityKind::Reservation,
            40,
            Some(ReservationStatus::Pending),
        )
        .await
        .unwrap();

    let updated = repository
        .set_reservation_status(Service::Clickandgo, internal_id, ReservationStatus::Canceled)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.external_id, 40);
    assert_eq!(updated.reservation_status, ReservationStatus::Canceled);
    assert_eq!(
        repository
            .get_reservation(Service::Clickandgo, internal_id)
            .await
            .unwrap(),
        Some(updated)
    );
    assert!(repository
        .set_reservation_status(Service::Zooking, internal_id, ReservationStatus::Canceled)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_reservation_without_status_reads_as_absent(pool: sqlx::PgPool) {
    let repository = PostgresIdMappingRepository::new(pool.clone()).await.unwrap();
    let service = Service::Zooking;
    let internal_id = repository
        .get_or_create_mapping(service, EntityKind::Reservation, 41)
        .await
        .unwrap();

    assert_eq!(
        repository
            .get_reservation_by_external_id(service, 41)
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        repository
            .get_or_create_mapping(service, EntityKind::Reservation, 41)
            .await
            .unwrap(),
        internal_id
    );

    repository
        .set_reservation_status(service, internal_id, ReservationStatus::Confirmed)
        .await
        .unwrap();
    let stored = repository
        .get_reservation_by_external_id(service, 41)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.internal_id, internal_id);
    assert_eq!(stored.reservation_status, ReservationStatus::Confirmed);
}

// ============================================================================
// Duplicate merge
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_merge_discards_when_canonical_row_exists(pool: sqlx::PgPool) {
    let repository = PostgresIdMappingRepository::new(pool.clone()).await.unwrap();
    let service = Service::Zooking;
    let canonical = repository
        .create_mapping(service, EntityKind::Property, 1, None)
        .await
        .unwrap();
    let duplicate = repository
        .create_mapping(service, EntityKind::Property, 2, None)
        .await
        .unwrap();

    let outcome = repository
        .repoint_or_delete(service, EntityKind::Property, duplicate, canonical)
        .await
        .unwrap();

    assert_eq!(outcome, MergeOutcome::DiscardedDuplicate);
    assert_eq!(
        repository
            .external_id_for(service, EntityKind::Property, canonical)
            .await
            .unwrap(),
        Some(1)
    );
    assert_eq!(
        repository
            .external_id_for(service, EntityKind::Property, duplicate)
            .await
            .unwrap(),
        None
    );
    assert_eq!(row_count(&pool, service, EntityKind::Property).await, 1);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_merge_repoints_when_canonical_row_is_absent(pool: sqlx::PgPool) {
    let repository = PostgresIdMappingRepository::new(pool.clone()).await.unwrap();
    let service = Service::Earthstayin;
    let old = repository
        .create_mapping(service, EntityKind::Property, 77, None)
        .await
        .unwrap();

    let outcome = repository
        .repoint_or_delete(service, EntityKind::Property, old, 500)
        .await
        .unwrap();
    assert_eq!(outcome, MergeOutcome::Repointed);
    assert_eq!(
        repository
            .internal_id_for(service, EntityKind::Property, 77)
            .await
            .unwrap(),
        Some(500)
    );

    let replay = repository
        .repoint_or_delete(service, EntityKind::Property, old, 500)
        .await
        .unwrap();
    assert_eq!(replay, MergeOutcome::Missing);
}
