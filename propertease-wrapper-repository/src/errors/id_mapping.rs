use propertease_wrapper_shared::{EntityKind, ExternalId, ParseError, Service};
use thiserror::Error;

/// Represents errors that can occur within the identifier store.
///
/// A failed operation never leaves partial row state behind: every multi-statement
/// operation runs inside one transaction that is rolled back on error.
#[derive(Debug, Error)]
pub enum IdMappingError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("{service} {kind} with external id {external_id} is already mapped")]
    DuplicateExternalId {
        service: Service,
        kind: EntityKind,
        external_id: ExternalId,
    },

    #[error("{0} ids are assigned upstream and cannot be minted")]
    UnsequencedKind(EntityKind),

    #[error("Invalid stored value: {0}")]
    InvalidValue(#[from] ParseError),
}
