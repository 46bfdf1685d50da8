use common::RecordVersion;
use thiserror::Error;

/// Errors that can occur when interacting with the backing stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrency conflict occurred when saving a record.
    /// The record's version did not match the stored version.
    #[error(
        "Concurrency conflict for {kind} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        kind: &'static str,
        id: String,
        expected: RecordVersion,
        actual: RecordVersion,
    },

    /// A stored record could not be mapped back into its domain shape.
    #[error("Corrupt {kind} record {id}: {reason}")]
    Corrupt {
        kind: &'static str,
        id: String,
        reason: String,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
