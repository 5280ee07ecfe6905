//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Error surfaced by the PostgreSQL driver.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Failure reported by a non-driver [`Queryer`](crate::Queryer)
    /// implementation (wrappers, instrumented connections, test doubles).
    #[error("connection error: {0}")]
    Connection(String),

    /// The advisory lock could not be acquired. Nothing was executed.
    #[error("failed to acquire advisory lock {lock_id}: {source}")]
    LockAcquire {
        lock_id: i64,
        #[source]
        source: Box<SchemaError>,
    },

    /// The advisory lock could not be released after an otherwise
    /// successful run. The migrations did apply; cleanup failed.
    #[error("failed to release advisory lock {lock_id}: {source}")]
    LockRelease {
        lock_id: i64,
        #[source]
        source: Box<SchemaError>,
    },

    /// Creating the migrations tracking table failed.
    #[error("failed to provision migrations table {table}: {source}")]
    Provision {
        table: String,
        #[source]
        source: Box<SchemaError>,
    },

    /// Reading the applied-migrations ledger failed. The most common cause
    /// is a tracking table that does not exist yet, which is meaningful
    /// signal and deliberately not collapsed into an empty result.
    #[error("failed to read applied migrations from {table}: {source}")]
    LedgerRead {
        table: String,
        #[source]
        source: Box<SchemaError>,
    },

    /// A migration script failed to execute. The transaction was rolled
    /// back; no ledger row for this or any later-planned migration exists.
    #[error("migration '{id}' failed: {source}")]
    Migration {
        id: String,
        #[source]
        source: Box<SchemaError>,
    },

    /// A panic raised while applying migrations, converted to an ordinary
    /// error so it takes the same rollback and unlock path.
    #[error("unexpected fault while applying migrations: {0}")]
    Fault(String),

    /// The advisory lock could not be released while unwinding from an
    /// earlier error. The primary error is preserved; the release failure
    /// is appended, never allowed to replace it.
    #[error("{primary}; additionally, releasing the advisory lock failed: {release}")]
    ReleaseAfterFailure {
        #[source]
        primary: Box<SchemaError>,
        release: Box<SchemaError>,
    },
}

impl SchemaError {
    /// Create a Provision error for the given tracking table.
    pub(crate) fn provision(table: impl Into<String>, source: SchemaError) -> Self {
        SchemaError::Provision {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Create a LedgerRead error for the given tracking table.
    pub(crate) fn ledger_read(table: impl Into<String>, source: SchemaError) -> Self {
        SchemaError::LedgerRead {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Create a Migration error naming the failed migration.
    pub(crate) fn migration(id: impl Into<String>, source: SchemaError) -> Self {
        SchemaError::Migration {
            id: id.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
