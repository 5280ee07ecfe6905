//! # pg-schema-migrate
//!
//! Embedded PostgreSQL schema migrations for applications using
//! tokio-postgres (directly or through deadpool-postgres).
//!
//! Hand [`Migrator::apply`] a connection and the full, ordered set of
//! migrations your application wants in place. The migrator works out which
//! ones have not run yet, executes the missing ones exactly once each in id
//! order, and records them in a tracking table, safely even when many
//! instances of the application race each other at startup:
//!
//! - **At-most-once execution** across concurrent processes, coordinated
//!   with a PostgreSQL advisory lock derived from the tracking table's name
//! - **All-or-nothing batches**: every pending migration runs inside one
//!   transaction, so a failure leaves the ledger showing none of them
//! - **Deterministic order**: execution order is defined by migration id
//!   alone, never by the order migrations were collected in
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pg_schema_migrate::{Migration, Migrator, TracingLogger};
//! use tokio_postgres::NoTls;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (mut client, connection) =
//!         tokio_postgres::connect("host=localhost user=postgres", NoTls).await?;
//!     tokio::spawn(connection);
//!
//!     let migrations = vec![Migration::new(
//!         "2021-01-01 001 create users",
//!         "CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT NOT NULL)",
//!     )];
//!
//!     let migrator = Migrator::new().with_logger(Arc::new(TracingLogger));
//!     migrator.apply(&mut client, &migrations).await?;
//!     Ok(())
//! }
//! ```
//!
//! Run the same call at every startup; once everything has been applied it
//! reduces to a lock round-trip and one empty-plan transaction.
//!
//! ## Non-goals
//!
//! Down migrations, dependency graphs between migrations, and non-PostgreSQL
//! databases are out of scope. Loading migration scripts from files or
//! embedded assets is the caller's concern; this crate takes a slice of
//! [`Migration`] values however they were produced.

pub mod connection;
pub mod error;
pub mod lock;
pub mod migration;
pub mod migrator;
pub mod quoting;
pub mod sql;

pub use connection::{Connection, Queryer, TransactionHandle};
pub use error::{Result, SchemaError};
pub use lock::advisory_lock_id;
pub use migration::{execution_plan, AppliedMigration, Migration};
pub use migrator::{Logger, Migrator, TracingLogger, DEFAULT_TABLE_NAME};
pub use quoting::{quoted_ident, quoted_table_name};
