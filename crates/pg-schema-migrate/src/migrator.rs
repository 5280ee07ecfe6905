//! The migration engine: configuration, ledger reading, and `apply`.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tracing::debug;

use crate::connection::{Connection, Queryer};
use crate::error::{Result, SchemaError};
use crate::lock;
use crate::migration::{execution_plan, AppliedMigration, Migration};
use crate::quoting::quoted_table_name;
use crate::sql;

/// Name of the tracking table used when none is configured.
pub const DEFAULT_TABLE_NAME: &str = "schema_migrations";

/// Caller-injected sink for the migrator's progress messages.
///
/// The migrator reports lock acquisition/release and each applied migration
/// through this sink. It is write-only from the migrator's perspective and
/// has no way to fail; whatever the sink does with the text can never affect
/// the outcome of [`Migrator::apply`].
pub trait Logger: Send + Sync {
    /// Accept one progress message.
    fn log(&self, message: &str);
}

/// A [`Logger`] that forwards progress messages to `tracing` at INFO level.
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!("{message}");
    }
}

/// An instance configured to run migrations against a particular tracking
/// table.
///
/// Construction is cheap and the value is immutable afterwards; build one
/// per tracking-table identity and reuse it. Two migrators configured with
/// the same `(schema_name, table_name)` pair derive the same advisory lock
/// key and therefore serialize each other's [`apply`](Migrator::apply)
/// calls, across processes and hosts.
pub struct Migrator {
    schema_name: Option<String>,
    table_name: String,
    logger: Option<Arc<dyn Logger>>,
}

impl Migrator {
    /// Create a migrator tracking against [`DEFAULT_TABLE_NAME`], with no
    /// schema qualifier (the connection's `search_path` resolves the table)
    /// and no logger.
    pub fn new() -> Self {
        Self {
            schema_name: None,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            logger: None,
        }
    }

    /// Set the schema the tracking table lives in.
    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Set the tracking table name.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Set the progress-message sink.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The configured schema qualifier, if any.
    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    /// The configured tracking table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The quoted, schema-qualified tracking table name as it appears in
    /// generated SQL.
    pub fn quoted_table_name(&self) -> String {
        quoted_table_name(self.schema_name.as_deref(), &self.table_name)
    }

    /// The advisory lock key serializing this migrator's `apply` calls.
    pub fn advisory_lock_id(&self) -> i64 {
        lock::advisory_lock_id(&self.table_name)
    }

    /// Apply any supplied migrations which have not yet been applied.
    ///
    /// The call blocks until it holds the tracking table's advisory lock,
    /// ensures the tracking table exists, then runs every not-yet-applied
    /// migration in id order inside a single transaction, recording each in
    /// the tracking table as it goes. The transaction commits only if every
    /// planned migration succeeded; otherwise it rolls back and the ledger
    /// shows none of them. The lock is released on every path.
    ///
    /// Calling this again with the same set is safe and cheap: the second
    /// call computes an empty plan and executes nothing. An empty
    /// `migrations` slice returns immediately without touching the database
    /// at all.
    ///
    /// # Errors
    ///
    /// See [`SchemaError`] for the failure classes. A failing migration is
    /// reported with its id and the database's complaint; a lock-release
    /// failure during unwind is appended to the primary error rather than
    /// replacing it.
    pub async fn apply<C>(&self, db: &mut C, migrations: &[Migration]) -> Result<()>
    where
        C: Connection + ?Sized,
    {
        if migrations.is_empty() {
            debug!("no migrations supplied, nothing to do");
            return Ok(());
        }

        let lock_id = self.advisory_lock_id();
        lock::acquire(&*db, lock_id).await?;
        self.log(&format!("acquired advisory lock {lock_id}"));

        let result = self.apply_locked(db, migrations).await;

        let released = lock::release(&*db, lock_id).await;
        if released.is_ok() {
            self.log(&format!("released advisory lock {lock_id}"));
        }

        match (result, released) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(release)) => Err(release),
            (Err(primary), Ok(())) => Err(primary),
            (Err(primary), Err(release)) => Err(SchemaError::ReleaseAfterFailure {
                primary: Box::new(primary),
                release: Box::new(release),
            }),
        }
    }

    /// Retrieve all already-applied migrations, keyed by migration id.
    ///
    /// Works through a plain connection or an open transaction. If the
    /// tracking table does not exist this surfaces as a
    /// [`SchemaError::LedgerRead`] rather than an empty map: an absent table
    /// means nothing was ever applied, including creation of the table
    /// itself, and callers get to distinguish that from "present but empty".
    pub async fn applied_migrations<Q>(&self, db: &Q) -> Result<HashMap<String, AppliedMigration>>
    where
        Q: Queryer + ?Sized,
    {
        let table = self.quoted_table_name();
        let rows = db
            .query(&sql::select_sql(&table), &[])
            .await
            .map_err(|e| SchemaError::ledger_read(&table, e))?;

        let mut applied = HashMap::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id")?;
            let checksum: String = row.try_get("checksum")?;
            let execution_time_in_millis: i32 = row.try_get("execution_time_in_millis")?;
            let applied_at: DateTime<Utc> = row.try_get("applied_at")?;
            applied.insert(
                id.clone(),
                AppliedMigration {
                    migration: Migration {
                        id,
                        script: String::new(),
                    },
                    checksum,
                    execution_time_in_millis,
                    applied_at,
                },
            );
        }
        Ok(applied)
    }

    /// Everything that happens while the advisory lock is held.
    async fn apply_locked<C>(&self, db: &mut C, migrations: &[Migration]) -> Result<()>
    where
        C: Connection + ?Sized,
    {
        self.ensure_migrations_table(db).await?;

        let tx = db.begin().await?;
        let outcome = AssertUnwindSafe(self.run_pending(&*tx, migrations))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(SchemaError::Fault(panic_message(panic.as_ref()))));

        match outcome {
            Ok(()) => tx.commit().await,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    debug!(error = %rollback_err, "rollback after failed apply also failed");
                }
                Err(err)
            }
        }
    }

    /// Idempotently create the tracking table, inside its own transaction
    /// boundary, distinct from the execution transaction. Safe to run
    /// repeatedly and concurrently; the advisory lock serializes the racing
    /// first-ever runs.
    async fn ensure_migrations_table<C>(&self, db: &mut C) -> Result<()>
    where
        C: Connection + ?Sized,
    {
        let table = self.quoted_table_name();
        let tx = db
            .begin()
            .await
            .map_err(|e| SchemaError::provision(&table, e))?;
        if let Err(e) = tx.batch_execute(&sql::create_table_sql(&table)).await {
            let _ = tx.rollback().await;
            return Err(SchemaError::provision(&table, e));
        }
        tx.commit()
            .await
            .map_err(|e| SchemaError::provision(&table, e))?;
        debug!(table = %table, "migrations table ensured");
        Ok(())
    }

    /// Read the ledger, diff it against the supplied migrations, and run
    /// whatever is pending, all through the open execution transaction.
    async fn run_pending<Q>(&self, tx: &Q, migrations: &[Migration]) -> Result<()>
    where
        Q: Queryer + ?Sized,
    {
        let applied = self.applied_migrations(tx).await?;
        let plan = execution_plan(&applied, migrations);
        debug!(
            pending = plan.len(),
            already_applied = migrations.len() - plan.len(),
            "computed execution plan"
        );

        for migration in &plan {
            self.run_migration(tx, migration).await?;
        }
        Ok(())
    }

    /// Execute one migration's script and record it in the ledger, both
    /// through the open execution transaction.
    async fn run_migration<Q>(&self, tx: &Q, migration: &Migration) -> Result<()>
    where
        Q: Queryer + ?Sized,
    {
        let applied_at = Utc::now();
        let started = Instant::now();

        tx.batch_execute(&migration.script)
            .await
            .map_err(|e| SchemaError::migration(&migration.id, e))?;

        let elapsed = started.elapsed();
        self.log(&format!(
            "migration '{}' applied in {elapsed:?}",
            migration.id
        ));

        let checksum = migration.checksum();
        let execution_time_in_millis = i32::try_from(elapsed.as_millis()).unwrap_or(i32::MAX);
        tx.execute(
            &sql::insert_sql(&self.quoted_table_name()),
            &[&migration.id, &checksum, &execution_time_in_millis, &applied_at],
        )
        .await?;
        Ok(())
    }

    fn log(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.log(message);
        }
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a panic payload as text for [`SchemaError::Fault`].
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic of unknown type".to_string()
    }
}
