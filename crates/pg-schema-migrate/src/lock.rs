//! Database-wide advisory locking.
//!
//! Concurrent `apply` calls against the same tracking table are serialized
//! with a session-scoped PostgreSQL advisory lock. Advisory locks exist
//! independently of any table or row, so the lock is obtainable before the
//! tracking table has ever been created, which matters because table
//! creation itself must be serialized on first run.
//!
//! Acquisition blocks with no timeout. That trade favors "no migration ever
//! runs twice or out of order" over availability; a caller that needs bounded
//! waiting applies a deadline at the connection layer.

use tracing::debug;

use crate::connection::Queryer;
use crate::error::{Result, SchemaError};

/// Salt mixed into the lock key so this engine's locks are unlikely to
/// collide with advisory locks other software derives from the same name.
const ADVISORY_LOCK_SALT: u32 = 542_384_964;

/// Derive the advisory lock key for a tracking table name.
///
/// CRC32-IEEE of the name, wrapping-multiplied by the salt, widened to the
/// `i64` range `pg_advisory_lock` accepts. Equal names always derive equal
/// keys; distinct names colliding is possible but with a 32-bit range
/// negligible in practice, and costs only spurious serialization, never
/// correctness.
pub fn advisory_lock_id(table_name: &str) -> i64 {
    let sum = crc32fast::hash(table_name.as_bytes()).wrapping_mul(ADVISORY_LOCK_SALT);
    i64::from(sum)
}

/// Block until the advisory lock identified by `lock_id` is held by this
/// session.
pub(crate) async fn acquire<Q: Queryer + ?Sized>(db: &Q, lock_id: i64) -> Result<()> {
    db.execute("SELECT pg_advisory_lock($1)", &[&lock_id])
        .await
        .map_err(|source| SchemaError::LockAcquire {
            lock_id,
            source: Box::new(source),
        })?;
    debug!(lock_id, "advisory lock acquired");
    Ok(())
}

/// Release the advisory lock identified by `lock_id`.
pub(crate) async fn release<Q: Queryer + ?Sized>(db: &Q, lock_id: i64) -> Result<()> {
    db.execute("SELECT pg_advisory_unlock($1)", &[&lock_id])
        .await
        .map_err(|source| SchemaError::LockRelease {
            lock_id,
            source: Box::new(source),
        })?;
    debug!(lock_id, "advisory lock released");
    Ok(())
}
