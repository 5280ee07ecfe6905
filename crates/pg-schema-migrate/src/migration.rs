//! Migration model and execution-plan computation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// A yet-to-be-run change to the schema. This is the type handed to
/// [`Migrator::apply`](crate::Migrator::apply) to request a schema change.
///
/// `id` is the sole key: it must be globally unique and must never be reused
/// for different script content once applied. The engine cannot detect that
/// misuse. Byte-wise ordering of `id` defines execution precedence, so a
/// sortable scheme (a timestamp prefix, a zero-padded sequence number) is the
/// expected convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Globally unique, sortable identifier.
    pub id: String,

    /// Database-native statement batch to execute. May contain multiple
    /// statements; it runs as one unit inside the execution transaction.
    pub script: String,
}

impl Migration {
    /// Create a migration from an id and a script body.
    pub fn new(id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: script.into(),
        }
    }

    /// Compute the MD5 fingerprint of the script body as 32 lowercase hex
    /// characters.
    ///
    /// This is a change-detection aid, not a security measure; it is what
    /// gets persisted in the ledger's `checksum` column at execution time.
    pub fn checksum(&self) -> String {
        let digest = Md5::digest(self.script.as_bytes());
        hex::encode(digest)
    }
}

/// A successfully executed migration as recorded in the tracking table.
///
/// Holds the [`Migration`] value it was produced from plus the execution
/// results. Rows read back from the ledger carry an empty `script`, since
/// script bodies are not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    /// The migration this record was produced from.
    pub migration: Migration,

    /// MD5 fingerprint of the script at the time it was executed.
    pub checksum: String,

    /// Wall-clock time the script took to execute, in milliseconds.
    pub execution_time_in_millis: i32,

    /// When the script began executing (not when it completed).
    pub applied_at: DateTime<Utc>,
}

/// Compute the execution plan: the requested migrations not yet present in
/// the ledger, sorted ascending by id.
///
/// Re-sorting regardless of input order is deliberate. Callers accumulate
/// migrations from multiple sources over the life of an application, and
/// append order must not leak into execution order; only the id defines
/// precedence. Supplying two migrations with equal ids is caller error and
/// leaves the result unspecified.
pub fn execution_plan(
    applied: &HashMap<String, AppliedMigration>,
    requested: &[Migration],
) -> Vec<Migration> {
    let mut plan: Vec<Migration> = requested
        .iter()
        .filter(|m| !applied.contains_key(&m.id))
        .cloned()
        .collect();
    plan.sort_by(|a, b| a.id.cmp(&b.id));
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied_record(id: &str) -> AppliedMigration {
        AppliedMigration {
            migration: Migration::new(id, ""),
            checksum: String::new(),
            execution_time_in_millis: 0,
            applied_at: Utc::now(),
        }
    }

    // =========================================================================
    // Checksum tests
    // =========================================================================

    #[test]
    fn test_checksum_known_vectors() {
        assert_eq!(
            Migration::new("001", "").checksum(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            Migration::new("001", "CREATE TABLE albums (id SERIAL PRIMARY KEY)").checksum(),
            "3d20bc0d9cbf01ed3ef81760d960769d"
        );
        assert_eq!(
            Migration::new("001", "SELECT 1;").checksum(),
            "71568061b2970a4b7c5160fe75356e10"
        );
    }

    #[test]
    fn test_checksum_depends_only_on_script_bytes() {
        let a = Migration::new("001", "SELECT 1;");
        let b = Migration::new("completely-different-id", "SELECT 1;");
        assert_eq!(a.checksum(), b.checksum());
        assert_ne!(a.checksum(), Migration::new("001", "SELECT 2;").checksum());
    }

    #[test]
    fn test_checksum_is_32_lowercase_hex_chars() {
        let sum = Migration::new("001", "CREATE TABLE t (id INT)").checksum();
        assert_eq!(sum.len(), 32);
        assert!(sum.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    // =========================================================================
    // Execution plan tests
    // =========================================================================

    #[test]
    fn test_plan_sorts_by_id_regardless_of_input_order() {
        let requested = vec![
            Migration::new("b", "SELECT 2"),
            Migration::new("a", "SELECT 1"),
            Migration::new("c", "SELECT 3"),
        ];
        let plan = execution_plan(&HashMap::new(), &requested);
        let ids: Vec<&str> = plan.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_plan_excludes_already_applied() {
        let mut applied = HashMap::new();
        applied.insert("2021-01-01 001".to_string(), applied_record("2021-01-01 001"));

        let requested = vec![
            Migration::new("2021-01-01 002", "SELECT 2"),
            Migration::new("2021-01-01 001", "SELECT 1"),
        ];
        let plan = execution_plan(&applied, &requested);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].id, "2021-01-01 002");
    }

    #[test]
    fn test_plan_empty_when_everything_applied() {
        let mut applied = HashMap::new();
        applied.insert("001".to_string(), applied_record("001"));
        applied.insert("002".to_string(), applied_record("002"));

        let requested = vec![Migration::new("001", ""), Migration::new("002", "")];
        assert!(execution_plan(&applied, &requested).is_empty());
    }

    #[test]
    fn test_plan_empty_input() {
        assert!(execution_plan(&HashMap::new(), &[]).is_empty());
    }

    #[test]
    fn test_plan_orders_bytewise() {
        // Byte-wise comparison, so "10" sorts before "9" unless ids are
        // zero-padded. The plan must reflect that, not numeric intuition.
        let requested = vec![Migration::new("9", ""), Migration::new("10", "")];
        let plan = execution_plan(&HashMap::new(), &requested);
        let ids: Vec<&str> = plan.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["10", "9"]);
    }
}
