//! SQL statement builders for the migrations tracking table.
//!
//! Every statement that touches the tracking table is generated here from
//! the already-quoted table name, so the exact shape of the ledger lives in
//! one place. The table declares no primary key and no uniqueness constraint
//! on `id`: at-most-once execution is enforced by plan computation under the
//! advisory lock, not by the schema.

/// DDL for the tracking table. Safe to run repeatedly and concurrently.
pub fn create_table_sql(quoted_table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {quoted_table} (\n            \
             id VARCHAR(255) NOT NULL,\n            \
             checksum VARCHAR(32) NOT NULL DEFAULT '',\n            \
             execution_time_in_millis INTEGER NOT NULL DEFAULT 0,\n            \
             applied_at TIMESTAMP WITH TIME ZONE NOT NULL\n        \
         )"
    )
}

/// INSERT for one ledger row. Binds `(id, checksum, execution_time_in_millis,
/// applied_at)` as `$1..$4`.
pub fn insert_sql(quoted_table: &str) -> String {
    format!(
        "INSERT INTO {quoted_table} \
         ( id, checksum, execution_time_in_millis, applied_at ) \
         VALUES ( $1, $2, $3, $4 )"
    )
}

/// SELECT of every ledger row, id-ascending so callers iterate
/// deterministically.
pub fn select_sql(quoted_table: &str) -> String {
    format!(
        "SELECT id, checksum, execution_time_in_millis, applied_at \
         FROM {quoted_table} ORDER BY id ASC"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql_shape() {
        let sql = create_table_sql("\"schema_migrations\"");
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"schema_migrations\""));
        assert!(sql.contains("id VARCHAR(255) NOT NULL"));
        assert!(sql.contains("checksum VARCHAR(32) NOT NULL DEFAULT ''"));
        assert!(sql.contains("execution_time_in_millis INTEGER NOT NULL DEFAULT 0"));
        assert!(sql.contains("applied_at TIMESTAMP WITH TIME ZONE NOT NULL"));
        assert!(!sql.contains("PRIMARY KEY"));
        assert!(!sql.contains("UNIQUE"));
    }

    #[test]
    fn test_insert_sql_binds_four_parameters() {
        let sql = insert_sql("\"schema_migrations\"");
        assert!(sql.contains("INSERT INTO \"schema_migrations\""));
        assert!(sql.contains("( id, checksum, execution_time_in_millis, applied_at )"));
        assert!(sql.contains("( $1, $2, $3, $4 )"));
    }

    #[test]
    fn test_select_sql_orders_by_id() {
        let sql = select_sql("\"public\".\"schema_migrations\"");
        assert!(sql.contains("FROM \"public\".\"schema_migrations\""));
        assert!(sql.ends_with("ORDER BY id ASC"));
    }
}
