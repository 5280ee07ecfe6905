//! Identifier quoting for the migrations tracking table.
//!
//! The tracking table name is configuration-supplied rather than
//! attacker-controlled, but it still ends up interpolated into DDL and DML
//! (identifiers cannot be bound as statement parameters), so it is never
//! trusted blindly.
//!
//! # Policy
//!
//! Rather than doubling embedded quote characters (standard SQL escaping),
//! this module strips them, along with whitespace and statement terminators.
//! Stripping is a deliberate simplification: the only identifier that flows
//! through here is the tracking table's, and a name that needs embedded
//! quotes in it is a configuration mistake, not something to round-trip.

/// Quote a PostgreSQL identifier.
///
/// Strips whitespace, the `"` quote character and the `;` statement
/// terminator, then wraps the remainder in double quotes. An identifier
/// that strips to nothing yields `""`, which is degenerate but tolerated;
/// callers must not configure a table name that strips to empty.
///
/// # Examples
///
/// ```
/// use pg_schema_migrate::quoted_ident;
///
/// assert_eq!(quoted_ident("users"), "\"users\"");
/// assert_eq!(quoted_ident("public\"; DROP TABLE x"), "\"publicDROPTABLEx\"");
/// ```
pub fn quoted_ident(ident: &str) -> String {
    let cleaned: String = ident
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"' && *c != ';')
        .collect();
    format!("\"{cleaned}\"")
}

/// Quote and qualify the migrations tracking table name.
///
/// Returns `"schema"."table"` when a schema is configured, else the bare
/// quoted table name (leaving the connection's `search_path` to resolve it).
pub fn quoted_table_name(schema_name: Option<&str>, table_name: &str) -> String {
    match schema_name {
        Some(schema) if !schema.is_empty() => {
            format!("{}.{}", quoted_ident(schema), quoted_ident(table_name))
        }
        _ => quoted_ident(table_name),
    }
}
