//! SQL dialect hook for array-valued tag columns
//!
//! Only the nested tag mode needs backend-specific syntax: turning an
//! array/JSON column into rows with a `value` column. Placeholders are not a
//! dialect concern here — the params contract fixes them to `$N` regardless of
//! backend, and the executing layer is expected to honor that numbering.

/// SQL dialect trait for array-column access
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Table expression yielding one row per array element, exposing the
    /// element under a `value` column.
    ///
    /// - SQLite: `json_each(col)`
    /// - PostgreSQL: `UNNEST(col) AS t(value)`
    fn array_values(&self, column: &str) -> String;
}

/// SQLite dialect: JSON-encoded array columns via `json_each`.
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn array_values(&self, column: &str) -> String {
        format!("json_each({})", column)
    }
}

/// PostgreSQL dialect: native array columns via `UNNEST`.
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn array_values(&self, column: &str) -> String {
        format!("UNNEST({}) AS t(value)", column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_array_values() {
        assert_eq!(SqliteDialect.array_values("tags"), "json_each(tags)");
        assert_eq!(SqliteDialect.name(), "sqlite");
    }

    #[test]
    fn test_postgres_array_values() {
        assert_eq!(
            PostgresDialect.array_values("i.tags"),
            "UNNEST(i.tags) AS t(value)"
        );
        assert_eq!(PostgresDialect.name(), "postgres");
    }
}
