use crate::repositories::StoreError;
use crate::DbPool;

/// Rejects anything but a plain SQL identifier, since table names are
/// interpolated into statements.
pub fn checked_table_name(table: &str) -> Result<&str, StoreError> {
    let mut chars = table.chars();
    let plain = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    };

    if plain {
        Ok(table)
    } else {
        Err(StoreError::Configuration(format!("`{table}` is not a plain table identifier")))
    }
}

/// Creates the customer table when it does not exist yet. Returns whether it was created.
pub async fn ensure_schema(pool: &DbPool, table: &str) -> Result<bool, StoreError> {
    let table = checked_table_name(table)?;

    let (existing,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;
    if existing > 0 {
        return Ok(false);
    }

    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY NOT NULL CHECK (length(id) > 0),
            name TEXT,
            email TEXT,
            created_at TEXT NOT NULL
        )"
    );
    sqlx::query(&ddl).execute(pool).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::{checked_table_name, ensure_schema};
    use crate::connect_with_settings;

    #[test]
    fn table_names_are_checked() {
        assert!(checked_table_name("customers").is_ok());
        assert!(checked_table_name("_archive_2024").is_ok());
        assert!(checked_table_name("").is_err());
        assert!(checked_table_name("2024_customers").is_err());
        assert!(checked_table_name("customers; DROP TABLE x").is_err());
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        assert!(ensure_schema(&pool, "customers").await.expect("first ensure"));
        assert!(!ensure_schema(&pool, "customers").await.expect("second ensure"));

        let rejected = sqlx::query(
            "INSERT INTO customers (id, name, email, created_at) VALUES ('', 'A', NULL, 'now')",
        )
        .execute(&pool)
        .await;
        assert!(rejected.is_err(), "empty identifiers should violate the table check");

        pool.close().await;
    }
}
