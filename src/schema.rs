//! Database schema management for `device-status-ingest`.
//!
//! Ensures the summary table exists before a run stages any writes.
//! Schema changes across runs are not handled.

use crate::error::Result;
use crate::store::SummaryStore;

// ---

const PG_CREATE: &str = r#"
    CREATE TABLE IF NOT EXISTS device_status_summary (
        "date"         DATE         PRIMARY KEY,
        online_count   BIGINT       NOT NULL,
        offline_count  BIGINT       NOT NULL,
        filename       VARCHAR(255) NOT NULL
    );
"#;

const MYSQL_CREATE: &str = r#"
    CREATE TABLE IF NOT EXISTS device_status_summary (
        `date`         DATE         NOT NULL PRIMARY KEY,
        online_count   BIGINT       NOT NULL,
        offline_count  BIGINT       NOT NULL,
        filename       VARCHAR(255) NOT NULL
    );
"#;

const SQLITE_CREATE: &str = r#"
    CREATE TABLE IF NOT EXISTS device_status_summary (
        "date"         TEXT    PRIMARY KEY,
        online_count   INTEGER NOT NULL,
        offline_count  INTEGER NOT NULL,
        filename       TEXT    NOT NULL
    );
"#;

/// Create the `device_status_summary` table (idempotent).
///
/// Safe to call on every run; no-op if the table already exists.
pub async fn create_schema(store: &SummaryStore) -> Result<()> {
    // ---
    match store {
        SummaryStore::Postgres(pool) => {
            let mut tx = pool.begin().await?;
            sqlx::query(PG_CREATE).execute(&mut *tx).await?;
            tx.commit().await?;
        }
        SummaryStore::MySql(pool) => {
            let mut tx = pool.begin().await?;
            sqlx::query(MYSQL_CREATE).execute(&mut *tx).await?;
            tx.commit().await?;
        }
        SummaryStore::Sqlite(pool) => {
            let mut tx = pool.begin().await?;
            sqlx::query(SQLITE_CREATE).execute(&mut *tx).await?;
            tx.commit().await?;
        }
    }
    tracing::debug!("device_status_summary table ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        // ---
        let store = SummaryStore::connect("sqlite::memory:", Duration::from_secs(5))
            .await
            .unwrap();

        create_schema(&store).await.unwrap();
        create_schema(&store).await.unwrap();

        assert!(store.list_summaries().await.unwrap().is_empty());
    }
}
