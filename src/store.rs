//! Storage handle for `device_status_summary`.
//!
//! The connection string picks the backend: `postgres://` (or
//! `postgresql://`) for PostgreSQL, `mysql://` for MySQL, `sqlite:` for
//! SQLite. SQLAlchemy-style driver suffixes (`mysql+pymysql://`) are
//! accepted. Either way the pool is capped at one connection, so a run owns
//! exactly one session.

use std::{borrow::Cow, str::FromStr, time::Duration};

use chrono::NaiveDate;
use sqlx::{
    mysql::MySqlPoolOptions,
    postgres::PgPoolOptions,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    MySql, MySqlPool, PgPool, Postgres, Sqlite, SqlitePool, Transaction,
};

use crate::error::{IngestError, Result};
use crate::models::{DeviceStatusSummary, UpsertOutcome};

// ---

const PG_LOOKUP: &str = r#"SELECT filename FROM device_status_summary WHERE "date" = $1"#;
const PG_UPSERT: &str = r#"
    INSERT INTO device_status_summary ("date", online_count, offline_count, filename)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT ("date") DO UPDATE SET
        online_count  = EXCLUDED.online_count,
        offline_count = EXCLUDED.offline_count,
        filename      = EXCLUDED.filename
"#;
const PG_SELECT_ONE: &str = r#"
    SELECT "date", online_count, offline_count, filename
    FROM device_status_summary WHERE "date" = $1
"#;

const SQLITE_LOOKUP: &str = r#"SELECT filename FROM device_status_summary WHERE "date" = ?"#;
const SQLITE_UPSERT: &str = r#"
    INSERT INTO device_status_summary ("date", online_count, offline_count, filename)
    VALUES (?, ?, ?, ?)
    ON CONFLICT ("date") DO UPDATE SET
        online_count  = excluded.online_count,
        offline_count = excluded.offline_count,
        filename      = excluded.filename
"#;
const SQLITE_SELECT_ONE: &str = r#"
    SELECT "date", online_count, offline_count, filename
    FROM device_status_summary WHERE "date" = ?
"#;

const MYSQL_LOOKUP: &str = "SELECT filename FROM device_status_summary WHERE `date` = ?";
const MYSQL_UPSERT: &str = r#"
    INSERT INTO device_status_summary (`date`, online_count, offline_count, filename)
    VALUES (?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        online_count  = VALUES(online_count),
        offline_count = VALUES(offline_count),
        filename      = VALUES(filename)
"#;
const MYSQL_SELECT_ONE: &str = r#"
    SELECT `date`, online_count, offline_count, filename
    FROM device_status_summary WHERE `date` = ?
"#;
const MYSQL_SELECT_ALL: &str = r#"
    SELECT `date`, online_count, offline_count, filename
    FROM device_status_summary ORDER BY `date`
"#;

const SELECT_ALL: &str = r#"
    SELECT "date", online_count, offline_count, filename
    FROM device_status_summary ORDER BY "date"
"#;

/// Look the date up, then upsert, both on the same open transaction.
macro_rules! upsert_in {
    ($tx:expr, $lookup:expr, $upsert:expr, $row:expr) => {{
        let existed = sqlx::query($lookup)
            .bind($row.date)
            .fetch_optional(&mut **$tx)
            .await?
            .is_some();

        sqlx::query($upsert)
            .bind($row.date)
            .bind($row.online_count)
            .bind($row.offline_count)
            .bind(&$row.filename)
            .execute(&mut **$tx)
            .await?;

        if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        }
    }};
}

/// Connection to the summary table's database.
#[derive(Debug, Clone)]
pub enum SummaryStore {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl SummaryStore {
    // ---
    /// Open a single-connection pool for `url`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        // ---
        let normalized = normalize_url(url);
        let url: &str = &normalized;
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(timeout)
                .connect(url)
                .await?;
            Ok(Self::Postgres(pool))
        } else if url.starts_with("mysql://") {
            let pool = MySqlPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(timeout)
                .connect(url)
                .await?;
            Ok(Self::MySql(pool))
        } else if url.starts_with("sqlite:") {
            let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
            // An in-memory database lives only as long as its one connection.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .acquire_timeout(timeout)
                .connect_with(options)
                .await?;
            Ok(Self::Sqlite(pool))
        } else {
            Err(IngestError::UnsupportedDatabaseUrl(url.to_string()))
        }
    }

    /// Start the run's transaction. Dropping it without commit rolls back.
    pub async fn begin(&self) -> Result<SummaryTx> {
        // ---
        Ok(match self {
            Self::Postgres(pool) => SummaryTx::Postgres(pool.begin().await?),
            Self::MySql(pool) => SummaryTx::MySql(pool.begin().await?),
            Self::Sqlite(pool) => SummaryTx::Sqlite(pool.begin().await?),
        })
    }

    /// Committed row for `date`, if any.
    pub async fn fetch_summary(&self, date: NaiveDate) -> Result<Option<DeviceStatusSummary>> {
        // ---
        let row = match self {
            Self::Postgres(pool) => {
                sqlx::query_as::<_, DeviceStatusSummary>(PG_SELECT_ONE)
                    .bind(date)
                    .fetch_optional(pool)
                    .await?
            }
            Self::MySql(pool) => {
                sqlx::query_as::<_, DeviceStatusSummary>(MYSQL_SELECT_ONE)
                    .bind(date)
                    .fetch_optional(pool)
                    .await?
            }
            Self::Sqlite(pool) => {
                sqlx::query_as::<_, DeviceStatusSummary>(SQLITE_SELECT_ONE)
                    .bind(date)
                    .fetch_optional(pool)
                    .await?
            }
        };
        Ok(row)
    }

    /// All committed rows ordered by date.
    pub async fn list_summaries(&self) -> Result<Vec<DeviceStatusSummary>> {
        // ---
        let rows = match self {
            Self::Postgres(pool) => {
                sqlx::query_as::<_, DeviceStatusSummary>(SELECT_ALL)
                    .fetch_all(pool)
                    .await?
            }
            Self::MySql(pool) => {
                sqlx::query_as::<_, DeviceStatusSummary>(MYSQL_SELECT_ALL)
                    .fetch_all(pool)
                    .await?
            }
            Self::Sqlite(pool) => {
                sqlx::query_as::<_, DeviceStatusSummary>(SELECT_ALL)
                    .fetch_all(pool)
                    .await?
            }
        };
        Ok(rows)
    }

    /// Release the connection.
    pub async fn close(&self) {
        // ---
        match self {
            Self::Postgres(pool) => pool.close().await,
            Self::MySql(pool) => pool.close().await,
            Self::Sqlite(pool) => pool.close().await,
        }
    }
}

/// Drop a SQLAlchemy driver suffix from the scheme (`mysql+pymysql://` → `mysql://`).
pub fn normalize_url(url: &str) -> Cow<'_, str> {
    // ---
    match url.split_once("://") {
        Some((scheme, rest)) if scheme.contains('+') => {
            let base = scheme.split('+').next().unwrap_or(scheme);
            Cow::Owned(format!("{base}://{rest}"))
        }
        _ => Cow::Borrowed(url),
    }
}

/// The single open transaction of one directory run.
pub enum SummaryTx {
    Postgres(Transaction<'static, Postgres>),
    MySql(Transaction<'static, MySql>),
    Sqlite(Transaction<'static, Sqlite>),
}

impl SummaryTx {
    // ---
    /// Insert the row for its date, or overwrite counts and filename if one exists.
    pub async fn upsert(&mut self, row: &DeviceStatusSummary) -> Result<UpsertOutcome> {
        // ---
        let outcome = match self {
            Self::Postgres(tx) => upsert_in!(tx, PG_LOOKUP, PG_UPSERT, row),
            Self::MySql(tx) => upsert_in!(tx, MYSQL_LOOKUP, MYSQL_UPSERT, row),
            Self::Sqlite(tx) => upsert_in!(tx, SQLITE_LOOKUP, SQLITE_UPSERT, row),
        };
        Ok(outcome)
    }

    pub async fn commit(self) -> Result<()> {
        // ---
        match self {
            Self::Postgres(tx) => tx.commit().await?,
            Self::MySql(tx) => tx.commit().await?,
            Self::Sqlite(tx) => tx.commit().await?,
        }
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        // ---
        match self {
            Self::Postgres(tx) => tx.rollback().await?,
            Self::MySql(tx) => tx.rollback().await?,
            Self::Sqlite(tx) => tx.rollback().await?,
        }
        Ok(())
    }
}
