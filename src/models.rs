//! Simple data models for the device status pipeline.

use chrono::NaiveDate;
use serde::Serialize;

// ---

/// Online/offline totals for one source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceCounts {
    // ---
    pub online: i64,
    pub offline: i64,
}

impl DeviceCounts {
    // ---
    pub fn new(online: i64, offline: i64) -> Self {
        Self { online, offline }
    }

    /// Fold one parsed line into the running totals.
    pub fn add(&mut self, online: i64, offline: i64) {
        self.online = self.online.saturating_add(online);
        self.offline = self.offline.saturating_add(offline);
    }
}

/// One persisted row of `device_status_summary`, keyed on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DeviceStatusSummary {
    // ---
    pub date: NaiveDate,
    pub online_count: i64,
    pub offline_count: i64,
    pub filename: String,
}

impl DeviceStatusSummary {
    // ---
    pub fn new(date: NaiveDate, counts: DeviceCounts, filename: impl Into<String>) -> Self {
        Self {
            date,
            online_count: counts.online,
            offline_count: counts.offline,
            filename: filename.into(),
        }
    }
}

/// Whether an upsert created the row for its date or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Tally of what one directory run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    // ---
    pub files_processed: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Relevant files whose name carried no `YYYY.MM.DD` token.
    pub skipped_no_date: usize,
    /// Entries without the region marker or a recognized suffix.
    pub skipped_filtered: usize,
}

impl RunReport {
    // ---
    pub fn record(&mut self, outcome: UpsertOutcome) {
        self.files_processed += 1;
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }
}
