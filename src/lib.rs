//! Daily device online/offline summaries loaded from report files.
//!
//! A run scans one folder for region-marked `.csv` / `.csv.gz` reports,
//! pulls the `YYYY.MM.DD` date out of each filename, sums the `Online:` and
//! `Offline:` values inside, and upserts one `device_status_summary` row per
//! date in a single transaction.
//!
//! Modules are leaves-first: `date` and `counts` know nothing about storage,
//! `store` and `schema` know nothing about files, and `ingest` composes them.

pub mod config;
pub mod counts;
pub mod date;
pub mod error;
pub mod ingest;
pub mod models;
pub mod schema;
pub mod store;

pub use config::Config;
pub use counts::{count_devices, parse_status_line, Compression};
pub use date::extract_date;
pub use error::{IngestError, Result};
pub use ingest::{classify, process_directory};
pub use models::{DeviceCounts, DeviceStatusSummary, RunReport, UpsertOutcome};
pub use store::{SummaryStore, SummaryTx};
