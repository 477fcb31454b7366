//! Directory run: filter report files, aggregate each, upsert one row per date.
//!
//! The whole run shares one transaction. It commits once after the last
//! entry; any error before that rolls everything back, so a failed run
//! leaves the table exactly as it was.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::counts::{count_devices, Compression};
use crate::date::extract_date;
use crate::error::{IngestError, Result};
use crate::models::{DeviceStatusSummary, RunReport, UpsertOutcome};
use crate::schema::create_schema;
use crate::store::{SummaryStore, SummaryTx};

const PLAIN_SUFFIX: &str = ".csv";
const GZIP_SUFFIX: &str = ".csv.gz";

// ---

/// Decide whether `filename` is a relevant report and how it is stored.
///
/// Returns `None` for names lacking `region_marker` or a `.csv` / `.csv.gz`
/// suffix.
pub fn classify(filename: &str, region_marker: &str) -> Option<Compression> {
    // ---
    if !filename.contains(region_marker) {
        return None;
    }
    if filename.ends_with(GZIP_SUFFIX) {
        Some(Compression::Gzip)
    } else if filename.ends_with(PLAIN_SUFFIX) {
        Some(Compression::Plain)
    } else {
        None
    }
}

/// Load every relevant report in `folder` into `store`.
///
/// Creates the table if needed, then stages one upsert per file inside a
/// single transaction and commits at the end. On error the transaction is
/// rolled back and the error returned; nothing from the run persists.
pub async fn process_directory(
    folder: &Path,
    store: &SummaryStore,
    region_marker: &str,
) -> Result<RunReport> {
    // ---
    create_schema(store).await?;

    let mut tx = store.begin().await?;
    match load_folder(folder, region_marker, &mut tx).await {
        Ok(report) => {
            tx.commit().await?;
            info!(
                "Run complete: {} files, {} inserted, {} updated, {} without date",
                report.files_processed, report.inserted, report.updated, report.skipped_no_date
            );
            Ok(report)
        }
        // The caller reports `e`; only the rollback is logged here.
        Err(e) => {
            warn!("Run aborted, rolling back device_status_summary changes");
            if let Err(rb) = tx.rollback().await {
                warn!("Rollback failed: {}", rb);
            }
            Err(e)
        }
    }
}

async fn load_folder(folder: &Path, region_marker: &str, tx: &mut SummaryTx) -> Result<RunReport> {
    // ---
    let mut report = RunReport::default();

    for (filename, path) in list_entries(folder)? {
        let Some(compression) = classify(&filename, region_marker) else {
            debug!("Skipping {}", filename);
            report.skipped_filtered += 1;
            continue;
        };

        let Some(date) = extract_date(&filename)? else {
            warn!("No date found in filename: {}", filename);
            report.skipped_no_date += 1;
            continue;
        };

        let counts = count_devices(&path, compression)?;
        let row = DeviceStatusSummary::new(date, counts, filename.as_str());

        let outcome = tx.upsert(&row).await?;
        match outcome {
            UpsertOutcome::Inserted => info!("Inserted: {} ({})", filename, date),
            UpsertOutcome::Updated => info!("Updated: {} ({})", filename, date),
        }
        report.record(outcome);
    }

    Ok(report)
}

/// Non-directory entries directly inside `folder`, sorted by name.
///
/// Symlinks are followed when deciding what is a directory. Names that are
/// not valid UTF-8 cannot carry the region marker and are dropped here.
fn list_entries(folder: &Path) -> Result<Vec<(String, PathBuf)>> {
    // ---
    let read_dir_err = |source| IngestError::ReadDir {
        path: folder.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => entries.push((name, path)),
            Err(raw) => debug!("Skipping non UTF-8 name {:?}", raw),
        }
    }

    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    #[test]
    fn test_classify() {
        // ---
        assert_eq!(classify("Chile_2024.01.01.csv", "Chile"), Some(Compression::Plain));
        assert_eq!(classify("Chile_2024.01.01.csv.gz", "Chile"), Some(Compression::Gzip));
        assert_eq!(classify("Peru_2024.01.01.csv", "Chile"), None);
        assert_eq!(classify("Chile_2024.01.01.txt", "Chile"), None);
        assert_eq!(classify("Chile_2024.01.01.csv.bak", "Chile"), None);
        assert_eq!(classify("chile_2024.01.01.csv", "Chile"), None);
    }

    #[test]
    fn test_list_entries_sorted_and_files_only() {
        // ---
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.csv"), "").unwrap();
        std::fs::write(dir.path().join("a.csv"), "").unwrap();
        std::fs::create_dir(dir.path().join("Chile_2024.01.01.csv")).unwrap();

        let names: Vec<String> = list_entries(dir.path())
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_entries_skips_symlinked_directory() {
        // ---
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Chile_2024.01.02.csv"), "").unwrap();
        std::os::unix::fs::symlink(target.path(), dir.path().join("Chile_2024.01.01.csv")).unwrap();

        let names: Vec<String> = list_entries(dir.path())
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["Chile_2024.01.02.csv"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_run_logs_rollback_without_repeating_error() {
        // ---
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Chile_2024.01.01.csv"), "x, Online: 1, Offline: 1\n").unwrap();
        std::fs::write(dir.path().join("Chile_2024.01.02.csv"), b"\xff\xfe\n").unwrap();

        let store = SummaryStore::connect("sqlite::memory:", Duration::from_secs(5))
            .await
            .unwrap();
        let err = process_directory(dir.path(), &store, "Chile").await.unwrap_err();

        assert!(matches!(err, IngestError::Decode { .. }));
        assert!(logs_contain("rolling back"));
        assert!(!logs_contain("not valid UTF-8"));
        assert!(store.list_summaries().await.unwrap().is_empty());
    }

    #[test]
    fn test_list_entries_missing_folder() {
        // ---
        let dir = TempDir::new().unwrap();
        let err = list_entries(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, IngestError::ReadDir { .. }));
    }
}
