//! Error taxonomy for the ingest pipeline.
//!
//! Skippable conditions (no date in a filename, a malformed line) are not
//! errors and never reach this type. Everything here aborts the run.

use std::path::PathBuf;

use thiserror::Error;

/// All errors produced while loading device status summaries.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The filename carried a `YYYY.MM.DD` token that is not a calendar date.
    #[error("Invalid date in filename {filename}: {source}")]
    InvalidDate {
        filename: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A source file could not be opened or read.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file is not valid UTF-8 text.
    #[error("File {path} is not valid UTF-8 (line {line})")]
    Decode { path: PathBuf, line: usize },

    /// The source folder could not be listed.
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The connection string names a backend this crate does not speak.
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabaseUrl(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        // ---
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = IngestError::FileRead {
            path: PathBuf::from("/data/Chile_2024.01.01.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/Chile_2024.01.01.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_decode() {
        // ---
        let err = IngestError::Decode {
            path: PathBuf::from("/data/report.csv"),
            line: 7,
        };
        assert_eq!(
            err.to_string(),
            "File /data/report.csv is not valid UTF-8 (line 7)"
        );
    }

    #[test]
    fn test_error_display_unsupported_url() {
        // ---
        let err = IngestError::UnsupportedDatabaseUrl("mysql://localhost/db".to_string());
        assert_eq!(
            err.to_string(),
            "Unsupported database URL: mysql://localhost/db"
        );
    }
}
