//! Calendar date extraction from report filenames.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{IngestError, Result};

/// `YYYY.MM.DD` anywhere in the name.
static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})\.([0-9]{2})\.([0-9]{2})").expect("date token pattern is valid")
});

// ---

/// Pull the first `YYYY.MM.DD` token out of `filename`.
///
/// Returns `Ok(None)` when the name carries no such token; the caller is
/// expected to warn and skip the file. A token that matches the shape but is
/// not a real calendar date (month 13, February 30) is an
/// [`IngestError::InvalidDate`].
pub fn extract_date(filename: &str) -> Result<Option<NaiveDate>> {
    // ---
    let Some(caps) = DATE_TOKEN.captures(filename) else {
        return Ok(None);
    };

    let iso = format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&iso, "%Y-%m-%d")
        .map(Some)
        .map_err(|source| IngestError::InvalidDate {
            filename: filename.to_string(),
            source,
        })
}
