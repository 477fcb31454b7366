//! Per-file online/offline aggregation.
//!
//! A report file is scanned line by line. Only lines that mention both
//! `Online:` and `Offline:` contribute; anything else, including lines whose
//! numbers do not parse, is skipped without failing the file.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use flate2::read::GzDecoder;

use crate::error::{IngestError, Result};
use crate::models::DeviceCounts;

const ONLINE_MARKER: &str = "Online:";
const OFFLINE_MARKER: &str = "Offline:";

// ---

/// How the bytes of a source file are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
}

/// Sum the online/offline values of every qualifying line in `path`.
///
/// Fails with [`IngestError::FileRead`] if the file cannot be opened or the
/// gzip stream is corrupt, and with [`IngestError::Decode`] on the first line
/// that is not valid UTF-8. Returns zero totals when nothing matches.
pub fn count_devices(path: &Path, compression: Compression) -> Result<DeviceCounts> {
    // ---
    let read_err = |source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let mut reader: Box<dyn BufRead> = match compression {
        Compression::Plain => Box::new(BufReader::new(file)),
        Compression::Gzip => Box::new(BufReader::new(GzDecoder::new(file))),
    };

    let mut totals = DeviceCounts::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(read_err)? == 0 {
            break;
        }
        line_no += 1;

        let line = std::str::from_utf8(&buf).map_err(|_| IngestError::Decode {
            path: path.to_path_buf(),
            line: line_no,
        })?;

        if let Some((online, offline)) = parse_status_line(line) {
            totals.add(online, offline);
        }
    }

    tracing::debug!(
        "{}: {} lines, online={} offline={}",
        path.display(),
        line_no,
        totals.online,
        totals.offline
    );
    Ok(totals)
}

/// Extract `(online, offline)` from one report line.
///
/// The line is split on commas; the online value is read from the first
/// field holding `Online:` and the offline value from the first field holding
/// `Offline:`. For `<prefix>, Online: n, Offline: m` those are the second and
/// third fields. Returns `None` for anything that does not fit.
pub fn parse_status_line(line: &str) -> Option<(i64, i64)> {
    // ---
    let line = line.trim();
    if !line.contains(ONLINE_MARKER) || !line.contains(OFFLINE_MARKER) {
        return None;
    }

    let mut online = None;
    let mut offline = None;
    for field in line.split(',') {
        if online.is_none() && field.contains(ONLINE_MARKER) {
            online = Some(field_value(field, ONLINE_MARKER)?);
        } else if offline.is_none() && field.contains(OFFLINE_MARKER) {
            offline = Some(field_value(field, OFFLINE_MARKER)?);
        }
    }

    Some((online?, offline?))
}

/// Non-negative integer following `marker` inside `field`.
fn field_value(field: &str, marker: &str) -> Option<i64> {
    // ---
    let (_, rest) = field.split_once(marker)?;
    rest.trim().parse::<i64>().ok().filter(|v| *v >= 0)
}
