//! Record file discovery and loading.
//!
//! Accepts a single `.json` / `.jsonl` file or a directory scanned
//! recursively for them, and converts every flat row into a [`Record`].

use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use insights_core::data_processors::{RawRow, RecordConverter};
use insights_core::error::{InsightsError, Result};
use insights_core::models::{Record, RecordKind};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Counts collected while loading, reported alongside the records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub files: usize,
    /// Flat objects found across all files.
    pub rows_read: usize,
    /// Rows without a usable date, or that were not objects.
    pub rows_skipped: usize,
    /// Offer hits repeated within the same offer.
    pub duplicates: usize,
    pub records_kept: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// `.json` and `.jsonl` files under `input`, sorted by path.
///
/// A path naming a file is returned as-is.
pub fn find_record_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        return Err(InsightsError::DataPathNotFound(input.to_path_buf()));
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(input)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_record_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    if files.is_empty() {
        return Err(InsightsError::NoDataFiles(input.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Load every record under `input`, sorted by date.
///
/// Offset-carrying timestamps are converted into `tz_name`. Rows that
/// cannot become records are skipped and counted, never fatal.
pub fn load_records(input: &Path, tz_name: &str) -> Result<(Vec<Record>, IngestSummary)> {
    let files = find_record_files(input)?;
    let converter = RecordConverter::new(tz_name);

    let mut summary = IngestSummary {
        files: files.len(),
        ..IngestSummary::default()
    };
    let mut seen_hits: HashSet<(String, String)> = HashSet::new();
    let mut records: Vec<Record> = Vec::new();

    for path in &files {
        let rows = match read_rows(path, &mut summary) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        let before = records.len();
        for row in rows {
            summary.rows_read += 1;
            let record = match converter.convert(&row) {
                Ok(r) => r,
                Err(e) => {
                    debug!("Skipping row in {}: {}", path.display(), e);
                    summary.rows_skipped += 1;
                    continue;
                }
            };
            if is_duplicate_hit(&record, &mut seen_hits) {
                summary.duplicates += 1;
                continue;
            }
            records.push(record);
        }
        debug!(
            "File {}: {} records",
            path.display(),
            records.len() - before
        );
    }

    records.sort_by_key(|r| (r.date(), r.hour_of_day()));
    summary.records_kept = records.len();

    info!(
        "Loaded {} records from {} files ({} skipped, {} duplicate hits)",
        summary.records_kept, summary.files, summary.rows_skipped, summary.duplicates
    );

    Ok((records, summary))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn is_record_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "jsonl" || ext == "json")
        .unwrap_or(false)
}

/// Flat objects from one file. Malformed lines and non-object entries are
/// counted as skipped.
fn read_rows(path: &Path, summary: &mut IngestSummary) -> Result<Vec<RawRow>> {
    let file_err = |source| InsightsError::FileRead {
        path: path.to_path_buf(),
        source,
    };

    if path.extension().map(|e| e == "jsonl").unwrap_or(false) {
        let file = std::fs::File::open(path).map_err(file_err)?;
        let mut rows = Vec::new();
        for line in std::io::BufReader::new(file).lines() {
            let line = line.map_err(file_err)?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(map)) => rows.push(map),
                Ok(_) => summary.rows_skipped += 1,
                Err(e) => {
                    debug!("Failed to parse JSON line in {}: {}", path.display(), e);
                    summary.rows_skipped += 1;
                }
            }
        }
        return Ok(rows);
    }

    let text = std::fs::read_to_string(path).map_err(file_err)?;
    let items = match serde_json::from_str::<Value>(&text)? {
        Value::Array(items) => items,
        Value::Object(map) => return Ok(vec![map]),
        _ => {
            warn!("{} does not hold an array of objects", path.display());
            return Ok(Vec::new());
        }
    };

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => rows.push(map),
            _ => summary.rows_skipped += 1,
        }
    }
    Ok(rows)
}

/// Registers the (offer, hitId) pair and reports whether it was already seen.
fn is_duplicate_hit(record: &Record, seen: &mut HashSet<(String, String)>) -> bool {
    if record.kind() != RecordKind::Offer {
        return false;
    }
    match (record.offer_name(), record.hit_id()) {
        (Some(offer), Some(hit)) => !seen.insert((offer.to_string(), hit.to_string())),
        _ => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
