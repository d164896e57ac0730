//! Dataset loading
//!
//! Reads the ETL payload once, derives the temporal keys of every row and
//! hands out an immutable [`Dataset`]. Everything downstream is a scan over
//! these rows, so dates are never parsed again after this point.

use std::path::Path;
use std::sync::Arc;

use chrono::Datelike;
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::{Field, RawRow, Row};
use crate::util::parse_date_safe;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    pub undated_rows: usize,
}

impl LoadReport {
    /// Report for rows that are already in memory: nothing was skipped.
    pub fn for_rows(rows: &[Row]) -> Self {
        LoadReport {
            total_rows: rows.len(),
            loaded_rows: rows.len(),
            skipped_rows: 0,
            undated_rows: rows.iter().filter(|r| r.year.is_none()).count(),
        }
    }
}

/// Outcome of a graceful load, for consumers that must keep running when the
/// payload is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Ready(LoadReport),
    Failed { reason: String },
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready(_))
    }
}

/// Read-only handle to the loaded rows.
///
/// Cloning is cheap and never copies the rows. `version` fingerprints the
/// source bytes and takes part in every memoization key.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Arc<[Row]>,
    version: String,
}

impl Dataset {
    pub fn new(rows: Vec<Row>, version: impl Into<String>) -> Self {
        Self {
            rows: rows.into(),
            version: version.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), "empty")
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Csv,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(SourceFormat::Json),
            Some("csv") => Ok(SourceFormat::Csv),
            _ => Err(Error::UnsupportedFormat(format!(
                "{} (expected .json or .csv)",
                path.display()
            ))),
        }
    }
}

fn text(field: Option<&Field>) -> Option<String> {
    field.and_then(Field::as_text)
}

fn number(field: Option<&Field>) -> f64 {
    field.and_then(Field::as_f64).unwrap_or(0.0)
}

/// Normalize one ETL row. Missing or non-numeric amounts contribute zero and
/// an unparseable order date leaves the temporal keys empty.
pub fn clean_row(raw: RawRow) -> Row {
    let order_date = parse_date_safe(text(raw.order_date.as_ref()).as_deref());
    let ship_date = parse_date_safe(text(raw.ship_date.as_ref()).as_deref());
    let quantity = number(raw.quantity.as_ref()).round().max(0.0) as i64;

    Row {
        order_date,
        ship_date,
        year: order_date.map(|d| d.year()),
        month_index: order_date.map(|d| d.month0()),
        sales: number(raw.sales.as_ref()),
        profit: number(raw.profit.as_ref()),
        quantity,
        discount: number(raw.discount.as_ref()),
        order_id: text(raw.order_id.as_ref()),
        category: text(raw.category.as_ref()),
        sub_category: text(raw.sub_category.as_ref()),
        segment: text(raw.segment.as_ref()),
        state: text(raw.state.as_ref()),
    }
}

fn push_row(rows: &mut Vec<Row>, report: &mut LoadReport, raw: RawRow) {
    let row = clean_row(raw);
    if row.year.is_none() {
        report.undated_rows += 1;
    }
    rows.push(row);
}

/// Parse a JSON array of row objects. Elements that are not objects are
/// skipped and counted; a payload that is not an array at all is an error.
pub fn parse_json(bytes: &[u8]) -> Result<(Vec<Row>, LoadReport)> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
    let mut report = LoadReport {
        total_rows: values.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(values.len());

    for (idx, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawRow>(value) {
            Ok(raw) => push_row(&mut rows, &mut report, raw),
            Err(e) => {
                tracing::debug!(index = idx, error = %e, "Skipping malformed row");
                report.skipped_rows += 1;
            }
        }
    }

    report.loaded_rows = rows.len();
    Ok((rows, report))
}

/// Parse a CSV export with the same header names as the JSON payload.
pub fn parse_csv(bytes: &[u8]) -> Result<(Vec<Row>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(bytes);
    let mut report = LoadReport::default();
    let mut rows = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        report.total_rows += 1;
        match result {
            Ok(raw) => push_row(&mut rows, &mut report, raw),
            Err(e) => {
                tracing::debug!(line = report.total_rows, error = %e, "Skipping malformed row");
                report.skipped_rows += 1;
            }
        }
    }

    report.loaded_rows = rows.len();
    Ok((rows, report))
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Parse an in-memory payload into a dataset.
pub fn load_bytes(bytes: &[u8], format: SourceFormat) -> Result<(Dataset, LoadReport)> {
    let (rows, report) = match format {
        SourceFormat::Json => parse_json(bytes)?,
        SourceFormat::Csv => parse_csv(bytes)?,
    };
    Ok((Dataset::new(rows, fingerprint(bytes)), report))
}

pub fn load_dataset(path: &Path) -> Result<(Dataset, LoadReport)> {
    let format = SourceFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let (dataset, report) = load_bytes(&bytes, format)?;

    tracing::info!(
        path = %path.display(),
        total = report.total_rows,
        loaded = report.loaded_rows,
        skipped = report.skipped_rows,
        undated = report.undated_rows,
        "Dataset loaded"
    );
    if report.skipped_rows > 0 {
        tracing::warn!(skipped = report.skipped_rows, "Some rows could not be read");
    }
    Ok((dataset, report))
}

/// Load without failing: an unreachable or malformed source yields an empty
/// dataset and [`LoadState::Failed`].
pub fn load_or_empty(path: &Path) -> (Dataset, LoadState) {
    match load_dataset(path) {
        Ok((dataset, report)) => (dataset, LoadState::Ready(report)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load dataset");
            (
                Dataset::empty(),
                LoadState::Failed {
                    reason: e.to_string(),
                },
            )
        }
    }
}
