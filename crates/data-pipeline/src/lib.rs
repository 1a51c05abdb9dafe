#![deny(warnings)]

//! Ingestion and normalization of forecast spreadsheets.
//!
//! Sources (workbook via `calamine`, CSV via `csv`) are first flattened into
//! [`RawRecord`]s keyed by header name, then [`normalize`]d into typed
//! [`Row`]s. Normalization never fails: unusable cells become missing
//! values and the row is kept.

use chrono::{Days, NaiveDate, NaiveDateTime};
use regex::Regex;
use scenario_core::{MacroDriver, Row};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

mod csv_source;
pub mod synth;
mod workbook;

pub use csv_source::{load_csv, read_csv};
pub use workbook::load_workbook;

pub const COL_COUNTRY: &str = "Country";
pub const COL_COUNTRY_ID: &str = "CountryID";
pub const COL_MATERIAL_GROUP: &str = "Material Group Desc";
pub const COL_DATE: &str = "Date";
pub const COL_SALES_VALUE: &str = "Sales Value";
pub const COL_SALES_QTY: &str = "Sales Qty";
pub const COL_COST: &str = "Cost";
pub const COL_OPERATING_PROFIT: &str = "Operating Profit";
pub const COL_PRICE_ELASTICITY: &str = "Price Elasticity";

/// Spreadsheet serial of 1970-01-01 in the 1900 date system.
pub const UNIX_EPOCH_SERIAL: f64 = 25569.0;

/// Errors raised while loading a dataset. Row-level problems are not errors.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: String,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook {0} has no sheets")]
    NoSheets(String),
    #[error("no header row found")]
    MissingHeader,
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
}

/// An untyped spreadsheet cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

/// One spreadsheet row keyed by header name.
pub type RawRecord = HashMap<String, CellValue>;

/// Columns the normalizer understands, excluding the optional `CountryID`.
pub fn expected_columns() -> Vec<&'static str> {
    let mut cols = vec![
        COL_COUNTRY,
        COL_MATERIAL_GROUP,
        COL_DATE,
        COL_SALES_VALUE,
        COL_SALES_QTY,
        COL_COST,
        COL_OPERATING_PROFIT,
        COL_PRICE_ELASTICITY,
    ];
    cols.extend(MacroDriver::ALL.iter().map(|d| d.column()));
    cols
}

/// Log expected columns that are absent and columns nobody reads.
///
/// Returns the missing expected columns.
pub fn check_headers(headers: &[String]) -> Vec<&'static str> {
    let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
    let expected = expected_columns();
    let missing: Vec<&'static str> = expected
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();
    for col in &missing {
        warn!(column = *col, "expected column absent; values treated as missing");
    }
    for h in headers {
        if h != COL_COUNTRY_ID && !expected.iter().any(|c| *c == h.as_str()) {
            debug!(column = %h, "ignoring unrecognised column");
        }
    }
    missing
}

/// Convert a spreadsheet date serial into a calendar date.
///
/// `days = floor(serial - 25569)` counted from 1970-01-01, i.e. midnight
/// UTC of `days * 86400` Unix seconds. The 1900 leap-year defect is absorbed
/// by the 25569 offset.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = (serial - UNIX_EPOCH_SERIAL).floor();
    // chrono's own range is far smaller than this
    if days.abs() > 1.0e8 {
        return None;
    }
    let days = days as i64;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    if days >= 0 {
        epoch.checked_add_days(Days::new(days as u64))
    } else {
        epoch.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Parse a textual date: a numeric serial, or an ISO calendar date or
/// datetime. Slash forms are year-first only (`2024/01/31`); day/month
/// order is ambiguous across locales and such text is rejected.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    if let Some(serial) = parse_number(t) {
        return serial_to_date(serial);
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn thousands_grouped() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("thousands regex must compile")
    })
}

/// Parse numeric text and reject non-finite results.
///
/// Commas are accepted only as thousands separators in 3-digit groups;
/// anything else containing a comma (`1,5`, `12,34`) is not a number.
pub fn parse_number(text: &str) -> Option<f64> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    let v = if t.contains(',') {
        if !thousands_grouped().is_match(t) {
            return None;
        }
        t.replace(',', "").parse::<f64>().ok()?
    } else {
        t.parse::<f64>().ok()?
    };
    v.is_finite().then_some(v)
}

fn cell_number(cell: Option<&CellValue>) -> Option<f64> {
    match cell? {
        CellValue::Number(x) if x.is_finite() => Some(*x),
        CellValue::Text(s) => parse_number(s),
        _ => None,
    }
}

fn cell_text(cell: Option<&CellValue>) -> Option<String> {
    let s = match cell? {
        CellValue::Empty => return None,
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Number(x) if x.fract() == 0.0 && x.abs() < 1.0e15 => format!("{x:.0}"),
        CellValue::Number(x) => x.to_string(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
    };
    (!s.is_empty()).then_some(s)
}

fn cell_date(cell: Option<&CellValue>) -> Option<NaiveDate> {
    match cell? {
        CellValue::Number(x) => serial_to_date(*x),
        CellValue::Text(s) => parse_date_text(s),
        CellValue::Date(d) => Some(*d),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// Map a raw record onto the typed row schema.
pub fn normalize(raw: &RawRecord) -> Row {
    let num = |col: &str| cell_number(raw.get(col));
    let mut row = Row {
        country: cell_text(raw.get(COL_COUNTRY)).unwrap_or_default(),
        country_id: cell_text(raw.get(COL_COUNTRY_ID)),
        material_group: cell_text(raw.get(COL_MATERIAL_GROUP)).unwrap_or_default(),
        date: cell_date(raw.get(COL_DATE)),
        sales_value: num(COL_SALES_VALUE),
        sales_qty: num(COL_SALES_QTY),
        cost_pct: num(COL_COST),
        operating_profit_pct: num(COL_OPERATING_PROFIT),
        price_elasticity: num(COL_PRICE_ELASTICITY),
        ..Row::default()
    };
    for d in MacroDriver::ALL {
        row.set_correlation(d, num(d.column()));
    }
    row
}

/// Turn a grid of cells into records: the first non-empty line is the
/// header, blank lines are skipped.
pub fn grid_to_records<I>(grid: I) -> Result<(Vec<String>, Vec<RawRecord>), IngestError>
where
    I: IntoIterator<Item = Vec<CellValue>>,
{
    let mut lines = grid
        .into_iter()
        .filter(|cells| cells.iter().any(|c| !is_blank(c)));
    let header_cells = lines.next().ok_or(IngestError::MissingHeader)?;
    let headers: Vec<String> = header_cells
        .iter()
        .map(|c| cell_text(Some(c)).unwrap_or_default())
        .collect();
    let records = lines
        .map(|cells| {
            headers
                .iter()
                .zip(cells)
                .filter(|(h, _)| !h.is_empty())
                .map(|(h, c)| (h.clone(), c))
                .collect::<RawRecord>()
        })
        .collect();
    Ok((headers, records))
}

fn is_blank(c: &CellValue) -> bool {
    match c {
        CellValue::Empty => true,
        CellValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Check headers, normalize every record and log the outcome.
pub fn normalize_all(source: &str, headers: &[String], records: &[RawRecord]) -> Vec<Row> {
    check_headers(headers);
    let rows: Vec<Row> = records.iter().map(normalize).collect();
    let undated = rows.iter().filter(|r| r.date.is_none()).count();
    if undated > 0 {
        warn!(source, undated, "rows without a usable date");
    }
    info!(source, rows = rows.len(), "dataset loaded");
    rows
}

/// Load a dataset, choosing the reader from the file extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Row>, IngestError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path),
        "csv" => load_csv(path),
        _ => Err(IngestError::UnsupportedFormat(path.display().to_string())),
    }
}
