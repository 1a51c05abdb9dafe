//! Workbook source backed by `calamine`; only the first sheet is read.

use crate::{grid_to_records, normalize_all, CellValue, IngestError};
use calamine::{open_workbook_auto, Data, Reader};
use scenario_core::Row;
use std::path::Path;

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // keep the serial; normalization owns the date conversion
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Read the first sheet of an xls/xlsx/xlsb/ods workbook into rows.
pub fn load_workbook<P: AsRef<Path>>(path: P) -> Result<Vec<Row>, IngestError> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let wrap = |e: calamine::Error| IngestError::Workbook {
        path: source.clone(),
        source: e,
    };
    let mut workbook = open_workbook_auto(path).map_err(wrap)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::NoSheets(source.clone()))?
        .map_err(wrap)?;
    let grid = range
        .rows()
        .map(|cells| cells.iter().map(cell_from_data).collect::<Vec<_>>());
    let (headers, records) = grid_to_records(grid)?;
    Ok(normalize_all(&source, &headers, &records))
}
