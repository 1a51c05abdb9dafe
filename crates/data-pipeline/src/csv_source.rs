//! CSV source; every field arrives as text and is typed by normalization.

use crate::{grid_to_records, normalize_all, CellValue, IngestError};
use scenario_core::Row;
use std::fs::File;
use std::io::Read;
use std::path::Path;

fn cell_from_field(field: &str) -> CellValue {
    if field.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(field.to_string())
    }
}

/// Read CSV with a header line from any reader.
pub fn read_csv<R: Read>(source: &str, reader: R) -> Result<Vec<Row>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut grid = Vec::new();
    for record in rdr.records() {
        let record = record?;
        grid.push(record.iter().map(cell_from_field).collect::<Vec<_>>());
    }
    let (headers, records) = grid_to_records(grid)?;
    Ok(normalize_all(source, &headers, &records))
}

pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Row>, IngestError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_csv(&path.display().to_string(), file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
Country,CountryID,Material Group Desc,Date,Sales Value,Sales Qty,Cost,Operating Profit,Price Elasticity
India,IN,Pumps,45292,\"1,000\",10,40,20,1
India,IN,Valves,2024-02-01,500,5,30,10,-0.5

Peru,PE,Pumps,,200,4,50,5,0
";

    #[test]
    fn parses_rows_and_skips_blank_lines() {
        let rows = read_csv("sample", SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].sales_value, Some(1000.0));
        assert_eq!(rows[0].country_id.as_deref(), Some("IN"));
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(rows[1].price_elasticity, Some(-0.5));
        assert_eq!(rows[2].country, "Peru");
        assert!(rows[2].date.is_none());
    }

    #[test]
    fn loads_from_disk_through_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        let rows = crate::load(&path).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn header_only_file_yields_no_rows() {
        let rows = read_csv("empty", "Country,Date\n".as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_csv("/nonexistent/forecast.csv").unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }
}
