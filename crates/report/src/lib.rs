#![deny(warnings)]

//! Export and text rendering of simulation rollups.
//!
//! JSON keeps raw floating point totals (non-finite values become `null`);
//! CSV and the text table show money rounded to cents.

use chrono::NaiveDate;
use rollup::{Bucket, Dimension, Rollups, Summary};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use scenario_core::{Shock, ShockFactors};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
}

/// Round to cents. `None` when the value has no decimal representation
/// (NaN, infinities, magnitudes beyond `Decimal`).
pub fn money(v: f64) -> Option<Decimal> {
    let mut d = Decimal::from_f64(v)?.round_dp(2);
    d.rescale(2);
    Some(d)
}

/// Cents-rounded text; non-representable values print as `f64` does.
pub fn format_money(v: f64) -> String {
    money(v).map_or_else(|| format!("{v:.2}"), |d| d.to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(ExportFormat::Json),
            Some("csv") => Ok(ExportFormat::Csv),
            _ => Err(ReportError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Everything a consumer needs to redraw the dashboard for one run.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub factors: &'a ShockFactors,
    pub summary: &'a Summary,
    pub rollups: &'a Rollups,
}

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    dimension: String,
    key: &'a str,
    country_id: Option<&'a str>,
    material_group: Option<&'a str>,
    date: Option<NaiveDate>,
    rows: usize,
    sim_revenue_final: String,
    simulated_cost: String,
    sim_gross_profit_final: String,
    sales_value: String,
    gross_profit: String,
    profit_impact: String,
    revenue_impact: String,
}

impl<'a> CsvRecord<'a> {
    fn new(dim: Dimension, b: &'a Bucket) -> Self {
        Self {
            dimension: dim.to_string(),
            key: &b.key,
            country_id: b.country_id.as_deref(),
            material_group: b.material_group.as_deref(),
            date: b.date,
            rows: b.rows,
            sim_revenue_final: format_money(b.sim_revenue_final),
            simulated_cost: format_money(b.simulated_cost),
            sim_gross_profit_final: format_money(b.sim_gross_profit_final),
            sales_value: format_money(b.sales_value),
            gross_profit: format_money(b.gross_profit),
            profit_impact: format_money(b.profit_impact),
            revenue_impact: format_money(b.revenue_impact),
        }
    }
}

pub fn write_json<W: Write>(w: W, report: &Report<'_>) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(w, report)?;
    Ok(())
}

/// All three rollups in one table, distinguished by a `dimension` column.
pub fn write_csv<W: Write>(w: W, rollups: &Rollups) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(w);
    for dim in Dimension::ALL {
        for b in rollups.get(dim) {
            wtr.serialize(CsvRecord::new(dim, b))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write the report to `path`, picking the format from its extension.
pub fn export(path: &Path, report: &Report<'_>) -> Result<ExportFormat, ReportError> {
    let format = ExportFormat::from_path(path)?;
    let mut file = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Json => write_json(&mut file, report)?,
        ExportFormat::Csv => write_csv(&mut file, report.rollups)?,
    }
    file.flush()?;
    info!(path = %path.display(), ?format, "report exported");
    Ok(format)
}

/// Non-zero levers as `key=+pct%`, or `neutral`.
pub fn describe_factors(f: &ShockFactors) -> String {
    let parts: Vec<String> = Shock::all()
        .filter(|s| f.get(*s) != 0.0)
        .map(|s| format!("{}={:+}%", s.key(), f.get(s)))
        .collect();
    if parts.is_empty() {
        "neutral".to_string()
    } else {
        parts.join(" ")
    }
}

/// Plain-text table of the first `top` buckets of one rollup.
pub fn render_top(dim: Dimension, buckets: &[Bucket], top: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{dim} (top {} of {})", top.min(buckets.len()), buckets.len());
    let _ = writeln!(
        out,
        "  {:<32} {:>16} {:>16} {:>16} {:>6}",
        "key", "sim revenue", "revenue impact", "profit impact", "rows"
    );
    for b in buckets.iter().take(top) {
        let _ = writeln!(
            out,
            "  {:<32} {:>16} {:>16} {:>16} {:>6}",
            b.key,
            format_money(b.sim_revenue_final),
            format_money(b.revenue_impact),
            format_money(b.profit_impact),
            b.rows
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenario_core::{MacroDriver, Row};
    use scenario_econ::{simulate, MissingPolicy};

    fn sample() -> (ShockFactors, Rollups, Summary) {
        let row = Row {
            country: "India".into(),
            country_id: Some("IN".into()),
            material_group: "Pumps".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            sales_value: Some(1000.0),
            sales_qty: Some(10.0),
            cost_pct: Some(40.0),
            operating_profit_pct: Some(20.0),
            price_elasticity: Some(1.0),
            correlations: [Some(0.0); MacroDriver::COUNT],
        };
        let f = ShockFactors::zero().with(Shock::PriceChange, 10.0).unwrap();
        let sims = simulate(&[row], &f, MissingPolicy::Compatible);
        (f, rollup::aggregate(&sims), rollup::summarize(&sims))
    }

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(format_money(1210.0000000000002), "1210.00");
        assert_eq!(format_money(12.34567), "12.35");
        assert_eq!(format_money(f64::NAN), "NaN");
        assert!(money(f64::INFINITY).is_none());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/r.JSON")).unwrap(),
            ExportFormat::Json
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("r.csv")).unwrap(),
            ExportFormat::Csv
        );
        assert!(ExportFormat::from_path(Path::new("r.xlsx")).is_err());
    }

    #[test]
    fn csv_has_one_line_per_bucket() {
        let (_, rollups, _) = sample();
        let mut buf = Vec::new();
        write_csv(&mut buf, &rollups).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("dimension,key,country_id"));
        assert!(lines[1].starts_with("country,India,IN,,,1,1210.00,484.00,242.00,1000.00"));
        assert!(lines[3].contains("Pumps__2024-01-01"));
    }

    #[test]
    fn json_export_to_disk() {
        let (f, rollups, summary) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let report = Report {
            factors: &f,
            summary: &summary,
            rollups: &rollups,
        };
        assert_eq!(export(&path, &report).unwrap(), ExportFormat::Json);
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["rollups"]["by_country"][0]["key"], "India");
        assert_eq!(v["factors"]["price_change"], 10.0);
    }

    #[test]
    fn text_rendering() {
        let (f, rollups, _) = sample();
        assert_eq!(describe_factors(&f), "price_change=+10%");
        assert_eq!(describe_factors(&ShockFactors::zero()), "neutral");
        let t = render_top(Dimension::Country, &rollups.by_country, 5);
        assert!(t.starts_with("country (top 1 of 1)"));
        assert!(t.contains("1210.00"));
    }
}
