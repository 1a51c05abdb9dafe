//! Seeded synthetic forecast datasets for demos and benchmarks.

use chrono::{Months, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scenario_core::{MacroDriver, Row};

const COUNTRIES: [(&str, &str); 6] = [
    ("India", "IN"),
    ("Brazil", "BR"),
    ("Germany", "DE"),
    ("Mexico", "MX"),
    ("Indonesia", "ID"),
    ("South Africa", "ZA"),
];

const MATERIAL_GROUPS: [&str; 5] = ["Pumps", "Valves", "Bearings", "Seals", "Motors"];

/// Months covered by generated dates, starting January 2023.
pub const HORIZON_MONTHS: u32 = 24;

/// Generate `n` fully populated rows; the same seed yields the same rows.
pub fn generate(n: usize, seed: u64) -> Vec<Row> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1);
    (0..n)
        .map(|i| {
            let (country, id) = COUNTRIES[i % COUNTRIES.len()];
            let group = MATERIAL_GROUPS[(i / COUNTRIES.len()) % MATERIAL_GROUPS.len()];
            let month = rng.gen_range(0..HORIZON_MONTHS);
            let qty: f64 = rng.gen_range(10.0..5_000.0);
            let unit_price: f64 = rng.gen_range(5.0..400.0);
            let mut row = Row {
                country: country.to_string(),
                country_id: Some(id.to_string()),
                material_group: group.to_string(),
                date: start.and_then(|d| d.checked_add_months(Months::new(month))),
                sales_value: Some((qty * unit_price * 100.0).round() / 100.0),
                sales_qty: Some(qty.round()),
                cost_pct: Some(rng.gen_range(40.0..85.0)),
                operating_profit_pct: Some(rng.gen_range(2.0..25.0)),
                price_elasticity: Some(rng.gen_range(-2.5..0.0)),
                ..Row::default()
            };
            for d in MacroDriver::ALL {
                row.set_correlation(d, Some(rng.gen_range(-1.0..1.0)));
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_rows() {
        assert_eq!(generate(50, 7), generate(50, 7));
        assert_ne!(generate(50, 7), generate(50, 8));
    }

    #[test]
    fn rows_are_dated_and_populated() {
        let rows = generate(120, 1);
        assert_eq!(rows.len(), 120);
        for r in &rows {
            assert!(r.date.is_some());
            assert!(r.sales_qty.unwrap() >= 10.0);
            assert!(r.correlations.iter().all(Option::is_some));
        }
        let countries: std::collections::BTreeSet<_> =
            rows.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries.len(), COUNTRIES.len());
    }
}
