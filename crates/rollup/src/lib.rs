#![deny(warnings)]

//! Aggregation of simulated rows into rollups for the dashboard views.
//!
//! One traversal feeds three group-by maps at once: by country, by
//! material group, and by material group + date. Rows without a date are
//! left out of every rollup.

use chrono::NaiveDate;
use scenario_econ::SimulatedRow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Separator between material group and date in the combined key.
pub const KEY_SEPARATOR: &str = "__";

/// Grouping dimension of a rollup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Country,
    MaterialGroup,
    GroupDate,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [
        Dimension::Country,
        Dimension::MaterialGroup,
        Dimension::GroupDate,
    ];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dimension::Country => "country",
            Dimension::MaterialGroup => "material_group",
            Dimension::GroupDate => "material_group_date",
        })
    }
}

/// One rollup bucket with its carried key fields and accumulated sums.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub key: String,
    /// Country code, carried on the country rollup only.
    pub country_id: Option<String>,
    /// Carried on the material-group and group+date rollups.
    pub material_group: Option<String>,
    /// Carried on the group+date rollup only.
    pub date: Option<NaiveDate>,
    pub rows: usize,
    pub sim_revenue_final: f64,
    pub simulated_cost: f64,
    pub sim_gross_profit_final: f64,
    pub sales_value: f64,
    pub gross_profit: f64,
    pub profit_impact: f64,
    pub revenue_impact: f64,
}

impl Bucket {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    fn add(&mut self, s: &SimulatedRow) {
        self.rows += 1;
        self.sim_revenue_final += s.sim_revenue_final;
        self.simulated_cost += s.simulated_cost;
        self.sim_gross_profit_final += s.sim_gross_profit_final;
        self.sales_value += s.row.sales_value.unwrap_or(0.0);
        self.gross_profit += s.gross_profit;
        self.profit_impact += s.profit_impact;
        self.revenue_impact += s.revenue_impact;
    }
}

/// The three rollups, each sorted by simulated revenue, highest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rollups {
    pub by_country: Vec<Bucket>,
    pub by_material_group: Vec<Bucket>,
    pub by_group_date: Vec<Bucket>,
}

impl Rollups {
    pub fn get(&self, dim: Dimension) -> &[Bucket] {
        match dim {
            Dimension::Country => &self.by_country,
            Dimension::MaterialGroup => &self.by_material_group,
            Dimension::GroupDate => &self.by_group_date,
        }
    }
}

/// Key of the group+date rollup, e.g. `Pumps__2024-01-01`.
pub fn group_date_key(material_group: &str, date: NaiveDate) -> String {
    format!("{material_group}{KEY_SEPARATOR}{}", date.format("%Y-%m-%d"))
}

/// Descending by simulated revenue; NaN totals last, ties by key.
pub fn by_revenue_desc(a: &Bucket, b: &Bucket) -> Ordering {
    let (x, y) = (a.sim_revenue_final, b.sim_revenue_final);
    let primary = match (x.is_nan(), y.is_nan()) {
        (false, false) => y.total_cmp(&x),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    };
    primary.then_with(|| a.key.cmp(&b.key))
}

fn into_sorted(map: HashMap<String, Bucket>) -> Vec<Bucket> {
    let mut v: Vec<Bucket> = map.into_values().collect();
    v.sort_by(by_revenue_desc);
    v
}

/// Build all three rollups in a single pass over `rows`.
pub fn aggregate(rows: &[SimulatedRow]) -> Rollups {
    let mut by_country: HashMap<String, Bucket> = HashMap::new();
    let mut by_group: HashMap<String, Bucket> = HashMap::new();
    let mut by_group_date: HashMap<String, Bucket> = HashMap::new();
    let mut undated = 0usize;

    for s in rows {
        let r = &s.row;
        let Some(date) = r.date else {
            undated += 1;
            continue;
        };

        let c = by_country
            .entry(r.country.clone())
            .or_insert_with(|| Bucket::new(r.country.clone()));
        if c.country_id.is_none() {
            c.country_id = r.country_id.clone();
        }
        c.add(s);

        let g = by_group
            .entry(r.material_group.clone())
            .or_insert_with(|| Bucket {
                material_group: Some(r.material_group.clone()),
                ..Bucket::new(r.material_group.clone())
            });
        g.add(s);

        let key = group_date_key(&r.material_group, date);
        let gd = by_group_date.entry(key).or_insert_with_key(|k| Bucket {
            material_group: Some(r.material_group.clone()),
            date: Some(date),
            ..Bucket::new(k.clone())
        });
        gd.add(s);
    }

    debug!(
        rows = rows.len(),
        undated,
        countries = by_country.len(),
        groups = by_group.len(),
        group_dates = by_group_date.len(),
        "aggregated rollups"
    );

    Rollups {
        by_country: into_sorted(by_country),
        by_material_group: into_sorted(by_group),
        by_group_date: into_sorted(by_group_date),
    }
}

/// Headline totals over a simulated dataset, undated rows included.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub rows: usize,
    pub dated_rows: usize,
    pub sales_value: f64,
    pub sim_revenue_final: f64,
    pub sim_gross_profit_final: f64,
    pub revenue_impact: f64,
    pub profit_impact: f64,
    /// Revenue impact relative to baseline sales, in percent.
    pub revenue_impact_pct: Option<f64>,
}

pub fn summarize(rows: &[SimulatedRow]) -> Summary {
    let mut s = Summary {
        rows: rows.len(),
        ..Summary::default()
    };
    for r in rows {
        if r.row.date.is_some() {
            s.dated_rows += 1;
        }
        s.sales_value += r.row.sales_value.unwrap_or(0.0);
        s.sim_revenue_final += r.sim_revenue_final;
        s.sim_gross_profit_final += r.sim_gross_profit_final;
        s.revenue_impact += r.revenue_impact;
        s.profit_impact += r.profit_impact;
    }
    s.revenue_impact_pct = (s.sales_value != 0.0).then(|| s.revenue_impact / s.sales_value * 100.0);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use scenario_core::{MacroDriver, Row, ShockFactors};
    use scenario_econ::{simulate, MissingPolicy};

    fn row(country: &str, group: &str, date: Option<NaiveDate>, value: f64, qty: f64) -> Row {
        Row {
            country: country.into(),
            country_id: Some(country[..2].to_uppercase()),
            material_group: group.into(),
            date,
            sales_value: Some(value),
            sales_qty: Some(qty),
            cost_pct: Some(40.0),
            operating_profit_pct: Some(20.0),
            price_elasticity: Some(-1.0),
            correlations: [Some(0.5); MacroDriver::COUNT],
        }
    }

    fn jan(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 1, day)
    }

    fn run(rows: &[Row]) -> Vec<SimulatedRow> {
        simulate(rows, &ShockFactors::default(), MissingPolicy::Compatible)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn one_bucket_per_country() {
        let sims = run(&[
            row("India", "Pumps", jan(1), 1000.0, 10.0),
            row("India", "Valves", jan(2), 500.0, 5.0),
        ]);
        let r = aggregate(&sims);
        assert_eq!(r.by_country.len(), 1);
        let india = &r.by_country[0];
        assert_eq!(india.key, "India");
        assert_eq!(india.country_id.as_deref(), Some("IN"));
        assert_eq!(india.rows, 2);
        assert!(close(
            india.sim_revenue_final,
            sims[0].sim_revenue_final + sims[1].sim_revenue_final
        ));
        assert_eq!(r.by_material_group.len(), 2);
        assert_eq!(r.by_group_date.len(), 2);
    }

    #[test]
    fn undated_rows_are_left_out_of_every_rollup() {
        let sims = run(&[
            row("India", "Pumps", jan(1), 1000.0, 10.0),
            row("Peru", "Seals", None, 800.0, 8.0),
        ]);
        assert_eq!(sims.len(), 2);
        let r = aggregate(&sims);
        for dim in Dimension::ALL {
            assert!(r.get(dim).iter().all(|b| !b.key.starts_with("Peru")));
            assert!(r.get(dim).iter().all(|b| !b.key.starts_with("Seals")));
            assert_eq!(r.get(dim).iter().map(|b| b.rows).sum::<usize>(), 1);
        }
        let s = summarize(&sims);
        assert_eq!(s.rows, 2);
        assert_eq!(s.dated_rows, 1);
    }

    #[test]
    fn group_date_key_and_carried_fields() {
        let sims = run(&[row("Chile", "Pumps", jan(15), 100.0, 1.0)]);
        let r = aggregate(&sims);
        let b = &r.by_group_date[0];
        assert_eq!(b.key, "Pumps__2024-01-15");
        assert_eq!(b.material_group.as_deref(), Some("Pumps"));
        assert_eq!(b.date, jan(15));
        assert_eq!(r.by_material_group[0].material_group.as_deref(), Some("Pumps"));
        assert!(r.by_material_group[0].date.is_none());
    }

    #[test]
    fn sorted_by_revenue_with_nan_last() {
        let mut broken = row("Zambia", "Motors", jan(3), 100.0, 0.0);
        broken.sales_qty = Some(0.0);
        let sims = run(&[
            row("Brazil", "Pumps", jan(1), 100.0, 1.0),
            broken,
            row("Germany", "Pumps", jan(1), 900.0, 9.0),
            row("Austria", "Pumps", jan(1), 400.0, 4.0),
        ]);
        let r = aggregate(&sims);
        let keys: Vec<&str> = r.by_country.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["Germany", "Austria", "Brazil", "Zambia"]);
        assert!(r.by_country[3].sim_revenue_final.is_nan());
    }

    #[test]
    fn summary_impact_percentage() {
        let sims = simulate(
            &[row("India", "Pumps", jan(1), 1000.0, 10.0)],
            &ShockFactors::zero(),
            MissingPolicy::Compatible,
        );
        let s = summarize(&sims);
        assert!(close(s.sales_value, 1000.0));
        assert!(close(s.revenue_impact_pct.unwrap(), 0.0));
        assert!(summarize(&[]).revenue_impact_pct.is_none());
    }

    fn arb_row() -> impl Strategy<Value = Row> {
        (
            0usize..4,
            0usize..3,
            prop::option::weighted(0.8, 1u32..28),
            1.0f64..10_000.0,
            1.0f64..100.0,
        )
            .prop_map(|(c, g, day, value, qty)| {
                let countries = ["India", "Peru", "Chile", "Kenya"];
                let groups = ["Pumps", "Valves", "Seals"];
                row(countries[c], groups[g], day.and_then(jan), value, qty)
            })
    }

    proptest! {
        #[test]
        fn sums_are_conserved_per_dimension(rows in prop::collection::vec(arb_row(), 0..60)) {
            let sims = run(&rows);
            let dated: Vec<&SimulatedRow> = sims.iter().filter(|s| s.row.date.is_some()).collect();
            let expected_rev: f64 = dated.iter().map(|s| s.sim_revenue_final).sum();
            let expected_profit: f64 = dated.iter().map(|s| s.profit_impact).sum();
            let r = aggregate(&sims);
            for dim in Dimension::ALL {
                let buckets = r.get(dim);
                let rev: f64 = buckets.iter().map(|b| b.sim_revenue_final).sum();
                let profit: f64 = buckets.iter().map(|b| b.profit_impact).sum();
                let n: usize = buckets.iter().map(|b| b.rows).sum();
                prop_assert!(close(rev, expected_rev));
                prop_assert!(close(profit, expected_profit));
                prop_assert_eq!(n, dated.len());
            }
        }

        #[test]
        fn rollups_are_sorted(rows in prop::collection::vec(arb_row(), 0..40)) {
            let r = aggregate(&run(&rows));
            for dim in Dimension::ALL {
                let b = r.get(dim);
                for w in b.windows(2) {
                    prop_assert!(by_revenue_desc(&w[0], &w[1]) != Ordering::Greater);
                }
            }
        }
    }
}
