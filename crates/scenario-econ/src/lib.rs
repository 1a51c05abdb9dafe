#![deny(warnings)]

//! Scenario engine: applies committed shock factors to forecast rows.
//!
//! Revenue is re-derived through a constant-elasticity composition:
//! - the price change scales unit price and, raised to the row's price
//!   elasticity, volume
//! - every macro driver contributes `factor ^ correlation`
//!
//! Cost and operating profit are then taken as percentages of the
//! simulated revenue.

use scenario_core::{MacroDriver, Row, ShockFactors};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a missing baseline field behaves inside the formula.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Missing values are 0 on the additive cost/profit chain and NaN on the
    /// multiplicative revenue chain, so a row lacking inputs shows up as NaN.
    #[default]
    Compatible,
    /// Missing values are 0 everywhere.
    ZeroFill,
}

/// A forecast row together with its simulated fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulatedRow {
    pub row: Row,
    /// Baseline cost, `sales_value * cost% / 100`.
    pub cost_value: f64,
    /// Baseline gross profit, `sales_value - cost_value`.
    pub gross_profit: f64,
    /// Baseline unit price, `sales_value / sales_qty`.
    pub price_computed: f64,
    pub new_price: f64,
    /// Volume response to the price change, `price_factor ^ elasticity`.
    pub price_impact: f64,
    pub sim_revenue_final: f64,
    pub simulated_cost: f64,
    pub sim_gross_profit_final: f64,
    pub revenue_impact: f64,
    pub profit_impact: f64,
}

/// Power used for elasticity terms.
///
/// A NaN or infinite exponent on a base of magnitude one yields NaN rather
/// than 1, so a missing coefficient is never silently neutral.
pub fn elastic_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (!exponent.is_finite() && base.abs() == 1.0) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// Product of `driver_factor ^ correlation` over all ten macro drivers.
pub fn driver_adjustment(row: &Row, factors: &ShockFactors, policy: MissingPolicy) -> f64 {
    MacroDriver::ALL
        .into_iter()
        .map(|d| {
            let corr = multiplicative(row.correlation(d), policy);
            elastic_pow(factors.driver_factor(d), corr)
        })
        .product()
}

fn multiplicative(v: Option<f64>, policy: MissingPolicy) -> f64 {
    match (v, policy) {
        (Some(x), _) => x,
        (None, MissingPolicy::Compatible) => f64::NAN,
        (None, MissingPolicy::ZeroFill) => 0.0,
    }
}

fn additive(v: Option<f64>) -> f64 {
    v.unwrap_or(0.0)
}

/// Simulate a single row.
pub fn simulate_row(row: &Row, factors: &ShockFactors, policy: MissingPolicy) -> SimulatedRow {
    let price_factor = factors.price_factor();

    let sales_value = multiplicative(row.sales_value, policy);
    let sales_qty = multiplicative(row.sales_qty, policy);
    let cost_pct = multiplicative(row.cost_pct, policy);
    let op_pct = multiplicative(row.operating_profit_pct, policy);
    let elasticity = multiplicative(row.price_elasticity, policy);

    // Division by zero is not guarded: qty 0 gives inf or NaN.
    let price_computed = sales_value / sales_qty;
    let cost_value = match (row.sales_value, row.cost_pct) {
        (Some(v), Some(c)) => v * c / 100.0,
        _ => 0.0,
    };
    let gross_profit = additive(row.sales_value) - cost_value;

    let new_price = price_computed * price_factor;
    let price_impact = elastic_pow(price_factor, elasticity);
    let drivers = driver_adjustment(row, factors, policy);
    let sim_revenue_final = sales_qty * price_impact * drivers * new_price;

    let simulated_cost = sim_revenue_final * (cost_pct / 100.0);
    let sim_gross_profit_final = sim_revenue_final * (op_pct / 100.0);

    SimulatedRow {
        row: row.clone(),
        cost_value,
        gross_profit,
        price_computed,
        new_price,
        price_impact,
        sim_revenue_final,
        simulated_cost,
        sim_gross_profit_final,
        revenue_impact: sim_revenue_final - additive(row.sales_value),
        profit_impact: sim_gross_profit_final - gross_profit,
    }
}

/// Simulate every row under one committed configuration.
///
/// Pure: identical inputs always produce identical output.
pub fn simulate(rows: &[Row], factors: &ShockFactors, policy: MissingPolicy) -> Vec<SimulatedRow> {
    let out: Vec<SimulatedRow> = rows
        .iter()
        .map(|r| simulate_row(r, factors, policy))
        .collect();
    let non_finite = out
        .iter()
        .filter(|s| !s.sim_revenue_final.is_finite())
        .count();
    debug!(rows = out.len(), non_finite, ?policy, "simulated rows");
    out
}
