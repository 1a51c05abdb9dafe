#![deny(warnings)]

//! Core domain models and invariants for the forecast scenario simulator.
//!
//! This crate defines the typed forecast row, the eleven shock levers and
//! the committed shock configuration, plus validation helpers that guard
//! their ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lowest accepted shock percentage (inclusive).
pub const MIN_SHOCK_PCT: f64 = -20.0;
/// Highest accepted shock percentage (inclusive).
pub const MAX_SHOCK_PCT: f64 = 20.0;
/// Default price-change shock applied on a fresh session.
pub const DEFAULT_PRICE_CHANGE_PCT: f64 = 8.0;

/// Macro-economic driver whose shock is scaled by a per-row correlation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroDriver {
    Cpi,
    ExchangeRate,
    ImportMerch,
    Gdp,
    Unemployment,
    ExportMerch,
    ForexReserve,
    RetailSales,
    StockMarket,
    IndustrialProduction,
}

impl MacroDriver {
    /// Number of macro drivers.
    pub const COUNT: usize = 10;

    /// All drivers in a fixed order; `index()` is the position in this array.
    pub const ALL: [MacroDriver; MacroDriver::COUNT] = [
        MacroDriver::Cpi,
        MacroDriver::ExchangeRate,
        MacroDriver::ImportMerch,
        MacroDriver::Gdp,
        MacroDriver::Unemployment,
        MacroDriver::ExportMerch,
        MacroDriver::ForexReserve,
        MacroDriver::RetailSales,
        MacroDriver::StockMarket,
        MacroDriver::IndustrialProduction,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Spreadsheet column holding the row's correlation to this driver.
    pub fn column(self) -> &'static str {
        match self {
            MacroDriver::Cpi => "CPI_corr",
            MacroDriver::ExchangeRate => "Exchange Rate_corr",
            MacroDriver::ImportMerch => "Import Merch_corr",
            MacroDriver::Gdp => "GDP_corr",
            MacroDriver::Unemployment => "Unemployment Rate_corr",
            MacroDriver::ExportMerch => "Export Merch_corr",
            MacroDriver::ForexReserve => "Foreign Reserve_corr",
            MacroDriver::RetailSales => "Retail Sales_corr",
            MacroDriver::StockMarket => "Stock Market_corr",
            MacroDriver::IndustrialProduction => "Industrial Production_corr",
        }
    }

    /// Stable key used in scenario files and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            MacroDriver::Cpi => "cpi",
            MacroDriver::ExchangeRate => "exchange_rate",
            MacroDriver::ImportMerch => "import_merch",
            MacroDriver::Gdp => "gdp",
            MacroDriver::Unemployment => "unemployment",
            MacroDriver::ExportMerch => "export_merch",
            MacroDriver::ForexReserve => "forex_reserve",
            MacroDriver::RetailSales => "retail_sales",
            MacroDriver::StockMarket => "stock_market",
            MacroDriver::IndustrialProduction => "industrial_production",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        MacroDriver::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl fmt::Display for MacroDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One of the eleven adjustable levers: the price change or a macro driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shock {
    PriceChange,
    Driver(MacroDriver),
}

impl Shock {
    pub const PRICE_CHANGE_KEY: &'static str = "price_change";

    pub fn key(self) -> &'static str {
        match self {
            Shock::PriceChange => Self::PRICE_CHANGE_KEY,
            Shock::Driver(d) => d.key(),
        }
    }

    /// Parse a lever key such as `price_change` or `gdp`.
    pub fn from_key(key: &str) -> Result<Self, ScenarioError> {
        if key == Self::PRICE_CHANGE_KEY {
            return Ok(Shock::PriceChange);
        }
        MacroDriver::from_key(key)
            .map(Shock::Driver)
            .ok_or_else(|| ScenarioError::UnknownShock(key.to_string()))
    }

    /// All eleven levers, price change first.
    pub fn all() -> impl Iterator<Item = Shock> {
        std::iter::once(Shock::PriceChange).chain(MacroDriver::ALL.into_iter().map(Shock::Driver))
    }
}

/// Committed shock configuration: a percentage per lever, each in [-20, 20].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShockFactors {
    /// Price change in percent.
    pub price_change: f64,
    /// Macro-driver shocks in percent, indexed by `MacroDriver::index`.
    pub drivers: [f64; MacroDriver::COUNT],
}

impl Default for ShockFactors {
    fn default() -> Self {
        Self {
            price_change: DEFAULT_PRICE_CHANGE_PCT,
            drivers: [0.0; MacroDriver::COUNT],
        }
    }
}

impl ShockFactors {
    /// Every lever at zero, the "reset" configuration.
    pub fn zero() -> Self {
        Self {
            price_change: 0.0,
            drivers: [0.0; MacroDriver::COUNT],
        }
    }

    pub fn get(&self, shock: Shock) -> f64 {
        match shock {
            Shock::PriceChange => self.price_change,
            Shock::Driver(d) => self.drivers[d.index()],
        }
    }

    /// Set a lever, rejecting values outside [-20, 20].
    pub fn set(&mut self, shock: Shock, pct: f64) -> Result<(), ScenarioError> {
        validate_percent(shock, pct)?;
        *self.slot(shock) = pct;
        Ok(())
    }

    /// Set a lever, clamping into [-20, 20] the way a slider does.
    /// Non-finite input is still rejected.
    pub fn set_clamped(&mut self, shock: Shock, pct: f64) -> Result<f64, ScenarioError> {
        let v = clamp_percent(pct).ok_or_else(|| ScenarioError::NonFinite(shock.key().to_string()))?;
        *self.slot(shock) = v;
        Ok(v)
    }

    /// Builder-style variant of [`ShockFactors::set`].
    pub fn with(mut self, shock: Shock, pct: f64) -> Result<Self, ScenarioError> {
        self.set(shock, pct)?;
        Ok(self)
    }

    /// Multiplier for the price change, `1 + pct/100`.
    pub fn price_factor(&self) -> f64 {
        factor(self.price_change)
    }

    /// Multiplier for a macro driver, `1 + pct/100`.
    pub fn driver_factor(&self, driver: MacroDriver) -> f64 {
        factor(self.drivers[driver.index()])
    }

    fn slot(&mut self, shock: Shock) -> &mut f64 {
        match shock {
            Shock::PriceChange => &mut self.price_change,
            Shock::Driver(d) => &mut self.drivers[d.index()],
        }
    }
}

/// Convert a percentage into a multiplicative factor.
pub fn factor(pct: f64) -> f64 {
    1.0 + pct / 100.0
}

/// Clamp a percentage into the accepted shock range; `None` for NaN/inf.
pub fn clamp_percent(pct: f64) -> Option<f64> {
    if !pct.is_finite() {
        return None;
    }
    Some(pct.clamp(MIN_SHOCK_PCT, MAX_SHOCK_PCT))
}

/// One observation of the forecast dataset.
///
/// Numeric fields are `None` when the source cell was absent or not numeric;
/// the scenario engine decides how a missing value behaves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub country: String,
    /// Country code carried through for map rendering.
    pub country_id: Option<String>,
    pub material_group: String,
    /// Calendar date; `None` when the source value was not a usable date.
    pub date: Option<NaiveDate>,
    pub sales_value: Option<f64>,
    pub sales_qty: Option<f64>,
    /// Cost as a percentage of sales value.
    pub cost_pct: Option<f64>,
    /// Operating profit as a percentage of revenue.
    pub operating_profit_pct: Option<f64>,
    pub price_elasticity: Option<f64>,
    /// Correlation coefficients indexed by `MacroDriver::index`.
    pub correlations: [Option<f64>; MacroDriver::COUNT],
}

impl Row {
    pub fn correlation(&self, driver: MacroDriver) -> Option<f64> {
        self.correlations[driver.index()]
    }

    pub fn set_correlation(&mut self, driver: MacroDriver, value: Option<f64>) {
        self.correlations[driver.index()] = value;
    }
}

/// Inclusive date range restricting which rows enter a simulation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    /// The window that admits every row, dated or not.
    pub const ALL: DateWindow = DateWindow {
        from: None,
        to: None,
    };

    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, ScenarioError> {
        let w = Self { from, to };
        validate_window(&w)?;
        Ok(w)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether a row dated `date` falls inside the window.
    ///
    /// Undated rows only pass the unbounded window.
    pub fn admits(&self, date: Option<NaiveDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(d) = date else {
            return false;
        };
        self.from.map_or(true, |f| d >= f) && self.to.map_or(true, |t| d <= t)
    }
}

/// Validation errors for scenario inputs.
#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    /// Shock percentage outside [-20, 20].
    #[error("shock `{shock}` = {value} is outside [-20, 20]")]
    ShockOutOfRange { shock: String, value: f64 },
    /// Numeric input must be finite.
    #[error("non-finite value for `{0}`")]
    NonFinite(String),
    /// Lever key not recognised.
    #[error("unknown shock `{0}`")]
    UnknownShock(String),
    /// Date window start is after its end.
    #[error("date window starts at {from} after it ends at {to}")]
    InvertedWindow { from: NaiveDate, to: NaiveDate },
}

/// Validate a single lever value.
pub fn validate_percent(shock: Shock, pct: f64) -> Result<(), ScenarioError> {
    if !pct.is_finite() {
        return Err(ScenarioError::NonFinite(shock.key().to_string()));
    }
    if !(MIN_SHOCK_PCT..=MAX_SHOCK_PCT).contains(&pct) {
        return Err(ScenarioError::ShockOutOfRange {
            shock: shock.key().to_string(),
            value: pct,
        });
    }
    Ok(())
}

/// Validate every lever of a configuration.
pub fn validate_shock_factors(f: &ShockFactors) -> Result<(), ScenarioError> {
    for shock in Shock::all() {
        validate_percent(shock, f.get(shock))?;
    }
    Ok(())
}

pub fn validate_window(w: &DateWindow) -> Result<(), ScenarioError> {
    if let (Some(from), Some(to)) = (w.from, w.to) {
        if from > to {
            return Err(ScenarioError::InvertedWindow { from, to });
        }
    }
    Ok(())
}
