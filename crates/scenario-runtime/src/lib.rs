#![deny(warnings)]

//! Scenario session: owns the loaded dataset, the control center and the
//! latest simulation output.
//!
//! Recomputation happens only on request: [`Session::run_simulation`]
//! commits pending shock edits and rebuilds the simulated rows and all
//! rollups from scratch. A failed run leaves the previous output in place.

use data_pipeline::IngestError;
use rollup::{aggregate, summarize, Rollups, Summary};
use scenario_core::{
    validate_shock_factors, validate_window, DateWindow, Row, ScenarioError, ShockFactors,
};
use scenario_econ::{simulate, MissingPolicy, SimulatedRow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

mod config;
mod control;

pub use config::{ConfigError, ScenarioConfig};
pub use control::ControlCenter;

/// Exact-match filter on the categorical columns, like the dashboard's
/// dropdowns. `None` means "all".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RowFilter {
    pub country: Option<String>,
    pub material_group: Option<String>,
}

impl RowFilter {
    pub fn admits(&self, row: &Row) -> bool {
        self.country.as_deref().map_or(true, |c| c == row.country)
            && self
                .material_group
                .as_deref()
                .map_or(true, |g| g == row.material_group)
    }
}

/// Result of one simulation pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationOutput {
    /// Monotonic run counter within the session.
    pub run: u64,
    pub factors: ShockFactors,
    pub window: DateWindow,
    pub filter: RowFilter,
    pub rows: Vec<SimulatedRow>,
    pub rollups: Rollups,
    pub summary: Summary,
}

/// Run the whole pipeline over `rows` without any session state.
pub fn run_pipeline(
    rows: &[Row],
    factors: &ShockFactors,
    window: &DateWindow,
    filter: &RowFilter,
    policy: MissingPolicy,
) -> (Vec<SimulatedRow>, Rollups, Summary) {
    let selected: Vec<Row> = rows
        .iter()
        .filter(|r| window.admits(r.date) && filter.admits(r))
        .cloned()
        .collect();
    let simulated = simulate(&selected, factors, policy);
    let rollups = aggregate(&simulated);
    let summary = summarize(&simulated);
    (simulated, rollups, summary)
}

pub struct Session {
    rows: Vec<Row>,
    window: DateWindow,
    filter: RowFilter,
    policy: MissingPolicy,
    controls: ControlCenter,
    output: Option<SimulationOutput>,
    runs: u64,
}

impl Session {
    /// New session with default shock factors and no restrictions.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            window: DateWindow::ALL,
            filter: RowFilter::default(),
            policy: MissingPolicy::default(),
            controls: ControlCenter::default(),
            output: None,
            runs: 0,
        }
    }

    pub fn with_config(rows: Vec<Row>, cfg: &ScenarioConfig) -> Result<Self, ScenarioError> {
        cfg.validate()?;
        let mut s = Self::new(rows);
        s.controls = ControlCenter::new(cfg.shock_factors()?);
        s.window = cfg.window;
        s.filter = cfg.filter.clone();
        s.policy = cfg.missing_policy;
        Ok(s)
    }

    /// Load a workbook or CSV and open a session over it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IngestError> {
        Ok(Self::new(data_pipeline::load(path)?))
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn controls(&self) -> &ControlCenter {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlCenter {
        &mut self.controls
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Store the window; it is validated on the next run.
    pub fn set_window(&mut self, window: DateWindow) {
        self.window = window;
    }

    pub fn set_filter(&mut self, filter: RowFilter) {
        self.filter = filter;
    }

    pub fn set_policy(&mut self, policy: MissingPolicy) {
        self.policy = policy;
    }

    /// Latest successful output, if any run has completed.
    pub fn output(&self) -> Option<&SimulationOutput> {
        self.output.as_ref()
    }

    /// Commit pending shocks and recompute.
    pub fn run_simulation(&mut self) -> Result<&SimulationOutput, ScenarioError> {
        validate_window(&self.window)?;
        validate_shock_factors(self.controls.pending())?;
        self.controls.commit();
        self.recompute()
    }

    /// Recompute with the committed shocks, e.g. after a window change.
    pub fn recompute(&mut self) -> Result<&SimulationOutput, ScenarioError> {
        validate_window(&self.window)?;
        let factors = *self.controls.committed();
        let (rows, rollups, summary) =
            run_pipeline(&self.rows, &factors, &self.window, &self.filter, self.policy);
        self.runs += 1;
        info!(
            run = self.runs,
            rows = rows.len(),
            countries = rollups.by_country.len(),
            revenue = summary.sim_revenue_final,
            "simulation complete"
        );
        let out = self.output.insert(SimulationOutput {
            run: self.runs,
            factors,
            window: self.window,
            filter: self.filter.clone(),
            rows,
            rollups,
            summary,
        });
        Ok(&*out)
    }
}
