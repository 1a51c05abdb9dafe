//! Scenario files: shock presets, date window, filter and missing-value
//! policy in YAML.

use crate::RowFilter;
use scenario_core::{validate_window, DateWindow, ScenarioError, Shock, ShockFactors};
use scenario_econ::MissingPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scenario file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// Contents of a scenario file. Absent sections keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Lever key to percent; levers not listed keep their default.
    pub shocks: BTreeMap<String, f64>,
    pub window: DateWindow,
    pub filter: RowFilter,
    pub missing_policy: MissingPolicy,
}

impl ScenarioConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: ScenarioConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.shock_factors()?;
        validate_window(&self.window)
    }

    /// Defaults overlaid with the listed shocks.
    pub fn shock_factors(&self) -> Result<ShockFactors, ScenarioError> {
        let mut f = ShockFactors::default();
        for (key, pct) in &self.shocks {
            f.set(Shock::from_key(key)?, *pct)?;
        }
        Ok(f)
    }
}
