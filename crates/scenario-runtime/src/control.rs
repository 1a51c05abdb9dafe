//! Pending versus committed shock factors.
//!
//! Slider edits only touch the pending copy; a simulation pass reads the
//! committed copy, which changes on [`ControlCenter::commit`] alone.

use scenario_core::{ScenarioError, Shock, ShockFactors};
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlCenter {
    pending: ShockFactors,
    committed: ShockFactors,
}

impl ControlCenter {
    pub fn new(initial: ShockFactors) -> Self {
        Self {
            pending: initial,
            committed: initial,
        }
    }

    pub fn pending(&self) -> &ShockFactors {
        &self.pending
    }

    pub fn committed(&self) -> &ShockFactors {
        &self.committed
    }

    /// Slider edit: the value is clamped into range. Returns the stored value.
    pub fn adjust(&mut self, shock: Shock, pct: f64) -> Result<f64, ScenarioError> {
        let v = self.pending.set_clamped(shock, pct)?;
        debug!(shock = shock.key(), requested = pct, stored = v, "pending shock adjusted");
        Ok(v)
    }

    /// Typed-in edit: out-of-range values are rejected and pending is kept.
    pub fn set(&mut self, shock: Shock, pct: f64) -> Result<(), ScenarioError> {
        self.pending.set(shock, pct)
    }

    /// Zero every pending lever. Committed values stay until the next commit.
    pub fn reset_to_zero(&mut self) {
        self.pending = ShockFactors::zero();
    }

    /// Drop pending edits.
    pub fn discard(&mut self) {
        self.pending = self.committed;
    }

    pub fn is_dirty(&self) -> bool {
        self.pending != self.committed
    }

    /// Make the pending configuration the committed one.
    /// Returns whether anything changed.
    pub fn commit(&mut self) -> bool {
        let changed = self.is_dirty();
        self.committed = self.pending;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenario_core::MacroDriver;

    #[test]
    fn edits_do_not_reach_committed_until_commit() {
        let mut cc = ControlCenter::default();
        cc.adjust(Shock::Driver(MacroDriver::Gdp), 5.0).unwrap();
        assert!(cc.is_dirty());
        assert_eq!(cc.committed().get(Shock::Driver(MacroDriver::Gdp)), 0.0);
        assert!(cc.commit());
        assert_eq!(cc.committed().get(Shock::Driver(MacroDriver::Gdp)), 5.0);
        assert!(!cc.is_dirty());
        assert!(!cc.commit());
    }

    #[test]
    fn slider_clamps_and_text_input_rejects() {
        let mut cc = ControlCenter::default();
        assert_eq!(cc.adjust(Shock::PriceChange, 35.0).unwrap(), 20.0);
        assert!(cc.set(Shock::PriceChange, -25.0).is_err());
        assert_eq!(cc.pending().price_change, 20.0);
    }

    #[test]
    fn reset_and_discard() {
        let mut cc = ControlCenter::default();
        cc.reset_to_zero();
        assert_eq!(*cc.pending(), ShockFactors::zero());
        assert_eq!(cc.committed().price_change, 8.0);
        cc.discard();
        assert_eq!(cc.pending(), cc.committed());
    }
}
