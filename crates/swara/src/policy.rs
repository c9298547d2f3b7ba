use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tunable constants of the quantizer.
///
/// The defaults are the values the quantizer was calibrated with. Any
/// other setting is an experiment, so every entry point takes the policy
/// explicitly rather than reading globals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizePolicy {
    /// Frames with confidence at or above this are voiced.
    pub voicing_threshold: f64,
    /// A group is a rest when its rest share exceeds this fraction.
    pub rest_majority: f64,
    /// Error charged per voiced frame discarded by a rest group.
    pub rest_penalty: f64,
    /// Smallest grid size tried, in frames per note.
    pub min_predictions_per_note: usize,
    /// Largest grid size tried, inclusive.
    pub max_predictions_per_note: usize,
}

impl Default for QuantizePolicy {
    fn default() -> Self {
        Self {
            voicing_threshold: 0.9,
            rest_majority: 0.8,
            rest_penalty: 0.51,
            min_predictions_per_note: 20,
            max_predictions_per_note: 64,
        }
    }
}

impl QuantizePolicy {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.voicing_threshold) {
            return Err(Error::InvalidPolicy(format!(
                "voicing_threshold must lie in [0, 1], got {}",
                self.voicing_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.rest_majority) {
            return Err(Error::InvalidPolicy(format!(
                "rest_majority must lie in [0, 1), got {}",
                self.rest_majority
            )));
        }
        if !self.rest_penalty.is_finite() || self.rest_penalty < 0.0 {
            return Err(Error::InvalidPolicy(format!(
                "rest_penalty must be finite and non-negative, got {}",
                self.rest_penalty
            )));
        }
        if self.min_predictions_per_note == 0 {
            return Err(Error::InvalidPolicy(
                "min_predictions_per_note must be at least 1".to_string(),
            ));
        }
        if self.min_predictions_per_note > self.max_predictions_per_note {
            return Err(Error::InvalidPolicy(format!(
                "grid range is empty: {}..={}",
                self.min_predictions_per_note, self.max_predictions_per_note
            )));
        }
        Ok(())
    }

    /// Grid sizes in enumeration order.
    pub fn grid_sizes(&self) -> std::ops::RangeInclusive<usize> {
        self.min_predictions_per_note..=self.max_predictions_per_note
    }

    /// Number of (grid size, phase) pairs an exhaustive search scores.
    pub fn candidate_count(&self) -> usize {
        self.grid_sizes().sum()
    }
}
