use serde::{Deserialize, Serialize};

/// Default cone size for trigger-object matching.
pub const DEFAULT_TRIGGER_MATCH_DELTA_R: f64 = 0.3;
/// Value returned by pairwise minimum scans when no pair exists.
pub const DEFAULT_PAIR_SCAN_SENTINEL: f64 = 1e9;

/// Tunable defaults used by a final state.
///
/// ```
/// use finalstate::config::FinalStateConfig;
///
/// let config = FinalStateConfig::new().trigger_match_delta_r(0.1);
/// assert_eq!(config.trigger_match_delta_r, 0.1);
/// assert_eq!(config.pair_scan_sentinel, 1e9);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalStateConfig {
    /// Maximum $`\Delta R`$ between a daughter and a trigger object when no explicit value is
    /// given to the matching methods.
    pub trigger_match_delta_r: f64,
    /// Initial value of the smallest-$`\Delta\phi`$/$`\Delta R`$ scans.
    pub pair_scan_sentinel: f64,
}

impl Default for FinalStateConfig {
    fn default() -> Self {
        Self {
            trigger_match_delta_r: DEFAULT_TRIGGER_MATCH_DELTA_R,
            pair_scan_sentinel: DEFAULT_PAIR_SCAN_SENTINEL,
        }
    }
}

impl FinalStateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default trigger-matching cone size.
    pub fn trigger_match_delta_r(mut self, value: f64) -> Self {
        self.trigger_match_delta_r = value;
        self
    }

    /// Set the value returned by pair scans over fewer than two daughters.
    pub fn pair_scan_sentinel(mut self, value: f64) -> Self {
        self.pair_scan_sentinel = value;
        self
    }
}
