use {
    crate::errors::{Error, Result},
    serde::{Deserialize, Serialize},
};

/// How a staker's share of each accrual pass is weighted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Share proportional to staked principal
    #[default]
    Amount,

    /// Share proportional to price-normalized principal times lock duration
    TimeWeighted {
        /// Shortest accepted lock, in seconds
        min_lock: u64,
        /// Longest accepted lock, in seconds
        max_lock: u64,
    },
}

impl Weighting {
    pub fn is_time_weighted(&self) -> bool {
        matches!(self, Weighting::TimeWeighted { .. })
    }

    /// Clamps a requested lock into the configured window.
    pub fn clamp_lock(&self, requested: u64) -> u64 {
        match *self {
            Weighting::Amount => 0,
            Weighting::TimeWeighted { min_lock, max_lock } => requested.clamp(min_lock, max_lock),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match *self {
            Weighting::Amount => Ok(()),
            Weighting::TimeWeighted { min_lock, max_lock } => {
                if max_lock == 0 || min_lock == 0 || min_lock > max_lock {
                    return Err(Error::Config(format!(
                        "invalid lock window {}..={}",
                        min_lock, max_lock
                    )));
                }
                Ok(())
            }
        }
    }
}
