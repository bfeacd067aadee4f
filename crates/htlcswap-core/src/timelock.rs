use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// The two absolute expiries of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockPair {
    /// Expiry of the initiator's leg. Always the later of the two.
    pub initiator: Timestamp,
    /// Expiry of the acceptor's leg.
    pub acceptor: Timestamp,
}

/// Derives asymmetric timelocks from a single duration.
///
/// The acceptor's leg expires after `duration * numerator / denominator`,
/// the initiator's after the full `duration`. The fraction is strictly
/// below one, so the initiator's lock always outlives the acceptor's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelockPolicy {
    numerator: u32,
    denominator: u32,
}

impl TimelockPolicy {
    /// A policy using the acceptor fraction `numerator / denominator`.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self, CoreError> {
        if numerator == 0 || denominator == 0 || numerator >= denominator {
            return Err(CoreError::InvalidTimelock(format!(
                "acceptor fraction must be in (0, 1), got {}/{}",
                numerator, denominator
            )));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// The acceptor's share of the duration, as `(numerator, denominator)`.
    pub fn fraction(&self) -> (u32, u32) {
        (self.numerator, self.denominator)
    }

    /// Compute both expiries from `now` and a duration in seconds.
    pub fn compute(&self, now: Timestamp, duration_secs: i64) -> Result<TimelockPair, CoreError> {
        if duration_secs <= 0 {
            return Err(CoreError::InvalidTimelock(format!(
                "duration must be positive, got {}s",
                duration_secs
            )));
        }

        let acceptor_offset = (i128::from(duration_secs) * i128::from(self.numerator)
            / i128::from(self.denominator)) as i64;
        if acceptor_offset <= 0 || acceptor_offset >= duration_secs {
            return Err(CoreError::InvalidTimelock(format!(
                "duration {}s too short to separate the two timelocks",
                duration_secs
            )));
        }

        let initiator = now.checked_add(duration_secs).ok_or_else(|| {
            CoreError::InvalidTimelock("initiator timelock overflows".into())
        })?;
        let acceptor = now + acceptor_offset;

        Ok(TimelockPair {
            initiator,
            acceptor,
        })
    }
}

impl Default for TimelockPolicy {
    /// Half the duration for the acceptor (24h initiator / 12h acceptor by default).
    fn default() -> Self {
        Self {
            numerator: 1,
            denominator: 2,
        }
    }
}
