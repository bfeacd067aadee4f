use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::timelock::TimelockPolicy;
use crate::types::Actor;

/// Minimum secret length, in bytes.
pub const MIN_SECRET_LEN: usize = 16;
/// Maximum secret length, in bytes.
pub const MAX_SECRET_LEN: usize = 64;

/// Who may cancel an offer that has not been accepted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Only the party that created the offer.
    #[default]
    InitiatorOnly,
    /// Either party.
    EitherParty,
}

impl CancelPolicy {
    pub fn permits(&self, actor: Actor) -> bool {
        match self {
            Self::InitiatorOnly => actor == Actor::Initiator,
            Self::EitherParty => true,
        }
    }
}

/// Configuration for the swap engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Secret entropy, in bytes.
    #[serde(default = "default_secret_len")]
    pub secret_len: usize,
    /// Lifetime of the initiator's lock, in seconds.
    #[serde(default = "default_timelock_duration")]
    pub timelock_duration_secs: i64,
    /// Acceptor's lock lifetime as a fraction of the initiator's: numerator.
    #[serde(default = "default_acceptor_numerator")]
    pub acceptor_timelock_numerator: u32,
    /// Acceptor's lock lifetime as a fraction of the initiator's: denominator.
    #[serde(default = "default_acceptor_denominator")]
    pub acceptor_timelock_denominator: u32,
    /// Who may cancel an open offer.
    #[serde(default)]
    pub cancel_policy: CancelPolicy,
}

fn default_secret_len() -> usize {
    32
}
fn default_timelock_duration() -> i64 {
    24 * 3600
}
fn default_acceptor_numerator() -> u32 {
    1
}
fn default_acceptor_denominator() -> u32 {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            secret_len: default_secret_len(),
            timelock_duration_secs: default_timelock_duration(),
            acceptor_timelock_numerator: default_acceptor_numerator(),
            acceptor_timelock_denominator: default_acceptor_denominator(),
            cancel_policy: CancelPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Build the timelock policy described by this config.
    pub fn timelock_policy(&self) -> Result<TimelockPolicy, CoreError> {
        TimelockPolicy::new(
            self.acceptor_timelock_numerator,
            self.acceptor_timelock_denominator,
        )
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(MIN_SECRET_LEN..=MAX_SECRET_LEN).contains(&self.secret_len) {
            return Err(CoreError::ValidationError(format!(
                "secret_len must be between {} and {} bytes, got {}",
                MIN_SECRET_LEN, MAX_SECRET_LEN, self.secret_len
            )));
        }
        // Run the policy once so a duration that cannot be split fails at startup.
        self.timelock_policy()?
            .compute(0, self.timelock_duration_secs)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.secret_len, 32);
        assert_eq!(config.timelock_duration_secs, 86_400);
        assert_eq!(config.cancel_policy, CancelPolicy::InitiatorOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str("timelock_duration_secs = 3600").unwrap();
        assert_eq!(config.timelock_duration_secs, 3600);
        assert_eq!(config.secret_len, 32);
        assert_eq!(config.acceptor_timelock_denominator, 2);
    }

    #[test]
    fn test_cancel_policy_from_toml() {
        let config: EngineConfig = toml::from_str("cancel_policy = \"either_party\"").unwrap();
        assert_eq!(config.cancel_policy, CancelPolicy::EitherParty);
    }

    #[test]
    fn test_invalid_secret_len() {
        let config = EngineConfig {
            secret_len: 8,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_duration() {
        let config = EngineConfig {
            timelock_duration_secs: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_fraction() {
        let config = EngineConfig {
            acceptor_timelock_numerator: 2,
            acceptor_timelock_denominator: 2,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cancel_policy_permits() {
        assert!(CancelPolicy::InitiatorOnly.permits(Actor::Initiator));
        assert!(!CancelPolicy::InitiatorOnly.permits(Actor::Acceptor));
        assert!(CancelPolicy::EitherParty.permits(Actor::Acceptor));
    }
}
