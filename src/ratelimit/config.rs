use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::ratelimit::DestinationKey;

/// Per-destination throttle settings, supplied once at client construction.
pub type ThrottleConfigs = HashMap<DestinationKey, ThrottleConfig>;

/// Throttle settings for a single destination.
///
/// `capacity` is the maximum number of tokens the destination's bucket can
/// hold and therefore the largest burst it allows; `fill_rate` is how many
/// tokens are restored per second. A capacity of `0` disables throttling
/// for the destination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleConfig {
    /// Maximum token balance; `0` disables throttling
    pub capacity: f64,

    /// Tokens restored per second
    pub fill_rate: f64,
}

impl ThrottleConfig {
    /// Allow at most `max_amount` requests per second
    #[must_use]
    pub const fn per_second(max_amount: f64) -> Self {
        Self {
            capacity: max_amount,
            fill_rate: max_amount,
        }
    }

    /// Allow at most `max_amount` requests per `period`.
    ///
    /// `ThrottleConfig::per(100.0, Duration::from_secs(60))` allows bursts
    /// of up to 100 requests, replenished over a minute.
    #[must_use]
    pub fn per(max_amount: f64, period: Duration) -> Self {
        Self {
            capacity: max_amount,
            fill_rate: max_amount / period.as_secs_f64(),
        }
    }

    /// A configuration that never throttles
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            capacity: 0.0,
            fill_rate: 0.0,
        }
    }

    /// Whether this configuration disables throttling
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.capacity <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_per_second() {
        let config = ThrottleConfig::per_second(5.0);
        assert_eq!(config.capacity, 5.0);
        assert_eq!(config.fill_rate, 5.0);
    }

    #[test]
    fn test_per_period() {
        let config = ThrottleConfig::per(100.0, Duration::from_secs(60));
        assert_eq!(config.capacity, 100.0);
        assert!((config.fill_rate - 100.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_unlimited() {
        assert!(ThrottleConfig::unlimited().is_unlimited());
        assert!(!ThrottleConfig::per_second(1.0).is_unlimited());
    }

    #[test]
    fn test_config_serialization() {
        let config = ThrottleConfig {
            capacity: 10.0,
            fill_rate: 2.5,
        };

        let toml = toml::to_string(&config).unwrap();
        let deserialized: ThrottleConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_map_deserialization() {
        let toml = r#"
            [site-x]
            capacity = 1.0
            fill_rate = 1.0

            [gofile]
            capacity = 100.0
            fill_rate = 1.6
        "#;
        let configs: ThrottleConfigs = toml::from_str(toml).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(
            configs[&DestinationKey::from("gofile")].capacity,
            100.0
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let toml = "capacity = 1.0\nfill_rate = 1.0\nburst = 3\n";
        assert!(toml::from_str::<ThrottleConfig>(toml).is_err());
    }
}
