use crate::domain::IngestionError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DEVICE_TIMEZONE: &str = "Europe/Athens";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttIngestionConfig {
    /// `mqtt://host:port`, `tcp://host:port`, `host:port` or `host`
    pub broker_url: String,

    pub client_id: String,

    pub username: Option<String>,

    pub password: Option<String>,

    pub keep_alive_secs: u64,

    /// Fixed wait between a lost connection and the next attempt
    pub retry_delay_secs: u64,

    /// Upper bound on messages being handled concurrently
    pub max_in_flight: usize,

    /// IANA zone the devices' clocks run in, applied to timestamps that carry no offset
    pub device_timezone: String,

    /// How long in-flight handlers may run after cancellation
    pub drain_timeout_secs: u64,
}

impl Default for MqttIngestionConfig {
    fn default() -> Self {
        Self {
            broker_url: "mqtt://localhost:1883".to_string(),
            client_id: "hometel-ingestion".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            retry_delay_secs: 5,
            max_in_flight: 8,
            device_timezone: DEFAULT_DEVICE_TIMEZONE.to_string(),
            drain_timeout_secs: 5,
        }
    }
}

impl MqttIngestionConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Longest the event loop waits for a free handler slot. Half the
    /// keep-alive, so a saturated pool never starves the broker of pings.
    pub fn slot_wait(&self) -> Duration {
        (self.keep_alive() / 2).max(Duration::from_secs(1))
    }

    pub fn device_timezone(&self) -> Result<Tz, IngestionError> {
        self.device_timezone.parse::<Tz>().map_err(|_| {
            IngestionError::Configuration(format!(
                "unknown device timezone: '{}'",
                self.device_timezone
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MqttIngestionConfig::default();
        assert_eq!(config.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.keep_alive(), Duration::from_secs(30));
        assert_eq!(config.slot_wait(), Duration::from_secs(15));
        assert_eq!(
            config.device_timezone().unwrap(),
            chrono_tz::Europe::Athens
        );
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let config = MqttIngestionConfig {
            device_timezone: "Europe/Atlantis".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.device_timezone(),
            Err(IngestionError::Configuration(_))
        ));
    }
}
