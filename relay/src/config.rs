//! Relay configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use fundrelay_types::Address;
use fundrelay_utils::LogFormat;

use crate::error::RelayError;
use crate::policy::DecisionPolicy;

/// Delay schedule between attempts on the same request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryBackoff {
    /// Same delay before every retry.
    Fixed { delay_ms: u64 },
    /// `base_ms * 2^(attempt - 1)`, capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
}

impl RetryBackoff {
    /// Delay before retry number `attempt` (1 = first retry).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { base_ms, max_ms } => {
                let shift = attempt.saturating_sub(1).min(32);
                let ms = base_ms.saturating_mul(1u64 << shift).min(max_ms);
                Duration::from_millis(ms)
            }
        }
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::Fixed { delay_ms: 0 }
    }
}

/// Where the relay fetches its numeric signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    #[serde(default = "default_data_source_url")]
    pub url: String,
    #[serde(default = "default_signal_min")]
    pub min: u64,
    #[serde(default = "default_signal_max")]
    pub max: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
    /// Skip the HTTP service and always use this signal.
    #[serde(default)]
    pub fixed_signal: Option<u64>,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            url: default_data_source_url(),
            min: default_signal_min(),
            max: default_signal_max(),
            timeout_ms: default_request_timeout_ms(),
            fixed_signal: None,
        }
    }
}

/// Configuration for a relay process.
///
/// Can be loaded from a TOML file via [`RelayConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the ledger node's RPC API.
    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,

    /// Account the relay acts as. It registers itself as a provider, so it
    /// must be the authority's owner or admin.
    #[serde(default = "default_provider")]
    pub provider: Address,

    /// Milliseconds between drain ticks.
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,

    /// Requests resolved per tick at most.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Total attempts per request before it is abandoned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Finish the batch in progress when shutdown arrives, instead of
    /// stopping at the next request boundary.
    #[serde(default = "default_true")]
    pub finish_batch_on_shutdown: bool,

    /// First event sequence to consume. Live events only when unset.
    #[serde(default)]
    pub replay_from: Option<u64>,

    /// Seconds between event feed reconnects.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Per-request timeout for calls to the ledger node, in milliseconds.
    /// Independent of the data source's `timeout_ms`.
    #[serde(default = "default_ledger_timeout_ms")]
    pub ledger_timeout_ms: u64,

    /// Port for `/metrics` and `/health`. Disabled when unset.
    #[serde(default)]
    pub metrics_port: Option<u16>,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub retry_backoff: RetryBackoff,

    #[serde(default)]
    pub policy: DecisionPolicy,

    #[serde(default)]
    pub data_source: DataSourceConfig,
}

fn default_ledger_url() -> String {
    "http://127.0.0.1:7070".to_string()
}

fn default_provider() -> Address {
    Address::from_label("fundrelay-owner")
}

fn default_drain_interval_ms() -> u64 {
    2_000
}

fn default_batch_size() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_reconnect_delay_secs() -> u64 {
    2
}

fn default_ledger_timeout_ms() -> u64 {
    10_000
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_source_url() -> String {
    "https://www.random.org/integers/".to_string()
}

fn default_signal_min() -> u64 {
    1
}

fn default_signal_max() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

impl RelayConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, RelayError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RelayError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, RelayError> {
        let config: Self = toml::from_str(s).map_err(|e| RelayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("RelayConfig is always serializable to TOML")
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.batch_size == 0 {
            return Err(RelayError::Config("batch_size must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(RelayError::Config("max_attempts must be at least 1".into()));
        }
        if self.drain_interval_ms == 0 {
            return Err(RelayError::Config("drain_interval_ms must be positive".into()));
        }
        if self.ledger_timeout_ms == 0 || self.data_source.timeout_ms == 0 {
            return Err(RelayError::Config("timeouts must be positive".into()));
        }
        if self.data_source.min > self.data_source.max {
            return Err(RelayError::Config(format!(
                "data source range {}..={} is empty",
                self.data_source.min, self.data_source.max
            )));
        }
        Ok(())
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger_timeout_ms)
    }

    /// WebSocket URL of the ledger's event feed.
    pub fn event_feed_url(&self) -> String {
        let base = self.ledger_url.trim_end_matches('/');
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws}/events/ws")
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ledger_url: default_ledger_url(),
            provider: default_provider(),
            drain_interval_ms: default_drain_interval_ms(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retry_backoff: RetryBackoff::default(),
            finish_batch_on_shutdown: default_true(),
            policy: DecisionPolicy::default(),
            replay_from: None,
            reconnect_delay_secs: default_reconnect_delay_secs(),
            ledger_timeout_ms: default_ledger_timeout_ms(),
            metrics_port: None,
            log_format: default_log_format(),
            log_level: default_log_level(),
            data_source: DataSourceConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_drain_three_every_two_seconds() {
        let config = RelayConfig::default();
        assert_eq!(config.drain_interval(), Duration::from_secs(2));
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.data_source.min, 1);
        assert_eq!(config.data_source.max, 1_000);
        assert_eq!(config.policy, DecisionPolicy::Parity);
        assert!(config.finish_batch_on_shutdown);
    }

    #[test]
    fn ledger_and_data_source_timeouts_are_separate() {
        let config = RelayConfig::default();
        assert_eq!(config.ledger_timeout(), Duration::from_secs(10));
        assert_eq!(config.data_source.timeout_ms, 5_000);

        let parsed = RelayConfig::from_toml_str(
            r#"
            ledger_timeout_ms = 30000
            [data_source]
            timeout_ms = 750
            "#,
        )
        .unwrap();
        assert_eq!(parsed.ledger_timeout(), Duration::from_secs(30));
        assert_eq!(parsed.data_source.timeout_ms, 750);

        assert!(RelayConfig::from_toml_str("ledger_timeout_ms = 0").is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = RelayConfig {
            retry_backoff: RetryBackoff::Exponential {
                base_ms: 100,
                max_ms: 1_000,
            },
            policy: DecisionPolicy::Threshold { at_least: 500 },
            metrics_port: Some(9100),
            ..RelayConfig::default()
        };
        let parsed = RelayConfig::from_toml_str(&config.to_toml_string()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_toml_and_validation() {
        let parsed = RelayConfig::from_toml_str(
            r#"
            batch_size = 10
            [policy]
            kind = "constant"
            verified = true
            "#,
        )
        .unwrap();
        assert_eq!(parsed.batch_size, 10);
        assert_eq!(parsed.policy, DecisionPolicy::Constant { verified: true });

        assert!(matches!(
            RelayConfig::from_toml_str("batch_size = 0"),
            Err(RelayError::Config(_))
        ));
        assert!(RelayConfig::from_toml_str("max_attempts = 0").is_err());
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let backoff = RetryBackoff::Exponential {
            base_ms: 100,
            max_ms: 500,
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(4), Duration::from_millis(500));
        assert_eq!(backoff.delay(60), Duration::from_millis(500));
    }

    #[test]
    fn feed_url_follows_ledger_scheme() {
        let mut config = RelayConfig::default();
        assert_eq!(config.event_feed_url(), "ws://127.0.0.1:7070/events/ws");
        config.ledger_url = "https://ledger.example/".into();
        assert_eq!(config.event_feed_url(), "wss://ledger.example/events/ws");
    }
}
