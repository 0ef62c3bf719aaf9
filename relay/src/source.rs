//! External data sources that yield the numeric verification signal.

use std::sync::Arc;
use std::time::Duration;

use crate::config::DataSourceConfig;
use crate::error::DataSourceError;

/// Anything that can produce one numeric signal per call.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch_signal(&self) -> Result<u64, DataSourceError>;
}

/// Plain-text integer service in the style of random.org's `integers` API.
pub struct RandomOrgSource {
    client: reqwest::Client,
    config: DataSourceConfig,
}

impl RandomOrgSource {
    pub fn new(config: DataSourceConfig) -> Result<Self, DataSourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DataSourceError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn query(&self) -> [(&'static str, String); 7] {
        [
            ("num", "1".to_string()),
            ("min", self.config.min.to_string()),
            ("max", self.config.max.to_string()),
            ("col", "1".to_string()),
            ("base", "10".to_string()),
            ("format", "plain".to_string()),
            ("rnd", "new".to_string()),
        ]
    }
}

/// A source that always yields the same signal. For local development.
pub struct FixedSignal(pub u64);

#[async_trait::async_trait]
impl DataSource for FixedSignal {
    async fn fetch_signal(&self) -> Result<u64, DataSourceError> {
        Ok(self.0)
    }
}

/// The data source a configuration asks for.
pub fn build_source(config: &DataSourceConfig) -> Result<Arc<dyn DataSource>, DataSourceError> {
    match config.fixed_signal {
        Some(signal) => {
            tracing::warn!(signal, "using a fixed verification signal");
            Ok(Arc::new(FixedSignal(signal)))
        }
        None => Ok(Arc::new(RandomOrgSource::new(config.clone())?)),
    }
}

/// Parse a plain-text response and check it against the requested range.
pub fn parse_signal(body: &str, min: u64, max: u64) -> Result<u64, DataSourceError> {
    let value: u64 = body
        .trim()
        .parse()
        .map_err(|_| DataSourceError::Malformed(body.trim().chars().take(64).collect()))?;
    if value < min || value > max {
        return Err(DataSourceError::OutOfRange { value, min, max });
    }
    Ok(value)
}

#[async_trait::async_trait]
impl DataSource for RandomOrgSource {
    async fn fetch_signal(&self) -> Result<u64, DataSourceError> {
        let response = self
            .client
            .get(&self.config.url)
            .query(&self.query())
            .send()
            .await
            .map_err(|e| DataSourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataSourceError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| DataSourceError::Transport(e.to_string()))?;
        let signal = parse_signal(&body, self.config.min, self.config.max)?;
        tracing::trace!(signal, "signal fetched");
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_signal_overrides_the_http_source() {
        let config = DataSourceConfig {
            fixed_signal: Some(8),
            ..DataSourceConfig::default()
        };
        let source = build_source(&config).unwrap();
        assert_eq!(source.fetch_signal().await.unwrap(), 8);
    }

    #[test]
    fn parses_plain_integer_bodies() {
        assert_eq!(parse_signal("742\n", 1, 1_000).unwrap(), 742);
        assert!(matches!(
            parse_signal("0", 1, 1_000),
            Err(DataSourceError::OutOfRange { value: 0, .. })
        ));
        assert!(matches!(
            parse_signal("1001", 1, 1_000),
            Err(DataSourceError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_signal("Error: quota exceeded", 1, 1_000),
            Err(DataSourceError::Malformed(_))
        ));
    }
}
