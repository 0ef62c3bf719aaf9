//! Nullable data source: scripted signals instead of HTTP.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use fundrelay_relay::{DataSource, DataSourceError};

/// A data source that replays a script, then falls back to a fixed answer.
pub struct NullDataSource {
    script: Mutex<VecDeque<Result<u64, DataSourceError>>>,
    fallback: Result<u64, DataSourceError>,
    calls: AtomicUsize,
}

impl NullDataSource {
    /// Always returns `signal`.
    pub fn returning(signal: u64) -> Self {
        Self::with_fallback(Ok(signal))
    }

    /// Always fails with a transport error.
    pub fn failing() -> Self {
        Self::with_fallback(Err(DataSourceError::Transport(
            "null data source is offline".into(),
        )))
    }

    pub fn with_fallback(fallback: Result<u64, DataSourceError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue one answer ahead of the fallback.
    pub fn push(&self, answer: Result<u64, DataSourceError>) {
        self.script.lock().unwrap().push_back(answer);
    }

    /// Number of `fetch_signal` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DataSource for NullDataSource {
    async fn fetch_signal(&self) -> Result<u64, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_runs_before_fallback() {
        let source = NullDataSource::returning(4);
        source.push(Err(DataSourceError::Status(503)));
        source.push(Ok(7));
        assert!(source.fetch_signal().await.is_err());
        assert_eq!(source.fetch_signal().await.unwrap(), 7);
        assert_eq!(source.fetch_signal().await.unwrap(), 4);
        assert_eq!(source.calls(), 3);
    }
}
