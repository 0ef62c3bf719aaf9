use fundrelay_types::ErrorKind;
use thiserror::Error;

/// Failure to obtain a signal. Always counts as a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    #[error("data source request failed: {0}")]
    Transport(String),

    #[error("data source returned status {0}")]
    Status(u16),

    #[error("data source returned malformed body {0:?}")]
    Malformed(String),

    #[error("signal {value} outside {min}..={max}")]
    OutOfRange { value: u64, min: u64, max: u64 },
}

impl DataSourceError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Transient
    }
}

/// Failure of a ledger call made by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The ledger could not be reached or failed internally.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused the call.
    #[error("ledger rejected the call ({kind}): {message}")]
    Rejected { kind: ErrorKind, message: String },
}

impl SubmissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::Transient,
            Self::Rejected { kind, .. } => *kind,
        }
    }

    /// Whether repeating the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient | ErrorKind::Fatal)
    }
}

/// Why one fetch-decide-submit attempt failed.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Source(#[from] DataSourceError),

    #[error(transparent)]
    Ledger(#[from] SubmissionError),
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("config error: {0}")]
    Config(String),

    #[error("provider registration failed: {0}")]
    Registration(SubmissionError),

    #[error("event feed error: {0}")]
    EventFeed(String),

    #[error("metrics server error: {0}")]
    Metrics(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("relay already started")]
    AlreadyStarted,
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Validation,
            Self::EventFeed(_) => ErrorKind::Transient,
            _ => ErrorKind::Fatal,
        }
    }
}
