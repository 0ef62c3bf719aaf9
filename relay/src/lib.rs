//! fundrelay verification relay.
//!
//! Watches the ledger for milestone verification requests, queues them, and
//! on a fixed interval resolves a bounded batch: each request gets a numeric
//! signal from an external data source, a [`DecisionPolicy`] turns it into a
//! result, and the result is submitted through the verification authority as
//! a registered provider. Failed attempts are retried a bounded number of
//! times and then dropped.

pub mod config;
pub mod drain;
pub mod error;
pub mod ledger;
pub mod local;
pub mod metrics;
pub mod policy;
pub mod queue;
pub mod service;
pub mod source;

pub use config::{DataSourceConfig, RelayConfig, RetryBackoff};
pub use drain::{DrainReport, Drainer, Resolution};
pub use error::{AttemptError, DataSourceError, RelayError, SubmissionError};
pub use ledger::{EventSource, HttpLedgerClient, LedgerClient, WsEventSource};
pub use local::{LocalEventSource, LocalLedgerClient};
pub use metrics::RelayMetrics;
pub use policy::DecisionPolicy;
pub use queue::{RequestQueue, VerificationRequest};
pub use service::{RelayService, ServiceState};
pub use source::{build_source, DataSource, FixedSignal, RandomOrgSource};
