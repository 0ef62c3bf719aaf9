//! Shared utilities for fundrelay processes.

pub mod logging;
pub mod shutdown;
pub mod time;

pub use logging::{init_logging, log_filter, LogFormat};
pub use shutdown::ShutdownController;
pub use time::format_duration;
