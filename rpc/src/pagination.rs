//! Sequence-based paging for the event log.

use serde::{Deserialize, Serialize};

/// Default page size when `limit` is not specified.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Query parameters accepted by `GET /events`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
    /// First sequence number to return.
    pub from: Option<u64>,
    /// Number of events per page (default 100, max 1000).
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn start(&self) -> u64 {
        self.from.unwrap_or(0)
    }

    /// Effective page size, clamped to `[1, MAX_PAGE_SIZE]`.
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// Where the next page starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// Pass as `from` to continue.
    pub next: u64,
    /// Whether more events exist past this page.
    pub more: bool,
}

impl PageCursor {
    pub fn after(start: u64, returned: usize, log_len: u64) -> Self {
        let next = start.saturating_add(returned as u64);
        Self {
            next,
            more: next < log_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        let q = EventQuery { from: None, limit: Some(0) };
        assert_eq!(q.effective_limit(), 1);
        let q = EventQuery { from: None, limit: Some(50_000) };
        assert_eq!(q.effective_limit(), MAX_PAGE_SIZE);
        assert_eq!(EventQuery::default().effective_limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn cursor_reports_remaining_events() {
        assert_eq!(PageCursor::after(0, 100, 250), PageCursor { next: 100, more: true });
        assert_eq!(PageCursor::after(200, 50, 250), PageCursor { next: 250, more: false });
        assert_eq!(PageCursor::after(900, 0, 250), PageCursor { next: 900, more: false });
    }
}
