//! Nullable event feed: events pushed by the test.

use fundrelay_ledger::{LedgerEvent, LoggedEvent};
use fundrelay_relay::EventSource;
use fundrelay_types::{Address, Timestamp};
use tokio::sync::mpsc;

/// Test-side handle that publishes events to a [`NullEventSource`].
pub struct NullEventFeed {
    tx: mpsc::UnboundedSender<LoggedEvent>,
    next_sequence: u64,
}

impl NullEventFeed {
    /// Publish an arbitrary event with the next sequence number.
    pub fn publish(&mut self, event: LedgerEvent) {
        let logged = LoggedEvent {
            sequence: self.next_sequence,
            timestamp: Timestamp::new(self.next_sequence),
            event,
        };
        self.next_sequence += 1;
        // The source being gone is fine.
        let _ = self.tx.send(logged);
    }

    /// Publish a `MilestoneVerificationRequested` event.
    pub fn request(&mut self, campaign: Address, milestone_index: usize) {
        self.publish(LedgerEvent::MilestoneVerificationRequested {
            campaign,
            milestone_index,
        });
    }
}

/// An event source fed from the test. Ends when the feed is dropped.
pub struct NullEventSource {
    rx: mpsc::UnboundedReceiver<LoggedEvent>,
}

impl NullEventSource {
    pub fn channel() -> (NullEventFeed, NullEventSource) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            NullEventFeed {
                tx,
                next_sequence: 0,
            },
            NullEventSource { rx },
        )
    }
}

#[async_trait::async_trait]
impl EventSource for NullEventSource {
    async fn next_event(&mut self) -> Option<LoggedEvent> {
        self.rx.recv().await
    }
}
