//! Concurrent access to one [`Chain`].

use crate::chain::Chain;
use crate::receipt::Receipt;
use fundrelay_ledger::LoggedEvent;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Capacity of the live event feed. Subscribers that fall further behind
/// than this see `Lagged` and should resume from the log.
const EVENT_FEED_CAPACITY: usize = 1_024;

/// Cloneable handle to a chain shared between the RPC server, metrics, and
/// in-process relay adapters.
///
/// Transactions run one at a time under an async mutex. Events are published
/// while the lock is still held, so subscribers see them in sequence order.
#[derive(Clone)]
pub struct SharedChain {
    inner: Arc<Mutex<Chain>>,
    feed: broadcast::Sender<LoggedEvent>,
}

impl SharedChain {
    pub fn new(chain: Chain) -> Self {
        let (feed, _) = broadcast::channel(EVENT_FEED_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(chain)),
            feed,
        }
    }

    /// Run a transaction and publish the events in its receipt.
    pub async fn transact<T, E>(
        &self,
        tx: impl FnOnce(&mut Chain) -> Result<(T, Receipt), E>,
    ) -> Result<(T, Receipt), E> {
        let mut chain = self.inner.lock().await;
        let (value, receipt) = tx(&mut chain)?;
        for event in &receipt.events {
            // No receivers is fine.
            let _ = self.feed.send(event.clone());
        }
        Ok((value, receipt))
    }

    /// Run a read-only query.
    pub async fn read<T>(&self, query: impl FnOnce(&Chain) -> T) -> T {
        let chain = self.inner.lock().await;
        query(&chain)
    }

    /// Run a mutation that appends no events (deposits, admin changes).
    pub async fn update<T>(&self, f: impl FnOnce(&mut Chain) -> T) -> T {
        let mut chain = self.inner.lock().await;
        f(&mut chain)
    }

    /// Subscribe to live events only.
    pub fn subscribe(&self) -> broadcast::Receiver<LoggedEvent> {
        self.feed.subscribe()
    }

    /// Subscribe and fetch the backlog from `from` in one step, so nothing
    /// falls between the history and the live feed.
    pub async fn subscribe_from(
        &self,
        from: u64,
    ) -> (Vec<LoggedEvent>, broadcast::Receiver<LoggedEvent>) {
        let chain = self.inner.lock().await;
        let rx = self.feed.subscribe();
        let backlog = chain.events().range(from, usize::MAX).to_vec();
        (backlog, rx)
    }
}
