//! In-process change subscriptions.
//!
//! Consumers subscribe to the feed and receive one notice per committed
//! catalog or ledger mutation, then re-derive whatever they display from a
//! fresh snapshot. Delivery is a notification, not a payload: the snapshot
//! read happens on the consumer side, so there is never a second copy of
//! state to drift.
//!
//! Unsubscription is tied to handle drop, so a torn-down consumer can never
//! leak its registration.

use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

const DEFAULT_FEED_CAPACITY: usize = 256;

/// Which half of the store changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    Catalog,
    Ledger,
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub owner_id: Uuid,
    pub scope: ChangeScope,
}

/// Fan-out point for change notices.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeNotice>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Registers a new subscriber. Dropping the handle unsubscribes.
    pub fn subscribe(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publishes a notice to all current subscribers. A feed with no
    /// subscribers silently drops the notice.
    pub fn publish(&self, notice: ChangeNotice) {
        let _ = self.sender.send(notice);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription. Buffered notices are bounded; a subscriber that
/// falls too far behind skips ahead to the oldest retained notice, which is
/// safe because consumers re-read full snapshots rather than applying
/// deltas.
pub struct SubscriptionHandle {
    receiver: broadcast::Receiver<ChangeNotice>,
}

impl SubscriptionHandle {
    /// Waits for the next change notice. Returns `None` once the feed is
    /// closed and drained.
    pub async fn recv(&mut self) -> Option<ChangeNotice> {
        loop {
            match self.receiver.recv().await {
                Ok(notice) => return Some(notice),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change subscriber lagged; skipping ahead");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_notices() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe();
        let owner = Uuid::new_v4();

        feed.publish(ChangeNotice {
            owner_id: owner,
            scope: ChangeScope::Catalog,
        });

        let notice = sub.recv().await.expect("notice");
        assert_eq!(notice.owner_id, owner);
        assert_eq!(notice.scope, ChangeScope::Catalog);
    }

    #[tokio::test]
    async fn dropping_a_handle_unsubscribes() {
        let feed = ChangeFeed::new();
        let sub = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        drop(sub);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn each_subscriber_sees_every_notice() {
        let feed = ChangeFeed::new();
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();
        let owner = Uuid::new_v4();

        feed.publish(ChangeNotice {
            owner_id: owner,
            scope: ChangeScope::Ledger,
        });

        assert_eq!(a.recv().await.unwrap().scope, ChangeScope::Ledger);
        assert_eq!(b.recv().await.unwrap().scope, ChangeScope::Ledger);
    }
}
