use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

pub mod subscriptions;

pub use subscriptions::{ChangeFeed, ChangeNotice, ChangeScope, SubscriptionHandle};

/// Domain events emitted after a mutation has committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ItemCreated {
        owner_id: Uuid,
        item_id: Uuid,
    },
    ItemUpdated {
        owner_id: Uuid,
        item_id: Uuid,
    },
    ItemDeleted {
        owner_id: Uuid,
        item_id: Uuid,
    },
    MovementRecorded {
        owner_id: Uuid,
        item_id: Uuid,
        transaction_id: Uuid,
        movement_type: String,
        quantity: i32,
        previous_quantity: i32,
        new_quantity: i32,
    },
}

impl Event {
    fn owner_id(&self) -> Uuid {
        match self {
            Event::ItemCreated { owner_id, .. }
            | Event::ItemUpdated { owner_id, .. }
            | Event::ItemDeleted { owner_id, .. }
            | Event::MovementRecorded { owner_id, .. } => *owner_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Event processing loop. Logs each event and republishes it to the change
/// feed so snapshot consumers know to re-derive.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, feed: ChangeFeed) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!("Received event: {:?}", event);

        let owner_id = event.owner_id();
        match &event {
            Event::ItemCreated { item_id, .. }
            | Event::ItemUpdated { item_id, .. }
            | Event::ItemDeleted { item_id, .. } => {
                info!(%owner_id, %item_id, "catalog changed");
                feed.publish(ChangeNotice {
                    owner_id,
                    scope: ChangeScope::Catalog,
                });
            }
            Event::MovementRecorded {
                item_id,
                transaction_id,
                movement_type,
                quantity,
                previous_quantity,
                new_quantity,
                ..
            } => {
                info!(
                    %owner_id,
                    %item_id,
                    %transaction_id,
                    movement_type = %movement_type,
                    quantity = *quantity,
                    previous_quantity = *previous_quantity,
                    new_quantity = *new_quantity,
                    "movement recorded"
                );
                // A movement touches both the catalog (quantity) and the ledger.
                feed.publish(ChangeNotice {
                    owner_id,
                    scope: ChangeScope::Catalog,
                });
                feed.publish(ChangeNotice {
                    owner_id,
                    scope: ChangeScope::Ledger,
                });
            }
        }
    }

    info!("Event processing loop stopped");
}
