use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the services after a mutation has been confirmed.
/// Delivery is best-effort; a full channel never fails the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserRegistered(Uuid),
    ItemCreated {
        item_id: Uuid,
        owner_id: Uuid,
        initial_quantity: i32,
    },
    ItemDeleted {
        item_id: Uuid,
        owner_id: Uuid,
        movements_removed: u64,
    },
    MovementRecorded {
        movement_id: Uuid,
        item_id: Uuid,
        movement_type: String,
        delta: i32,
        new_quantity: i32,
    },
    MovementReversed {
        original_movement_id: Uuid,
        reversal_movement_id: Uuid,
        item_id: Uuid,
    },
    LowStock {
        item_id: Uuid,
        owner_id: Uuid,
        quantity: i32,
        threshold: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging instead of failing when the channel is closed
    /// or full; event delivery must never undo a confirmed mutation.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Dropping event, channel unavailable: {}", e);
        }
    }
}

/// Background consumer for domain events. Currently logs each event; this is
/// the integration point for notification fan-out.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::LowStock {
                item_id,
                quantity,
                threshold,
                ..
            } => {
                warn!(
                    item_id = %item_id,
                    quantity,
                    threshold,
                    "Item at or below its low-stock threshold"
                );
            }
            other => info!(event = ?other, "Domain event"),
        }
    }
    info!("Event channel closed, stopping event processor");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_does_not_fail_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let sender = EventSender::new(tx);
        sender.send(Event::UserRegistered(Uuid::new_v4())).await;
    }
}
