use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Domain notifications emitted after a ledger mutation commits.
///
/// These are decoupled from the audit trail: the activity table is the
/// durable record, the event channel only feeds in-process listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockInCreated {
        stock_in_id: i64,
        line_count: usize,
    },
    IssuanceCreated {
        issuance_id: i64,
        staff_id: i64,
        line_count: usize,
    },
    IssuanceReversed {
        issuance_id: i64,
    },
    IssuanceFailed {
        actor_id: i64,
    },
    LowStockAlert {
        item_id: i64,
        quantity: i32,
        reorder_level: i32,
    },
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

    /// Sends an event, logging instead of failing when the channel is gone.
    ///
    /// Engines call this after their transaction has committed; a closed
    /// channel must never look like a failed mutation to the caller.
    pub async fn send_best_effort(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!(?event, "Dropping event after commit: {}", e);
        }
    }
}

/// Event processing loop; logs every event it drains.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockInCreated {
                stock_in_id,
                line_count,
            } => {
                info!(stock_in_id, line_count, "Stock-in committed");
            }
            Event::IssuanceCreated {
                issuance_id,
                staff_id,
                line_count,
            } => {
                info!(issuance_id, staff_id, line_count, "Issuance committed");
            }
            Event::IssuanceReversed { issuance_id } => {
                info!(issuance_id, "Issuance reversed");
            }
            Event::IssuanceFailed { actor_id } => {
                info!(actor_id, "Issuance attempt rejected");
            }
            Event::LowStockAlert {
                item_id,
                quantity,
                reorder_level,
            } => {
                warn!(item_id, quantity, reorder_level, "Item at or below reorder level");
            }
        }
    }

    info!("Event processing loop stopped");
}
