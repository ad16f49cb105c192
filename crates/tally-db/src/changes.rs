//! # Change Feed
//!
//! Broadcast of "table X was written" signals, consumed by live queries.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Change Feed                                    │
//! │                                                                         │
//! │  ProductRepository ──┐                                                  │
//! │  SaleRepository    ──┼──► publish(TableChange) ──► broadcast::Sender    │
//! │  SaleCoordinator   ──┘    (after commit only)           │               │
//! │                                              ┌──────────┼──────────┐    │
//! │                                              ▼          ▼          ▼    │
//! │                                         LiveQuery  LiveQuery  LiveQuery │
//! │                                         (products) (sales)    (both)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A change carries no payload beyond the table and the kind of write.
//! Subscribers re-run their own query; they never patch results in place.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered changes per subscriber before it starts lagging.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Tables whose writes are announced on the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Products,
    Sales,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Products => "products",
            Table::Sales => "sales",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

/// One committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChange {
    pub table: Table,
    pub kind: ChangeKind,
}

impl TableChange {
    pub fn new(table: Table, kind: ChangeKind) -> Self {
        TableChange { table, kind }
    }
}

/// Cloneable handle to the broadcast channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<TableChange>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        ChangeFeed { tx }
    }

    /// Announces a committed write. Having no subscribers is not an error.
    pub fn publish(&self, table: Table, kind: ChangeKind) {
        let change = TableChange::new(table, kind);
        match self.tx.send(change) {
            Ok(receivers) => debug!(table = table.as_str(), ?kind, receivers, "Change published"),
            Err(_) => debug!(table = table.as_str(), ?kind, "Change published with no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
