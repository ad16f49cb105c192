//! # Live Queries
//!
//! "Always show the current result of this query" for dashboards and lists.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          LiveQuery<T>                                   │
//! │                                                                         │
//! │  Database::live_query([Products], || repo.list_low_stock(5))           │
//! │       │                                                                 │
//! │       ├── subscribe to ChangeFeed   (before the first run, so no       │
//! │       │                              write can slip in between)        │
//! │       ├── run query once ──► watch::Sender (initial value)             │
//! │       ▼                                                                 │
//! │  background task                                                       │
//! │    loop {                                                              │
//! │      change on a watched table ──► re-run ──► send if different        │
//! │      receiver lagged           ──► re-run ──► send if different        │
//! │      feed closed               ──► stop                                │
//! │    }                                                                   │
//! │       │                                                                 │
//! │  unsubscribe() / drop ──► task aborted, feed receiver released         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Query failures are logged and the previous result stays current.
//! Nothing in here writes or validates.

use std::future::Future;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::changes::{Table, TableChange};
use crate::error::DbResult;

/// Handle to a continuously refreshed query result.
#[derive(Debug)]
pub struct LiveQuery<T> {
    rx: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> LiveQuery<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Runs `query` once and keeps it fresh in the background.
    ///
    /// `changes` must be subscribed before this call returns control to
    /// any writer; [`crate::Database::live_query`] takes care of that.
    pub(crate) async fn start<F, Fut>(
        tables: Vec<Table>,
        mut changes: broadcast::Receiver<TableChange>,
        query: F,
    ) -> DbResult<Self>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = DbResult<T>> + Send + 'static,
    {
        let initial = query().await?;
        let (tx, rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if tables.contains(&change.table) => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Live query lagged, refreshing");
                    }
                    Err(RecvError::Closed) => break,
                }

                match query().await {
                    Ok(fresh) => {
                        let changed = tx.send_if_modified(|current| {
                            if *current == fresh {
                                false
                            } else {
                                *current = fresh;
                                true
                            }
                        });
                        if changed {
                            debug!("Live query result changed");
                        }
                    }
                    Err(err) => warn!(error = %err, "Live query refresh failed, keeping last result"),
                }

                if tx.is_closed() {
                    break;
                }
            }
        });

        Ok(LiveQuery { rx, task })
    }

    /// The latest result.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Waits for the next different result. `None` once the query stopped.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stream of results, starting with the current one.
    pub fn stream(&self) -> WatchStream<T> {
        WatchStream::new(self.rx.clone())
    }

    /// Stops refreshing and releases the feed subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tally_core::NewProduct;

    use crate::pool::{Database, DbConfig};

    fn pen(stock: i64) -> NewProduct {
        NewProduct {
            name: "Gel Pen".to_string(),
            description: String::new(),
            wholesale_price: 5.0,
            selling_price: 9.5,
            stock,
            category: "Writing".to_string(),
        }
    }

    #[tokio::test]
    async fn test_live_query_refreshes_on_write() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut live = db
            .live_query(vec![crate::Table::Products], move || {
                let repo = repo.clone();
                async move { repo.count().await }
            })
            .await
            .unwrap();
        assert_eq!(live.current(), 0);

        db.products().create(&pen(3)).await.unwrap();

        let next = tokio::time::timeout(Duration::from_secs(2), live.changed())
            .await
            .unwrap();
        assert_eq!(next, Some(1));
        assert_eq!(live.current(), 1);
    }

    #[tokio::test]
    async fn test_unrelated_table_does_not_refresh() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sales = db.sales();

        let mut live = db
            .live_query(vec![crate::Table::Sales], move || {
                let sales = sales.clone();
                async move { sales.count().await }
            })
            .await
            .unwrap();

        db.products().create(&pen(3)).await.unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(100), live.changed()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_feed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let before = db.changes().subscriber_count();

        let live = db
            .live_query(vec![crate::Table::Products], move || {
                let repo = repo.clone();
                async move { repo.count().await }
            })
            .await
            .unwrap();
        assert_eq!(db.changes().subscriber_count(), before + 1);

        live.unsubscribe();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(db.changes().subscriber_count(), before);
    }
}
