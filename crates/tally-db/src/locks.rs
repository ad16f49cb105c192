//! # Per-Product Stock Locks
//!
//! Serializes sale completions that touch the same products.
//!
//! ```text
//! Sale A: {#3, #7}  ──► lock #3 ──► lock #7 ──► check + write ──► release
//! Sale B: {#7, #9}  ──────────────► wait #7 ─────────────────────► lock #7 ──► ...
//! Sale C: {#1}      ──► lock #1 ──► check + write ──► release      (runs in parallel)
//! ```
//!
//! Locks are always taken in ascending id order, so two baskets with
//! overlapping products can never wait on each other in a cycle.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use tally_core::ProductId;

type Slot = Arc<AsyncMutex<()>>;

/// Registry of one async mutex per product id.
///
/// Entries are created on demand and dropped once nobody holds them.
#[derive(Debug, Clone, Default)]
pub struct StockLocks {
    slots: Arc<Mutex<HashMap<ProductId, Slot>>>,
}

/// Held locks for one basket. Dropping it releases them.
#[derive(Debug)]
pub struct StockGuard {
    registry: StockLocks,
    held: Vec<(ProductId, OwnedMutexGuard<()>)>,
}

impl StockLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every id in `ids` (duplicates ignored) in ascending order.
    pub async fn acquire<I>(&self, ids: I) -> StockGuard
    where
        I: IntoIterator<Item = ProductId>,
    {
        let ordered: BTreeSet<ProductId> = ids.into_iter().collect();
        let mut held = Vec::with_capacity(ordered.len());

        for id in ordered {
            let slot = self.slot(id);
            let guard = slot.lock_owned().await;
            held.push((id, guard));
        }

        debug!(products = held.len(), "Stock locks acquired");
        StockGuard {
            registry: self.clone(),
            held,
        }
    }

    /// Number of ids with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn slot(&self, id: ProductId) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(id).or_default().clone()
    }

    fn prune(&self, ids: &[ProductId]) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            if slots.get(id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
                slots.remove(id);
            }
        }
    }
}

impl StockGuard {
    /// Ids held by this guard, ascending.
    pub fn products(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.held.iter().map(|(id, _)| *id)
    }
}

impl Drop for StockGuard {
    fn drop(&mut self) {
        let ids: Vec<ProductId> = self.held.iter().map(|(id, _)| *id).collect();
        // Release the mutexes first so their Arcs are no longer counted.
        self.held.clear();
        self.registry.prune(&ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_orders_and_dedups() {
        let locks = StockLocks::new();
        let guard = locks.acquire([9, 3, 9, 1]).await;

        assert_eq!(guard.products().collect::<Vec<_>>(), vec![1, 3, 9]);
        assert_eq!(locks.tracked(), 3);

        drop(guard);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_baskets_wait() {
        let locks = StockLocks::new();
        let first = locks.acquire([1, 2]).await;

        let contender = locks.clone();
        let handle = tokio::spawn(async move {
            let _guard = contender.acquire([2, 3]).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        drop(first);
        handle.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_disjoint_baskets_do_not_block() {
        let locks = StockLocks::new();
        let _first = locks.acquire([1]).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire([2])).await;
        assert!(second.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_guard_serializes_check_then_write() {
        use std::sync::atomic::{AtomicI64, Ordering};

        let locks = StockLocks::new();
        let stock = Arc::new(AtomicI64::new(5));
        let sold = Arc::new(AtomicI64::new(0));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let locks = locks.clone();
                let stock = Arc::clone(&stock);
                let sold = Arc::clone(&sold);
                tokio::spawn(async move {
                    let _guard = locks.acquire([7]).await;
                    let seen = stock.load(Ordering::SeqCst);
                    // Give other tasks every chance to read the same value.
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    if seen >= 1 {
                        stock.store(seen - 1, Ordering::SeqCst);
                        sold.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(sold.load(Ordering::SeqCst), 5);
        assert_eq!(stock.load(Ordering::SeqCst), 0);
        assert_eq!(locks.tracked(), 0);
    }
}
