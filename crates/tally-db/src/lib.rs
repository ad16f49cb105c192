//! # tally-db: Persistence and Sale Coordination for Tally
//!
//! SQLite-backed catalog and ledger stores, the coordinator that keeps them
//! consistent, and live queries on top of a change feed.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Data Flow                                │
//! │                                                                         │
//! │  CLI command (sale new 3:2 7:1 --discount 10)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐  │   │
//! │  │   │  Database    │   │ Repositories  │   │  SaleCoordinator │  │   │
//! │  │   │  (pool.rs)   │◄──│ product, sale │◄──│  (checkout.rs)   │  │   │
//! │  │   └──────────────┘   └───────┬───────┘   └────────┬─────────┘  │   │
//! │  │                              │ publish            │ publish    │   │
//! │  │                              ▼                    ▼            │   │
//! │  │                     ┌──────────────────────────────────┐       │   │
//! │  │                     │  ChangeFeed ──► LiveQuery<T>     │       │   │
//! │  │                     └──────────────────────────────────┘       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL) or :memory:                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool and the `Database` handle
//! - [`migrations`] - Embedded schema migrations
//! - [`repository`] - Catalog (`products`) and ledger (`sales`) stores
//! - [`checkout`] - Sale coordinator
//! - [`locks`] - Per-product stock locks
//! - [`changes`] - Change feed
//! - [`live`] - Live queries
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//! use tally_core::{BasketLine, DiscountRate};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let sale = db
//!     .checkout()
//!     .complete_sale(&[BasketLine::new(1, 4)], DiscountRate::from_percentage(10.0))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod changes;
pub mod checkout;
pub mod error;
pub mod live;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use changes::{ChangeFeed, ChangeKind, Table, TableChange};
pub use checkout::SaleCoordinator;
pub use error::{DbError, DbResult};
pub use live::LiveQuery;
pub use locks::StockLocks;
pub use pool::{Database, DbConfig};

pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
