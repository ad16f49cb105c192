//! # Repository Module
//!
//! The two stores, each a thin typed layer over its tables.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  db.products()                         db.sales()                       │
//! │  ProductRepository (catalog)           SaleRepository (ledger)          │
//! │  ├── create / update / delete          ├── append                      │
//! │  ├── get / list / search               ├── get / list                  │
//! │  ├── list_low_stock / count            ├── list_by_date_range          │
//! │  └── adjust_stock (guarded)            └── list_recent / count         │
//! │                                                                         │
//! │  Both publish to the ChangeFeed after a successful write.              │
//! │  The coordinator reuses their `*_in` helpers inside one transaction.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod product;
pub mod sale;
