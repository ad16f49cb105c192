//! # Commands
//!
//! One async function per user action. Each takes the shared [`AppState`],
//! returns a serialisable value or an [`ApiError`], and knows nothing
//! about how the result is printed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product.rs   add / edit / delete / get / list / search                │
//! │  sale.rs      complete / preview / list / get                          │
//! │  report.rs    sales_report / dashboard                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`AppState`]: crate::state::AppState
//! [`ApiError`]: crate::error::ApiError

pub mod product;
pub mod report;
pub mod sale;
