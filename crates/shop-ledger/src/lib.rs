//! Inventory and purchase ledger for the storefront.
//!
//! This crate is the authoritative core of the shop. It provides:
//! - `CatalogStore` with sequential, never-reused item ids
//! - `AccessGuard` restricting catalog mutation to the proprietor
//! - `PurchaseEngine` validating, committing and paying out purchases
//! - `ShopWriter` / `ShopReader` trait boundaries and the `Storefront` that
//!   implements them behind a single lock
//! - A hash-chained event log with broadcast subscriptions
//! - Deterministic replay and chain validation for audits

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod guard;
pub mod replay;
pub mod settlement;
pub mod storefront;
pub mod traits;
pub mod transfer;
pub mod validation;

pub use catalog::CatalogStore;
pub use config::{ShopConfig, MAX_EVENT_CAPACITY};
pub use error::{Result, ShopError};
pub use events::{EventLog, EventRecord, ShopEvent};
pub use guard::AccessGuard;
pub use replay::{ReplayEngine, ReplayResult};
pub use settlement::{
    Payout, PurchaseBook, PurchaseEngine, PurchaseReceipt, PurchaseRequest, Quote,
};
pub use storefront::{AuditReport, EventStream, Storefront};
pub use traits::{ShopReader, ShopWriter};
pub use transfer::{FundsTransfer, InMemoryBank, TransferError};
pub use validation::{EventChainValidator, ValidationReport, Violation, ViolationKind};
