//! Foundation types for the storefront ledger.
//!
//! This crate provides the identity, catalog, and receipt types shared by
//! the ledger and its front ends. Every other crate in the workspace depends
//! on `shop-types`.
//!
//! # Key Types
//!
//! - [`Principal`]: Unforgeable caller identity derived from identity material
//! - [`ItemId`]: Sequential catalog identifier (first item is 1)
//! - [`Item`]: A catalog entry as stored by the ledger
//! - [`ItemDraft`]: The full set of mutable item fields used for create/update
//! - [`ReceiptId`]: UUID v7 purchase receipt identifier

pub mod error;
pub mod identity;
pub mod item;
pub mod receipt;

pub use error::TypeError;
pub use identity::{IdentityMaterial, Principal};
pub use item::{Amount, Item, ItemDraft, ItemId};
pub use receipt::ReceiptId;
