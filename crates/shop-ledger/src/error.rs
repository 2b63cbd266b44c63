use shop_types::{Amount, ItemId, Principal};

use crate::settlement::PurchaseReceipt;

/// Convenience alias used throughout the ledger crate.
pub type Result<T> = std::result::Result<T, ShopError>;

/// Errors produced by ledger operations.
///
/// Every variant except [`ShopError::TransferFailure`] and
/// [`ShopError::Internal`] is raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShopError {
    /// Malformed input: blank text fields, zero quantity, arithmetic overflow.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("item {0} not found")]
    NotFound(ItemId),

    #[error("Only owner can call this function")]
    Unauthorized,

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u64, available: u64 },

    #[error("Insufficient funds sent: required {required}, attached {attached}")]
    InsufficientFunds { required: Amount, attached: Amount },

    /// Funds could not be delivered after the purchase was committed.
    ///
    /// Stock and purchase records are NOT rolled back; the receipt is carried
    /// so the payment can be reconciled by hand.
    #[error(
        "transfer of {amount} to {recipient} failed after commit of receipt {}: {reason}",
        .receipt.receipt_id
    )]
    TransferFailure {
        receipt: Box<PurchaseReceipt>,
        recipient: Principal,
        amount: Amount,
        reason: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Whether the caller may retry after correcting its input.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound(_)
                | Self::Unauthorized
                | Self::InsufficientStock { .. }
                | Self::InsufficientFunds { .. }
        )
    }

    /// Whether the ledger committed effects that the error did not undo.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransferFailure { .. })
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        Self::Internal(format!("{what} lock poisoned"))
    }
}
