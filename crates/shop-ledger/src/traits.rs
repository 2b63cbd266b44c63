use shop_types::{Amount, Item, ItemDraft, ItemId, Principal};

use crate::error::Result;
use crate::events::EventRecord;
use crate::settlement::PurchaseReceipt;

/// Write boundary of the storefront ledger.
///
/// `caller` is always supplied by the session layer next to the request; it
/// is never read from the request payload.
pub trait ShopWriter: Send + Sync {
    /// Proprietor only. The new item is always available.
    fn create_item(&self, caller: &Principal, draft: ItemDraft) -> Result<ItemId>;

    /// Proprietor only. Replaces every mutable field.
    fn update_item(&self, caller: &Principal, id: ItemId, draft: ItemDraft) -> Result<()>;

    /// Buy `quantity` units of `item_id`, paying with `attached` funds.
    fn purchase(
        &self,
        caller: &Principal,
        item_id: ItemId,
        quantity: u64,
        attached: Amount,
    ) -> Result<PurchaseReceipt>;
}

/// Read boundary of the storefront ledger.
pub trait ShopReader: Send + Sync {
    fn proprietor(&self) -> Principal;

    fn get_item(&self, id: ItemId) -> Result<Item>;

    /// Highest assigned item id.
    fn count(&self) -> Result<u64>;

    fn items(&self) -> Result<Vec<Item>>;

    fn purchase_record(&self, buyer: &Principal, item_id: ItemId) -> Result<u64>;

    fn events(&self) -> Result<Vec<EventRecord>>;

    /// Records with a sequence number greater than `seq`.
    fn events_since(&self, seq: u64) -> Result<Vec<EventRecord>>;
}
