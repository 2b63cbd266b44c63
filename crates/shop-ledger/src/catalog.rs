use std::collections::BTreeMap;

use shop_types::{Item, ItemDraft, ItemId};

use crate::error::{Result, ShopError};

/// Authoritative mapping from item id to item record.
///
/// The store performs no locking and no authorization of its own: every
/// mutation reaches it through [`crate::Storefront`], which holds the store
/// lock and runs the access guard first.
#[derive(Clone, Debug, Default)]
pub struct CatalogStore {
    items: BTreeMap<ItemId, Item>,
    last_id: u64,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new available item under the next sequential id.
    pub fn create_item(&mut self, draft: ItemDraft) -> Result<ItemId> {
        Self::check_draft(&draft)?;
        let id = self.next_id()?;

        let item = Item::from_draft(id, draft.with_available(true));
        self.items.insert(id, item);
        self.last_id = id.get();
        Ok(id)
    }

    /// Replace every mutable field of an existing item.
    pub fn update_item(&mut self, id: ItemId, draft: ItemDraft) -> Result<()> {
        let item = self.items.get_mut(&id).ok_or(ShopError::NotFound(id))?;
        Self::check_draft(&draft)?;
        item.apply(draft);
        Ok(())
    }

    /// Reject drafts with a blank name, description or media reference.
    pub fn check_draft(draft: &ItemDraft) -> Result<()> {
        match draft.blank_field() {
            Some(field) => Err(ShopError::Validation(format!("{field} must not be empty"))),
            None => Ok(()),
        }
    }

    /// The id the next created item will receive.
    pub fn next_id(&self) -> Result<ItemId> {
        ItemId::new(self.last_id)
            .next()
            .ok_or_else(|| ShopError::Validation("item id space exhausted".into()))
    }

    pub fn get_item(&self, id: ItemId) -> Result<&Item> {
        self.items.get(&id).ok_or(ShopError::NotFound(id))
    }

    /// Highest assigned id, which is also the number of items ever created.
    pub fn count(&self) -> u64 {
        self.last_id
    }

    /// All items in id order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub(crate) fn decrement_stock(&mut self, id: ItemId, quantity: u64) -> Result<()> {
        let item = self.items.get_mut(&id).ok_or(ShopError::NotFound(id))?;
        item.stock = item
            .stock
            .checked_sub(quantity)
            .ok_or(ShopError::InsufficientStock {
                requested: quantity,
                available: item.stock,
            })?;
        Ok(())
    }
}
