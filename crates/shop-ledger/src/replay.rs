use std::collections::BTreeMap;

use shop_types::{Item, ItemDraft, ItemId, Principal};

use crate::events::{EventRecord, ShopEvent};

/// Catalog and purchase records rebuilt from an event log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayResult {
    pub applied_events: u64,
    /// Highest item id seen in an `ItemCreated` event.
    pub count: u64,
    pub items: BTreeMap<ItemId, Item>,
    pub purchases: BTreeMap<(Principal, ItemId), u64>,
    /// Settlement failures awaiting manual reconciliation.
    pub unsettled: Vec<EventRecord>,
}

/// Deterministic replay of the audit trail.
pub struct ReplayEngine;

impl ReplayEngine {
    /// Rebuild state from the first record on.
    ///
    /// Records that reference unknown items are skipped; run
    /// [`crate::EventChainValidator`] to surface them.
    pub fn replay(records: &[EventRecord]) -> ReplayResult {
        let mut result = ReplayResult::default();

        for record in records {
            match &record.event {
                ShopEvent::ItemCreated {
                    id,
                    name,
                    description,
                    media_ref,
                    price,
                    stock,
                } => {
                    let draft = ItemDraft::new(
                        name.clone(),
                        description.clone(),
                        media_ref.clone(),
                        *price,
                        *stock,
                    );
                    result.items.insert(*id, Item::from_draft(*id, draft));
                    result.count = result.count.max(id.get());
                }
                ShopEvent::ItemUpdated {
                    id,
                    name,
                    description,
                    media_ref,
                    price,
                    stock,
                    available,
                } => {
                    let Some(item) = result.items.get_mut(id) else {
                        continue;
                    };
                    item.apply(
                        ItemDraft::new(
                            name.clone(),
                            description.clone(),
                            media_ref.clone(),
                            *price,
                            *stock,
                        )
                        .with_available(*available),
                    );
                }
                ShopEvent::ItemPurchased {
                    buyer,
                    item_id,
                    quantity,
                    ..
                } => {
                    let Some(item) = result.items.get_mut(item_id) else {
                        continue;
                    };
                    item.stock = item.stock.saturating_sub(*quantity);
                    let entry = result.purchases.entry((*buyer, *item_id)).or_insert(0);
                    *entry = entry.saturating_add(*quantity);
                }
                ShopEvent::SettlementFailed { .. } => {
                    result.unsettled.push(record.clone());
                }
            }
            result.applied_events += 1;
        }

        result
    }
}
