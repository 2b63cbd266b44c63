use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use shop_types::{Amount, Item, ItemDraft, ItemId, Principal};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogStore;
use crate::config::ShopConfig;
use crate::error::{Result, ShopError};
use crate::events::{EventLog, EventRecord, ShopEvent};
use crate::guard::AccessGuard;
use crate::replay::ReplayEngine;
use crate::settlement::{Payout, PurchaseBook, PurchaseEngine, PurchaseReceipt, PurchaseRequest};
use crate::traits::{ShopReader, ShopWriter};
use crate::transfer::{FundsTransfer, InMemoryBank};
use crate::validation::{EventChainValidator, ValidationReport};

/// A broadcast channel receiver for committed events.
pub type EventStream = broadcast::Receiver<EventRecord>;

/// The storefront ledger: catalog, access guard and settlement engine around
/// one authoritative state.
///
/// All state sits behind a single lock. Each operation validates and commits
/// under one write guard; funds transfers run after the guard is dropped, so
/// a transfer that calls back into the storefront sees committed state.
pub struct Storefront {
    guard: AccessGuard,
    engine: PurchaseEngine,
    transfer: Arc<dyn FundsTransfer>,
    inner: RwLock<ShopState>,
    events: broadcast::Sender<EventRecord>,
}

#[derive(Default)]
struct ShopState {
    catalog: CatalogStore,
    book: PurchaseBook,
    log: EventLog,
}

/// Result of checking the audit trail against live state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    pub validation: ValidationReport,
    /// Whether replaying the log reproduces the live catalog and records.
    pub replay_matches: bool,
    /// `SettlementFailed` records that need manual reconciliation.
    pub unsettled: Vec<EventRecord>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.validation.is_valid() && self.replay_matches && self.unsettled.is_empty()
    }
}

impl Storefront {
    pub fn new(config: ShopConfig, transfer: Arc<dyn FundsTransfer>) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_capacity);
        info!(proprietor = %config.proprietor, "storefront initialized");
        Ok(Self {
            guard: AccessGuard::new(config.proprietor),
            engine: PurchaseEngine::new(config.proprietor, config.max_quantity_per_purchase),
            transfer,
            inner: RwLock::new(ShopState::default()),
            events,
        })
    }

    /// A storefront settling into a fresh [`InMemoryBank`].
    pub fn in_memory(config: ShopConfig) -> Result<(Self, Arc<InMemoryBank>)> {
        let bank = Arc::new(InMemoryBank::new());
        let shop = Self::new(config, bank.clone())?;
        Ok((shop, bank))
    }

    /// Receive every event committed from now on.
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Validate the event chain and compare its replay with live state.
    pub fn audit(&self) -> Result<AuditReport> {
        let state = self.read_state()?;
        let records = state.log.records();
        let validation = EventChainValidator::validate(records);
        let replayed = ReplayEngine::replay(records);

        let live_items: Vec<&Item> = state.catalog.items().collect();
        let replayed_items: Vec<&Item> = replayed.items.values().collect();
        let live_records: Vec<_> = state.book.iter().map(|(k, v)| (*k, *v)).collect();
        let replayed_records: Vec<_> = replayed.purchases.iter().map(|(k, v)| (*k, *v)).collect();

        let replay_matches = live_items == replayed_items
            && live_records == replayed_records
            && state.catalog.count() == replayed.count;

        if !replay_matches {
            warn!("event log replay diverges from live state");
        }

        Ok(AuditReport {
            validation,
            replay_matches,
            unsettled: replayed.unsettled,
        })
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, ShopState>> {
        self.inner.read().map_err(|_| ShopError::poisoned("storefront read"))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, ShopState>> {
        self.inner
            .write()
            .map_err(|_| ShopError::poisoned("storefront write"))
    }

    fn publish(&self, record: EventRecord) {
        // No subscribers is fine; the log is the durable copy.
        let _ = self.events.send(record);
    }

    fn record_settlement_failure(
        &self,
        receipt: &PurchaseReceipt,
        recipient: Principal,
        amount: Amount,
        reason: &str,
    ) -> Result<()> {
        let mut state = self.write_state()?;
        let record = state.log.append(ShopEvent::SettlementFailed {
            buyer: receipt.buyer,
            item_id: receipt.item_id,
            recipient,
            amount,
            reason: reason.to_string(),
        })?;
        self.publish(record);
        Ok(())
    }
}

impl ShopWriter for Storefront {
    fn create_item(&self, caller: &Principal, draft: ItemDraft) -> Result<ItemId> {
        self.guard.require_proprietor(caller)?;
        CatalogStore::check_draft(&draft)?;

        let mut state = self.write_state()?;
        let state = &mut *state;

        let next = state.catalog.next_id()?;
        let preview = Item::from_draft(next, draft.clone().with_available(true));
        let record = state.log.prepare(ShopEvent::created(&preview))?;

        let id = state.catalog.create_item(draft)?;
        state.log.push(record.clone());
        self.publish(record);

        info!(item_id = %id, price = %preview.price, stock = preview.stock, "item created");
        Ok(id)
    }

    fn update_item(&self, caller: &Principal, id: ItemId, draft: ItemDraft) -> Result<()> {
        self.guard.require_proprietor(caller)?;

        let mut state = self.write_state()?;
        let state = &mut *state;

        let mut updated = state.catalog.get_item(id)?.clone();
        CatalogStore::check_draft(&draft)?;
        updated.apply(draft.clone());
        let record = state.log.prepare(ShopEvent::updated(&updated))?;

        state.catalog.update_item(id, draft)?;
        state.log.push(record.clone());
        self.publish(record);

        info!(item_id = %id, available = updated.available, "item updated");
        Ok(())
    }

    fn purchase(
        &self,
        caller: &Principal,
        item_id: ItemId,
        quantity: u64,
        attached: Amount,
    ) -> Result<PurchaseReceipt> {
        let request = PurchaseRequest {
            buyer: *caller,
            item_id,
            quantity,
            attached,
        };

        let receipt = {
            let mut state = self.write_state()?;
            let state = &mut *state;

            let quote = self
                .engine
                .quote(&state.catalog, &state.book, &request)
                .inspect_err(|e| {
                    warn!(
                        buyer = %caller,
                        item_id = %item_id,
                        quantity,
                        error = %e,
                        "purchase rejected"
                    );
                })?;
            let (receipt, record) =
                self.engine
                    .commit(&mut state.catalog, &mut state.book, &mut state.log, &quote)?;
            self.publish(record);
            receipt
        };

        info!(
            buyer = %caller,
            item_id = %item_id,
            quantity,
            total = %receipt.total_price,
            refund = %receipt.refund,
            "purchase committed"
        );

        match self.engine.pay_out(self.transfer.as_ref(), &receipt) {
            Payout::Settled => Ok(receipt),
            Payout::Failed {
                recipient,
                amount,
                reason,
            } => {
                error!(
                    receipt = %receipt.receipt_id,
                    recipient = %recipient,
                    amount = %amount,
                    reason = %reason,
                    "settlement failed after commit; manual reconciliation required"
                );
                let recorded =
                    self.record_settlement_failure(&receipt, recipient, amount, &reason);
                if let Err(e) = recorded {
                    error!(error = %e, "could not record settlement failure");
                }
                Err(ShopError::TransferFailure {
                    receipt: Box::new(receipt),
                    recipient,
                    amount,
                    reason,
                })
            }
        }
    }
}

impl ShopReader for Storefront {
    fn proprietor(&self) -> Principal {
        self.guard.proprietor()
    }

    fn get_item(&self, id: ItemId) -> Result<Item> {
        let state = self.read_state()?;
        let item = state.catalog.get_item(id)?.clone();
        debug!(item_id = %id, stock = item.stock, "item read");
        Ok(item)
    }

    fn count(&self) -> Result<u64> {
        Ok(self.read_state()?.catalog.count())
    }

    fn items(&self) -> Result<Vec<Item>> {
        Ok(self.read_state()?.catalog.items().cloned().collect())
    }

    fn purchase_record(&self, buyer: &Principal, item_id: ItemId) -> Result<u64> {
        Ok(self.read_state()?.book.quantity(buyer, item_id))
    }

    fn events(&self) -> Result<Vec<EventRecord>> {
        Ok(self.read_state()?.log.records().to_vec())
    }

    fn events_since(&self, seq: u64) -> Result<Vec<EventRecord>> {
        Ok(self.read_state()?.log.since(seq).to_vec())
    }
}
