use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shop_types::{Amount, ItemId, Principal, ReceiptId};

use crate::catalog::CatalogStore;
use crate::error::{Result, ShopError};
use crate::events::{EventLog, EventRecord, ShopEvent};
use crate::transfer::FundsTransfer;

/// Cumulative quantity bought per (buyer, item).
///
/// Entries are created on first purchase and only ever grow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurchaseBook {
    records: BTreeMap<(Principal, ItemId), u64>,
}

impl PurchaseBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity `buyer` has bought of `item_id`; zero if never bought.
    pub fn quantity(&self, buyer: &Principal, item_id: ItemId) -> u64 {
        self.records.get(&(*buyer, item_id)).copied().unwrap_or(0)
    }

    /// What the record would read after buying `quantity` more.
    pub fn projected(&self, buyer: &Principal, item_id: ItemId, quantity: u64) -> Result<u64> {
        self.quantity(buyer, item_id)
            .checked_add(quantity)
            .ok_or_else(|| ShopError::Validation("purchase record overflow".into()))
    }

    pub(crate) fn set(&mut self, buyer: Principal, item_id: ItemId, total: u64) {
        self.records.insert((buyer, item_id), total);
    }

    /// All records as `((buyer, item), quantity)`.
    pub fn iter(&self) -> impl Iterator<Item = (&(Principal, ItemId), &u64)> {
        self.records.iter()
    }
}

/// Inputs of a purchase call. Price and stock are never part of it: both are
/// read from the catalog at call time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub buyer: Principal,
    pub item_id: ItemId,
    pub quantity: u64,
    /// Funds the buyer sent along with the call.
    pub attached: Amount,
}

/// Confirmation handed back for a committed purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub receipt_id: ReceiptId,
    pub buyer: Principal,
    pub item_id: ItemId,
    pub quantity: u64,
    pub unit_price: Amount,
    pub total_price: Amount,
    pub attached: Amount,
    /// `attached - total_price`, returned to the buyer.
    pub refund: Amount,
    /// Sequence number of the `ItemPurchased` event.
    pub event_seq: u64,
}

/// A fully validated purchase that has not touched any state yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    pub request: PurchaseRequest,
    pub unit_price: Amount,
    pub total_price: Amount,
    pub refund: Amount,
    /// Purchase record value after commit.
    pub record_after: u64,
}

/// Outcome of paying out a committed purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payout {
    Settled,
    /// `recipient` did not receive `amount`; later payouts were skipped.
    Failed {
        recipient: Principal,
        amount: Amount,
        reason: String,
    },
}

/// Validates, commits and pays out purchases.
///
/// The engine is stateless apart from configuration; the storefront hands
/// it the catalog, purchase book and event log under its write lock.
#[derive(Clone, Copy, Debug)]
pub struct PurchaseEngine {
    proprietor: Principal,
    max_quantity: Option<u64>,
}

impl PurchaseEngine {
    pub fn new(proprietor: Principal, max_quantity: Option<u64>) -> Self {
        Self {
            proprietor,
            max_quantity,
        }
    }

    /// Run every precondition in order. The first failure is returned.
    pub fn quote(
        &self,
        catalog: &CatalogStore,
        book: &PurchaseBook,
        request: &PurchaseRequest,
    ) -> Result<Quote> {
        let item = catalog.get_item(request.item_id)?;

        if !item.available {
            return Err(ShopError::Validation(format!(
                "item {} is not available",
                item.id
            )));
        }
        if request.quantity == 0 {
            return Err(ShopError::Validation("quantity must be at least 1".into()));
        }
        if let Some(max) = self.max_quantity {
            if request.quantity > max {
                return Err(ShopError::Validation(format!(
                    "quantity {} exceeds the per-purchase limit of {max}",
                    request.quantity
                )));
            }
        }
        if request.quantity > item.stock {
            return Err(ShopError::InsufficientStock {
                requested: request.quantity,
                available: item.stock,
            });
        }

        let total_price = item
            .price
            .checked_mul(Amount::from(request.quantity))
            .ok_or_else(|| ShopError::Validation("total price overflow".into()))?;

        if request.attached < total_price {
            return Err(ShopError::InsufficientFunds {
                required: total_price,
                attached: request.attached,
            });
        }

        let record_after = book.projected(&request.buyer, request.item_id, request.quantity)?;

        Ok(Quote {
            request: *request,
            unit_price: item.price,
            total_price,
            refund: request.attached - total_price,
            record_after,
        })
    }

    /// Apply a quote: decrement stock, bump the purchase record, append the
    /// `ItemPurchased` event. Either all three land or none does.
    pub fn commit(
        &self,
        catalog: &mut CatalogStore,
        book: &mut PurchaseBook,
        log: &mut EventLog,
        quote: &Quote,
    ) -> Result<(PurchaseReceipt, EventRecord)> {
        let request = &quote.request;
        let record = log.prepare(ShopEvent::ItemPurchased {
            buyer: request.buyer,
            item_id: request.item_id,
            quantity: request.quantity,
            total_price: quote.total_price,
        })?;

        catalog.decrement_stock(request.item_id, request.quantity)?;
        book.set(request.buyer, request.item_id, quote.record_after);

        let receipt = PurchaseReceipt {
            receipt_id: ReceiptId::new(),
            buyer: request.buyer,
            item_id: request.item_id,
            quantity: request.quantity,
            unit_price: quote.unit_price,
            total_price: quote.total_price,
            attached: request.attached,
            refund: quote.refund,
            event_seq: record.seq,
        };
        log.push(record.clone());
        Ok((receipt, record))
    }

    /// Pay the proprietor, then refund any overpayment.
    ///
    /// Must be called without holding the store lock. Zero amounts are not
    /// transferred. A failed proprietor payment skips the refund.
    pub fn pay_out(&self, transfer: &dyn FundsTransfer, receipt: &PurchaseReceipt) -> Payout {
        let payouts = [
            (self.proprietor, receipt.total_price),
            (receipt.buyer, receipt.refund),
        ];
        for (recipient, amount) in payouts {
            if amount == 0 {
                continue;
            }
            if let Err(e) = transfer.transfer(&recipient, amount) {
                return Payout::Failed {
                    recipient,
                    amount,
                    reason: e.to_string(),
                };
            }
        }
        Payout::Settled
    }
}

#[cfg(test)]
mod tests {
    use shop_types::ItemDraft;

    use super::*;
    use crate::transfer::{InMemoryBank, TransferError};

    struct Fixture {
        engine: PurchaseEngine,
        catalog: CatalogStore,
        book: PurchaseBook,
        log: EventLog,
        owner: Principal,
        buyer: Principal,
        item: ItemId,
    }

    fn fixture(price: Amount, stock: u64) -> Fixture {
        let owner = Principal::from_label("owner");
        let mut catalog = CatalogStore::new();
        let item = catalog
            .create_item(ItemDraft::new("Knife", "Sharp", "ipfs://knife", price, stock))
            .unwrap();
        Fixture {
            engine: PurchaseEngine::new(owner, None),
            catalog,
            book: PurchaseBook::new(),
            log: EventLog::new(),
            owner,
            buyer: Principal::from_label("buyer"),
            item,
        }
    }

    fn request(f: &Fixture, quantity: u64, attached: Amount) -> PurchaseRequest {
        PurchaseRequest {
            buyer: f.buyer,
            item_id: f.item,
            quantity,
            attached,
        }
    }

    #[test]
    fn quote_computes_total_and_refund() {
        let f = fixture(100, 10);
        let quote = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 2, 250))
            .unwrap();
        assert_eq!(quote.total_price, 200);
        assert_eq!(quote.refund, 50);
        assert_eq!(quote.record_after, 2);
    }

    #[test]
    fn missing_item_is_checked_first() {
        let f = fixture(100, 10);
        let mut req = request(&f, 0, 0);
        req.item_id = ItemId::new(9);
        assert_eq!(
            f.engine.quote(&f.catalog, &f.book, &req).unwrap_err(),
            ShopError::NotFound(ItemId::new(9))
        );
    }

    #[test]
    fn unavailable_item_is_rejected_before_stock() {
        let mut f = fixture(100, 0);
        f.catalog
            .update_item(
                f.item,
                ItemDraft::new("Knife", "Sharp", "ipfs://knife", 100, 0).with_available(false),
            )
            .unwrap();
        let err = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 5, 0))
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(msg) if msg.contains("not available")));
    }

    #[test]
    fn purchase_record_overflow_is_rejected() {
        let mut f = fixture(0, 10);
        f.book.set(f.buyer, f.item, u64::MAX - 1);

        let err = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 2, 0))
            .unwrap_err();
        assert_eq!(err, ShopError::Validation("purchase record overflow".into()));
        assert_eq!(f.book.quantity(&f.buyer, f.item), u64::MAX - 1);

        let quote = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 1, 0))
            .unwrap();
        assert_eq!(quote.record_after, u64::MAX);
    }

    #[test]
    fn zero_quantity_is_invalid() {
        let f = fixture(100, 10);
        let err = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 0, 1000))
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn stock_is_checked_before_funds() {
        let f = fixture(100, 5);
        let err = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 10, 0))
            .unwrap_err();
        assert_eq!(
            err,
            ShopError::InsufficientStock {
                requested: 10,
                available: 5
            }
        );
        assert!(err.to_string().starts_with("Insufficient stock"));
    }

    #[test]
    fn underpayment_is_rejected() {
        let f = fixture(100, 5);
        let err = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 2, 100))
            .unwrap_err();
        assert_eq!(
            err,
            ShopError::InsufficientFunds {
                required: 200,
                attached: 100
            }
        );
        assert!(err.to_string().starts_with("Insufficient funds sent"));
    }

    #[test]
    fn price_overflow_is_a_validation_error() {
        let f = fixture(Amount::MAX, 5);
        let err = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 2, Amount::MAX))
            .unwrap_err();
        assert_eq!(err, ShopError::Validation("total price overflow".into()));
    }

    #[test]
    fn quantity_limit_applies() {
        let mut f = fixture(1, 100);
        f.engine = PurchaseEngine::new(f.owner, Some(3));
        f.engine
            .quote(&f.catalog, &f.book, &request(&f, 3, 3))
            .unwrap();
        let err = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 4, 4))
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(msg) if msg.contains("limit of 3")));
    }

    #[test]
    fn commit_applies_all_effects() {
        let mut f = fixture(100, 10);
        let quote = f
            .engine
            .quote(&f.catalog, &f.book, &request(&f, 2, 200))
            .unwrap();
        let (receipt, record) = f
            .engine
            .commit(&mut f.catalog, &mut f.book, &mut f.log, &quote)
            .unwrap();

        assert_eq!(f.catalog.get_item(f.item).unwrap().stock, 8);
        assert_eq!(f.book.quantity(&f.buyer, f.item), 2);
        assert_eq!(receipt.event_seq, 1);
        assert_eq!(receipt.refund, 0);
        assert_eq!(f.log.records(), &[record]);
    }

    #[test]
    fn pay_out_pays_owner_then_refunds() {
        let f = fixture(100, 10);
        let bank = InMemoryBank::new();
        let receipt = PurchaseReceipt {
            receipt_id: ReceiptId::new(),
            buyer: f.buyer,
            item_id: f.item,
            quantity: 2,
            unit_price: 100,
            total_price: 200,
            attached: 250,
            refund: 50,
            event_seq: 1,
        };
        assert_eq!(f.engine.pay_out(&bank, &receipt), Payout::Settled);
        assert_eq!(bank.history(), vec![(f.owner, 200), (f.buyer, 50)]);
    }

    struct Refusing(Principal);

    impl FundsTransfer for Refusing {
        fn transfer(
            &self,
            to: &Principal,
            _amount: Amount,
        ) -> std::result::Result<(), TransferError> {
            if *to == self.0 {
                Err(TransferError::Rejected(*to))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn failed_owner_payment_skips_refund() {
        let f = fixture(100, 10);
        let receipt = PurchaseReceipt {
            receipt_id: ReceiptId::new(),
            buyer: f.buyer,
            item_id: f.item,
            quantity: 1,
            unit_price: 100,
            total_price: 100,
            attached: 150,
            refund: 50,
            event_seq: 1,
        };
        let payout = f.engine.pay_out(&Refusing(f.owner), &receipt);
        assert!(matches!(
            payout,
            Payout::Failed { recipient, amount: 100, .. } if recipient == f.owner
        ));
    }
}
