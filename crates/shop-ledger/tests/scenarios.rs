//! End-to-end purchase scenarios against an in-memory storefront.

use std::sync::Arc;

use shop_ledger::{
    InMemoryBank, ShopConfig, ShopError, ShopEvent, ShopReader, ShopWriter, Storefront,
};
use shop_types::{Amount, ItemDraft, ItemId, Principal};

struct World {
    shop: Storefront,
    bank: Arc<InMemoryBank>,
    owner: Principal,
    buyer: Principal,
    item: ItemId,
}

fn world(price: Amount, stock: u64) -> World {
    let owner = Principal::from_label("owner");
    let (shop, bank) = Storefront::in_memory(ShopConfig::new(owner)).unwrap();
    let item = shop
        .create_item(
            &owner,
            ItemDraft::new(
                "Hunting knife",
                "Sharp knife for hunting",
                "https://example.com/hunting-knife.jpg",
                price,
                stock,
            ),
        )
        .unwrap();
    World {
        shop,
        bank,
        owner,
        buyer: Principal::from_label("buyer"),
        item,
    }
}

#[test]
fn scenario_a_exact_payment() {
    let w = world(100, 10);
    let receipt = w.shop.purchase(&w.buyer, w.item, 2, 200).unwrap();

    assert_eq!(w.shop.get_item(w.item).unwrap().stock, 8);
    assert_eq!(w.shop.purchase_record(&w.buyer, w.item).unwrap(), 2);
    assert_eq!(w.bank.balance(&w.owner), 200);
    assert_eq!(w.bank.balance(&w.buyer), 0);
    assert_eq!(receipt.total_price, 200);
    assert_eq!(receipt.refund, 0);

    let last = w.shop.events().unwrap().pop().unwrap();
    assert_eq!(
        last.event,
        ShopEvent::ItemPurchased {
            buyer: w.buyer,
            item_id: w.item,
            quantity: 2,
            total_price: 200,
        }
    );
    assert_eq!(receipt.event_seq, last.seq);
}

#[test]
fn scenario_b_sell_out_then_reject() {
    let w = world(100, 10);
    w.shop.purchase(&w.buyer, w.item, 10, 1000).unwrap();
    assert_eq!(w.shop.get_item(w.item).unwrap().stock, 0);

    let err = w.shop.purchase(&w.buyer, w.item, 1, 100).unwrap_err();
    assert_eq!(
        err,
        ShopError::InsufficientStock {
            requested: 1,
            available: 0
        }
    );
    // Availability is independent of stock.
    assert!(w.shop.get_item(w.item).unwrap().available);
}

#[test]
fn scenario_c_overpayment_is_refunded() {
    let w = world(100, 10);
    let receipt = w.shop.purchase(&w.buyer, w.item, 2, 250).unwrap();

    assert_eq!(w.bank.balance(&w.owner), 200);
    assert_eq!(w.bank.balance(&w.buyer), 50);
    assert_eq!(receipt.refund, 50);
    assert_eq!(w.bank.history(), vec![(w.owner, 200), (w.buyer, 50)]);
}

#[test]
fn scenario_d_non_owner_cannot_create() {
    let w = world(100, 10);
    let mallory = Principal::from_label("mallory");
    let err = w
        .shop
        .create_item(&mallory, ItemDraft::new("Fake", "Fake", "ipfs://fake", 1, 1))
        .unwrap_err();

    assert_eq!(err, ShopError::Unauthorized);
    assert_eq!(err.to_string(), "Only owner can call this function");
    assert_eq!(w.shop.count().unwrap(), 1);
}

#[test]
fn non_owner_cannot_update() {
    let w = world(100, 10);
    let before = w.shop.get_item(w.item).unwrap();
    let err = w
        .shop
        .update_item(
            &w.buyer,
            w.item,
            ItemDraft::new("Cheap", "Cheap", "ipfs://x", 1, 1000),
        )
        .unwrap_err();
    assert_eq!(err, ShopError::Unauthorized);
    assert_eq!(w.shop.get_item(w.item).unwrap(), before);
    assert_eq!(w.shop.events().unwrap().len(), 1);
}

#[test]
fn insufficient_stock_has_no_effects() {
    let w = world(100, 5);
    let err = w.shop.purchase(&w.buyer, w.item, 10, 1000).unwrap_err();
    assert!(err.to_string().starts_with("Insufficient stock"));
    assert!(err.is_retriable());

    assert_eq!(w.shop.get_item(w.item).unwrap().stock, 5);
    assert_eq!(w.shop.purchase_record(&w.buyer, w.item).unwrap(), 0);
    assert!(w.bank.history().is_empty());
    assert_eq!(w.shop.events().unwrap().len(), 1);
}

#[test]
fn insufficient_funds_has_no_effects() {
    let w = world(100, 5);
    let err = w.shop.purchase(&w.buyer, w.item, 2, 100).unwrap_err();
    assert!(err.to_string().starts_with("Insufficient funds sent"));

    assert_eq!(w.shop.get_item(w.item).unwrap().stock, 5);
    assert_eq!(w.shop.purchase_record(&w.buyer, w.item).unwrap(), 0);
    assert!(w.bank.history().is_empty());
}

#[test]
fn unavailable_item_cannot_be_bought() {
    let w = world(100, 5);
    w.shop
        .update_item(
            &w.owner,
            w.item,
            ItemDraft::new("Hunting knife", "Retired", "ipfs://k", 100, 5).with_available(false),
        )
        .unwrap();

    let err = w.shop.purchase(&w.buyer, w.item, 1, 100).unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
    assert_eq!(w.shop.get_item(w.item).unwrap().stock, 5);
}

#[test]
fn missing_item_is_not_found() {
    let w = world(100, 5);
    assert_eq!(
        w.shop.purchase(&w.buyer, ItemId::new(2), 1, 100),
        Err(ShopError::NotFound(ItemId::new(2)))
    );
    assert_eq!(
        w.shop.get_item(ItemId::new(2)),
        Err(ShopError::NotFound(ItemId::new(2)))
    );
}

#[test]
fn price_is_read_at_purchase_time() {
    let w = world(100, 5);
    w.shop
        .update_item(
            &w.owner,
            w.item,
            ItemDraft::new("Hunting knife", "Now pricier", "ipfs://k", 150, 5),
        )
        .unwrap();

    // The buyer still believes the old price.
    let err = w.shop.purchase(&w.buyer, w.item, 1, 100).unwrap_err();
    assert_eq!(
        err,
        ShopError::InsufficientFunds {
            required: 150,
            attached: 100
        }
    );
}

#[test]
fn records_accumulate_per_buyer() {
    let w = world(10, 100);
    let other = Principal::from_label("other");
    w.shop.purchase(&w.buyer, w.item, 2, 20).unwrap();
    w.shop.purchase(&w.buyer, w.item, 3, 30).unwrap();
    w.shop.purchase(&other, w.item, 4, 40).unwrap();

    assert_eq!(w.shop.purchase_record(&w.buyer, w.item).unwrap(), 5);
    assert_eq!(w.shop.purchase_record(&other, w.item).unwrap(), 4);
    assert_eq!(w.shop.get_item(w.item).unwrap().stock, 91);
    assert!(w.shop.audit().unwrap().is_clean());
}

#[test]
fn free_items_transfer_nothing() {
    let w = world(0, 3);
    let receipt = w.shop.purchase(&w.buyer, w.item, 1, 0).unwrap();
    assert_eq!(receipt.total_price, 0);
    assert!(w.bank.history().is_empty());
}

#[test]
fn items_lists_whole_catalog() {
    let w = world(100, 5);
    w.shop
        .create_item(&w.owner, ItemDraft::new("Chef knife", "Kitchen", "ipfs://c", 80, 2))
        .unwrap();
    let names: Vec<_> = w
        .shop
        .items()
        .unwrap()
        .into_iter()
        .map(|i| (i.id.get(), i.name))
        .collect();
    assert_eq!(
        names,
        vec![(1, "Hunting knife".to_string()), (2, "Chef knife".to_string())]
    );
    assert_eq!(w.shop.proprietor(), w.owner);
}
