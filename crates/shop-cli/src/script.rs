use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shop_ledger::{
    InMemoryBank, PurchaseReceipt, ShopConfig, ShopError, ShopReader, ShopWriter, Storefront,
};
use shop_types::{Amount, Item, ItemDraft, ItemId, Principal};

/// A scripted session: steps run in order against one storefront.
#[derive(Clone, Debug, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

/// One scripted call. Principals are given as labels, `key:` public keys or
/// 64-char hex.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Create {
        #[serde(rename = "as")]
        caller: String,
        item: ItemDraft,
    },
    Update {
        #[serde(rename = "as")]
        caller: String,
        id: ItemId,
        item: ItemDraft,
    },
    /// Put money in a wallet so it can be attached to purchases.
    Fund { who: String, amount: Amount },
    Purchase {
        #[serde(rename = "as")]
        caller: String,
        id: ItemId,
        quantity: u64,
        attach: Amount,
    },
    Get { id: ItemId },
    Record { who: String, id: ItemId },
    List,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Fund { .. } => "fund",
            Self::Purchase { .. } => "purchase",
            Self::Get { .. } => "get",
            Self::Record { .. } => "record",
            Self::List => "list",
        }
    }
}

/// What a step produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created { id: ItemId },
    Updated { id: ItemId },
    Funded { who: Principal, balance: Amount },
    Purchased { receipt: PurchaseReceipt },
    Item { item: Item },
    Record { who: Principal, id: ItemId, quantity: u64 },
    Items { items: Vec<Item> },
    Rejected {
        step: &'static str,
        kind: &'static str,
        message: String,
    },
}

/// Distinct, stable name for each error kind shown to users.
pub fn error_kind(error: &ShopError) -> &'static str {
    match error {
        ShopError::Validation(_) => "ValidationError",
        ShopError::NotFound(_) => "NotFoundError",
        ShopError::Unauthorized => "UnauthorizedError",
        ShopError::InsufficientStock { .. } => "InsufficientStockError",
        ShopError::InsufficientFunds { .. } => "InsufficientFundsError",
        ShopError::TransferFailure { .. } => "TransferFailure",
        ShopError::Internal(_) => "InternalError",
    }
}

/// `key:<hex>` is a wallet public key, bare 64-char hex a principal hash,
/// anything else a label.
pub fn resolve_principal(text: &str) -> Principal {
    text.strip_prefix("key:")
        .and_then(|key| Principal::from_public_key_hex(key).ok())
        .or_else(|| Principal::from_hex(text).ok())
        .unwrap_or_else(|| Principal::from_label(text))
}

/// A storefront plus the wallets of everyone taking part in a script.
pub struct Session {
    pub shop: Storefront,
    pub bank: Arc<InMemoryBank>,
}

impl Session {
    pub fn new(config: ShopConfig) -> shop_ledger::Result<Self> {
        let (shop, bank) = Storefront::in_memory(config)?;
        Ok(Self { shop, bank })
    }

    pub fn execute(&self, step: &Step) -> Outcome {
        let name = step.name();
        let result = match step {
            Step::Create { caller, item } => self
                .shop
                .create_item(&resolve_principal(caller), item.clone())
                .map(|id| Outcome::Created { id }),
            Step::Update { caller, id, item } => self
                .shop
                .update_item(&resolve_principal(caller), *id, item.clone())
                .map(|()| Outcome::Updated { id: *id }),
            Step::Fund { who, amount } => return self.fund(resolve_principal(who), *amount),
            Step::Purchase {
                caller,
                id,
                quantity,
                attach,
            } => return self.purchase(resolve_principal(caller), *id, *quantity, *attach),
            Step::Get { id } => self.shop.get_item(*id).map(|item| Outcome::Item { item }),
            Step::Record { who, id } => {
                let who = resolve_principal(who);
                self.shop
                    .purchase_record(&who, *id)
                    .map(|quantity| Outcome::Record {
                        who,
                        id: *id,
                        quantity,
                    })
            }
            Step::List => self.shop.items().map(|items| Outcome::Items { items }),
        };
        result.unwrap_or_else(|e| rejected(name, &e))
    }

    fn fund(&self, who: Principal, amount: Amount) -> Outcome {
        match self.bank.deposit(&who, amount) {
            Ok(()) => Outcome::Funded {
                who,
                balance: self.bank.balance(&who),
            },
            Err(e) => Outcome::Rejected {
                step: "fund",
                kind: "WalletError",
                message: e.to_string(),
            },
        }
    }

    /// Attach funds from the buyer's wallet; a rejected purchase gives them back.
    fn purchase(&self, buyer: Principal, id: ItemId, quantity: u64, attach: Amount) -> Outcome {
        if let Err(e) = self.bank.withdraw(&buyer, attach) {
            return Outcome::Rejected {
                step: "purchase",
                kind: "WalletError",
                message: e.to_string(),
            };
        }

        match self.shop.purchase(&buyer, id, quantity, attach) {
            Ok(receipt) => Outcome::Purchased { receipt },
            Err(e) => {
                if e.is_retriable() {
                    if let Err(wallet) = self.bank.deposit(&buyer, attach) {
                        tracing::warn!(
                            buyer = %buyer,
                            error = %wallet,
                            "could not return attached funds"
                        );
                    }
                }
                rejected("purchase", &e)
            }
        }
    }
}

fn rejected(step: &'static str, error: &ShopError) -> Outcome {
    Outcome::Rejected {
        step,
        kind: error_kind(error),
        message: error.to_string(),
    }
}
