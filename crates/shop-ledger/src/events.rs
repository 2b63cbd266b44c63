use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use shop_types::{Amount, Item, ItemId, Principal};

use crate::error::{Result, ShopError};

/// Notifications emitted by the ledger.
///
/// Variant and field names are the compatibility surface relied on by
/// indexers and the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopEvent {
    ItemCreated {
        id: ItemId,
        name: String,
        description: String,
        media_ref: String,
        price: Amount,
        stock: u64,
    },
    ItemUpdated {
        id: ItemId,
        name: String,
        description: String,
        media_ref: String,
        price: Amount,
        stock: u64,
        available: bool,
    },
    ItemPurchased {
        buyer: Principal,
        item_id: ItemId,
        quantity: u64,
        total_price: Amount,
    },
    /// A purchase committed but one of its payouts was not delivered.
    SettlementFailed {
        buyer: Principal,
        item_id: ItemId,
        recipient: Principal,
        amount: Amount,
        reason: String,
    },
}

impl ShopEvent {
    pub fn created(item: &Item) -> Self {
        Self::ItemCreated {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            media_ref: item.media_ref.clone(),
            price: item.price,
            stock: item.stock,
        }
    }

    pub fn updated(item: &Item) -> Self {
        Self::ItemUpdated {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            media_ref: item.media_ref.clone(),
            price: item.price,
            stock: item.stock,
            available: item.available,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ItemCreated { .. } => "ItemCreated",
            Self::ItemUpdated { .. } => "ItemUpdated",
            Self::ItemPurchased { .. } => "ItemPurchased",
            Self::SettlementFailed { .. } => "SettlementFailed",
        }
    }

    /// The item this event concerns.
    pub fn item_id(&self) -> ItemId {
        match self {
            Self::ItemCreated { id, .. } | Self::ItemUpdated { id, .. } => *id,
            Self::ItemPurchased { item_id, .. } | Self::SettlementFailed { item_id, .. } => {
                *item_id
            }
        }
    }
}

impl fmt::Display for ShopEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemCreated {
                id, name, price, stock, ..
            } => write!(f, "ItemCreated {id} \"{name}\" price={price} stock={stock}"),
            Self::ItemUpdated {
                id,
                name,
                price,
                stock,
                available,
                ..
            } => write!(
                f,
                "ItemUpdated {id} \"{name}\" price={price} stock={stock} available={available}"
            ),
            Self::ItemPurchased {
                buyer,
                item_id,
                quantity,
                total_price,
            } => write!(
                f,
                "ItemPurchased {item_id} buyer={buyer} quantity={quantity} total={total_price}"
            ),
            Self::SettlementFailed {
                item_id,
                recipient,
                amount,
                reason,
                ..
            } => write!(
                f,
                "SettlementFailed {item_id} recipient={recipient} amount={amount}: {reason}"
            ),
        }
    }
}

/// An event as stored in the audit trail.
///
/// Records are hash-linked: `hash` covers every other field, including
/// `prev_hash`, so editing or removing a record breaks the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// 1-based position in the log.
    pub seq: u64,
    pub prev_hash: Option<[u8; 32]>,
    pub hash: [u8; 32],
    pub timestamp_ms: u64,
    pub event: ShopEvent,
}

impl EventRecord {
    /// Recompute the hash this record should carry.
    pub fn compute_hash(&self) -> Result<[u8; 32]> {
        let mut canonical = self.clone();
        canonical.hash = [0; 32];

        let encoded = serde_json::to_vec(&canonical)
            .map_err(|e| ShopError::Internal(format!("event encoding failed: {e}")))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"shop-event-v1:");
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }

    /// Short hex representation of the hash.
    pub fn short_hash(&self) -> String {
        hex::encode(&self.hash[..4])
    }
}

/// Append-only, hash-chained event log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the record that appending `event` would produce.
    ///
    /// Nothing is stored until [`EventLog::push`], so a caller can prepare the
    /// record before mutating anything else.
    pub fn prepare(&self, event: ShopEvent) -> Result<EventRecord> {
        let last = self.head();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let mut record = EventRecord {
            seq: self.records.len() as u64 + 1,
            prev_hash: last.map(|r| r.hash),
            hash: [0; 32],
            timestamp_ms: last.map_or(now, |r| now.max(r.timestamp_ms)),
            event,
        };
        record.hash = record.compute_hash()?;
        Ok(record)
    }

    /// Append a record obtained from [`EventLog::prepare`] on this log.
    pub fn push(&mut self, record: EventRecord) {
        debug_assert_eq!(record.seq, self.records.len() as u64 + 1);
        tracing::debug!(seq = record.seq, kind = record.event.kind(), "event appended");
        self.records.push(record);
    }

    pub fn append(&mut self, event: ShopEvent) -> Result<EventRecord> {
        let record = self.prepare(event)?;
        self.push(record.clone());
        Ok(record)
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `seq` strictly greater than `seq`.
    pub fn since(&self, seq: u64) -> &[EventRecord] {
        let start = (seq as usize).min(self.records.len());
        &self.records[start..]
    }

    pub fn head(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
