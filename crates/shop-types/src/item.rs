use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Monetary amount in the smallest indivisible currency unit.
pub type Amount = u128;

/// Sequential catalog identifier.
///
/// The ledger assigns ids starting at 1 and never reuses them, so `0` never
/// names an item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id that follows this one.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl From<u64> for ItemId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl FromStr for ItemId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('#').unwrap_or(s);
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| TypeError::InvalidItemId(format!("{s}: {e}")))
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The full set of mutable item fields.
///
/// Catalog updates always replace every field; there is no partial patch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub description: String,
    /// URI of the item's image or other media.
    pub media_ref: String,
    /// Unit price in the smallest currency unit.
    pub price: Amount,
    pub stock: u64,
    /// Operator-controlled flag, independent of `stock`.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl ItemDraft {
    /// A draft for a new, available item.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        media_ref: impl Into<String>,
        price: Amount,
        stock: u64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            media_ref: media_ref.into(),
            price,
            stock,
            available: true,
        }
    }

    /// Builder-style availability override.
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Name of the first text field that is empty or whitespace-only.
    pub fn blank_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("description", &self.description),
            ("media_ref", &self.media_ref),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// A catalog entry as stored by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub media_ref: String,
    pub price: Amount,
    pub stock: u64,
    pub available: bool,
}

impl Item {
    /// Materialize a draft under an assigned id.
    pub fn from_draft(id: ItemId, draft: ItemDraft) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            media_ref: draft.media_ref,
            price: draft.price,
            stock: draft.stock,
            available: draft.available,
        }
    }

    /// Replace every mutable field, keeping the id.
    pub fn apply(&mut self, draft: ItemDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.media_ref = draft.media_ref;
        self.price = draft.price;
        self.stock = draft.stock;
        self.available = draft.available;
    }

    /// The mutable fields of this item as a draft.
    pub fn to_draft(&self) -> ItemDraft {
        ItemDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            media_ref: self.media_ref.clone(),
            price: self.price,
            stock: self.stock,
            available: self.available,
        }
    }
}
