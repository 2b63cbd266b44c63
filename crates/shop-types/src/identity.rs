use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Material used to derive a [`Principal`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityMaterial {
    /// A wallet or account public key (32 bytes).
    PublicKey([u8; 32]),
    /// A human-readable account label, used by local sessions and scripts.
    Label(String),
}

/// Unforgeable caller identity supplied by the session layer.
///
/// A `Principal` is derived deterministically from [`IdentityMaterial`]
/// using BLAKE3; the same material always yields the same principal. The
/// ledger never lets a caller assert a principal in a request payload: it is
/// always an argument supplied next to the request.
///
/// Serialized as a 64-character hex string so it can appear in TOML
/// configuration and JSON scripts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Principal {
    hash: [u8; 32],
}

impl Principal {
    /// Derive a `Principal` from identity material.
    pub fn derive(material: &IdentityMaterial) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"shop-principal-v1:");
        match material {
            IdentityMaterial::PublicKey(pk) => {
                hasher.update(b"pubkey:");
                hasher.update(pk);
            }
            IdentityMaterial::Label(label) => {
                hasher.update(b"label:");
                hasher.update(label.as_bytes());
            }
        }
        Self {
            hash: *hasher.finalize().as_bytes(),
        }
    }

    /// Shorthand for deriving from a [`IdentityMaterial::Label`].
    pub fn from_label(label: &str) -> Self {
        Self::derive(&IdentityMaterial::Label(label.to_string()))
    }

    /// Derive from a hex-encoded 32-byte wallet public key.
    pub fn from_public_key_hex(s: &str) -> Result<Self, TypeError> {
        Ok(Self::derive(&IdentityMaterial::PublicKey(decode_32(s)?)))
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("pr:{}", hex::encode(&self.hash[..4]))
    }

    /// Parse from a hex string (64 hex characters, optional `pr:` prefix).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("pr:").unwrap_or(s);
        Ok(Self { hash: decode_32(s)? })
    }
}

fn decode_32(s: &str) -> Result<[u8; 32], TypeError> {
    let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| TypeError::InvalidLength {
        expected: 32,
        actual: bytes.len(),
    })
}

impl FromStr for Principal {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.short_id())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}
