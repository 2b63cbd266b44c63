use std::path::Path;

use serde::{Deserialize, Serialize};
use shop_types::Principal;

use crate::error::{Result, ShopError};

/// Configuration captured when a storefront is constructed.
///
/// The proprietor is fixed for the lifetime of the storefront; there is no
/// ownership transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    /// The only principal allowed to create or modify catalog items, and the
    /// recipient of every purchase payment.
    pub proprietor: Principal,
    /// Buffer size of the event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Optional operator cap on units per purchase call.
    #[serde(default)]
    pub max_quantity_per_purchase: Option<u64>,
}

/// Largest accepted broadcast buffer.
pub const MAX_EVENT_CAPACITY: usize = 65_536;

fn default_event_capacity() -> usize {
    256
}

impl ShopConfig {
    /// Configuration with defaults for everything but the proprietor.
    pub fn new(proprietor: Principal) -> Self {
        Self {
            proprietor,
            event_capacity: default_event_capacity(),
            max_quantity_per_purchase: None,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ShopError::Validation(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ShopError::Validation(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ShopError::Internal(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(ShopError::Validation(
                "event_capacity must be at least 1".into(),
            ));
        }
        if self.event_capacity > MAX_EVENT_CAPACITY {
            return Err(ShopError::Validation(format!(
                "event_capacity must be at most {MAX_EVENT_CAPACITY}"
            )));
        }
        if self.max_quantity_per_purchase == Some(0) {
            return Err(ShopError::Validation(
                "max_quantity_per_purchase must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let owner = Principal::from_label("owner");
        let c = ShopConfig::new(owner);
        assert_eq!(c.proprietor, owner);
        assert_eq!(c.event_capacity, 256);
        assert!(c.max_quantity_per_purchase.is_none());
        c.validate().unwrap();
    }

    #[test]
    fn parses_minimal_toml() {
        let owner = Principal::from_label("owner");
        let source = format!("proprietor = \"{}\"\n", owner.to_hex());
        let c = ShopConfig::from_toml_str(&source).unwrap();
        assert_eq!(c, ShopConfig::new(owner));
    }

    #[test]
    fn toml_roundtrip_keeps_limits() {
        let mut c = ShopConfig::new(Principal::from_label("owner"));
        c.max_quantity_per_purchase = Some(5);
        c.event_capacity = 8;
        let text = c.to_toml_string().unwrap();
        assert_eq!(ShopConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn rejects_bad_proprietor() {
        let err = ShopConfig::from_toml_str("proprietor = \"not-hex\"").unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn rejects_zero_limits() {
        let mut c = ShopConfig::new(Principal::from_label("owner"));
        c.event_capacity = 0;
        assert!(c.validate().is_err());

        let mut c = ShopConfig::new(Principal::from_label("owner"));
        c.max_quantity_per_purchase = Some(0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_oversized_event_capacity() {
        let owner = Principal::from_label("owner");
        let source = format!(
            "proprietor = \"{}\"\nevent_capacity = 9223372036854775807\n",
            owner.to_hex()
        );
        let err = ShopConfig::from_toml_str(&source).unwrap_err();
        assert!(matches!(err, ShopError::Validation(msg) if msg.contains("at most")));

        let mut c = ShopConfig::new(owner);
        c.event_capacity = MAX_EVENT_CAPACITY;
        c.validate().unwrap();
        c.event_capacity = MAX_EVENT_CAPACITY + 1;
        assert!(c.validate().is_err());
    }

    #[test]
    fn load_reads_file() {
        let owner = Principal::from_label("owner");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "proprietor = \"{}\"", owner.to_hex()).unwrap();
        writeln!(file, "max_quantity_per_purchase = 3").unwrap();

        let c = ShopConfig::load(file.path()).unwrap();
        assert_eq!(c.max_quantity_per_purchase, Some(3));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShopConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ShopError::Validation(msg) if msg.contains("cannot read config")));
    }
}
