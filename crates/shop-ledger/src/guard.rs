use shop_types::Principal;

use crate::error::{Result, ShopError};

/// Restricts catalog mutation to the proprietor.
///
/// Holds nothing but the proprietor identity captured at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessGuard {
    proprietor: Principal,
}

impl AccessGuard {
    pub fn new(proprietor: Principal) -> Self {
        Self { proprietor }
    }

    pub fn proprietor(&self) -> Principal {
        self.proprietor
    }

    pub fn require_proprietor(&self, caller: &Principal) -> Result<()> {
        if *caller != self.proprietor {
            tracing::warn!(caller = %caller, "catalog mutation denied");
            return Err(ShopError::Unauthorized);
        }
        Ok(())
    }
}
