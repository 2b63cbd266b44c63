use std::collections::HashMap;
use std::sync::RwLock;

use shop_types::{Amount, Principal};

/// Failure reported by a funds transfer primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("recipient {0} rejected the transfer")]
    Rejected(Principal),

    #[error("balance overflow crediting {0}")]
    Overflow(Principal),

    #[error("insufficient balance for {principal}: required {required}, available {available}")]
    InsufficientBalance {
        principal: Principal,
        required: Amount,
        available: Amount,
    },

    #[error("transfer backend unavailable: {0}")]
    Unavailable(String),
}

/// Outbound boundary that moves funds out of the ledger.
///
/// Implementations must either deliver the full amount or fail without
/// delivering anything. They may call back into the storefront: the ledger
/// has committed its own state and released its lock before calling.
pub trait FundsTransfer: Send + Sync {
    fn transfer(&self, to: &Principal, amount: Amount) -> Result<(), TransferError>;
}

/// In-memory balances for tests, demos, and embedding.
///
/// Every successful [`FundsTransfer::transfer`] credits the recipient and is
/// appended to a transfer history.
#[derive(Debug, Default)]
pub struct InMemoryBank {
    inner: RwLock<BankState>,
}

#[derive(Debug, Default)]
struct BankState {
    balances: HashMap<Principal, Amount>,
    history: Vec<(Principal, Amount)>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, principal: &Principal) -> Amount {
        self.inner
            .read()
            .map(|state| state.balances.get(principal).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Add funds to a wallet from outside the ledger.
    pub fn deposit(&self, principal: &Principal, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.write()?;
        credit(&mut state, principal, amount)
    }

    /// Take funds out of a wallet, e.g. to attach them to a purchase.
    pub fn withdraw(&self, principal: &Principal, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.write()?;
        let available = state.balances.get(principal).copied().unwrap_or(0);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(TransferError::InsufficientBalance {
                    principal: *principal,
                    required: amount,
                    available,
                })?;
        state.balances.insert(*principal, remaining);
        Ok(())
    }

    /// Transfers delivered so far, oldest first.
    pub fn history(&self) -> Vec<(Principal, Amount)> {
        self.inner
            .read()
            .map(|state| state.history.clone())
            .unwrap_or_default()
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BankState>, TransferError> {
        self.inner
            .write()
            .map_err(|_| TransferError::Unavailable("bank lock poisoned".into()))
    }
}

impl FundsTransfer for InMemoryBank {
    fn transfer(&self, to: &Principal, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.write()?;
        credit(&mut state, to, amount)?;
        state.history.push((*to, amount));
        Ok(())
    }
}

fn credit(
    state: &mut BankState,
    principal: &Principal,
    amount: Amount,
) -> Result<(), TransferError> {
    let balance = state.balances.entry(*principal).or_insert(0);
    *balance = balance
        .checked_add(amount)
        .ok_or(TransferError::Overflow(*principal))?;
    Ok(())
}
