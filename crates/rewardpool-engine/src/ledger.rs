//! Host ledger collaborator.
//!
//! The engine never moves value itself. It reads settled receipts and
//! balances through [`Ledger`] and hands back the [`Transfer`]s it wants
//! issued. [`InMemoryLedger`] is a simple host used by the simulator and
//! tests.

use {
    crate::{PoolError, Result},
    rewardpool_common::{Address, AssetId, Receipt, Transfer},
    std::collections::{HashMap, HashSet},
    thiserror::Error,
    tracing::debug,
};

pub trait Ledger {
    /// Whether the host settled this transfer. Settlement is permanent; the
    /// pool itself tracks which receipts it has already accepted.
    fn is_settled(&self, receipt: &Receipt) -> bool;

    /// Current balance of `asset` held by `holder`.
    fn balance_of(&self, holder: &Address, asset: AssetId) -> u64;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{holder} holds {available} of {asset}, needs {requested}")]
    InsufficientFunds {
        holder: Address,
        asset: AssetId,
        requested: u64,
        available: u64,
    },

    #[error("Balance overflow for {holder} in {asset}")]
    Overflow { holder: Address, asset: AssetId },
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    balances: HashMap<(Address, AssetId), u64>,
    settled: HashSet<Receipt>,
    next_id: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `holder` out of thin air (genesis funding, consensus rewards).
    pub fn mint(&mut self, holder: Address, asset: AssetId, amount: u64) -> std::result::Result<(), LedgerError> {
        let balance = self.balances.entry((holder, asset)).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { holder, asset })?;
        Ok(())
    }

    /// Moves `amount` from `sender` to `receiver` and returns the settled
    /// receipt.
    pub fn pay(
        &mut self,
        sender: Address,
        receiver: Address,
        asset: AssetId,
        amount: u64,
    ) -> std::result::Result<Receipt, LedgerError> {
        self.move_funds(sender, receiver, asset, amount)?;

        self.next_id += 1;
        let receipt = Receipt {
            id: self.next_id,
            sender,
            receiver,
            asset,
            amount,
        };
        self.settled.insert(receipt);
        debug!("Settled receipt {} for {} of {}", receipt.id, amount, asset);
        Ok(receipt)
    }

    /// Issues the pool's outbound transfers. Either every transfer applies
    /// or none does.
    pub fn apply(&mut self, from: Address, transfers: &[Transfer]) -> std::result::Result<(), LedgerError> {
        let mut draft = self.balances.clone();
        for transfer in transfers {
            Self::move_in(&mut draft, from, transfer.to, transfer.asset, transfer.amount)?;
        }
        self.balances = draft;
        Ok(())
    }

    fn move_funds(
        &mut self,
        from: Address,
        to: Address,
        asset: AssetId,
        amount: u64,
    ) -> std::result::Result<(), LedgerError> {
        Self::move_in(&mut self.balances, from, to, asset, amount)
    }

    fn move_in(
        balances: &mut HashMap<(Address, AssetId), u64>,
        from: Address,
        to: Address,
        asset: AssetId,
        amount: u64,
    ) -> std::result::Result<(), LedgerError> {
        let available = balances.get(&(from, asset)).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                holder: from,
                asset,
                requested: amount,
                available,
            });
        }
        balances.insert((from, asset), available - amount);

        let balance = balances.entry((to, asset)).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { holder: to, asset })?;
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn is_settled(&self, receipt: &Receipt) -> bool {
        self.settled.contains(receipt)
    }

    fn balance_of(&self, holder: &Address, asset: AssetId) -> u64 {
        self.balances.get(&(*holder, asset)).copied().unwrap_or(0)
    }
}

/// Checks that `holder` can fund every transfer, summed per asset.
/// `shortfall` builds the error for the first uncovered asset.
pub(crate) fn ensure_covered(
    ledger: &dyn Ledger,
    holder: &Address,
    transfers: &[Transfer],
    shortfall: fn(u64, u64) -> PoolError,
) -> Result<()> {
    let mut totals: Vec<(AssetId, u64)> = Vec::new();
    for transfer in transfers {
        match totals.iter_mut().find(|(asset, _)| *asset == transfer.asset) {
            Some((_, total)) => {
                *total = total
                    .checked_add(transfer.amount)
                    .ok_or(PoolError::ArithmeticOverflow)?
            }
            None => totals.push((transfer.asset, transfer.amount)),
        }
    }

    for (asset, requested) in totals {
        let available = ledger.balance_of(holder, asset);
        if requested > available {
            return Err(shortfall(requested, available));
        }
    }
    Ok(())
}
