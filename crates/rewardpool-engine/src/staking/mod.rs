//! Staker registry, persisted pool state and the stake lifecycle.

mod lifecycle;
pub mod registry;
pub mod types;

pub(crate) use lifecycle::drain_rewards;
pub use lifecycle::{admin_unstake, claim, stake, stake_locked, unstake};
pub use registry::StakerRegistry;
pub use types::{PoolState, StakerRecord};

use {
    crate::{ledger::Ledger, PoolError, Result},
    rewardpool_common::{Address, AssetId, CallContext, PoolConfig, Receipt, MAX_REWARD_ASSETS},
    serde::{Deserialize, Serialize},
};

/// The entire persisted footprint of one pool instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub state: PoolState,
    pub registry: StakerRegistry,
}

impl PoolSnapshot {
    pub fn provision(address: Address, config: &PoolConfig) -> Self {
        Self {
            state: PoolState::from_config(address, config),
            registry: StakerRegistry::new(config.capacity),
        }
    }

    /// Verifies the accounting invariants that every committed state must
    /// satisfy. Returns a description of the first violation.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let occupied = self.registry.occupied();

        let staked: u128 = occupied.iter().map(|r| r.stake as u128).sum();
        if staked != self.state.total_staked as u128 {
            return Err(format!(
                "total_staked {} != registry stake {}",
                self.state.total_staked, staked
            ));
        }

        for asset in 0..MAX_REWARD_ASSETS {
            let accrued: u128 = occupied.iter().map(|r| r.accrued[asset] as u128).sum();
            if accrued != self.state.accrued_outstanding[asset] as u128 {
                return Err(format!(
                    "accrued_outstanding[{}] {} != registry accrued {}",
                    asset, self.state.accrued_outstanding[asset], accrued
                ));
            }
        }

        let weight: u128 = occupied.iter().map(|r| r.staking_weight).sum();
        if weight != self.state.total_staking_weight {
            return Err(format!(
                "total_staking_weight {} != registry weight {}",
                self.state.total_staking_weight, weight
            ));
        }

        if let Some(slot) = occupied.iter().position(|r| r.is_sentinel()) {
            return Err(format!("occupied slot {} holds the sentinel", slot));
        }
        if let Some(offset) = self.registry.slots()[occupied.len()..]
            .iter()
            .position(|r| !r.is_sentinel())
        {
            return Err(format!("slot {} beyond the occupied range is in use", occupied.len() + offset));
        }
        for (i, record) in occupied.iter().enumerate() {
            if occupied[..i].iter().any(|other| other.address == record.address) {
                return Err(format!("{} is registered twice", record.address));
            }
        }

        Ok(())
    }
}

/// Checks an inbound receipt against what the caller declared and marks it
/// spent. A receipt is accepted at most once per pool.
pub(crate) fn consume_receipt(
    state: &mut PoolState,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    receipt: &Receipt,
    asset: AssetId,
    quantity: u64,
) -> Result<()> {
    if receipt.amount != quantity {
        return Err(PoolError::ReceiptMismatch(format!(
            "receipt amount {} does not match declared {}",
            receipt.amount, quantity
        )));
    }
    if receipt.asset != asset {
        return Err(PoolError::ReceiptMismatch(format!(
            "receipt asset {} is not {}",
            receipt.asset, asset
        )));
    }
    if receipt.sender != ctx.caller {
        return Err(PoolError::ReceiptMismatch(format!(
            "receipt sender {} is not the caller",
            receipt.sender
        )));
    }
    if receipt.receiver != state.address {
        return Err(PoolError::ReceiptMismatch(format!(
            "receipt receiver {} is not this pool",
            receipt.receiver
        )));
    }
    if state.consumed_receipts.contains(&receipt.id) {
        return Err(PoolError::ReceiptMismatch(format!(
            "receipt {} was already consumed",
            receipt.id
        )));
    }
    if !ledger.is_settled(receipt) {
        return Err(PoolError::ReceiptMismatch(format!(
            "receipt {} was not settled",
            receipt.id
        )));
    }
    state.consumed_receipts.insert(receipt.id);
    Ok(())
}
