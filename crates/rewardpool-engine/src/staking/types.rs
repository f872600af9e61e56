//! Persisted pool state and staker records

use {
    crate::{rewards::AccrualCursor, PoolError, Result},
    rewardpool_common::{
        utils::address_serde, Address, AssetId, CallContext, PoolConfig, Weighting,
        MAX_REWARD_ASSETS, SENTINEL_ADDRESS,
    },
    serde::{Deserialize, Serialize},
    std::collections::BTreeSet,
};

/// The pool-wide singleton. Only the owning [`crate::Pool`] mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolState {
    /// The pool's own account; receipts must name it as receiver
    #[serde(with = "address_serde")]
    pub address: Address,

    pub staked_asset: AssetId,
    pub reward_assets: Vec<AssetId>,
    pub weighting: Weighting,

    /// Sum of principal over all occupied registry slots
    pub total_staked: u64,
    /// Sum of staking weights (time-weighted pools only)
    pub total_staking_weight: u128,

    /// Undistributed reward balance per reward asset index
    pub injected_rewards: [u64; MAX_REWARD_ASSETS],
    /// Sum of staker `accrued` per reward asset index
    pub accrued_outstanding: [u64; MAX_REWARD_ASSETS],

    #[serde(with = "address_serde")]
    pub admin: Address,
    #[serde(with = "address_serde")]
    pub oracle_admin: Address,
    #[serde(with = "address_serde")]
    pub treasury: Address,

    pub minimum_reserved_balance: u64,
    pub pickup_threshold: u64,
    pub commission_bps: u64,
    pub commission_accrued: u64,
    pub total_consensus_rewards: u64,

    pub lst_asset: Option<AssetId>,
    pub lst_scale: u64,
    /// Circulating supply of the liquid staking token
    pub lst_outstanding: u64,
    /// LST units held in reserve by the pool, available to mint
    pub lst_backing_balance: u64,
    /// Principal backing the circulating LST
    pub lst_principal: u64,

    pub stake_token_price: u64,
    pub reward_token_price: u64,
    pub lst_price: u64,

    pub accrual_batch_size: usize,
    pub accrual_cursor: Option<AccrualCursor>,

    pub pool_active: bool,
    pub freeze: bool,
    pub contract_version: u64,
    /// Ids of every inbound receipt this pool has accepted
    #[serde(default)]
    pub consumed_receipts: BTreeSet<u64>,
    #[serde(default)]
    pub migrated_to: Option<Address>,
}

impl PoolState {
    pub fn from_config(address: Address, config: &PoolConfig) -> Self {
        let (lst_asset, lst_scale) = match &config.lst {
            Some(lst) => (Some(lst.lst_asset), lst.scale),
            None => (None, 0),
        };

        Self {
            address,
            staked_asset: config.staked_asset,
            reward_assets: config.reward_assets.clone(),
            weighting: config.weighting,
            total_staked: 0,
            total_staking_weight: 0,
            injected_rewards: [0; MAX_REWARD_ASSETS],
            accrued_outstanding: [0; MAX_REWARD_ASSETS],
            admin: config.admin,
            oracle_admin: config.oracle_admin,
            treasury: config.treasury,
            minimum_reserved_balance: config.minimum_reserved_balance,
            pickup_threshold: config.pickup_threshold,
            commission_bps: config.commission_bps,
            commission_accrued: 0,
            total_consensus_rewards: 0,
            lst_asset,
            lst_scale,
            lst_outstanding: 0,
            lst_backing_balance: 0,
            lst_principal: 0,
            stake_token_price: 0,
            reward_token_price: 0,
            lst_price: 0,
            accrual_batch_size: config.accrual_batch_size,
            accrual_cursor: None,
            pool_active: true,
            freeze: false,
            contract_version: 1,
            consumed_receipts: BTreeSet::new(),
            migrated_to: None,
        }
    }

    pub fn reward_index(&self, asset: AssetId) -> Option<usize> {
        self.reward_assets.iter().position(|a| *a == asset)
    }

    pub fn is_compounding(&self, reward_index: usize) -> bool {
        self.reward_assets[reward_index] == self.staked_asset
    }

    /// Denominator of the proportional share for the pool's weighting.
    pub fn share_denominator(&self) -> u128 {
        match self.weighting {
            Weighting::Amount => self.total_staked as u128,
            Weighting::TimeWeighted { .. } => self.total_staking_weight,
        }
    }

    pub fn prices_set(&self) -> bool {
        self.stake_token_price > 0 && self.reward_token_price > 0
    }

    pub fn ensure_admin(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.admin {
            return Err(PoolError::Unauthorized(ctx.caller));
        }
        Ok(())
    }

    pub fn ensure_not_migrated(&self) -> Result<()> {
        match self.migrated_to {
            Some(successor) => Err(PoolError::Migrated(successor)),
            None => Ok(()),
        }
    }

    pub fn ensure_not_frozen(&self) -> Result<()> {
        self.ensure_not_migrated()?;
        if self.freeze {
            return Err(PoolError::PoolFrozen);
        }
        Ok(())
    }

    pub fn ensure_active(&self) -> Result<()> {
        self.ensure_not_frozen()?;
        if !self.pool_active {
            return Err(PoolError::PoolInactive);
        }
        Ok(())
    }
}

/// One occupied (or sentinel) registry slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerRecord {
    #[serde(with = "address_serde")]
    pub address: Address,
    pub stake: u64,
    pub accrued: [u64; MAX_REWARD_ASSETS],

    pub lock_duration: u64,
    pub stake_start_time: u64,
    pub unlock_time: u64,
    pub staking_weight: u128,
    pub last_reward_rate: u64,
    pub last_update_time: u64,

    /// LST minted from this staker's converted principal
    pub lst_minted: u64,
}

impl StakerRecord {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.address == SENTINEL_ADDRESS
    }

    pub fn is_locked(&self, now: u64) -> bool {
        now < self.unlock_time
    }
}
