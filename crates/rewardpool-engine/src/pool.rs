//! The pool aggregate.
//!
//! `Pool` owns one instance's [`PoolSnapshot`] and exposes every entry
//! point. Each call runs against a draft copy of the snapshot and commits
//! only when it succeeds, so a failed call leaves no trace. Outbound
//! transfers are handed back to the host only on commit.

use {
    crate::{
        admin,
        commission::{self, PickupSummary},
        ledger::Ledger,
        lst,
        metrics::PoolMetrics,
        migration::{self, MigrationPackage},
        rewards::{self, AccrualSummary},
        staking::{self, PoolSnapshot, PoolState, StakerRecord, StakerRegistry},
        PoolError, Result,
    },
    rewardpool_common::{Address, AssetId, CallContext, PoolConfig, Receipt, Transfer},
    std::sync::Arc,
    tracing::{debug, info, warn},
};

pub struct Pool {
    address: Address,
    snapshot: Option<PoolSnapshot>,
    metrics: Arc<PoolMetrics>,
}

impl Pool {
    /// An unprovisioned pool at `address`. Every entry point except
    /// [`Pool::initialize`] fails until it is provisioned.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            snapshot: None,
            metrics: PoolMetrics::new(),
        }
    }

    /// Resumes a pool from persisted state.
    pub fn from_snapshot(snapshot: PoolSnapshot) -> Self {
        Self {
            address: snapshot.state.address,
            snapshot: Some(snapshot),
            metrics: PoolMetrics::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn metrics(&self) -> Arc<PoolMetrics> {
        self.metrics.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Result<&PoolSnapshot> {
        self.snapshot.as_ref().ok_or(PoolError::NotInitialized)
    }

    pub fn state(&self) -> Result<&PoolState> {
        Ok(&self.snapshot()?.state)
    }

    pub fn registry(&self) -> Result<&StakerRegistry> {
        Ok(&self.snapshot()?.registry)
    }

    pub fn staker(&self, address: &Address) -> Result<Option<&StakerRecord>> {
        let registry = self.registry()?;
        Ok(registry.find(address).and_then(|slot| registry.get(slot)))
    }

    /// Whether a batched accrual pass is open.
    pub fn accrual_in_progress(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.state.accrual_cursor.is_some())
    }

    pub fn exchange_rate(&self) -> Result<u64> {
        lst::exchange_rate(self.state()?)
    }

    /// Provisions the registry and pool state. Runs exactly once.
    pub fn initialize(&mut self, ctx: &CallContext, config: &PoolConfig) -> Result<()> {
        if self.snapshot.is_some() {
            self.metrics.increment_rejections();
            return Err(PoolError::AlreadyInitialized);
        }
        config
            .validate()
            .map_err(|e| PoolError::InvalidAmount(e.to_string()))?;

        self.snapshot = Some(PoolSnapshot::provision(self.address, config));
        info!(
            "Pool {} initialized by {} with {} slots and {} reward assets",
            self.address,
            ctx.caller,
            config.capacity,
            config.reward_assets.len()
        );
        Ok(())
    }

    fn transact<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut PoolSnapshot) -> Result<T>,
    ) -> Result<T> {
        let result = match self.snapshot.as_ref() {
            None => Err(PoolError::NotInitialized),
            Some(current) => {
                let mut draft = current.clone();
                f(&mut draft).map(|value| (draft, value))
            }
        };

        match result {
            Ok((draft, value)) => {
                self.snapshot = Some(draft);
                debug!("{} committed", op);
                Ok(value)
            }
            Err(e) => {
                warn!("{} rejected: {}", op, e);
                self.metrics.increment_rejections();
                Err(e)
            }
        }
    }

    pub fn stake(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        receipt: &Receipt,
        quantity: u64,
    ) -> Result<()> {
        self.transact("stake", |s| staking::stake(s, ctx, ledger, receipt, quantity))?;
        self.metrics.increment_stakes();
        Ok(())
    }

    pub fn stake_locked(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        receipt: &Receipt,
        quantity: u64,
        lock_duration: u64,
    ) -> Result<()> {
        self.transact("stake_locked", |s| {
            staking::stake_locked(s, ctx, ledger, receipt, quantity, lock_duration)
        })?;
        self.metrics.increment_stakes();
        Ok(())
    }

    pub fn claim_rewards(&mut self, ctx: &CallContext, ledger: &dyn Ledger) -> Result<Vec<Transfer>> {
        let transfers = self.transact("claim", |s| staking::claim(s, ctx, ledger))?;
        self.metrics.increment_claims();
        Ok(transfers)
    }

    /// `quantity` 0 withdraws the full stake.
    pub fn unstake(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        quantity: u64,
    ) -> Result<Vec<Transfer>> {
        let transfers = self.transact("unstake", |s| staking::unstake(s, ctx, ledger, quantity))?;
        self.metrics.increment_unstakes();
        Ok(transfers)
    }

    pub fn admin_unstake(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        staker: Address,
        quantity: u64,
    ) -> Result<Vec<Transfer>> {
        let transfers = self.transact("admin_unstake", |s| {
            staking::admin_unstake(s, ctx, ledger, staker, quantity)
        })?;
        self.metrics.increment_unstakes();
        Ok(transfers)
    }

    pub fn inject_rewards(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        receipt: &Receipt,
        quantity: u64,
        asset: AssetId,
    ) -> Result<()> {
        self.transact("inject_rewards", |s| {
            rewards::inject_rewards(s, ctx, ledger, receipt, quantity, asset)
        })
    }

    /// Permissionless full accrual.
    pub fn accrue(&mut self, ctx: &CallContext) -> Result<AccrualSummary> {
        let summary = self.transact("accrue", |s| {
            s.state.ensure_not_migrated()?;
            rewards::accrue(&mut s.state, &mut s.registry, ctx.now)
        })?;
        self.record_accrual(&summary);
        Ok(summary)
    }

    /// Permissionless bounded accrual step. `limit` defaults to the
    /// configured batch size.
    pub fn accrue_batch(&mut self, ctx: &CallContext, limit: Option<usize>) -> Result<AccrualSummary> {
        let summary = self.transact("accrue_batch", |s| {
            s.state.ensure_not_migrated()?;
            let limit = limit.unwrap_or(s.state.accrual_batch_size);
            rewards::accrue_batch(&mut s.state, &mut s.registry, ctx.now, limit)
        })?;
        self.record_accrual(&summary);
        Ok(summary)
    }

    fn record_accrual(&self, summary: &AccrualSummary) {
        if summary.slots_visited == 0 {
            return;
        }
        if summary.complete {
            self.metrics.increment_accrual_passes();
        }
        let distributed = summary.total_distributed().min(u64::MAX as u128) as u64;
        self.metrics.add_rewards_distributed(distributed);
    }

    pub fn mint_lst(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        quantity: u64,
        receipt: &Receipt,
    ) -> Result<Vec<Transfer>> {
        let transfers = self.transact("mint_lst", |s| lst::mint_lst(s, ctx, ledger, receipt, quantity))?;
        self.metrics
            .add_lst_minted(transfers.iter().map(|t| t.amount).sum());
        Ok(transfers)
    }

    pub fn burn_lst(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        receipt: &Receipt,
        quantity: u64,
    ) -> Result<Vec<Transfer>> {
        let transfers = self.transact("burn_lst", |s| lst::burn_lst(s, ctx, ledger, receipt, quantity))?;
        self.metrics.add_lst_burned(quantity);
        Ok(transfers)
    }

    pub fn convert_stake_to_lst(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        quantity: u64,
    ) -> Result<Vec<Transfer>> {
        let lst_asset = self.state()?.lst_asset;
        let transfers = self.transact("convert_stake_to_lst", |s| {
            lst::convert_stake_to_lst(s, ctx, ledger, quantity)
        })?;
        self.metrics.add_lst_minted(
            transfers
                .iter()
                .filter(|t| Some(t.asset) == lst_asset)
                .map(|t| t.amount)
                .sum(),
        );
        Ok(transfers)
    }

    pub fn fund_lst_reserve(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        receipt: &Receipt,
        quantity: u64,
    ) -> Result<()> {
        self.transact("fund_lst_reserve", |s| {
            lst::fund_lst_reserve(s, ctx, ledger, receipt, quantity)
        })
    }

    pub fn pickup_native_rewards(&mut self, ledger: &dyn Ledger) -> Result<PickupSummary> {
        self.transact("pickup_native_rewards", |s| {
            commission::pickup_native_rewards(s, ledger)
        })
    }

    pub fn pay_commission(&mut self, ctx: &CallContext, ledger: &dyn Ledger) -> Result<Vec<Transfer>> {
        self.transact("pay_commission", |s| commission::pay_commission(s, ctx, ledger))
    }

    pub fn migrate_contract(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        successor: Address,
    ) -> Result<MigrationPackage> {
        self.transact("migrate_contract", |s| {
            migration::migrate_contract(s, ctx, ledger, successor)
        })
    }

    pub fn accept_migration(
        &mut self,
        ctx: &CallContext,
        ledger: &dyn Ledger,
        package: &MigrationPackage,
    ) -> Result<()> {
        self.transact("accept_migration", |s| {
            migration::accept_migration(s, ctx, ledger, package)
        })
    }

    pub fn update_admin_address(&mut self, ctx: &CallContext, new_admin: Address) -> Result<()> {
        self.transact("update_admin_address", |s| {
            admin::update_admin_address(&mut s.state, ctx, new_admin)
        })
    }

    pub fn update_oracle_admin(&mut self, ctx: &CallContext, oracle_admin: Address) -> Result<()> {
        self.transact("update_oracle_admin", |s| {
            admin::update_oracle_admin(&mut s.state, ctx, oracle_admin)
        })
    }

    pub fn update_treasury(&mut self, ctx: &CallContext, treasury: Address) -> Result<()> {
        self.transact("update_treasury", |s| {
            admin::update_treasury(&mut s.state, ctx, treasury)
        })
    }

    pub fn update_commission(&mut self, ctx: &CallContext, commission_bps: u64) -> Result<()> {
        self.transact("update_commission", |s| {
            admin::update_commission(&mut s.state, ctx, commission_bps)
        })
    }

    pub fn update_minimum_reserved_balance(&mut self, ctx: &CallContext, balance: u64) -> Result<()> {
        self.transact("update_minimum_reserved_balance", |s| {
            admin::update_minimum_reserved_balance(&mut s.state, ctx, balance)
        })
    }

    pub fn set_freeze(&mut self, ctx: &CallContext, freeze: bool) -> Result<()> {
        self.transact("set_freeze", |s| admin::set_freeze(&mut s.state, ctx, freeze))
    }

    pub fn set_pool_active(&mut self, ctx: &CallContext, active: bool) -> Result<()> {
        self.transact("set_pool_active", |s| {
            admin::set_pool_active(&mut s.state, ctx, active)
        })
    }

    pub fn set_prices(
        &mut self,
        ctx: &CallContext,
        stake_price: u64,
        lst_or_reward_price: u64,
    ) -> Result<()> {
        self.transact("set_prices", |s| {
            admin::set_prices(&mut s.state, ctx, stake_price, lst_or_reward_price)
        })
    }

    pub fn bump_contract_version(&mut self, ctx: &CallContext) -> Result<u64> {
        self.transact("bump_contract_version", |s| {
            admin::bump_contract_version(&mut s.state, ctx)
        })
    }
}
