use {
    crate::script::{resolve, Step},
    anyhow::{anyhow, Context, Result},
    rewardpool_common::{AssetId, CallContext, PoolConfig, Receipt, Transfer},
    rewardpool_engine::{InMemoryLedger, Pool, PoolSnapshot},
    tracing::{info, warn},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub index: usize,
    pub op: &'static str,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub applied: usize,
    pub failed: Vec<StepFailure>,
}

/// A pool plus the host around it: an in-memory ledger and a clock.
/// Every step is one invocation. A failed step leaves both the pool and
/// the ledger as they were.
pub struct Simulator {
    config: PoolConfig,
    pool: Pool,
    ledger: InMemoryLedger,
    clock: u64,
}

impl Simulator {
    pub fn new(pool_label: &str, config: PoolConfig, start_time: u64) -> Result<Self> {
        let mut pool = Pool::new(resolve(pool_label));
        pool.initialize(&CallContext::new(config.admin, start_time), &config)
            .context("initializing pool")?;
        info!("Pool {} provisioned with {} slots", pool.address(), config.capacity);

        Ok(Self {
            config,
            pool,
            ledger: InMemoryLedger::new(),
            clock: start_time,
        })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn snapshot(&self) -> Result<&PoolSnapshot> {
        Ok(self.pool.snapshot()?)
    }

    pub fn run(&mut self, steps: &[Step]) -> RunReport {
        let mut report = RunReport::default();
        for (index, step) in steps.iter().enumerate() {
            match self.execute(step) {
                Ok(outcome) => {
                    info!("#{} {}: {}", index, step.name(), outcome);
                    report.applied += 1;
                }
                Err(e) => {
                    warn!("#{} {} failed: {:#}", index, step.name(), e);
                    report.failed.push(StepFailure {
                        index,
                        op: step.name(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }
        report
    }

    pub fn execute(&mut self, step: &Step) -> Result<String> {
        let checkpoint = self.ledger.clone();
        let outcome = self.dispatch(step);
        if outcome.is_err() {
            self.ledger = checkpoint;
        }
        outcome
    }

    fn ctx(&self, caller: &str) -> CallContext {
        CallContext::new(resolve(caller), self.clock)
    }

    fn deposit(&mut self, caller: &str, asset: AssetId, amount: u64) -> Result<(CallContext, Receipt)> {
        let ctx = self.ctx(caller);
        let receipt = self.ledger.pay(ctx.caller, self.pool.address(), asset, amount)?;
        Ok((ctx, receipt))
    }

    fn settle(&mut self, transfers: &[Transfer]) -> Result<String> {
        self.ledger.apply(self.pool.address(), transfers)?;
        Ok(describe(transfers))
    }

    fn lst_asset(&self) -> Result<AssetId> {
        self.pool
            .state()?
            .lst_asset
            .ok_or_else(|| anyhow!("pool {} issues no liquid token", self.pool.address()))
    }

    fn dispatch(&mut self, step: &Step) -> Result<String> {
        match step {
            Step::Fund { holder, asset, amount } => {
                self.ledger.mint(resolve(holder), *asset, *amount)?;
                Ok(format!("{} {} to {}", amount, asset, holder))
            }
            Step::AdvanceClock { seconds } => {
                self.clock = self
                    .clock
                    .checked_add(*seconds)
                    .ok_or_else(|| anyhow!("clock overflow"))?;
                Ok(format!("now {}", self.clock))
            }
            Step::ConsensusReward { amount } => {
                self.ledger.mint(self.pool.address(), AssetId::NATIVE, *amount)?;
                Ok(format!("{} native to the pool account", amount))
            }
            Step::Stake { caller, amount, lock } => {
                let staked = self.pool.state()?.staked_asset;
                let (ctx, receipt) = self.deposit(caller, staked, *amount)?;
                match lock {
                    Some(lock) => self
                        .pool
                        .stake_locked(&ctx, &self.ledger, &receipt, *amount, *lock)?,
                    None => self.pool.stake(&ctx, &self.ledger, &receipt, *amount)?,
                }
                Ok(format!("{} staked {}", caller, amount))
            }
            Step::Claim { caller } => {
                let transfers = self.pool.claim_rewards(&self.ctx(caller), &self.ledger)?;
                self.settle(&transfers)
            }
            Step::Unstake { caller, amount } => {
                let transfers = self.pool.unstake(&self.ctx(caller), &self.ledger, *amount)?;
                self.settle(&transfers)
            }
            Step::AdminUnstake { caller, staker, amount } => {
                let transfers = self.pool.admin_unstake(
                    &self.ctx(caller),
                    &self.ledger,
                    resolve(staker),
                    *amount,
                )?;
                self.settle(&transfers)
            }
            Step::Inject { caller, asset, amount } => {
                let (ctx, receipt) = self.deposit(caller, *asset, *amount)?;
                self.pool
                    .inject_rewards(&ctx, &self.ledger, &receipt, *amount, *asset)?;
                Ok(format!("{} {} injected", amount, asset))
            }
            Step::Accrue { caller } => {
                let summary = self.pool.accrue(&self.ctx(caller))?;
                Ok(format!(
                    "{} slots, {} distributed",
                    summary.slots_visited,
                    summary.total_distributed()
                ))
            }
            Step::AccrueBatch { caller, limit } => {
                let summary = self.pool.accrue_batch(&self.ctx(caller), *limit)?;
                Ok(format!(
                    "{} slots, {} distributed, complete: {}",
                    summary.slots_visited,
                    summary.total_distributed(),
                    summary.complete
                ))
            }
            Step::MintLst { caller, amount } => {
                let staked = self.pool.state()?.staked_asset;
                let (ctx, receipt) = self.deposit(caller, staked, *amount)?;
                let transfers = self.pool.mint_lst(&ctx, &self.ledger, *amount, &receipt)?;
                self.settle(&transfers)
            }
            Step::BurnLst { caller, amount } => {
                let lst = self.lst_asset()?;
                let (ctx, receipt) = self.deposit(caller, lst, *amount)?;
                let transfers = self.pool.burn_lst(&ctx, &self.ledger, &receipt, *amount)?;
                self.settle(&transfers)
            }
            Step::ConvertToLst { caller, amount } => {
                let transfers =
                    self.pool
                        .convert_stake_to_lst(&self.ctx(caller), &self.ledger, *amount)?;
                self.settle(&transfers)
            }
            Step::FundLstReserve { caller, amount } => {
                let lst = self.lst_asset()?;
                let (ctx, receipt) = self.deposit(caller, lst, *amount)?;
                self.pool
                    .fund_lst_reserve(&ctx, &self.ledger, &receipt, *amount)?;
                Ok(format!("reserve funded with {}", amount))
            }
            Step::PickupNativeRewards => {
                let summary = self.pool.pickup_native_rewards(&self.ledger)?;
                Ok(format!(
                    "delta {}, commission {}, credited {}",
                    summary.delta, summary.commission, summary.credited
                ))
            }
            Step::PayCommission { caller } => {
                let transfers = self.pool.pay_commission(&self.ctx(caller), &self.ledger)?;
                self.settle(&transfers)
            }
            Step::SetPrices {
                caller,
                stake_price,
                second_price,
            } => {
                self.pool
                    .set_prices(&self.ctx(caller), *stake_price, *second_price)?;
                Ok(format!("prices {} / {}", stake_price, second_price))
            }
            Step::SetFreeze { caller, freeze } => {
                self.pool.set_freeze(&self.ctx(caller), *freeze)?;
                Ok(format!("frozen: {}", freeze))
            }
            Step::SetPoolActive { caller, active } => {
                self.pool.set_pool_active(&self.ctx(caller), *active)?;
                Ok(format!("active: {}", active))
            }
            Step::UpdateCommission {
                caller,
                commission_bps,
            } => {
                self.pool
                    .update_commission(&self.ctx(caller), *commission_bps)?;
                Ok(format!("commission {} bps", commission_bps))
            }
            Step::UpdateMinimumReservedBalance { caller, balance } => {
                self.pool
                    .update_minimum_reserved_balance(&self.ctx(caller), *balance)?;
                Ok(format!("minimum reserved balance {}", balance))
            }
            Step::UpdateAdminAddress { caller, admin } => {
                self.pool
                    .update_admin_address(&self.ctx(caller), resolve(admin))?;
                Ok(format!("admin is now {}", admin))
            }
            Step::UpdateOracleAdmin {
                caller,
                oracle_admin,
            } => {
                self.pool
                    .update_oracle_admin(&self.ctx(caller), resolve(oracle_admin))?;
                Ok(format!("oracle admin is now {}", oracle_admin))
            }
            Step::UpdateTreasury { caller, treasury } => {
                self.pool
                    .update_treasury(&self.ctx(caller), resolve(treasury))?;
                Ok(format!("treasury is now {}", treasury))
            }
            Step::BumpContractVersion { caller } => {
                let version = self.pool.bump_contract_version(&self.ctx(caller))?;
                Ok(format!("version {}", version))
            }
            Step::Migrate { caller, successor } => self.migrate(caller, successor),
        }
    }

    /// Runs the handover on copies so a failure at any stage leaves the
    /// current pool untouched. On success the simulator continues against
    /// the successor.
    fn migrate(&mut self, caller: &str, successor: &str) -> Result<String> {
        let ctx = self.ctx(caller);
        let state = self.pool.state()?.clone();

        let mut config = self.config.clone();
        config.admin = state.admin;
        config.oracle_admin = state.oracle_admin;
        config.treasury = state.treasury;
        config.commission_bps = state.commission_bps;
        config.minimum_reserved_balance = state.minimum_reserved_balance;

        let mut next = Pool::new(resolve(successor));
        next.initialize(&ctx, &config)
            .context("provisioning successor")?;

        let mut source = Pool::from_snapshot(self.pool.snapshot()?.clone());
        let package = source.migrate_contract(&ctx, &self.ledger, next.address())?;
        self.ledger.apply(source.address(), &package.transfers)?;
        next.accept_migration(&ctx, &self.ledger, &package)?;

        let moved = describe(&package.transfers);
        self.pool = next;
        self.config = config;
        Ok(format!("now at {} after moving {}", self.pool.address(), moved))
    }
}

fn describe(transfers: &[Transfer]) -> String {
    if transfers.is_empty() {
        return "no transfers".to_string();
    }
    transfers
        .iter()
        .map(|t| format!("{} {} -> {}", t.amount, t.asset, t.to))
        .collect::<Vec<_>>()
        .join(", ")
}
