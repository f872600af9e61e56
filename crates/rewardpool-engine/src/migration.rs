//! Two-phase handover of every tracked balance to a successor pool.
//!
//! The source pool packages its figures, registry and the transfers that
//! move the backing balances, then zeroes itself and freezes. The successor
//! verifies the package against its own fresh state and what actually
//! arrived on the ledger before adopting it verbatim.

use {
    crate::{
        ledger::{ensure_covered, Ledger},
        rewards::accrue,
        staking::{PoolSnapshot, PoolState, StakerRecord},
        PoolError, Result,
    },
    rewardpool_common::{
        utils::address_serde, Address, AssetId, CallContext, Transfer, Weighting,
        MAX_REWARD_ASSETS, SENTINEL_ADDRESS,
    },
    serde::{Deserialize, Serialize},
    tracing::info,
};

/// Balances and counters carried across a migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationFigures {
    pub lst_backing_balance: u64,
    pub total_staked: u64,
    pub circulating_lst: u64,
    pub total_consensus_rewards: u64,
    pub commission_accrued: u64,
    pub lst_principal: u64,
}

impl MigrationFigures {
    fn of(state: &PoolState) -> Self {
        Self {
            lst_backing_balance: state.lst_backing_balance,
            total_staked: state.total_staked,
            circulating_lst: state.lst_outstanding,
            total_consensus_rewards: state.total_consensus_rewards,
            commission_accrued: state.commission_accrued,
            lst_principal: state.lst_principal,
        }
    }

    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPackage {
    #[serde(with = "address_serde")]
    pub source: Address,
    #[serde(with = "address_serde")]
    pub successor: Address,

    pub staked_asset: AssetId,
    pub reward_assets: Vec<AssetId>,
    pub lst_asset: Option<AssetId>,
    pub weighting: Weighting,

    pub figures: MigrationFigures,
    pub injected_rewards: [u64; MAX_REWARD_ASSETS],
    pub accrued_outstanding: [u64; MAX_REWARD_ASSETS],
    pub total_staking_weight: u128,
    pub records: Vec<StakerRecord>,

    /// Outbound transfers moving the backing balances to the successor
    pub transfers: Vec<Transfer>,
}

impl MigrationPackage {
    fn build(state: &PoolState, records: Vec<StakerRecord>, successor: Address) -> Result<Self> {
        let figures = MigrationFigures::of(state);

        let mut owed: Vec<(AssetId, u64)> = Vec::new();
        let mut add = |asset: AssetId, amount: u64| -> Result<()> {
            if amount == 0 {
                return Ok(());
            }
            match owed.iter_mut().find(|(a, _)| *a == asset) {
                Some((_, total)) => {
                    *total = total
                        .checked_add(amount)
                        .ok_or(PoolError::ArithmeticOverflow)?
                }
                None => owed.push((asset, amount)),
            }
            Ok(())
        };

        add(state.staked_asset, figures.total_staked)?;
        add(state.staked_asset, figures.lst_principal)?;
        add(AssetId::NATIVE, figures.total_consensus_rewards)?;
        add(AssetId::NATIVE, figures.commission_accrued)?;
        for (index, asset) in state.reward_assets.iter().enumerate() {
            add(*asset, state.injected_rewards[index])?;
            add(*asset, state.accrued_outstanding[index])?;
        }
        if let Some(lst_asset) = state.lst_asset {
            add(lst_asset, figures.lst_backing_balance)?;
        }

        Ok(Self {
            source: state.address,
            successor,
            staked_asset: state.staked_asset,
            reward_assets: state.reward_assets.clone(),
            lst_asset: state.lst_asset,
            weighting: state.weighting,
            figures,
            injected_rewards: state.injected_rewards,
            accrued_outstanding: state.accrued_outstanding,
            total_staking_weight: state.total_staking_weight,
            records,
            transfers: owed
                .into_iter()
                .map(|(asset, amount)| Transfer::new(successor, asset, amount))
                .collect(),
        })
    }

    /// Internal consistency: the figures agree with the carried records and
    /// every transfer goes to the successor.
    pub fn verify(&self) -> Result<()> {
        let mismatch = |what: &str| Err(PoolError::InvalidAmount(format!("migration package {}", what)));

        let staked: u128 = self.records.iter().map(|r| r.stake as u128).sum();
        if staked != self.figures.total_staked as u128 {
            return mismatch("stake does not match its records");
        }
        for asset in 0..MAX_REWARD_ASSETS {
            let accrued: u128 = self.records.iter().map(|r| r.accrued[asset] as u128).sum();
            if accrued != self.accrued_outstanding[asset] as u128 {
                return mismatch("accrued rewards do not match its records");
            }
        }
        let weight: u128 = self.records.iter().map(|r| r.staking_weight).sum();
        if weight != self.total_staking_weight {
            return mismatch("staking weight does not match its records");
        }
        if self.records.iter().any(StakerRecord::is_sentinel) {
            return mismatch("carries an empty record");
        }
        if self.transfers.iter().any(|t| t.to != self.successor) {
            return mismatch("transfers value to a third party");
        }
        Ok(())
    }
}

/// Packages the pool for `successor`, zeroes every tracked figure and
/// freezes the source.
pub fn migrate_contract(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    successor: Address,
) -> Result<MigrationPackage> {
    let PoolSnapshot { state, registry } = snapshot;
    state.ensure_admin(ctx)?;
    state.ensure_not_migrated()?;
    if successor == state.address || successor == SENTINEL_ADDRESS {
        return Err(PoolError::InvalidAmount(format!(
            "{} cannot succeed this pool",
            successor
        )));
    }

    accrue(state, registry, ctx.now)?;

    let package = MigrationPackage::build(state, registry.occupied().to_vec(), successor)?;
    ensure_covered(ledger, &state.address, &package.transfers, |requested, available| {
        PoolError::InsufficientBacking { requested, available }
    })?;

    state.total_staked = 0;
    state.total_staking_weight = 0;
    state.injected_rewards = [0; MAX_REWARD_ASSETS];
    state.accrued_outstanding = [0; MAX_REWARD_ASSETS];
    state.total_consensus_rewards = 0;
    state.commission_accrued = 0;
    state.lst_outstanding = 0;
    state.lst_backing_balance = 0;
    state.lst_principal = 0;
    state.accrual_cursor = None;
    registry.clear();

    state.pool_active = false;
    state.freeze = true;
    state.migrated_to = Some(successor);

    info!(
        "Migrated {} stakers and {} transfers to {}",
        package.records.len(),
        package.transfers.len(),
        successor
    );
    Ok(package)
}

/// Adopts a package on a freshly initialized successor.
pub fn accept_migration(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    package: &MigrationPackage,
) -> Result<()> {
    let PoolSnapshot { state, registry } = snapshot;
    state.ensure_admin(ctx)?;
    state.ensure_not_migrated()?;

    let fresh = registry.is_empty()
        && MigrationFigures::of(state).is_zero()
        && state.total_staking_weight == 0
        && state.injected_rewards.iter().all(|r| *r == 0)
        && state.accrued_outstanding.iter().all(|r| *r == 0);
    if !fresh {
        return Err(PoolError::AlreadyInitialized);
    }

    if package.successor != state.address {
        return Err(PoolError::InvalidAmount(format!(
            "package is addressed to {}",
            package.successor
        )));
    }
    if package.staked_asset != state.staked_asset
        || package.reward_assets != state.reward_assets
        || package.lst_asset != state.lst_asset
        || package.weighting != state.weighting
    {
        return Err(PoolError::InvalidAmount(
            "package assets or weighting differ from this pool".into(),
        ));
    }
    if package.records.len() > registry.capacity() {
        return Err(PoolError::RegistryFull {
            capacity: registry.capacity(),
        });
    }
    package.verify()?;
    ensure_covered(ledger, &state.address, &package.transfers, |requested, available| {
        PoolError::InsufficientBacking { requested, available }
    })?;

    for record in &package.records {
        registry.insert(*record)?;
    }
    let figures = package.figures;
    state.total_staked = figures.total_staked;
    state.lst_backing_balance = figures.lst_backing_balance;
    state.lst_outstanding = figures.circulating_lst;
    state.total_consensus_rewards = figures.total_consensus_rewards;
    state.commission_accrued = figures.commission_accrued;
    state.lst_principal = figures.lst_principal;
    state.injected_rewards = package.injected_rewards;
    state.accrued_outstanding = package.accrued_outstanding;
    state.total_staking_weight = package.total_staking_weight;

    info!(
        "Accepted migration from {} with {} stakers",
        package.source,
        package.records.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use rewardpool_common::{utils::address_from_label, PoolConfig};

    const STAKED: AssetId = AssetId(1);
    const REWARD: AssetId = AssetId(2);

    fn provision(label: &str) -> PoolSnapshot {
        let config = PoolConfig::new(STAKED, vec![REWARD], address_from_label("admin"));
        PoolSnapshot::provision(address_from_label(label), &config)
    }

    fn funded_source(ledger: &mut InMemoryLedger) -> PoolSnapshot {
        let mut source = provision("source");
        for (label, stake) in [("alice", 300), ("bob", 100)] {
            let mut record = StakerRecord::new(address_from_label(label));
            record.stake = stake;
            record.accrued[0] = stake / 10;
            source.registry.insert(record).unwrap();
        }
        source.state.total_staked = 400;
        source.state.accrued_outstanding[0] = 40;
        source.state.total_consensus_rewards = 70;
        source.state.commission_accrued = 5;

        let pool = source.state.address;
        ledger.mint(pool, STAKED, 400).unwrap();
        ledger.mint(pool, REWARD, 40).unwrap();
        ledger.mint(pool, AssetId::NATIVE, 75).unwrap();
        source
    }

    #[test]
    fn test_round_trip_handover() {
        let mut ledger = InMemoryLedger::new();
        let mut source = funded_source(&mut ledger);
        let mut successor = provision("successor");
        let admin = CallContext::new(address_from_label("admin"), 0);

        let package =
            migrate_contract(&mut source, &admin, &ledger, successor.state.address).unwrap();
        assert_eq!(package.records.len(), 2);
        assert_eq!(package.transfers.len(), 3);
        assert!(source.registry.is_empty());
        assert_eq!(source.state.total_staked, 0);
        assert!(source.state.freeze);
        assert_eq!(source.state.migrated_to, Some(successor.state.address));

        // Nothing has arrived yet.
        assert!(matches!(
            accept_migration(&mut successor, &admin, &ledger, &package),
            Err(PoolError::InsufficientBacking { .. })
        ));

        ledger.apply(source.state.address, &package.transfers).unwrap();
        accept_migration(&mut successor, &admin, &ledger, &package).unwrap();
        assert_eq!(successor.state.total_staked, 400);
        assert_eq!(successor.state.accrued_outstanding[0], 40);
        assert_eq!(successor.state.total_consensus_rewards, 70);
        assert_eq!(successor.registry.len(), 2);
        assert!(successor.check_invariants().is_ok());

        assert_eq!(
            accept_migration(&mut successor, &admin, &ledger, &package),
            Err(PoolError::AlreadyInitialized)
        );
    }

    #[test]
    fn test_migrated_source_rejects_further_calls() {
        let mut ledger = InMemoryLedger::new();
        let mut source = funded_source(&mut ledger);
        let admin = CallContext::new(address_from_label("admin"), 0);
        let successor = address_from_label("successor");

        migrate_contract(&mut source, &admin, &ledger, successor).unwrap();
        assert_eq!(
            migrate_contract(&mut source, &admin, &ledger, successor),
            Err(PoolError::Migrated(successor))
        );
    }

    #[test]
    fn test_migration_requires_admin_and_backing() {
        let mut ledger = InMemoryLedger::new();
        let mut source = funded_source(&mut ledger);
        let successor = address_from_label("successor");

        let alice = CallContext::new(address_from_label("alice"), 0);
        assert!(matches!(
            migrate_contract(&mut source, &alice, &ledger, successor),
            Err(PoolError::Unauthorized(_))
        ));

        let admin = CallContext::new(address_from_label("admin"), 0);
        let empty_ledger = InMemoryLedger::new();
        assert!(matches!(
            migrate_contract(&mut source, &admin, &empty_ledger, successor),
            Err(PoolError::InsufficientBacking { .. })
        ));
    }

    #[test]
    fn test_tampered_package_rejected() {
        let mut ledger = InMemoryLedger::new();
        let mut source = funded_source(&mut ledger);
        let mut successor = provision("successor");
        let admin = CallContext::new(address_from_label("admin"), 0);

        let mut package =
            migrate_contract(&mut source, &admin, &ledger, successor.state.address).unwrap();
        ledger.apply(source.state.address, &package.transfers).unwrap();
        package.figures.total_staked += 1;

        assert!(matches!(
            accept_migration(&mut successor, &admin, &ledger, &package),
            Err(PoolError::InvalidAmount(_))
        ));
        assert!(successor.registry.is_empty());
    }

    #[test]
    fn test_package_for_other_pool_rejected() {
        let mut ledger = InMemoryLedger::new();
        let mut source = funded_source(&mut ledger);
        let mut other = provision("other");
        let admin = CallContext::new(address_from_label("admin"), 0);

        let package =
            migrate_contract(&mut source, &admin, &ledger, address_from_label("successor")).unwrap();
        assert!(matches!(
            accept_migration(&mut other, &admin, &ledger, &package),
            Err(PoolError::InvalidAmount(_))
        ));
    }
}
