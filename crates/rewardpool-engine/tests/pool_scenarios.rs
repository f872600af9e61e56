use rewardpool_common::{
    utils::address_from_label, Address, AssetId, CallContext, LstConfig, PoolConfig, Transfer,
    Weighting,
};
use rewardpool_engine::{InMemoryLedger, Ledger, Pool, PoolError, StakerRecord};

const STAKED: AssetId = AssetId(1);
const REWARD: AssetId = AssetId(2);

struct Host {
    pool: Pool,
    ledger: InMemoryLedger,
    admin: Address,
}

impl Host {
    fn new(config: PoolConfig) -> Self {
        let admin = config.admin;
        let mut pool = Pool::new(address_from_label("pool"));
        pool.initialize(&CallContext::new(admin, 0), &config).unwrap();
        Self {
            pool,
            ledger: InMemoryLedger::new(),
            admin,
        }
    }

    fn standard() -> Self {
        Self::new(PoolConfig::new(
            STAKED,
            vec![REWARD],
            address_from_label("admin"),
        ))
    }

    fn ctx(&self, label: &str) -> CallContext {
        CallContext::new(address_from_label(label), 0)
    }

    fn stake(&mut self, label: &str, quantity: u64) -> Result<(), PoolError> {
        let staker = address_from_label(label);
        self.ledger.mint(staker, STAKED, quantity).unwrap();
        let receipt = self
            .ledger
            .pay(staker, self.pool.address(), STAKED, quantity)
            .unwrap();
        self.pool
            .stake(&CallContext::new(staker, 0), &self.ledger, &receipt, quantity)
    }

    fn inject(&mut self, asset: AssetId, quantity: u64) {
        let funder = address_from_label("funder");
        self.ledger.mint(funder, asset, quantity).unwrap();
        let receipt = self
            .ledger
            .pay(funder, self.pool.address(), asset, quantity)
            .unwrap();
        self.pool
            .inject_rewards(&CallContext::new(funder, 0), &self.ledger, &receipt, quantity, asset)
            .unwrap();
    }

    fn settle(&mut self, transfers: &[Transfer]) {
        self.ledger.apply(self.pool.address(), transfers).unwrap();
    }

    fn record(&self, label: &str) -> Option<StakerRecord> {
        self.pool
            .staker(&address_from_label(label))
            .unwrap()
            .copied()
    }

    /// Conservation against the pool's actual ledger balances.
    fn assert_conserved(&self) {
        let snapshot = self.pool.snapshot().unwrap();
        snapshot.check_invariants().unwrap();

        let state = &snapshot.state;
        for (index, asset) in state.reward_assets.iter().enumerate() {
            let owed = state.injected_rewards[index] as u128
                + state.accrued_outstanding[index] as u128
                + if *asset == state.staked_asset {
                    state.total_staked as u128
                } else {
                    0
                };
            let held = self.ledger.balance_of(&self.pool.address(), *asset) as u128;
            assert!(owed <= held, "{} owes {} but holds {}", asset, owed, held);
        }
    }
}

#[test]
fn test_five_equal_stakers_split_an_injection() {
    let mut host = Host::standard();
    let labels = ["s0", "s1", "s2", "s3", "s4"];
    for label in labels {
        host.stake(label, 1_000_000_000).unwrap();
    }
    assert_eq!(host.pool.state().unwrap().total_staked, 5_000_000_000);

    host.inject(REWARD, 100_000_000);
    host.pool.accrue(&host.ctx("anyone")).unwrap();

    for label in labels {
        assert_eq!(host.record(label).unwrap().accrued[0], 20_000_000);
    }
    assert_eq!(host.pool.state().unwrap().injected_rewards[0], 0);
    host.assert_conserved();
}

#[test]
fn test_claim_moves_exactly_the_accrued_balance() {
    let mut host = Host::standard();
    for label in ["s0", "s1", "s2", "s3", "s4"] {
        host.stake(label, 1_000_000_000).unwrap();
    }
    host.inject(REWARD, 100_000_000);
    host.pool.accrue(&host.ctx("anyone")).unwrap();

    let staker = address_from_label("s2");
    assert_eq!(host.ledger.balance_of(&staker, REWARD), 0);

    let transfers = host.pool.claim_rewards(&host.ctx("s2"), &host.ledger).unwrap();
    host.settle(&transfers);

    assert_eq!(host.ledger.balance_of(&staker, REWARD), 20_000_000);
    assert_eq!(host.record("s2").unwrap().accrued[0], 0);
    assert_eq!(host.pool.metrics().claims(), 1);
    host.assert_conserved();
}

#[test]
fn test_full_unstake_of_only_staker() {
    let mut host = Host::standard();
    host.stake("solo", 777).unwrap();

    let transfers = host.pool.unstake(&host.ctx("solo"), &host.ledger, 0).unwrap();
    host.settle(&transfers);

    let snapshot = host.pool.snapshot().unwrap();
    assert_eq!(snapshot.state.total_staked, 0);
    assert_eq!(snapshot.registry.len(), 0);
    assert!(snapshot.registry.slots()[0].is_sentinel());
    assert_eq!(host.ledger.balance_of(&address_from_label("solo"), STAKED), 777);
    host.assert_conserved();
}

#[test]
fn test_registry_at_capacity_rejects_new_staker() {
    let mut config = PoolConfig::new(STAKED, vec![REWARD], address_from_label("admin"));
    config.capacity = 3;
    let mut host = Host::new(config);
    for label in ["a", "b", "c"] {
        host.stake(label, 10).unwrap();
    }

    assert_eq!(host.stake("d", 10), Err(PoolError::RegistryFull { capacity: 3 }));
    let snapshot = host.pool.snapshot().unwrap();
    assert_eq!(snapshot.state.total_staked, 30);
    assert_eq!(snapshot.registry.len(), 3);

    // Existing stakers may still top up.
    host.stake("a", 5).unwrap();
}

#[test]
fn test_accrual_is_idempotent() {
    let mut host = Host::standard();
    host.stake("a", 3).unwrap();
    host.stake("b", 7).unwrap();
    host.inject(REWARD, 1_001);

    host.pool.accrue(&host.ctx("anyone")).unwrap();
    let first = host.pool.snapshot().unwrap().clone();
    let summary = host.pool.accrue(&host.ctx("anyone")).unwrap();

    assert_eq!(summary.slots_visited, 0);
    assert_eq!(host.pool.snapshot().unwrap(), &first);
}

#[test]
fn test_every_staker_earns_from_each_pass() {
    let mut host = Host::standard();
    host.stake("whale", 1_000_000_000_000).unwrap();
    host.stake("minnow", 1).unwrap();

    for round in 1..=3u64 {
        host.inject(REWARD, 100);
        host.pool.accrue(&host.ctx("anyone")).unwrap();
        assert_eq!(host.record("minnow").unwrap().accrued[0], round);
    }
    host.assert_conserved();
}

#[test]
fn test_compaction_after_middle_removal() {
    let mut host = Host::standard();
    for (label, stake) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
        host.stake(label, stake).unwrap();
    }

    host.pool.unstake(&host.ctx("b"), &host.ledger, 0).unwrap();

    let registry = host.pool.registry().unwrap();
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.get(1).unwrap().address, address_from_label("d"));
    assert_eq!(registry.get(1).unwrap().stake, 4);
    assert!(registry.occupied().iter().all(|r| !r.is_sentinel()));
}

#[test]
fn test_replayed_receipts_change_nothing() {
    let mut host = Host::standard();
    host.stake("b", 1_000).unwrap();

    let alice = address_from_label("a");
    let pool = host.pool.address();
    host.ledger.mint(alice, STAKED, 1_000).unwrap();
    let stake_receipt = host.ledger.pay(alice, pool, STAKED, 1_000).unwrap();
    host.pool
        .stake(&host.ctx("a"), &host.ledger, &stake_receipt, 1_000)
        .unwrap();

    let funder = address_from_label("funder");
    host.ledger.mint(funder, REWARD, 200).unwrap();
    let reward_receipt = host.ledger.pay(funder, pool, REWARD, 200).unwrap();
    host.pool
        .inject_rewards(&host.ctx("funder"), &host.ledger, &reward_receipt, 200, REWARD)
        .unwrap();

    let before = host.pool.snapshot().unwrap().clone();
    assert!(matches!(
        host.pool
            .stake(&host.ctx("a"), &host.ledger, &stake_receipt, 1_000),
        Err(PoolError::ReceiptMismatch(_))
    ));
    assert!(matches!(
        host.pool
            .inject_rewards(&host.ctx("funder"), &host.ledger, &reward_receipt, 200, REWARD),
        Err(PoolError::ReceiptMismatch(_))
    ));
    assert_eq!(host.pool.snapshot().unwrap(), &before);
    assert_eq!(host.pool.metrics().rejections(), 2);
    host.assert_conserved();

    // Both stakers still get back exactly what they paid in
    for label in ["a", "b"] {
        let transfers = host.pool.unstake(&host.ctx(label), &host.ledger, 0).unwrap();
        host.settle(&transfers);
        assert_eq!(host.ledger.balance_of(&address_from_label(label), STAKED), 1_000);
    }
    assert_eq!(host.ledger.balance_of(&pool, STAKED), 0);
    host.assert_conserved();
}

#[test]
fn test_compounding_pool_reinvests_rewards() {
    let mut host = Host::new(PoolConfig::new(
        STAKED,
        vec![STAKED, REWARD],
        address_from_label("admin"),
    ));
    host.stake("a", 1_000).unwrap();
    host.stake("b", 3_000).unwrap();
    host.inject(STAKED, 400);
    host.inject(REWARD, 40);

    host.pool.accrue(&host.ctx("anyone")).unwrap();
    let a = host.record("a").unwrap();
    let b = host.record("b").unwrap();
    let state = host.pool.state().unwrap();
    assert_eq!(a.stake, 1_102);
    assert_eq!(b.stake, 3_297);
    assert_eq!(a.stake + b.stake + state.injected_rewards[0], 4_400);
    assert_eq!(a.accrued[0], 0);
    assert_eq!(a.accrued[1], 10);
    assert_eq!(a.accrued[1] + b.accrued[1], 40);
    host.assert_conserved();

    // The unit left injected compounds into the first slot before withdrawal.
    let transfers = host.pool.unstake(&host.ctx("a"), &host.ledger, 0).unwrap();
    assert_eq!(transfers[0], Transfer::new(address_from_label("a"), STAKED, 1_103));
    host.settle(&transfers);
    host.assert_conserved();
}

#[test]
fn test_batched_accrual_blocks_nothing() {
    let mut config = PoolConfig::new(STAKED, vec![REWARD], address_from_label("admin"));
    config.accrual_batch_size = 2;
    let mut host = Host::new(config);
    for label in ["a", "b", "c", "d", "e"] {
        host.stake(label, 100).unwrap();
    }
    host.inject(REWARD, 500);

    let summary = host.pool.accrue_batch(&host.ctx("keeper"), None).unwrap();
    assert_eq!(summary.slots_visited, 2);
    assert!(host.pool.accrual_in_progress());

    // A lifecycle call finishes the open pass before acting.
    host.stake("f", 100).unwrap();
    assert!(!host.pool.accrual_in_progress());
    for label in ["a", "b", "c", "d", "e"] {
        assert_eq!(host.record(label).unwrap().accrued[0], 100);
    }
    assert_eq!(host.record("f").unwrap().accrued[0], 0);
    host.assert_conserved();
}

#[test]
fn test_time_weighted_pool_favors_longer_locks() {
    let mut config = PoolConfig::new(STAKED, vec![REWARD], address_from_label("admin"));
    config.weighting = Weighting::TimeWeighted {
        min_lock: 10,
        max_lock: 40,
    };
    let mut host = Host::new(config);
    let admin = CallContext::new(host.admin, 0);
    host.pool.set_prices(&admin, 1, 1).unwrap();

    for (label, lock) in [("short", 10), ("long", 30)] {
        let staker = address_from_label(label);
        host.ledger.mint(staker, STAKED, 500).unwrap();
        let receipt = host
            .ledger
            .pay(staker, host.pool.address(), STAKED, 500)
            .unwrap();
        host.pool
            .stake_locked(&CallContext::new(staker, 0), &host.ledger, &receipt, 500, lock)
            .unwrap();
    }

    host.inject(REWARD, 400);
    host.pool.accrue(&host.ctx("anyone")).unwrap();
    assert_eq!(host.record("short").unwrap().accrued[0], 100);
    assert_eq!(host.record("long").unwrap().accrued[0], 300);
    assert_eq!(host.record("long").unwrap().last_reward_rate, 300);

    assert_eq!(
        host.pool
            .unstake(&CallContext::new(address_from_label("long"), 20), &host.ledger, 0),
        Err(PoolError::LockActive { unlock_time: 30 })
    );
    let transfers = host
        .pool
        .unstake(&CallContext::new(address_from_label("long"), 30), &host.ledger, 0)
        .unwrap();
    assert_eq!(transfers.len(), 2);
    host.assert_conserved();
}

#[test]
fn test_lst_cycle_with_commission_pickup() {
    let admin = address_from_label("admin");
    let mut config = PoolConfig::new(AssetId::NATIVE, vec![], admin);
    config.lst = Some(LstConfig {
        lst_asset: AssetId(50),
        scale: 10_000,
    });
    config.commission_bps = 1_000;
    config.treasury = address_from_label("treasury");
    let mut host = Host::new(config);
    let pool = host.pool.address();

    host.ledger.mint(admin, AssetId(50), 1_000_000).unwrap();
    let reserve = host.ledger.pay(admin, pool, AssetId(50), 1_000_000).unwrap();
    host.pool
        .fund_lst_reserve(&CallContext::new(admin, 0), &host.ledger, &reserve, 1_000_000)
        .unwrap();

    let alice = address_from_label("alice");
    host.ledger.mint(alice, AssetId::NATIVE, 10_000).unwrap();
    let deposit = host.ledger.pay(alice, pool, AssetId::NATIVE, 10_000).unwrap();
    let minted = host
        .pool
        .mint_lst(&CallContext::new(alice, 0), &host.ledger, 10_000, &deposit)
        .unwrap();
    host.settle(&minted);
    assert_eq!(host.ledger.balance_of(&alice, AssetId(50)), 10_000);

    // Consensus rewards arrive on the pool's native balance.
    host.ledger.mint(pool, AssetId::NATIVE, 2_000).unwrap();
    let summary = host.pool.pickup_native_rewards(&host.ledger).unwrap();
    assert_eq!((summary.commission, summary.credited), (200, 1_800));
    assert_eq!(host.pool.exchange_rate().unwrap(), 11_800);

    let paid = host
        .pool
        .pay_commission(&CallContext::new(admin, 0), &host.ledger)
        .unwrap();
    host.settle(&paid);
    assert_eq!(
        host.pool.pickup_native_rewards(&host.ledger).unwrap().delta,
        0
    );

    let redeem = host.ledger.pay(alice, pool, AssetId(50), 5_000).unwrap();
    let burned = host
        .pool
        .burn_lst(&CallContext::new(alice, 0), &host.ledger, &redeem, 5_000)
        .unwrap();
    assert_eq!(burned, vec![Transfer::new(alice, AssetId::NATIVE, 5_900)]);
    host.settle(&burned);

    let state = host.pool.state().unwrap();
    assert_eq!(state.lst_outstanding, 5_000);
    assert_eq!(state.lst_principal, 5_000);
    assert_eq!(state.total_consensus_rewards, 900);
    assert_eq!(host.pool.exchange_rate().unwrap(), 11_800);
    assert_eq!(host.pool.metrics().lst_minted(), 10_000);
    assert_eq!(host.pool.metrics().lst_burned(), 5_000);
}

#[test]
fn test_migration_between_pools() {
    let mut host = Host::standard();
    host.stake("a", 600).unwrap();
    host.stake("b", 400).unwrap();
    host.inject(REWARD, 100);
    host.pool.accrue(&host.ctx("anyone")).unwrap();

    let admin = CallContext::new(host.admin, 0);
    let mut successor = Pool::new(address_from_label("successor"));
    successor
        .initialize(
            &admin,
            &PoolConfig::new(STAKED, vec![REWARD], host.admin),
        )
        .unwrap();

    let package = host
        .pool
        .migrate_contract(&admin, &host.ledger, successor.address())
        .unwrap();
    host.settle(&package.transfers);

    // The package travels between hosts as JSON.
    let wire = serde_json::to_string(&package).unwrap();
    let received = serde_json::from_str(&wire).unwrap();
    successor
        .accept_migration(&admin, &host.ledger, &received)
        .unwrap();

    let state = successor.state().unwrap();
    assert_eq!(state.total_staked, 1_000);
    assert_eq!(state.accrued_outstanding[0], 100);
    successor.snapshot().unwrap().check_invariants().unwrap();

    assert_eq!(
        host.stake("c", 1),
        Err(PoolError::Migrated(successor.address()))
    );

    let b = address_from_label("b");
    let transfers = successor
        .claim_rewards(&CallContext::new(b, 0), &host.ledger)
        .unwrap();
    assert_eq!(transfers, vec![Transfer::new(b, REWARD, 40)]);
}

#[test]
fn test_snapshot_survives_serialization() {
    let mut host = Host::standard();
    host.stake("a", 5).unwrap();
    host.inject(REWARD, 9);
    host.pool.accrue_batch(&host.ctx("keeper"), Some(1)).unwrap();

    let snapshot = host.pool.snapshot().unwrap();
    let bytes = bincode::serialize(snapshot).unwrap();
    let restored: rewardpool_engine::PoolSnapshot = bincode::deserialize(&bytes).unwrap();
    assert_eq!(&restored, snapshot);

    let resumed = Pool::from_snapshot(restored);
    assert_eq!(resumed.address(), host.pool.address());
    assert!(!resumed.accrual_in_progress());
}
