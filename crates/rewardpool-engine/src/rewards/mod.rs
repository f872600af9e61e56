//! Accrual engine: splits injected reward balances across the registry.
//!
//! A pass visits reward assets in order and, for each asset, every occupied
//! slot in registry order. Each staker's cut is computed from the asset's
//! injected balance as it stood when the pass opened; the running remainder
//! is debited as the pass goes and the last occupied slot absorbs the
//! rounding remainder. When the reward asset is the staked asset the cut
//! compounds into principal, which grows the denominator seen by later slots
//! of the same pass; whatever that leaves undistributed stays injected for
//! the next pass.
//!
//! Passes can run to completion in one call ([`accrue`]) or in bounded
//! steps ([`accrue_batch`]) with the position persisted in
//! [`PoolState::accrual_cursor`].

pub mod calculation;
mod injection;

pub use calculation::PRECISION;
pub use injection::inject_rewards;

use {
    crate::{
        staking::{PoolState, StakerRegistry},
        PoolError, Result,
    },
    calculation::{proportional_share, reweigh, share_of_pool},
    rewardpool_common::{Weighting, MAX_REWARD_ASSETS},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

/// Position of an open accrual pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualCursor {
    /// Injected balance per asset when the pass opened
    pub pass_totals: [u64; MAX_REWARD_ASSETS],
    /// Reward asset index being distributed
    pub asset: usize,
    /// Next registry slot to visit for that asset
    pub next_slot: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccrualSummary {
    pub slots_visited: usize,
    pub distributed: [u64; MAX_REWARD_ASSETS],
    /// False while a batched pass is still open
    pub complete: bool,
}

impl AccrualSummary {
    pub fn total_distributed(&self) -> u128 {
        self.distributed.iter().map(|d| *d as u128).sum()
    }
}

/// Brings every staker current: finishes any open batched pass, then runs
/// one full pass over whatever is still injected.
pub fn accrue(state: &mut PoolState, registry: &mut StakerRegistry, now: u64) -> Result<AccrualSummary> {
    let mut summary = AccrualSummary::default();

    if state.accrual_cursor.is_some() {
        step(state, registry, now, usize::MAX, &mut summary)?;
    }
    if open_pass(state, registry) {
        step(state, registry, now, usize::MAX, &mut summary)?;
    }

    summary.complete = true;
    if summary.slots_visited > 0 {
        debug!(
            "Accrual pass over {} stakers distributed {:?}",
            registry.len(),
            &summary.distributed[..state.reward_assets.len()]
        );
    }
    Ok(summary)
}

/// Visits at most `limit` registry slots, opening a pass if none is open.
pub fn accrue_batch(
    state: &mut PoolState,
    registry: &mut StakerRegistry,
    now: u64,
    limit: usize,
) -> Result<AccrualSummary> {
    if limit == 0 {
        return Err(PoolError::InvalidAmount("batch limit must be positive".into()));
    }

    let mut summary = AccrualSummary::default();
    if state.accrual_cursor.is_some() || open_pass(state, registry) {
        step(state, registry, now, limit, &mut summary)?;
    }
    summary.complete = state.accrual_cursor.is_none();

    debug!(
        "Accrual batch visited {} slots, complete: {}",
        summary.slots_visited, summary.complete
    );
    Ok(summary)
}

/// Opens a pass when there is something to distribute and someone to
/// distribute it to.
fn open_pass(state: &mut PoolState, registry: &StakerRegistry) -> bool {
    if registry.is_empty() || state.share_denominator() == 0 {
        return false;
    }

    let assets = state.reward_assets.len();
    if state.injected_rewards[..assets].iter().all(|r| *r == 0) {
        return false;
    }

    state.accrual_cursor = Some(AccrualCursor {
        pass_totals: state.injected_rewards,
        asset: 0,
        next_slot: 0,
    });
    true
}

fn step(
    state: &mut PoolState,
    registry: &mut StakerRegistry,
    now: u64,
    mut budget: usize,
    summary: &mut AccrualSummary,
) -> Result<()> {
    let Some(mut cursor) = state.accrual_cursor.take() else {
        return Ok(());
    };

    while cursor.asset < state.reward_assets.len() {
        let asset = cursor.asset;
        let occupied = registry.len();

        if cursor.pass_totals[asset] == 0
            || state.injected_rewards[asset] == 0
            || cursor.next_slot >= occupied
        {
            cursor.asset += 1;
            cursor.next_slot = 0;
            continue;
        }

        if budget == 0 {
            state.accrual_cursor = Some(cursor);
            return Ok(());
        }

        let slot = cursor.next_slot;
        let credited = credit_slot(
            state,
            registry,
            slot,
            asset,
            cursor.pass_totals[asset],
            slot + 1 == occupied,
            now,
        )?;

        summary.distributed[asset] = summary.distributed[asset]
            .checked_add(credited)
            .ok_or(PoolError::ArithmeticOverflow)?;
        summary.slots_visited += 1;
        cursor.next_slot += 1;
        budget -= 1;
    }

    Ok(())
}

fn credit_slot(
    state: &mut PoolState,
    registry: &mut StakerRegistry,
    slot: usize,
    asset: usize,
    pass_total: u64,
    is_last: bool,
    now: u64,
) -> Result<u64> {
    let denominator = state.share_denominator();
    let record = registry
        .get_mut(slot)
        .ok_or_else(|| PoolError::InvalidAmount(format!("slot {} is not occupied", slot)))?;

    let weight = match state.weighting {
        Weighting::Amount => record.stake as u128,
        Weighting::TimeWeighted { .. } => record.staking_weight,
    };
    let share = proportional_share(weight, denominator)?;
    if share == 0 {
        return Ok(0);
    }

    // Only rounding dust goes to the last slot. A compounding pass leaves
    // its shortfall injected for the next pass.
    let remaining = state.injected_rewards[asset];
    let rate = if is_last && !state.is_compounding(asset) {
        remaining
    } else {
        share_of_pool(pass_total, share)?.min(remaining)
    };
    state.injected_rewards[asset] = remaining - rate;

    if state.is_compounding(asset) {
        record.stake = record
            .stake
            .checked_add(rate)
            .ok_or(PoolError::ArithmeticOverflow)?;
        state.total_staked = state
            .total_staked
            .checked_add(rate)
            .ok_or(PoolError::ArithmeticOverflow)?;
        reweigh(state, record)?;
    } else {
        record.accrued[asset] = record.accrued[asset]
            .checked_add(rate)
            .ok_or(PoolError::ArithmeticOverflow)?;
        state.accrued_outstanding[asset] = state.accrued_outstanding[asset]
            .checked_add(rate)
            .ok_or(PoolError::ArithmeticOverflow)?;
    }

    if state.weighting.is_time_weighted() {
        record.last_reward_rate = rate;
        record.last_update_time = now;
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::StakerRecord;
    use rewardpool_common::{utils::address_from_label, AssetId, PoolConfig};

    const STAKED: AssetId = AssetId(1);
    const REWARD: AssetId = AssetId(2);

    fn setup(stakes: &[u64], rewards: Vec<AssetId>) -> (PoolState, StakerRegistry) {
        let config = PoolConfig::new(STAKED, rewards, address_from_label("admin"));
        let mut state = PoolState::from_config(address_from_label("pool"), &config);
        let mut registry = StakerRegistry::new(16);
        for (i, stake) in stakes.iter().enumerate() {
            registry
                .insert(StakerRecord {
                    stake: *stake,
                    ..StakerRecord::new(address_from_label(&format!("staker-{}", i)))
                })
                .unwrap();
            state.total_staked += stake;
        }
        (state, registry)
    }

    #[test]
    fn test_equal_stakers_split_evenly() {
        let (mut state, mut registry) = setup(&[1_000_000_000; 5], vec![REWARD]);
        state.injected_rewards[0] = 100_000_000;

        let summary = accrue(&mut state, &mut registry, 0).unwrap();
        assert!(summary.complete);
        assert_eq!(summary.distributed[0], 100_000_000);
        assert_eq!(state.injected_rewards[0], 0);
        for record in registry.occupied() {
            assert_eq!(record.accrued[0], 20_000_000);
        }
        assert_eq!(state.accrued_outstanding[0], 100_000_000);
    }

    #[test]
    fn test_last_staker_absorbs_remainder() {
        let (mut state, mut registry) = setup(&[1, 1, 1], vec![REWARD]);
        state.injected_rewards[0] = 100;

        accrue(&mut state, &mut registry, 0).unwrap();
        let accrued: Vec<u64> = registry.occupied().iter().map(|r| r.accrued[0]).collect();
        assert_eq!(accrued, vec![33, 33, 34]);
        assert_eq!(state.injected_rewards[0], 0);
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let (mut state, mut registry) = setup(&[10, 20, 30], vec![REWARD]);
        state.injected_rewards[0] = 1_000;

        accrue(&mut state, &mut registry, 0).unwrap();
        let before = (state.clone(), registry.clone());
        let summary = accrue(&mut state, &mut registry, 0).unwrap();

        assert_eq!(summary.slots_visited, 0);
        assert_eq!((state, registry), before);
    }

    #[test]
    fn test_tiny_stake_still_earns() {
        let (mut state, mut registry) = setup(&[1, 1_000_000_000_000], vec![REWARD]);
        state.injected_rewards[0] = 10;

        accrue(&mut state, &mut registry, 0).unwrap();
        assert_eq!(registry.get(0).unwrap().accrued[0], 1);
        assert_eq!(registry.get(1).unwrap().accrued[0], 9);
    }

    #[test]
    fn test_compounding_grows_principal_and_denominator() {
        let (mut state, mut registry) = setup(&[1_000, 1_000], vec![STAKED]);
        state.injected_rewards[0] = 100;

        accrue(&mut state, &mut registry, 0).unwrap();
        // 1000/2000 of 100, then 1000/2050 of 100.
        assert_eq!(registry.get(0).unwrap().stake, 1_050);
        assert_eq!(registry.get(1).unwrap().stake, 1_048);
        assert_eq!(state.total_staked, 2_098);
        assert_eq!(state.injected_rewards[0], 2);
        assert_eq!(state.accrued_outstanding[0], 0);

        accrue(&mut state, &mut registry, 0).unwrap();
        assert_eq!(registry.get(0).unwrap().stake, 1_051);
        assert_eq!(registry.get(1).unwrap().stake, 1_049);
        assert_eq!(state.total_staked, 2_100);
        assert_eq!(state.injected_rewards[0], 0);
    }

    #[test]
    fn test_compounding_changes_later_shares_in_same_pass() {
        let (mut state, mut registry) = setup(&[1_000, 1_000, 1_000], vec![STAKED]);
        state.injected_rewards[0] = 300;

        accrue(&mut state, &mut registry, 0).unwrap();
        // 1000/3000, 1000/3099 and 1000/3195 of 300, each rounded down.
        let stakes: Vec<u64> = registry.occupied().iter().map(|r| r.stake).collect();
        assert_eq!(stakes, vec![1_099, 1_096, 1_093]);
        assert_eq!(state.total_staked, 3_288);
        assert_eq!(state.injected_rewards[0], 12);
    }

    #[test]
    fn test_compounding_last_staker_gets_only_its_share() {
        let (mut state, mut registry) = setup(&[1_000; 10], vec![STAKED]);
        state.injected_rewards[0] = 10_000;

        accrue(&mut state, &mut registry, 0).unwrap();
        let gains: Vec<u64> = registry.occupied().iter().map(|r| r.stake - 1_000).collect();
        assert_eq!(gains, vec![1_000, 909, 839, 784, 738, 700, 668, 639, 614, 592]);
        assert_eq!(state.injected_rewards[0], 2_517);
        assert_eq!(state.total_staked + state.injected_rewards[0], 20_000);
    }

    #[test]
    fn test_multiple_assets_distribute_independently() {
        let (mut state, mut registry) = setup(&[300, 100], vec![REWARD, AssetId(3)]);
        state.injected_rewards[0] = 400;
        state.injected_rewards[1] = 40;

        let summary = accrue(&mut state, &mut registry, 0).unwrap();
        assert_eq!(summary.distributed[..2], [400, 40]);
        assert_eq!(registry.get(0).unwrap().accrued[..2], [300, 30]);
        assert_eq!(registry.get(1).unwrap().accrued[..2], [100, 10]);
    }

    #[test]
    fn test_empty_registry_keeps_injection() {
        let (mut state, mut registry) = setup(&[], vec![REWARD]);
        state.injected_rewards[0] = 500;

        let summary = accrue(&mut state, &mut registry, 0).unwrap();
        assert_eq!(summary.slots_visited, 0);
        assert_eq!(state.injected_rewards[0], 500);
        assert!(state.accrual_cursor.is_none());
    }

    #[test]
    fn test_batches_match_a_full_pass() {
        let stakes = [7, 11, 13, 17, 19, 23, 29];
        let (mut full_state, mut full_registry) = setup(&stakes, vec![REWARD, STAKED]);
        full_state.injected_rewards[0] = 1_000_003;
        full_state.injected_rewards[1] = 999;
        let (mut batch_state, mut batch_registry) = (full_state.clone(), full_registry.clone());

        accrue(&mut full_state, &mut full_registry, 0).unwrap();

        let mut batches = 0;
        loop {
            let summary = accrue_batch(&mut batch_state, &mut batch_registry, 0, 3).unwrap();
            batches += 1;
            assert!(summary.slots_visited <= 3);
            if summary.complete {
                break;
            }
            assert!(batch_state.accrual_cursor.is_some());
        }

        assert_eq!(batches, 5);
        assert_eq!(batch_state, full_state);
        assert_eq!(batch_registry, full_registry);
    }

    #[test]
    fn test_full_accrual_finishes_open_batch() {
        let (mut state, mut registry) = setup(&[5, 5, 5, 5], vec![REWARD]);
        state.injected_rewards[0] = 40;

        accrue_batch(&mut state, &mut registry, 0, 2).unwrap();
        assert_eq!(state.accrual_cursor.unwrap().next_slot, 2);

        accrue(&mut state, &mut registry, 0).unwrap();
        assert!(state.accrual_cursor.is_none());
        assert!(registry.occupied().iter().all(|r| r.accrued[0] == 10));
    }

    #[test]
    fn test_zero_batch_limit_rejected() {
        let (mut state, mut registry) = setup(&[5], vec![REWARD]);
        assert!(matches!(
            accrue_batch(&mut state, &mut registry, 0, 0),
            Err(PoolError::InvalidAmount(_))
        ));
    }
}
