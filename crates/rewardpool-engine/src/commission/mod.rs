//! Native consensus reward pickup and commission payout

use {
    crate::{
        ledger::{ensure_covered, Ledger},
        staking::{PoolSnapshot, PoolState},
        PoolError, Result,
    },
    rewardpool_common::{config::BPS_DENOMINATOR, AssetId, CallContext, Transfer},
    tracing::{debug, info},
};

/// Outcome of one pickup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickupSummary {
    /// Untracked native balance observed
    pub delta: u64,
    /// Commission skimmed from the delta
    pub commission: u64,
    /// Remainder credited to consensus rewards
    pub credited: u64,
}

/// Every native-currency amount the pool already accounts for.
pub fn tracked_native(state: &PoolState) -> Result<u64> {
    let mut figures = vec![
        state.minimum_reserved_balance,
        state.total_consensus_rewards,
        state.commission_accrued,
    ];
    if state.staked_asset.is_native() {
        figures.push(state.total_staked);
        figures.push(state.lst_principal);
    }
    if let Some(index) = state.reward_index(AssetId::NATIVE) {
        figures.push(state.injected_rewards[index]);
        figures.push(state.accrued_outstanding[index]);
    }

    figures.into_iter().try_fold(0u64, |total, figure| {
        total.checked_add(figure).ok_or(PoolError::ArithmeticOverflow)
    })
}

/// Credits newly arrived native balance to consensus rewards, net of
/// commission. Repeated calls with no balance change are no-ops.
pub fn pickup_native_rewards(
    snapshot: &mut PoolSnapshot,
    ledger: &dyn Ledger,
) -> Result<PickupSummary> {
    let state = &mut snapshot.state;
    state.ensure_not_frozen()?;

    let balance = ledger.balance_of(&state.address, AssetId::NATIVE);
    let delta = balance.saturating_sub(tracked_native(state)?);
    if delta <= state.pickup_threshold {
        debug!(
            "Pickup found {} untracked native, threshold {}",
            delta, state.pickup_threshold
        );
        return Ok(PickupSummary::default());
    }

    let commission = ((delta as u128 * state.commission_bps as u128) / BPS_DENOMINATOR as u128) as u64;
    let credited = delta - commission;
    state.commission_accrued = state
        .commission_accrued
        .checked_add(commission)
        .ok_or(PoolError::ArithmeticOverflow)?;
    state.total_consensus_rewards = state
        .total_consensus_rewards
        .checked_add(credited)
        .ok_or(PoolError::ArithmeticOverflow)?;

    info!(
        "Picked up {} native rewards: {} commission, {} to consensus rewards",
        delta, commission, credited
    );
    Ok(PickupSummary {
        delta,
        commission,
        credited,
    })
}

/// Sends accrued commission to the treasury. Callable by the admin or the
/// treasury itself.
pub fn pay_commission(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
) -> Result<Vec<Transfer>> {
    let state = &mut snapshot.state;
    if ctx.caller != state.admin && ctx.caller != state.treasury {
        return Err(PoolError::Unauthorized(ctx.caller));
    }
    state.ensure_not_migrated()?;

    let amount = state.commission_accrued;
    if amount == 0 {
        debug!("No commission accrued");
        return Ok(Vec::new());
    }

    let transfers = vec![Transfer::new(state.treasury, AssetId::NATIVE, amount)];
    ensure_covered(ledger, &state.address, &transfers, |requested, available| {
        PoolError::InsufficientRewards { requested, available }
    })?;
    state.commission_accrued = 0;

    info!("Paid {} commission to treasury {}", amount, state.treasury);
    Ok(transfers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use rewardpool_common::{utils::address_from_label, PoolConfig};

    fn setup(commission_bps: u64) -> (PoolSnapshot, InMemoryLedger) {
        let mut config = PoolConfig::new(AssetId::NATIVE, vec![], address_from_label("admin"));
        config.commission_bps = commission_bps;
        config.minimum_reserved_balance = 100;
        config.treasury = address_from_label("treasury");
        let snapshot = PoolSnapshot::provision(address_from_label("pool"), &config);

        let mut ledger = InMemoryLedger::new();
        ledger.mint(snapshot.state.address, AssetId::NATIVE, 100).unwrap();
        (snapshot, ledger)
    }

    #[test]
    fn test_pickup_splits_commission() {
        let (mut snapshot, mut ledger) = setup(1_000);
        ledger.mint(snapshot.state.address, AssetId::NATIVE, 5_000).unwrap();

        let summary = pickup_native_rewards(&mut snapshot, &ledger).unwrap();
        assert_eq!(
            summary,
            PickupSummary {
                delta: 5_000,
                commission: 500,
                credited: 4_500
            }
        );
        assert_eq!(snapshot.state.commission_accrued, 500);
        assert_eq!(snapshot.state.total_consensus_rewards, 4_500);
    }

    #[test]
    fn test_repeated_pickup_is_stable() {
        let (mut snapshot, mut ledger) = setup(250);
        ledger.mint(snapshot.state.address, AssetId::NATIVE, 1_234).unwrap();

        pickup_native_rewards(&mut snapshot, &ledger).unwrap();
        let before = snapshot.clone();
        let summary = pickup_native_rewards(&mut snapshot, &ledger).unwrap();
        assert_eq!(summary, PickupSummary::default());
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_pickup_ignores_tracked_stake_and_threshold() {
        let (mut snapshot, mut ledger) = setup(0);
        snapshot.state.total_staked = 1_000;
        snapshot.state.pickup_threshold = 10;
        ledger.mint(snapshot.state.address, AssetId::NATIVE, 1_010).unwrap();

        assert_eq!(
            pickup_native_rewards(&mut snapshot, &ledger).unwrap(),
            PickupSummary::default()
        );
        ledger.mint(snapshot.state.address, AssetId::NATIVE, 1).unwrap();
        assert_eq!(pickup_native_rewards(&mut snapshot, &ledger).unwrap().delta, 11);
    }

    #[test]
    fn test_balance_below_tracked_is_no_op() {
        let (mut snapshot, ledger) = setup(0);
        snapshot.state.total_consensus_rewards = 50;
        assert_eq!(
            pickup_native_rewards(&mut snapshot, &ledger).unwrap(),
            PickupSummary::default()
        );
    }

    #[test]
    fn test_pay_commission() {
        let (mut snapshot, mut ledger) = setup(1_000);
        ledger.mint(snapshot.state.address, AssetId::NATIVE, 2_000).unwrap();
        pickup_native_rewards(&mut snapshot, &ledger).unwrap();

        let stranger = CallContext::new(address_from_label("stranger"), 0);
        assert!(matches!(
            pay_commission(&mut snapshot, &stranger, &ledger),
            Err(PoolError::Unauthorized(_))
        ));

        let treasury = address_from_label("treasury");
        let transfers = pay_commission(&mut snapshot, &CallContext::new(treasury, 0), &ledger).unwrap();
        assert_eq!(transfers, vec![Transfer::new(treasury, AssetId::NATIVE, 200)]);
        assert_eq!(snapshot.state.commission_accrued, 0);

        let again = pay_commission(&mut snapshot, &CallContext::new(treasury, 0), &ledger).unwrap();
        assert!(again.is_empty());
    }
}
