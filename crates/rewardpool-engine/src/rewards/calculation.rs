//! Integer fixed-point share arithmetic

use {
    crate::{staking::types::StakerRecord, staking::PoolState, PoolError, Result},
    rewardpool_common::Weighting,
};

/// Fixed-point scale of a proportional share.
pub const PRECISION: u128 = 1_000_000_000_000_000;

/// `weight / total` scaled by [`PRECISION`]. Zero when the pool is empty.
pub fn proportional_share(weight: u128, total: u128) -> Result<u128> {
    if total == 0 {
        return Ok(0);
    }
    weight
        .checked_mul(PRECISION)
        .map(|scaled| scaled / total)
        .ok_or(PoolError::ArithmeticOverflow)
}

/// A staker's cut of `pool_total` for the given share. A nonzero share never
/// rounds down to nothing: it is floored to one unit.
pub fn share_of_pool(pool_total: u64, share: u128) -> Result<u64> {
    let rate = (pool_total as u128)
        .checked_mul(share)
        .ok_or(PoolError::ArithmeticOverflow)?
        / PRECISION;
    let rate = u64::try_from(rate).map_err(|_| PoolError::ArithmeticOverflow)?;

    if rate == 0 && share > 0 {
        Ok(1)
    } else {
        Ok(rate)
    }
}

/// Stake expressed in reward-token terms. A nonzero stake never normalizes
/// to zero, otherwise it could not earn in a time-weighted pool.
pub fn normalized_stake(stake: u64, stake_price: u64, reward_price: u64) -> Result<u128> {
    if stake_price == 0 || reward_price == 0 {
        return Err(PoolError::PricesNotSet);
    }
    let value = (stake as u128)
        .checked_mul(stake_price as u128)
        .ok_or(PoolError::ArithmeticOverflow)?
        / reward_price as u128;

    if value == 0 && stake > 0 {
        Ok(1)
    } else {
        Ok(value)
    }
}

pub fn staking_weight(
    stake: u64,
    lock_duration: u64,
    stake_price: u64,
    reward_price: u64,
) -> Result<u128> {
    normalized_stake(stake, stake_price, reward_price)?
        .checked_mul(lock_duration as u128)
        .ok_or(PoolError::ArithmeticOverflow)
}

/// Replaces the record's contribution to `total_staking_weight` with one
/// computed from its current stake and lock. Must run around every change
/// to `stake` or `lock_duration` in a time-weighted pool.
pub fn reweigh(state: &mut PoolState, record: &mut StakerRecord) -> Result<()> {
    if !matches!(state.weighting, Weighting::TimeWeighted { .. }) {
        return Ok(());
    }

    let without = state
        .total_staking_weight
        .checked_sub(record.staking_weight)
        .ok_or(PoolError::ArithmeticOverflow)?;

    let weight = if record.stake == 0 {
        0
    } else {
        staking_weight(
            record.stake,
            record.lock_duration,
            state.stake_token_price,
            state.reward_token_price,
        )?
    };

    state.total_staking_weight = without
        .checked_add(weight)
        .ok_or(PoolError::ArithmeticOverflow)?;
    record.staking_weight = weight;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_shares() {
        let share = proportional_share(1_000_000_000, 5_000_000_000).unwrap();
        assert_eq!(share, PRECISION / 5);
        assert_eq!(share_of_pool(100_000_000, share).unwrap(), 20_000_000);
    }

    #[test]
    fn test_small_share_floors_to_one_unit() {
        let share = proportional_share(1, 1_000_000_000_000).unwrap();
        assert!(share > 0);
        assert_eq!(share_of_pool(10, share).unwrap(), 1);
        assert_eq!(share_of_pool(10, 0).unwrap(), 0);
    }

    #[test]
    fn test_empty_pool_has_no_share() {
        assert_eq!(proportional_share(10, 0).unwrap(), 0);
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(
            proportional_share(u128::MAX / 2, 1),
            Err(PoolError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_staking_weight() {
        assert_eq!(staking_weight(1_000, 30, 2, 1).unwrap(), 60_000);
        assert_eq!(staking_weight(1_000, 30, 1, 4).unwrap(), 7_500);
        assert_eq!(staking_weight(1_000, 30, 0, 4), Err(PoolError::PricesNotSet));
    }

    #[test]
    fn test_small_stake_keeps_a_weight() {
        assert_eq!(normalized_stake(3, 1, 4).unwrap(), 1);
        assert_eq!(staking_weight(3, 60, 1, 4).unwrap(), 60);
        assert_eq!(normalized_stake(0, 1, 4).unwrap(), 0);
    }
}
