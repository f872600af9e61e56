use crate::{staking::PoolState, PoolError, Result};

/// Principal plus collected consensus rewards backing the circulating LST.
pub fn backing(state: &PoolState) -> Result<u64> {
    state
        .lst_principal
        .checked_add(state.total_consensus_rewards)
        .ok_or(PoolError::ArithmeticOverflow)
}

/// Underlying units per `lst_scale` LST units. 1:1 before the first mint.
pub fn exchange_rate(state: &PoolState) -> Result<u64> {
    if state.lst_scale == 0 {
        return Err(PoolError::LstNotConfigured);
    }
    if state.lst_outstanding == 0 {
        return Ok(state.lst_scale);
    }

    let backing = backing(state)?;
    if backing == 0 {
        return Err(PoolError::PricesNotSet);
    }
    let rate = (backing as u128)
        .checked_mul(state.lst_scale as u128)
        .ok_or(PoolError::ArithmeticOverflow)?
        / state.lst_outstanding as u128;
    u64::try_from(rate).map_err(|_| PoolError::ArithmeticOverflow)
}

/// LST minted for `principal` underlying at `rate`.
pub fn lst_for_principal(principal: u64, rate: u64, scale: u64) -> Result<u64> {
    if rate == 0 {
        return Err(PoolError::PricesNotSet);
    }
    let minted = (principal as u128)
        .checked_mul(scale as u128)
        .ok_or(PoolError::ArithmeticOverflow)?
        / rate as u128;
    u64::try_from(minted).map_err(|_| PoolError::ArithmeticOverflow)
}

/// Underlying owed for redeeming `lst` units at `rate`.
pub fn principal_for_lst(lst: u64, rate: u64, scale: u64) -> Result<u64> {
    if scale == 0 {
        return Err(PoolError::LstNotConfigured);
    }
    let owed = (rate as u128)
        .checked_mul(lst as u128)
        .ok_or(PoolError::ArithmeticOverflow)?
        / scale as u128;
    u64::try_from(owed).map_err(|_| PoolError::ArithmeticOverflow)
}
