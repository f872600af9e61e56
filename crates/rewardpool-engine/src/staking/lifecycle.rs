//! Stake, claim and unstake. Every transition accrues first so reward
//! snapshots are taken before principal changes.

use {
    super::{consume_receipt, PoolSnapshot, PoolState, StakerRegistry},
    crate::{
        ledger::{ensure_covered, Ledger},
        rewards::{accrue, calculation::reweigh},
        PoolError, Result,
    },
    rewardpool_common::{Address, CallContext, Receipt, Transfer},
    tracing::{debug, info},
};

pub fn stake(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    receipt: &Receipt,
    quantity: u64,
) -> Result<()> {
    deposit(snapshot, ctx, ledger, receipt, quantity, 0)
}

/// Stake with a requested lock. Only time-weighted pools accept locks; the
/// request is clamped into the configured window.
pub fn stake_locked(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    receipt: &Receipt,
    quantity: u64,
    lock_duration: u64,
) -> Result<()> {
    if !snapshot.state.weighting.is_time_weighted() {
        return Err(PoolError::InvalidAmount(
            "pool does not accept lock durations".into(),
        ));
    }
    deposit(snapshot, ctx, ledger, receipt, quantity, lock_duration)
}

fn deposit(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    receipt: &Receipt,
    quantity: u64,
    requested_lock: u64,
) -> Result<()> {
    let PoolSnapshot { state, registry } = snapshot;
    state.ensure_active()?;

    if quantity == 0 {
        return Err(PoolError::InvalidAmount("stake quantity must be positive".into()));
    }
    let staked_asset = state.staked_asset;
    consume_receipt(state, ctx, ledger, receipt, staked_asset, quantity)?;

    let time_weighted = state.weighting.is_time_weighted();
    if time_weighted && !state.prices_set() {
        return Err(PoolError::PricesNotSet);
    }

    accrue(state, registry, ctx.now)?;

    let slot = registry.find_or_insert(ctx.caller)?;
    let record = registry
        .get_mut(slot)
        .ok_or(PoolError::NotFound(ctx.caller))?;
    let first_stake = record.stake == 0;

    record.stake = record
        .stake
        .checked_add(quantity)
        .ok_or(PoolError::ArithmeticOverflow)?;
    state.total_staked = state
        .total_staked
        .checked_add(quantity)
        .ok_or(PoolError::ArithmeticOverflow)?;

    if time_weighted {
        let lock = state.weighting.clamp_lock(requested_lock);
        if first_stake {
            record.stake_start_time = ctx.now;
        }
        record.lock_duration = record.lock_duration.max(lock);
        let unlock_time = ctx
            .now
            .checked_add(lock)
            .ok_or(PoolError::ArithmeticOverflow)?;
        record.unlock_time = record.unlock_time.max(unlock_time);
        reweigh(state, record)?;
    }

    info!(
        "Staked {} for {} (slot {}, total staked {})",
        quantity, ctx.caller, slot, state.total_staked
    );
    Ok(())
}

/// Pays out everything accrued to the caller. Nothing accrued is not an
/// error: no transfers are issued.
pub fn claim(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
) -> Result<Vec<Transfer>> {
    let PoolSnapshot { state, registry } = snapshot;
    state.ensure_not_frozen()?;

    let slot = registry
        .find(&ctx.caller)
        .ok_or(PoolError::NotFound(ctx.caller))?;
    accrue(state, registry, ctx.now)?;

    let transfers = drain_rewards(state, registry, slot, ctx.caller)?;
    if transfers.is_empty() {
        debug!("Nothing accrued for {}", ctx.caller);
        return Ok(transfers);
    }
    ensure_covered(ledger, &state.address, &transfers, |requested, available| {
        PoolError::InsufficientRewards { requested, available }
    })?;

    info!("Claimed {} reward transfers for {}", transfers.len(), ctx.caller);
    Ok(transfers)
}

/// Withdraws `quantity` of principal (0 for all) plus every accrued reward.
pub fn unstake(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    quantity: u64,
) -> Result<Vec<Transfer>> {
    snapshot.state.ensure_not_frozen()?;
    withdraw(snapshot, ledger, ctx.caller, quantity, ctx.now, true)
}

/// Unstake on behalf of `staker`, authorized by the admin. Ignores the
/// freeze and any active lock.
pub fn admin_unstake(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    staker: Address,
    quantity: u64,
) -> Result<Vec<Transfer>> {
    snapshot.state.ensure_admin(ctx)?;
    snapshot.state.ensure_not_migrated()?;
    info!("Admin {} forcing unstake of {}", ctx.caller, staker);
    withdraw(snapshot, ledger, staker, quantity, ctx.now, false)
}

fn withdraw(
    snapshot: &mut PoolSnapshot,
    ledger: &dyn Ledger,
    staker: Address,
    quantity: u64,
    now: u64,
    respect_lock: bool,
) -> Result<Vec<Transfer>> {
    let PoolSnapshot { state, registry } = snapshot;

    let slot = registry.find(&staker).ok_or(PoolError::NotFound(staker))?;
    accrue(state, registry, now)?;

    let record = *registry.get(slot).ok_or(PoolError::NotFound(staker))?;
    let amount = if quantity == 0 { record.stake } else { quantity };
    if amount > record.stake {
        return Err(PoolError::InsufficientStake {
            requested: amount,
            available: record.stake,
        });
    }
    if amount == 0 {
        return Err(PoolError::InvalidAmount("nothing staked to withdraw".into()));
    }
    if respect_lock && record.is_locked(now) {
        return Err(PoolError::LockActive {
            unlock_time: record.unlock_time,
        });
    }

    let mut transfers = vec![Transfer::new(staker, state.staked_asset, amount)];
    transfers.extend(drain_rewards(state, registry, slot, staker)?);
    ensure_covered(ledger, &state.address, &transfers, |requested, available| {
        PoolError::InsufficientBacking { requested, available }
    })?;

    let record = registry
        .get_mut(slot)
        .ok_or(PoolError::NotFound(staker))?;
    record.stake -= amount;
    state.total_staked = state
        .total_staked
        .checked_sub(amount)
        .ok_or(PoolError::ArithmeticOverflow)?;
    reweigh(state, record)?;

    if record.stake == 0 {
        registry.remove(slot)?;
        info!(
            "Unstaked {} for {}, record removed ({} stakers left)",
            amount,
            staker,
            registry.len()
        );
    } else {
        info!("Unstaked {} for {}, {} still staked", amount, staker, record.stake);
    }
    Ok(transfers)
}

/// Zeroes the staker's accrued balances and returns the matching payouts.
pub(crate) fn drain_rewards(
    state: &mut PoolState,
    registry: &mut StakerRegistry,
    slot: usize,
    staker: Address,
) -> Result<Vec<Transfer>> {
    let record = registry.get_mut(slot).ok_or(PoolError::NotFound(staker))?;

    let mut transfers = Vec::new();
    for (index, asset) in state.reward_assets.iter().enumerate() {
        let owed = record.accrued[index];
        if owed == 0 {
            continue;
        }
        state.accrued_outstanding[index] = state.accrued_outstanding[index]
            .checked_sub(owed)
            .ok_or(PoolError::ArithmeticOverflow)?;
        record.accrued[index] = 0;
        transfers.push(Transfer::new(staker, *asset, owed));
    }
    Ok(transfers)
}
