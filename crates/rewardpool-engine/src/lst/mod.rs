//! Liquid staking token exchange.
//!
//! The LST tracks `lst_principal + total_consensus_rewards` against its
//! circulating supply. Minting draws from a reserve of LST the admin funds
//! up front; burning returns redeemed units to that reserve.

pub mod exchange;

pub use exchange::{backing, exchange_rate};

use {
    crate::{
        ledger::{ensure_covered, Ledger},
        rewards::{accrue, calculation::reweigh},
        staking::{consume_receipt, drain_rewards, PoolSnapshot, PoolState},
        PoolError, Result,
    },
    exchange::{lst_for_principal, principal_for_lst},
    rewardpool_common::{AssetId, CallContext, Receipt, Transfer},
    tracing::info,
};

fn configured_lst(state: &PoolState) -> Result<AssetId> {
    state.lst_asset.ok_or(PoolError::LstNotConfigured)
}

/// Minted LST for `principal` at the current rate, checked against the
/// reserve.
fn quote_mint(state: &PoolState, principal: u64) -> Result<u64> {
    let rate = exchange_rate(state)?;
    let minted = lst_for_principal(principal, rate, state.lst_scale)?;
    if minted == 0 {
        return Err(PoolError::InvalidAmount(format!(
            "{} underlying mints no LST at rate {}",
            principal, rate
        )));
    }
    if minted > state.lst_backing_balance {
        return Err(PoolError::InsufficientBacking {
            requested: minted,
            available: state.lst_backing_balance,
        });
    }
    Ok(minted)
}

fn record_mint(state: &mut PoolState, principal: u64, minted: u64) -> Result<()> {
    state.lst_outstanding = state
        .lst_outstanding
        .checked_add(minted)
        .ok_or(PoolError::ArithmeticOverflow)?;
    state.lst_backing_balance -= minted;
    state.lst_principal = state
        .lst_principal
        .checked_add(principal)
        .ok_or(PoolError::ArithmeticOverflow)?;
    Ok(())
}

/// Deposits `quantity` of the staked asset and issues LST at the current
/// exchange rate.
pub fn mint_lst(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    receipt: &Receipt,
    quantity: u64,
) -> Result<Vec<Transfer>> {
    let state = &mut snapshot.state;
    state.ensure_active()?;
    let lst_asset = configured_lst(state)?;

    if quantity == 0 {
        return Err(PoolError::InvalidAmount("mint quantity must be positive".into()));
    }
    let staked_asset = state.staked_asset;
    consume_receipt(state, ctx, ledger, receipt, staked_asset, quantity)?;

    let minted = quote_mint(state, quantity)?;
    let transfers = vec![Transfer::new(ctx.caller, lst_asset, minted)];
    ensure_covered(ledger, &state.address, &transfers, |requested, available| {
        PoolError::InsufficientBacking { requested, available }
    })?;
    record_mint(state, quantity, minted)?;

    info!(
        "Minted {} LST for {} against {} principal ({} circulating)",
        minted, ctx.caller, quantity, state.lst_outstanding
    );
    Ok(transfers)
}

/// Redeems `quantity` LST for the underlying at the current exchange rate.
/// Principal is debited 1:1 with the redeemed units; only the growth
/// portion is drawn from consensus rewards.
pub fn burn_lst(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    receipt: &Receipt,
    quantity: u64,
) -> Result<Vec<Transfer>> {
    let state = &mut snapshot.state;
    state.ensure_not_frozen()?;
    let lst_asset = configured_lst(state)?;

    if quantity == 0 {
        return Err(PoolError::InvalidAmount("burn quantity must be positive".into()));
    }
    if state.lst_outstanding == 0 || quantity > state.lst_outstanding {
        return Err(PoolError::InsufficientBacking {
            requested: quantity,
            available: state.lst_outstanding,
        });
    }
    consume_receipt(state, ctx, ledger, receipt, lst_asset, quantity)?;

    let available = backing(state)?;
    if available == 0 {
        return Err(PoolError::PricesNotSet);
    }
    let rate = exchange_rate(state)?;
    let owed = principal_for_lst(quantity, rate, state.lst_scale)?;
    if owed == 0 {
        return Err(PoolError::InvalidAmount(format!(
            "{} LST redeems for nothing at rate {}",
            quantity, rate
        )));
    }
    if owed > available {
        return Err(PoolError::InsufficientBacking {
            requested: owed,
            available,
        });
    }

    let transfers = vec![Transfer::new(ctx.caller, state.staked_asset, owed)];
    ensure_covered(ledger, &state.address, &transfers, |requested, available| {
        PoolError::InsufficientBacking { requested, available }
    })?;

    let mut principal_debit = quantity.min(owed).min(state.lst_principal);
    let mut rewards_debit = owed - principal_debit;
    if rewards_debit > state.total_consensus_rewards {
        principal_debit += rewards_debit - state.total_consensus_rewards;
        rewards_debit = state.total_consensus_rewards;
    }
    state.lst_principal -= principal_debit;
    state.total_consensus_rewards -= rewards_debit;
    state.lst_outstanding -= quantity;
    state.lst_backing_balance = state
        .lst_backing_balance
        .checked_add(quantity)
        .ok_or(PoolError::ArithmeticOverflow)?;

    info!(
        "Burned {} LST for {}, paid {} ({} principal, {} rewards)",
        quantity, ctx.caller, owed, principal_debit, rewards_debit
    );
    Ok(transfers)
}

/// Converts registry stake (0 for all) into LST. A full conversion removes
/// the record and pays out its accrued rewards.
pub fn convert_stake_to_lst(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    quantity: u64,
) -> Result<Vec<Transfer>> {
    let PoolSnapshot { state, registry } = snapshot;
    state.ensure_active()?;
    let lst_asset = configured_lst(state)?;

    let slot = registry
        .find(&ctx.caller)
        .ok_or(PoolError::NotFound(ctx.caller))?;
    accrue(state, registry, ctx.now)?;

    let record = *registry.get(slot).ok_or(PoolError::NotFound(ctx.caller))?;
    let amount = if quantity == 0 { record.stake } else { quantity };
    if amount == 0 || amount > record.stake {
        return Err(PoolError::InsufficientStake {
            requested: amount,
            available: record.stake,
        });
    }
    if record.is_locked(ctx.now) {
        return Err(PoolError::LockActive {
            unlock_time: record.unlock_time,
        });
    }

    let minted = quote_mint(state, amount)?;
    let mut transfers = vec![Transfer::new(ctx.caller, lst_asset, minted)];
    if amount == record.stake {
        transfers.extend(drain_rewards(state, registry, slot, ctx.caller)?);
    }
    ensure_covered(ledger, &state.address, &transfers, |requested, available| {
        PoolError::InsufficientBacking { requested, available }
    })?;

    let record = registry
        .get_mut(slot)
        .ok_or(PoolError::NotFound(ctx.caller))?;
    record.stake -= amount;
    record.lst_minted = record
        .lst_minted
        .checked_add(minted)
        .ok_or(PoolError::ArithmeticOverflow)?;
    state.total_staked -= amount;
    reweigh(state, record)?;
    record_mint(state, amount, minted)?;

    if record.stake == 0 {
        registry.remove(slot)?;
    }
    info!(
        "Converted {} stake of {} into {} LST",
        amount, ctx.caller, minted
    );
    Ok(transfers)
}

/// Admin deposit of LST units into the mint reserve.
pub fn fund_lst_reserve(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    receipt: &Receipt,
    quantity: u64,
) -> Result<()> {
    let state = &mut snapshot.state;
    state.ensure_admin(ctx)?;
    state.ensure_not_migrated()?;
    let lst_asset = configured_lst(state)?;

    if quantity == 0 {
        return Err(PoolError::InvalidAmount("reserve deposit must be positive".into()));
    }
    consume_receipt(state, ctx, ledger, receipt, lst_asset, quantity)?;

    state.lst_backing_balance = state
        .lst_backing_balance
        .checked_add(quantity)
        .ok_or(PoolError::ArithmeticOverflow)?;
    info!(
        "LST reserve funded with {} ({} available)",
        quantity, state.lst_backing_balance
    );
    Ok(())
}
