//! Identity-gated parameter setters

use {
    crate::{staking::PoolState, PoolError, Result},
    rewardpool_common::{config::BPS_DENOMINATOR, Address, CallContext, SENTINEL_ADDRESS},
    tracing::info,
};

fn ensure_address(address: Address) -> Result<()> {
    if address == SENTINEL_ADDRESS {
        return Err(PoolError::InvalidAmount("the zero address cannot hold a role".into()));
    }
    Ok(())
}

pub fn update_admin_address(state: &mut PoolState, ctx: &CallContext, admin: Address) -> Result<()> {
    state.ensure_admin(ctx)?;
    ensure_address(admin)?;
    info!("Admin rotated from {} to {}", state.admin, admin);
    state.admin = admin;
    Ok(())
}

pub fn update_oracle_admin(state: &mut PoolState, ctx: &CallContext, oracle_admin: Address) -> Result<()> {
    state.ensure_admin(ctx)?;
    ensure_address(oracle_admin)?;
    info!("Oracle admin set to {}", oracle_admin);
    state.oracle_admin = oracle_admin;
    Ok(())
}

pub fn update_treasury(state: &mut PoolState, ctx: &CallContext, treasury: Address) -> Result<()> {
    state.ensure_admin(ctx)?;
    ensure_address(treasury)?;
    info!("Treasury set to {}", treasury);
    state.treasury = treasury;
    Ok(())
}

pub fn update_commission(state: &mut PoolState, ctx: &CallContext, commission_bps: u64) -> Result<()> {
    state.ensure_admin(ctx)?;
    if commission_bps > BPS_DENOMINATOR {
        return Err(PoolError::InvalidAmount(format!(
            "commission {} bps exceeds {}",
            commission_bps, BPS_DENOMINATOR
        )));
    }
    info!("Commission updated from {} to {} bps", state.commission_bps, commission_bps);
    state.commission_bps = commission_bps;
    Ok(())
}

pub fn update_minimum_reserved_balance(state: &mut PoolState, ctx: &CallContext, balance: u64) -> Result<()> {
    state.ensure_admin(ctx)?;
    info!("Minimum reserved balance set to {}", balance);
    state.minimum_reserved_balance = balance;
    Ok(())
}

pub fn set_freeze(state: &mut PoolState, ctx: &CallContext, freeze: bool) -> Result<()> {
    state.ensure_admin(ctx)?;
    state.ensure_not_migrated()?;
    info!("Freeze set to {}", freeze);
    state.freeze = freeze;
    Ok(())
}

pub fn set_pool_active(state: &mut PoolState, ctx: &CallContext, active: bool) -> Result<()> {
    state.ensure_admin(ctx)?;
    state.ensure_not_migrated()?;
    info!("Pool active set to {}", active);
    state.pool_active = active;
    Ok(())
}

/// Writes oracle prices. The second price is the LST price on LST pools
/// and the reward token price otherwise. Zero clears a price.
pub fn set_prices(
    state: &mut PoolState,
    ctx: &CallContext,
    stake_price: u64,
    lst_or_reward_price: u64,
) -> Result<()> {
    if ctx.caller != state.admin && ctx.caller != state.oracle_admin {
        return Err(PoolError::Unauthorized(ctx.caller));
    }

    state.stake_token_price = stake_price;
    if state.lst_asset.is_some() {
        state.lst_price = lst_or_reward_price;
    } else {
        state.reward_token_price = lst_or_reward_price;
    }
    info!(
        "Prices set: stake {}, {} {}",
        stake_price,
        if state.lst_asset.is_some() { "lst" } else { "reward" },
        lst_or_reward_price
    );
    Ok(())
}

pub fn bump_contract_version(state: &mut PoolState, ctx: &CallContext) -> Result<u64> {
    state.ensure_admin(ctx)?;
    state.contract_version = state
        .contract_version
        .checked_add(1)
        .ok_or(PoolError::ArithmeticOverflow)?;
    info!("Contract version now {}", state.contract_version);
    Ok(state.contract_version)
}
