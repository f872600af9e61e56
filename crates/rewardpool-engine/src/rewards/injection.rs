use {
    super::accrue,
    crate::{
        ledger::Ledger,
        staking::{consume_receipt, PoolSnapshot},
        PoolError, Result,
    },
    rewardpool_common::{AssetId, CallContext, Receipt},
    tracing::info,
};

/// Adds `quantity` of a reward asset to the undistributed pool. Existing
/// stakers are brought current first so the new funds only reach the next
/// pass.
pub fn inject_rewards(
    snapshot: &mut PoolSnapshot,
    ctx: &CallContext,
    ledger: &dyn Ledger,
    receipt: &Receipt,
    quantity: u64,
    asset: AssetId,
) -> Result<()> {
    let PoolSnapshot { state, registry } = snapshot;
    state.ensure_not_frozen()?;

    if quantity == 0 {
        return Err(PoolError::InvalidAmount("injection quantity must be positive".into()));
    }
    let index = state
        .reward_index(asset)
        .ok_or_else(|| PoolError::InvalidAmount(format!("{} is not a reward asset", asset)))?;
    consume_receipt(state, ctx, ledger, receipt, asset, quantity)?;

    accrue(state, registry, ctx.now)?;

    state.injected_rewards[index] = state.injected_rewards[index]
        .checked_add(quantity)
        .ok_or(PoolError::ArithmeticOverflow)?;
    info!(
        "Injected {} of {} ({} undistributed)",
        quantity, asset, state.injected_rewards[index]
    );
    Ok(())
}
