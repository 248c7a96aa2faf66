//! Collateralization and Liquidation Math
//!
//! An oven is undercollateralized when its tez collateral is worth less than
//! 16/15 of its ctez debt valued at the target price. Liquidators burn debt
//! and receive collateral at a 32/31 premium, never more than the oven holds.

use ctez_common::{
    constants::{
        collateral::{MIN_RATIO_DENOMINATOR, MIN_RATIO_NUMERATOR},
        liquidation::{REWARD_DENOMINATOR, REWARD_NUMERATOR},
        precision::PRICE_PRECISION,
    },
    errors::{CtezError, CtezResult},
    math::{ctez_to_tez_value, mul_div, to_u64, Rounding},
};

/// Debt valued in mutez at `target`, rounded against the owner
pub fn debt_value(debt: u64, target: u128) -> CtezResult<u128> {
    ctez_to_tez_value(debt, target, Rounding::Up)
}

/// `collateral * 15 < 16 * debt_value` with any debt outstanding
pub fn is_undercollateralized(collateral: u64, debt: u64, target: u128) -> CtezResult<bool> {
    if debt == 0 {
        return Ok(false);
    }
    let required = debt_value(debt, target)?
        .checked_mul(MIN_RATIO_NUMERATOR)
        .ok_or(CtezError::ArithmeticOverflow)?;
    let held = collateral as u128 * MIN_RATIO_DENOMINATOR;
    Ok(held < required)
}

/// Fail with `Undercollateralized` unless the pair meets the minimum ratio
pub fn require_collateralized(collateral: u64, debt: u64, target: u128) -> CtezResult<()> {
    if is_undercollateralized(collateral, debt, target)? {
        return Err(CtezError::Undercollateralized { collateral, debt, target });
    }
    Ok(())
}

/// Largest debt quantity a single liquidation may burn
///
/// `min(debt, floor(collateral * 31 * PRICE_PRECISION / (32 * target)))`
pub fn max_liquidatable(collateral: u64, debt: u64, target: u128) -> CtezResult<u64> {
    let denominator = target
        .checked_mul(REWARD_NUMERATOR)
        .ok_or(CtezError::ArithmeticOverflow)?;
    let covered = mul_div(
        collateral as u128 * REWARD_DENOMINATOR,
        PRICE_PRECISION,
        denominator,
        Rounding::Down,
    )?;
    Ok(covered.min(debt as u128) as u64)
}

/// Collateral (mutez) a liquidator receives for burning `quantity` ctez
pub fn seized_collateral(quantity: u64, target: u128) -> CtezResult<u64> {
    to_u64(mul_div(
        quantity as u128 * REWARD_NUMERATOR,
        target,
        PRICE_PRECISION * REWARD_DENOMINATOR,
        Rounding::Down,
    )?)
}
