//! Fixed-Point Math for ctez Protocol
//!
//! Integer helpers with an explicit rounding direction. Amounts paid out
//! to users round down; amounts charged to users round up. Nothing here
//! wraps silently.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{CtezError, CtezResult};

/// Rounding direction of a division
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Rounding {
    /// Toward zero (payouts)
    Down,
    /// Away from zero (charges)
    Up,
}

/// Divide with the requested rounding
pub fn div_round(numerator: u128, denominator: u128, rounding: Rounding) -> CtezResult<u128> {
    if denominator == 0 {
        return Err(CtezError::DivisionByZero);
    }
    let quotient = numerator / denominator;
    match rounding {
        Rounding::Down => Ok(quotient),
        Rounding::Up if numerator % denominator != 0 => {
            quotient.checked_add(1).ok_or(CtezError::ArithmeticOverflow)
        }
        Rounding::Up => Ok(quotient),
    }
}

/// Floor division
pub fn floor_div(numerator: u128, denominator: u128) -> CtezResult<u128> {
    div_round(numerator, denominator, Rounding::Down)
}

/// Ceiling division
pub fn ceil_div(numerator: u128, denominator: u128) -> CtezResult<u128> {
    div_round(numerator, denominator, Rounding::Up)
}

/// Compute `a * b / denom` with explicit rounding
///
/// Fails with `ArithmeticOverflow` if `a * b` does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, denom: u128, rounding: Rounding) -> CtezResult<u128> {
    let product = a.checked_mul(b).ok_or(CtezError::ArithmeticOverflow)?;
    div_round(product, denom, rounding)
}

/// Pro-rata share of `amount` for `shares` out of `total_shares`
pub fn pro_rata(shares: u64, amount: u64, total_shares: u64, rounding: Rounding) -> CtezResult<u64> {
    to_u64(mul_div(shares as u128, amount as u128, total_shares as u128, rounding)?)
}

/// Narrow a `u128` intermediate back to an amount
pub fn to_u64(value: u128) -> CtezResult<u64> {
    u64::try_from(value).map_err(|_| CtezError::ArithmeticOverflow)
}

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> CtezResult<u64> {
    a.checked_add(b).ok_or(CtezError::ArithmeticOverflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u64, b: u64) -> CtezResult<u64> {
    a.checked_sub(b).ok_or(CtezError::ArithmeticOverflow)
}

/// Safe addition on wide accumulators
pub fn safe_add_u128(a: u128, b: u128) -> CtezResult<u128> {
    a.checked_add(b).ok_or(CtezError::ArithmeticOverflow)
}

/// Value of `quantity` ctez in mutez at `target`
pub fn ctez_to_tez_value(quantity: u64, target: u128, rounding: Rounding) -> CtezResult<u128> {
    mul_div(quantity as u128, target, crate::constants::precision::PRICE_PRECISION, rounding)
}

/// Quantity of ctez worth `mutez` at `target`
pub fn tez_to_ctez_value(mutez: u64, target: u128, rounding: Rounding) -> CtezResult<u128> {
    mul_div(mutez as u128, crate::constants::precision::PRICE_PRECISION, target, rounding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::precision::PRICE_PRECISION;

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div(10, 10, 3, Rounding::Down).unwrap(), 33);
        assert_eq!(mul_div(10, 10, 3, Rounding::Up).unwrap(), 34);
        // Exact results do not round up
        assert_eq!(mul_div(10, 9, 3, Rounding::Up).unwrap(), 30);
        assert_eq!(mul_div(0, 9, 3, Rounding::Up).unwrap(), 0);
    }

    #[test]
    fn test_mul_div_overflow_does_not_wrap() {
        let result = mul_div(u128::MAX, 2, 2, Rounding::Down);
        assert_eq!(result, Err(CtezError::ArithmeticOverflow));
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0, Rounding::Up), Err(CtezError::DivisionByZero));
    }

    #[test]
    fn test_ceil_floor_div() {
        assert_eq!(floor_div(7, 2).unwrap(), 3);
        assert_eq!(ceil_div(7, 2).unwrap(), 4);
        assert_eq!(ceil_div(8, 2).unwrap(), 4);
    }

    #[test]
    fn test_pro_rata_rounding() {
        // 5,858 of 116,981 shares of 15,900
        assert_eq!(pro_rata(5_858, 15_900, 116_981, Rounding::Down).unwrap(), 796);
        assert_eq!(pro_rata(5_858, 15_900, 116_981, Rounding::Up).unwrap(), 797);
        assert_eq!(pro_rata(0, 15_900, 116_981, Rounding::Up).unwrap(), 0);
        assert_eq!(pro_rata(1, 1, 0, Rounding::Down), Err(CtezError::DivisionByZero));
    }

    #[test]
    fn test_to_u64_narrowing() {
        assert_eq!(to_u64(u64::MAX as u128).unwrap(), u64::MAX);
        assert_eq!(to_u64(u64::MAX as u128 + 1), Err(CtezError::ArithmeticOverflow));
    }

    #[test]
    fn test_price_conversions() {
        // At 1.5 tez per ctez, 2 ctez are worth 3 tez
        let target = PRICE_PRECISION * 3 / 2;
        assert_eq!(ctez_to_tez_value(2_000_000, target, Rounding::Down).unwrap(), 3_000_000);
        assert_eq!(tez_to_ctez_value(3_000_000, target, Rounding::Down).unwrap(), 2_000_000);
        // 1 mutez at 1.5 tez/ctez buys 0.67 ctez units
        assert_eq!(tez_to_ctez_value(1, target, Rounding::Down).unwrap(), 0);
        assert_eq!(tez_to_ctez_value(1, target, Rounding::Up).unwrap(), 1);
    }
}
