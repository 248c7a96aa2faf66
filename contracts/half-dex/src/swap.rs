//! Swap Engine
//!
//! Prices tez/ctez swaps around the drift oracle's target price.
//!
//! Each pool has a liquidity target `Q` derived from the outstanding ctez.
//! While its reserves sit above `Q` a pool sells at the target price. Below
//! `Q` the marginal price carries a premium growing quadratically with the
//! deficit, up to `MAX_PREMIUM_BPS` for a drained pool:
//!
//! ```text
//! premium(r) = MAX_PREMIUM_BPS * ((Q - r) / Q)^2      for r < Q
//! cost(delta) = delta + MAX_PREMIUM_BPS / 10_000 * (g(d1) - g(d0))
//! g(d) = d^3 / (3 Q^2)
//! ```
//!
//! where `d0`/`d1` are the deficits before and after the trade. The gross
//! output is the largest `delta` whose cost, converted to the sent asset at
//! the target price, fits in the sent amount. The swap fee is taken out of
//! the gross output and credited to the paying pool's proceeds.

use ctez_common::{
    constants::{
        dex::{
            MAX_PREMIUM_BPS, MAX_SEARCH_STEPS, MIN_SELF_RESERVES, MIN_TARGET_LIQUIDITY,
            SWAP_FEE_BPS, TARGET_LIQUIDITY_BPS,
        },
        precision::{BPS_DENOMINATOR, PRICE_PRECISION},
        subsidy::SUBSIDY_BPS_PER_YEAR,
        time::SECONDS_PER_YEAR,
    },
    errors::{CtezError, CtezResult},
    events::{CtezEvent, EventLog},
    math::{ctez_to_tez_value, div_round, mul_div, safe_add, safe_sub, to_u64, Rounding},
    types::{Address, CallContext, DexSide, SwapDirection},
};

use crate::{require_deadline, HalfDex};

/// Fixed-point scale of the deficit fraction used for premiums
const FRACTION_SCALE: u128 = 1_000_000_000_000;

/// Arguments of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    /// Amount of the source asset sent
    pub sent: u64,
    /// Slippage bound on the amount received
    pub min_received: u64,
    /// Receiver of the bought asset
    pub to: Address,
    /// Last timestamp the swap may execute at
    pub deadline: u64,
}

/// Priced swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    pub direction: SwapDirection,
    /// Source asset sent
    pub sent: u64,
    /// Taken out of the destination pool's reserves
    pub gross: u64,
    /// Part of `gross` credited to the destination pool's proceeds
    pub fee: u64,
    /// Part of `gross` paid to the receiver
    pub bought: u64,
    /// Curve cost of `gross` in the source asset (never above `sent`)
    pub cost: u64,
}

/// Swap pricing at one target price and debt level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapEngine {
    /// Tez per ctez, scaled by `PRICE_PRECISION`
    pub target: u128,
    /// Outstanding oven debt
    pub total_debt: u64,
}

impl SwapEngine {
    pub fn new(target: u128, total_debt: u64) -> Self {
        Self { target, total_debt }
    }

    // ============ Curve ============

    /// Liquidity target of the ctez-selling pool, in ctez
    pub fn ctez_liquidity_target(&self) -> CtezResult<u64> {
        let share = mul_div(
            self.total_debt as u128,
            TARGET_LIQUIDITY_BPS as u128,
            BPS_DENOMINATOR as u128,
            Rounding::Down,
        )?;
        Ok(to_u64(share)?.max(MIN_TARGET_LIQUIDITY))
    }

    /// Liquidity target of a pool, in the asset it sells
    pub fn liquidity_target(&self, side: DexSide) -> CtezResult<u64> {
        let ctez = self.ctez_liquidity_target()?;
        match side {
            DexSide::SellCtez => Ok(ctez),
            DexSide::SellTez => {
                Ok(to_u64(ctez_to_tez_value(ctez, self.target, Rounding::Down)?)?.max(1))
            }
        }
    }

    /// Marginal premium of a pool at its current reserves
    pub fn premium_bps(&self, pool: &HalfDex) -> CtezResult<u64> {
        premium_at(pool.self_reserves, self.liquidity_target(pool.side)?)
    }

    /// Mid market price of ctez in tez, scaled by `PRICE_PRECISION`
    pub fn market_price(&self, sell_tez: &HalfDex, sell_ctez: &HalfDex) -> CtezResult<u128> {
        let buy_ctez = BPS_DENOMINATOR + self.premium_bps(sell_ctez)?;
        let buy_tez = BPS_DENOMINATOR + self.premium_bps(sell_tez)?;
        mul_div(self.target, buy_ctez as u128, buy_tez as u128, Rounding::Down)
    }

    /// Cost of buying `delta` from `reserves`, in the pool's own asset
    pub fn cost_in_pool_asset(&self, reserves: u64, q: u64, delta: u64) -> CtezResult<u128> {
        if delta == 0 {
            return Ok(0);
        }
        let remaining = safe_sub(reserves, delta)?;
        let d0 = q.saturating_sub(reserves);
        let d1 = q.saturating_sub(remaining);
        let area = premium_area(d1, q, Rounding::Up)?
            .saturating_sub(premium_area(d0, q, Rounding::Down)?);
        let premium = mul_div(area, MAX_PREMIUM_BPS as u128, BPS_DENOMINATOR as u128, Rounding::Up)?;
        Ok(delta as u128 + premium)
    }

    /// Pool-asset cost converted to the asset sent, rounded up
    pub fn cost_in_sent_asset(&self, direction: SwapDirection, pool_cost: u128) -> CtezResult<u128> {
        match direction {
            // Paying tez for ctez
            SwapDirection::TezToCtez => mul_div(pool_cost, self.target, PRICE_PRECISION, Rounding::Up),
            // Paying ctez for tez
            SwapDirection::CtezToTez => mul_div(pool_cost, PRICE_PRECISION, self.target, Rounding::Up),
        }
    }

    fn cost(&self, direction: SwapDirection, reserves: u64, q: u64, delta: u64) -> CtezResult<u128> {
        let pool_cost = self.cost_in_pool_asset(reserves, q, delta)?;
        self.cost_in_sent_asset(direction, pool_cost)
    }

    // ============ Quote / Execute ============

    /// Price a swap against `destination` without touching it
    pub fn quote(
        &self,
        direction: SwapDirection,
        destination: &HalfDex,
        sent: u64,
        min_received: u64,
    ) -> CtezResult<SwapQuote> {
        // 1. Input
        if sent == 0 {
            return Err(CtezError::InvalidInput {
                param: "sent",
                reason: "must be positive",
            });
        }
        if destination.side != direction.destination() {
            return Err(CtezError::InvalidInput {
                param: "destination",
                reason: "pool does not sell the bought asset",
            });
        }

        // 2. The pool can never be drained below its floor
        let reserves = destination.self_reserves;
        let q = self.liquidity_target(destination.side)?;
        let max_delta = reserves.saturating_sub(MIN_SELF_RESERVES);
        let full_cost = self.cost(direction, reserves, q, max_delta)?;
        if full_cost < sent as u128 {
            let max_bought = max_delta - swap_fee(max_delta)?;
            if max_bought < min_received {
                return Err(CtezError::InsufficientTokensBought {
                    bought: max_bought,
                    minimum: min_received,
                });
            }
            return Err(CtezError::InsufficientTokensLiquidity {
                available: max_delta,
                requested: sent,
            });
        }

        // 3. Largest delta whose cost fits in `sent`
        let (mut lo, mut hi) = (0u64, max_delta);
        for _ in 0..MAX_SEARCH_STEPS {
            if lo >= hi {
                break;
            }
            let mid = lo + (hi - lo).div_ceil(2);
            if self.cost(direction, reserves, q, mid)? <= sent as u128 {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        let gross = lo;

        // 4. Fee and slippage
        let fee = swap_fee(gross)?;
        let bought = gross - fee;
        let minimum = min_received.max(1);
        if bought < minimum {
            return Err(CtezError::InsufficientTokensBought { bought, minimum });
        }

        Ok(SwapQuote {
            direction,
            sent,
            gross,
            fee,
            bought,
            cost: to_u64(self.cost(direction, reserves, q, gross)?)?,
        })
    }

    /// Execute a swap: the destination pool pays, the source pool keeps what
    /// was sent
    pub fn swap(
        &self,
        direction: SwapDirection,
        sell_tez: &mut HalfDex,
        sell_ctez: &mut HalfDex,
        call: &CallContext,
        request: &SwapRequest,
        events: &mut EventLog,
    ) -> CtezResult<SwapQuote> {
        // 1. Deadline
        require_deadline(request.deadline, call.now)?;

        let (destination, source) = match direction {
            SwapDirection::TezToCtez => (sell_ctez, sell_tez),
            SwapDirection::CtezToTez => (sell_tez, sell_ctez),
        };

        // 2. Price
        let quote = self.quote(direction, destination, request.sent, request.min_received)?;

        // 3. Compute reserves
        let destination_reserves = safe_sub(destination.self_reserves, quote.gross)?;
        let source_reserves = safe_add(source.self_reserves, request.sent)?;

        // 4. Apply
        destination.distribute_proceeds(quote.fee)?;
        destination.self_reserves = destination_reserves;
        source.self_reserves = source_reserves;

        events.emit(CtezEvent::Swapped {
            direction,
            sender: call.sender,
            to: request.to,
            sent: request.sent,
            bought: quote.bought,
            fee: quote.fee,
            timestamp: call.now,
        });

        Ok(quote)
    }

    // ============ Subsidy ============

    /// Ctez subsidy owed to `pool` for `elapsed` seconds below its target
    ///
    /// Pools without providers, or at or above their target, earn nothing.
    pub fn subsidy(&self, pool: &HalfDex, elapsed: u64) -> CtezResult<u64> {
        if elapsed == 0 || self.total_debt == 0 || !pool.has_providers() {
            return Ok(0);
        }
        let q = self.liquidity_target(pool.side)?;
        if pool.self_reserves >= q {
            return Ok(0);
        }
        let deficit = q - pool.self_reserves;
        let full_rate = mul_div(
            self.total_debt as u128,
            elapsed as u128 * SUBSIDY_BPS_PER_YEAR as u128,
            SECONDS_PER_YEAR as u128 * BPS_DENOMINATOR as u128,
            Rounding::Down,
        )?;
        to_u64(mul_div(full_rate, deficit as u128, q as u128, Rounding::Down)?)
    }
}

/// Swap fee on a gross output, rounded up
pub fn swap_fee(gross: u64) -> CtezResult<u64> {
    to_u64(mul_div(
        gross as u128,
        SWAP_FEE_BPS as u128,
        BPS_DENOMINATOR as u128,
        Rounding::Up,
    )?)
}

/// Marginal premium in bps at `reserves` against liquidity target `q`
pub fn premium_at(reserves: u64, q: u64) -> CtezResult<u64> {
    if reserves >= q {
        return Ok(0);
    }
    let fraction = mul_div((q - reserves) as u128, FRACTION_SCALE, q as u128, Rounding::Down)?;
    to_u64(mul_div(
        fraction * fraction,
        MAX_PREMIUM_BPS as u128,
        FRACTION_SCALE * FRACTION_SCALE,
        Rounding::Down,
    )?)
}

/// `d^3 / (3 q^2)` with both divisions rounded the same way
fn premium_area(deficit: u64, q: u64, rounding: Rounding) -> CtezResult<u128> {
    if deficit == 0 {
        return Ok(0);
    }
    let d = deficit as u128;
    let squared = div_round(d * d, q as u128, rounding)?;
    let cubed = squared.checked_mul(d).ok_or(CtezError::ArithmeticOverflow)?;
    div_round(cubed, 3 * q as u128, rounding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AddLiquidity;
    use ctez_common::constants::time::SECONDS_PER_YEAR;

    const PAR: u128 = PRICE_PRECISION;
    const LP: Address = [1u8; 32];
    const TRADER: Address = [2u8; 32];

    fn pool(side: DexSide, deposit: u64) -> HalfDex {
        let mut dex = HalfDex::new(side);
        if deposit > 0 {
            let request = AddLiquidity { amount: deposit, min_liquidity_minted: 0, deadline: u64::MAX };
            dex.add_liquidity(&CallContext::new(LP, 0), &request, &mut EventLog::new())
                .unwrap();
        }
        dex
    }

    fn request(sent: u64, min_received: u64) -> SwapRequest {
        SwapRequest { sent, min_received, to: TRADER, deadline: 100 }
    }

    #[test]
    fn test_liquidity_targets() {
        let engine = SwapEngine::new(PAR * 2, 0);
        assert_eq!(engine.liquidity_target(DexSide::SellCtez).unwrap(), MIN_TARGET_LIQUIDITY);
        assert_eq!(engine.liquidity_target(DexSide::SellTez).unwrap(), MIN_TARGET_LIQUIDITY * 2);

        let engine = SwapEngine::new(PAR, 1_000_000 * MIN_TARGET_LIQUIDITY);
        assert_eq!(
            engine.liquidity_target(DexSide::SellCtez).unwrap(),
            50_000 * MIN_TARGET_LIQUIDITY
        );
    }

    #[test]
    fn test_premium_curve() {
        let q = 1_000_000;
        assert_eq!(premium_at(q, q).unwrap(), 0);
        assert_eq!(premium_at(q * 2, q).unwrap(), 0);
        assert_eq!(premium_at(q / 2, q).unwrap(), MAX_PREMIUM_BPS / 4);
        assert_eq!(premium_at(0, q).unwrap(), MAX_PREMIUM_BPS);
    }

    #[test]
    fn test_market_price_at_par_when_pools_are_deep() {
        let engine = SwapEngine::new(PAR, 0);
        let sell_tez = pool(DexSide::SellTez, 10 * MIN_TARGET_LIQUIDITY);
        let sell_ctez = pool(DexSide::SellCtez, 10 * MIN_TARGET_LIQUIDITY);
        assert_eq!(engine.market_price(&sell_tez, &sell_ctez).unwrap(), PAR);
    }

    #[test]
    fn test_market_price_rises_when_ctez_is_scarce() {
        let engine = SwapEngine::new(PAR, 0);
        let sell_tez = pool(DexSide::SellTez, 10 * MIN_TARGET_LIQUIDITY);
        let sell_ctez = HalfDex::new(DexSide::SellCtez);
        let price = engine.market_price(&sell_tez, &sell_ctez).unwrap();
        assert_eq!(price, PAR * 10_499 / 10_000);
    }

    #[test]
    fn test_swap_at_target_above_liquidity_target() {
        let engine = SwapEngine::new(PAR, 0);
        let mut sell_tez = pool(DexSide::SellTez, 0);
        let mut sell_ctez = pool(DexSide::SellCtez, 10 * MIN_TARGET_LIQUIDITY);
        let reserves_before = sell_ctez.self_reserves;
        let mut events = EventLog::new();

        let quote = engine
            .swap(
                SwapDirection::TezToCtez,
                &mut sell_tez,
                &mut sell_ctez,
                &CallContext::new(TRADER, 50),
                &request(1_000_000, 999_500),
                &mut events,
            )
            .unwrap();

        assert_eq!(quote.gross, 1_000_000);
        assert_eq!(quote.fee, 500);
        assert_eq!(quote.bought, 999_500);
        assert_eq!(quote.cost, 1_000_000);
        assert_eq!(sell_ctez.self_reserves, reserves_before - 1_000_000);
        assert_eq!(sell_ctez.proceeds_reserves, 500);
        assert_eq!(sell_tez.self_reserves, 1 + 1_000_000);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_swap_converts_at_target() {
        // ctez worth 2 tez: 1 ctez buys 2 tez before fees
        let engine = SwapEngine::new(PAR * 2, 0);
        let sell_tez = pool(DexSide::SellTez, 10 * MIN_TARGET_LIQUIDITY);
        let quote = engine
            .quote(SwapDirection::CtezToTez, &sell_tez, 1_000_000, 0)
            .unwrap();
        assert_eq!(quote.gross, 2_000_000);
        assert_eq!(quote.fee, 1_000);
        assert_eq!(quote.bought, 1_999_000);
    }

    #[test]
    fn test_larger_swaps_get_worse_rates() {
        let engine = SwapEngine::new(PAR, 0);
        // Reserves sitting exactly at the liquidity target
        let sell_ctez = pool(DexSide::SellCtez, MIN_TARGET_LIQUIDITY - 1);
        let small = engine.quote(SwapDirection::TezToCtez, &sell_ctez, 10_000_000, 0).unwrap();
        let large = engine.quote(SwapDirection::TezToCtez, &sell_ctez, 50_000_000, 0).unwrap();

        assert!(small.gross < 10_000_000);
        assert!(large.gross > small.gross);
        // Average rate: large.gross / 50M < small.gross / 10M
        assert!((large.gross as u128) * 10_000_000 < (small.gross as u128) * 50_000_000);
        assert!(large.cost <= 50_000_000);
    }

    #[test]
    fn test_pool_cannot_be_drained() {
        let engine = SwapEngine::new(PAR, 0);
        let sell_ctez = HalfDex::new(DexSide::SellCtez);

        let result = engine.quote(SwapDirection::TezToCtez, &sell_ctez, 1_000, 0);
        assert_eq!(result, Err(CtezError::InsufficientTokensLiquidity { available: 0, requested: 1_000 }));

        // A receiver asking for more than the pool holds fails on the minimum
        let result = engine.quote(SwapDirection::TezToCtez, &sell_ctez, 1_000, 10);
        assert_eq!(result, Err(CtezError::InsufficientTokensBought { bought: 0, minimum: 10 }));
    }

    #[test]
    fn test_min_received_enforced() {
        let engine = SwapEngine::new(PAR, 0);
        let sell_ctez = pool(DexSide::SellCtez, 10 * MIN_TARGET_LIQUIDITY);
        let result = engine.quote(SwapDirection::TezToCtez, &sell_ctez, 1_000_000, 999_501);
        assert_eq!(result, Err(CtezError::InsufficientTokensBought { bought: 999_500, minimum: 999_501 }));
    }

    #[test]
    fn test_swap_after_deadline_fails() {
        let engine = SwapEngine::new(PAR, 0);
        let mut sell_tez = pool(DexSide::SellTez, 10 * MIN_TARGET_LIQUIDITY);
        let mut sell_ctez = pool(DexSide::SellCtez, 10 * MIN_TARGET_LIQUIDITY);
        let result = engine.swap(
            SwapDirection::CtezToTez,
            &mut sell_tez,
            &mut sell_ctez,
            &CallContext::new(TRADER, 101),
            &request(1, 0),
            &mut EventLog::new(),
        );
        assert_eq!(result, Err(CtezError::DeadlineHasPassed { deadline: 100, now: 101 }));
    }

    #[test]
    fn test_quote_rejects_wrong_pool() {
        let engine = SwapEngine::new(PAR, 0);
        let sell_tez = pool(DexSide::SellTez, 10 * MIN_TARGET_LIQUIDITY);
        let result = engine.quote(SwapDirection::TezToCtez, &sell_tez, 1_000, 0);
        assert!(matches!(result, Err(CtezError::InvalidInput { param: "destination", .. })));
    }

    #[test]
    fn test_subsidy_accrual() {
        // 1,000,000 ctez outstanding: target liquidity is 50,000 ctez
        let engine = SwapEngine::new(PAR, 1_000_000_000_000);
        let sell_ctez = pool(DexSide::SellCtez, 1_000_000);
        let subsidy = engine.subsidy(&sell_ctez, SECONDS_PER_YEAR).unwrap();
        assert_eq!(subsidy, 99_997_999_998);

        // No providers, no subsidy
        assert_eq!(engine.subsidy(&HalfDex::new(DexSide::SellCtez), SECONDS_PER_YEAR).unwrap(), 0);
        assert_eq!(engine.subsidy(&sell_ctez, 0).unwrap(), 0);
    }

    #[test]
    fn test_swap_fee_rounds_up() {
        assert_eq!(swap_fee(0).unwrap(), 0);
        assert_eq!(swap_fee(1).unwrap(), 1);
        assert_eq!(swap_fee(2_000).unwrap(), 1);
        assert_eq!(swap_fee(2_001).unwrap(), 2);
    }
}
