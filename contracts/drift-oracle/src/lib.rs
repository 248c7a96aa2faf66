//! Drift Oracle Contract
//!
//! Tracks the ctez target price (tez per ctez) and the drift rate it moves
//! at. The oracle is advanced at most once per elapsed time step, from the
//! market price observed on the half-dex pair:
//!
//! - the target first moves by `drift * elapsed`, saturating
//! - the drift then leans against the gap between the observed price and
//!   the target (market below target pushes drift up, above pushes it down)
//!
//! The oracle never fails: out-of-range intermediates saturate and the target
//! is clamped to a positive minimum.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use ctez_common::{
    constants::{
        drift::{DRIFT_DAMPING, INITIAL_TARGET, MAX_DEVIATION_PPM, MAX_DRIFT, MIN_TARGET},
        precision::{DRIFT_PRECISION, PPM_DENOMINATOR},
    },
    events::CtezEvent,
    math::{mul_div, Rounding},
};

// ============ Oracle State ============

/// Target price context shared by ovens and the swap curve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DriftOracle {
    /// Tez per ctez, scaled by `PRICE_PRECISION`
    pub target: u128,
    /// Relative change of `target` per second, scaled by `DRIFT_PRECISION`
    pub drift: i128,
    /// Timestamp of the last applied step
    pub last_update: u64,
}

impl DriftOracle {
    /// Genesis context: 1:1 target, zero drift
    pub fn new(genesis_time: u64) -> Self {
        Self {
            target: INITIAL_TARGET,
            drift: 0,
            last_update: genesis_time,
        }
    }

    /// Seconds that a step at `now` would apply
    pub fn pending_elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_update)
    }

    /// Apply one time step, observing `observed_price` on the market
    ///
    /// Returns `None` (and leaves the context untouched) when `now` is not
    /// after `last_update`.
    pub fn advance(&mut self, now: u64, observed_price: u128) -> Option<DriftStep> {
        if now <= self.last_update {
            return None;
        }
        let elapsed = now - self.last_update;

        let old_target = self.target;
        let old_drift = self.drift;

        // 1. Move the target with the current drift
        let new_target = drifted_target(old_target, old_drift, elapsed);

        // 2. Lean the drift against the observed gap
        let new_drift = adjusted_drift(old_drift, new_target, observed_price, elapsed);

        self.target = new_target;
        self.drift = new_drift;
        self.last_update = now;

        Some(DriftStep {
            elapsed,
            old_target,
            new_target,
            old_drift,
            new_drift,
            observed_price,
        })
    }
}

impl Default for DriftOracle {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Record of one applied step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftStep {
    pub elapsed: u64,
    pub old_target: u128,
    pub new_target: u128,
    pub old_drift: i128,
    pub new_drift: i128,
    pub observed_price: u128,
}

impl DriftStep {
    /// Event describing this step
    pub fn to_event(&self, timestamp: u64) -> CtezEvent {
        CtezEvent::DriftAdvanced {
            old_target: self.old_target,
            new_target: self.new_target,
            old_drift: self.old_drift,
            new_drift: self.new_drift,
            observed_price: self.observed_price,
            elapsed: self.elapsed,
            timestamp,
        }
    }
}

// ============ Step Math ============

/// `target * (1 + drift * elapsed)`, saturating and clamped to `MIN_TARGET`
pub fn drifted_target(target: u128, drift: i128, elapsed: u64) -> u128 {
    let rate = drift.unsigned_abs().saturating_mul(elapsed as u128);
    let delta = mul_div(target, rate, DRIFT_PRECISION, Rounding::Down).unwrap_or(u128::MAX);
    let moved = if drift >= 0 {
        target.saturating_add(delta)
    } else {
        target.saturating_sub(delta)
    };
    moved.max(MIN_TARGET)
}

/// Relative distance of `observed` from `target` in ppm, capped
pub fn deviation_ppm(target: u128, observed: u128) -> u128 {
    let gap = target.abs_diff(observed);
    mul_div(gap, PPM_DENOMINATOR, target, Rounding::Down)
        .map_or(MAX_DEVIATION_PPM, |ppm| ppm.min(MAX_DEVIATION_PPM))
}

/// Drift after `elapsed` seconds of feedback from the observed price
pub fn adjusted_drift(drift: i128, target: u128, observed: u128, elapsed: u64) -> i128 {
    if observed == target {
        return drift;
    }
    let deviation = deviation_ppm(target, observed);
    let push = (deviation * deviation)
        .saturating_mul(elapsed as u128)
        / DRIFT_DAMPING;
    // Bounded before the signed cast; anything past 2 * MAX_DRIFT clamps the same
    let push = push.min(2 * MAX_DRIFT as u128) as i128;

    let moved = if observed < target {
        drift.saturating_add(push)
    } else {
        drift.saturating_sub(push)
    };
    moved.clamp(-MAX_DRIFT, MAX_DRIFT)
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;
    use ctez_common::constants::precision::PRICE_PRECISION;

    #[test]
    fn test_genesis() {
        let oracle = DriftOracle::new(1_000);
        assert_eq!(oracle.target, PRICE_PRECISION);
        assert_eq!(oracle.drift, 0);
        assert_eq!(oracle.last_update, 1_000);
    }

    #[test]
    fn test_no_op_when_time_does_not_move() {
        let mut oracle = DriftOracle::new(1_000);
        assert!(oracle.advance(1_000, PRICE_PRECISION / 2).is_none());
        assert!(oracle.advance(999, PRICE_PRECISION / 2).is_none());
        assert_eq!(oracle, DriftOracle::new(1_000));
    }

    #[test]
    fn test_step_applied_once_per_interval() {
        let mut oracle = DriftOracle::new(0);
        oracle.drift = 1_000_000; // 1e-12 per second

        let step = oracle.advance(10, PRICE_PRECISION).unwrap();
        assert_eq!(step.elapsed, 10);
        // 1e12 * 1e6 * 10 / 1e18 = 10
        assert_eq!(oracle.target, PRICE_PRECISION + 10);

        // Same timestamp again does nothing
        assert!(oracle.advance(10, PRICE_PRECISION).is_none());
        assert_eq!(oracle.target, PRICE_PRECISION + 10);
    }

    #[test]
    fn test_drift_rises_when_market_below_target() {
        let mut oracle = DriftOracle::new(0);
        let step = oracle.advance(100, PRICE_PRECISION * 99 / 100).unwrap();
        assert!(step.new_drift > 0);
        // A 1% gap (10,000 ppm) is under the cap
        assert_eq!(step.new_drift, (10_000i128 * 10_000 * 100) / 64);
    }

    #[test]
    fn test_drift_falls_when_market_above_target() {
        let mut oracle = DriftOracle::new(0);
        let step = oracle.advance(100, PRICE_PRECISION * 2).unwrap();
        // Deviation is capped
        assert_eq!(step.new_drift, -((15_625i128 * 15_625 * 100) / 64));
    }

    #[test]
    fn test_drift_is_bounded() {
        let mut oracle = DriftOracle::new(0);
        oracle.advance(u64::MAX, 1).unwrap();
        assert_eq!(oracle.drift, MAX_DRIFT);
    }

    #[test]
    fn test_target_saturates_and_stays_positive() {
        assert_eq!(drifted_target(u128::MAX - 1, MAX_DRIFT, u64::MAX), u128::MAX);
        assert_eq!(drifted_target(PRICE_PRECISION, -MAX_DRIFT, u64::MAX), MIN_TARGET);
        assert_eq!(drifted_target(PRICE_PRECISION, 0, u64::MAX), PRICE_PRECISION);
    }

    #[test]
    fn test_deviation_ppm() {
        assert_eq!(deviation_ppm(PRICE_PRECISION, PRICE_PRECISION), 0);
        assert_eq!(deviation_ppm(PRICE_PRECISION, PRICE_PRECISION * 101 / 100), 10_000);
        assert_eq!(deviation_ppm(PRICE_PRECISION, 0), MAX_DEVIATION_PPM);
        assert_eq!(deviation_ppm(1, u128::MAX), MAX_DEVIATION_PPM);
    }

    #[test]
    fn test_step_event() {
        let mut oracle = DriftOracle::new(0);
        let step = oracle.advance(5, PRICE_PRECISION).unwrap();
        match step.to_event(5) {
            CtezEvent::DriftAdvanced { elapsed, timestamp, new_target, .. } => {
                assert_eq!(elapsed, 5);
                assert_eq!(timestamp, 5);
                assert_eq!(new_target, PRICE_PRECISION);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
