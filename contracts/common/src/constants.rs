//! Protocol Constants
//!
//! All magic numbers and configuration values for the ctez protocol.
//!
//! # Network Configuration
//!
//! Use feature flags to compile for different networks:
//! - `mainnet` - Production values (deeper liquidity floor, lower subsidy)
//! - Default (no feature) - Testnet values (small floors for testing)
//!
//! ```toml
//! # For mainnet deployment:
//! ctez-common = { path = "...", features = ["mainnet"] }
//! ```

/// Token Metadata
pub mod token {
    /// Synthetic token name
    pub const NAME: &str = "ctez";
    /// Synthetic token symbol
    pub const SYMBOL: &str = "CTEZ";
    /// Decimal places (same as tez)
    pub const DECIMALS: u8 = 6;
    /// One unit with decimals (1 ctez = 1_000_000 base units)
    pub const ONE: u64 = 1_000_000;
    /// One tez in mutez
    pub const ONE_TEZ: u64 = 1_000_000;
}

/// Fixed-point precision
pub mod precision {
    /// Target price scale: `PRICE_PRECISION` == 1 tez per ctez
    pub const PRICE_PRECISION: u128 = 1_000_000_000_000; // 1e12

    /// Drift scale: relative change of the target per second
    pub const DRIFT_PRECISION: u128 = 1_000_000_000_000_000_000; // 1e18

    /// Fee index scale (reward per liquidity share)
    pub const FEE_INDEX_PRECISION: u128 = 1_000_000_000_000_000_000; // 1e18

    /// Basis points denominator
    pub const BPS_DENOMINATOR: u64 = 10_000;

    /// Parts-per-million denominator
    pub const PPM_DENOMINATOR: u128 = 1_000_000;
}

/// Oven collateralization
pub mod collateral {
    /// Minimum collateral ratio numerator (16/15 ~ 106.7%)
    pub const MIN_RATIO_NUMERATOR: u128 = 16;

    /// Minimum collateral ratio denominator
    pub const MIN_RATIO_DENOMINATOR: u128 = 15;
}

/// Liquidation Configuration
pub mod liquidation {
    /// Seized collateral = debt value * 32/31 (liquidator bonus of 1/31)
    pub const REWARD_NUMERATOR: u128 = 32;

    /// Liquidation reward denominator
    pub const REWARD_DENOMINATOR: u128 = 31;
}

/// Half-dex Configuration
pub mod dex {
    /// Shares and reserves of a freshly originated pool (locked bootstrap share)
    pub const GENESIS_LIQUIDITY_SHARES: u64 = 1;

    /// Reserves of a freshly originated pool
    pub const GENESIS_SELF_RESERVES: u64 = 1;

    /// Reserves a swap must always leave behind
    pub const MIN_SELF_RESERVES: u64 = 1;

    /// Swap fee charged on the gross output (0.05%)
    pub const SWAP_FEE_BPS: u64 = 5;

    /// Premium paid at the margin when a pool is fully drained (5%)
    pub const MAX_PREMIUM_BPS: u64 = 500;

    /// Liquidity target as a share of outstanding ctez (5%)
    pub const TARGET_LIQUIDITY_BPS: u64 = 500;

    /// Floor for the liquidity target, in ctez base units
    /// - Mainnet: 10,000 ctez
    /// - Testnet: 100 ctez
    #[cfg(feature = "mainnet")]
    pub const MIN_TARGET_LIQUIDITY: u64 = 10_000 * super::token::ONE;
    #[cfg(not(feature = "mainnet"))]
    pub const MIN_TARGET_LIQUIDITY: u64 = 100 * super::token::ONE;

    /// Upper bound on binary search iterations when pricing a swap
    pub const MAX_SEARCH_STEPS: u32 = 128;
}

/// Drift Oracle Configuration
pub mod drift {
    /// Genesis target price (1 tez per ctez)
    pub const INITIAL_TARGET: u128 = super::precision::PRICE_PRECISION;

    /// Smallest target the oracle will ever report
    pub const MIN_TARGET: u128 = 1;

    /// Deviation cap in ppm (1/64 = 15,625 ppm)
    pub const MAX_DEVIATION_PPM: u128 = 15_625;

    /// Divisor applied to squared ppm deviation per elapsed second
    pub const DRIFT_DAMPING: u128 = 64;

    /// Absolute bound on drift (0.0001% of target per second)
    pub const MAX_DRIFT: i128 = 1_000_000_000_000;
}

/// Subsidy Configuration
pub mod subsidy {
    /// Annual subsidy rate at full pool deficit, relative to outstanding ctez
    /// - Mainnet: 1%
    /// - Testnet: 10% (visible accrual in short test runs)
    #[cfg(feature = "mainnet")]
    pub const SUBSIDY_BPS_PER_YEAR: u64 = 100;
    #[cfg(not(feature = "mainnet"))]
    pub const SUBSIDY_BPS_PER_YEAR: u64 = 1_000;
}

/// Time-related constants
pub mod time {
    /// Seconds per year (365 days)
    pub const SECONDS_PER_YEAR: u64 = 31_536_000;

    /// Seconds per day
    pub const SECONDS_PER_DAY: u64 = 86_400;
}
