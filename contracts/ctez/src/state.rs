//! Global Protocol State
//!
//! One record holds everything the protocol persists: the oven registry,
//! both half-dex pools and the drift oracle context. Queries read it
//! directly; mutations go through the engine's entrypoints.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use ctez_common::{
    errors::CtezResult,
    types::{Address, CtezConfig, DexSide, OvenKey, SwapDirection},
    Vec,
};
use ctez_drift_oracle::DriftOracle;
use ctez_half_dex::{HalfDex, LiquidityOwner, SwapEngine, SwapQuote};
use ctez_oven_manager::{Oven, OvenRegistry};

/// Persisted protocol state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CtezState {
    /// Every oven plus collateral/debt rollups
    pub ovens: OvenRegistry,
    /// Pool selling tez for ctez
    pub sell_tez: HalfDex,
    /// Pool selling ctez for tez
    pub sell_ctez: HalfDex,
    /// Target price and drift
    pub context: DriftOracle,
    /// Ctez minted as liquidity subsidies since genesis
    pub total_subsidy_minted: u64,
    /// Runtime wiring
    pub config: CtezConfig,
}

impl CtezState {
    /// Origination state
    pub fn genesis(config: CtezConfig) -> Self {
        Self {
            ovens: OvenRegistry::new(),
            sell_tez: HalfDex::new(DexSide::SellTez),
            sell_ctez: HalfDex::new(DexSide::SellCtez),
            context: DriftOracle::new(config.genesis_time),
            total_subsidy_minted: 0,
            config,
        }
    }

    /// Pricing at the current target and debt
    pub fn swap_engine(&self) -> SwapEngine {
        SwapEngine::new(self.context.target, self.ovens.total_debt)
    }

    /// Pool for `side`
    pub fn dex(&self, side: DexSide) -> &HalfDex {
        match side {
            DexSide::SellTez => &self.sell_tez,
            DexSide::SellCtez => &self.sell_ctez,
        }
    }

    pub(crate) fn dex_mut(&mut self, side: DexSide) -> &mut HalfDex {
        match side {
            DexSide::SellTez => &mut self.sell_tez,
            DexSide::SellCtez => &mut self.sell_ctez,
        }
    }

    // ============ Queries ============

    /// Oven by key
    pub fn oven(&self, key: &OvenKey) -> Option<&Oven> {
        self.ovens.get(key)
    }

    /// Ovens of an owner
    pub fn ovens_of(&self, owner: &Address) -> Vec<&Oven> {
        self.ovens.ovens_of(owner)
    }

    pub fn sell_tez_dex(&self) -> &HalfDex {
        &self.sell_tez
    }

    pub fn sell_ctez_dex(&self) -> &HalfDex {
        &self.sell_ctez
    }

    /// Liquidity record with pending accrual folded in; zero when absent
    pub fn liquidity_owner(&self, side: DexSide, address: &Address) -> CtezResult<LiquidityOwner> {
        self.dex(side).liquidity_owner(address)
    }

    /// Drift oracle context
    pub fn context(&self) -> &DriftOracle {
        &self.context
    }

    /// Mid market price of ctez in tez, scaled by `PRICE_PRECISION`
    pub fn market_price(&self) -> CtezResult<u128> {
        self.swap_engine().market_price(&self.sell_tez, &self.sell_ctez)
    }

    /// Dry-run a swap against the current pools
    pub fn quote_swap(&self, direction: SwapDirection, sent: u64) -> CtezResult<SwapQuote> {
        self.swap_engine()
            .quote(direction, self.dex(direction.destination()), sent, 0)
    }

    /// SHA-256 of the borsh encoding
    pub fn state_hash(&self) -> [u8; 32] {
        let bytes = borsh::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        hash
    }
}
