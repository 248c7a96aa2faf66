//! Half-Dex Pools for ctez
//!
//! A half-dex is a single-asset pool: liquidity providers deposit the asset
//! the pool sells (tez for `sell_tez`, ctez for `sell_ctez`) and earn
//!
//! - **proceeds**: the swap fee, in the pool's own asset
//! - **subsidy**: ctez minted by the protocol while the pool is short of its
//!   liquidity target
//!
//! ## Fee Index
//!
//! Proceeds and subsidy are folded into a pool-wide reward-per-share
//! accumulator once, when they arrive. Each account stores the index it was
//! last settled at and catches up lazily when it is next touched:
//!
//! ```text
//! owed += shares * (fee_index - last_fee_index) / FEE_INDEX_PRECISION
//! ```
//!
//! Every operation is O(1) in the number of liquidity providers.
//!
//! ## Genesis
//!
//! A fresh pool holds one reserve unit and one liquidity share that nobody
//! owns. The locked share keeps the share price defined and absorbs the
//! rounding dust of every distribution.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod swap;

use ctez_common::{
    constants::{
        dex::{GENESIS_LIQUIDITY_SHARES, GENESIS_SELF_RESERVES},
        precision::FEE_INDEX_PRECISION,
    },
    errors::{CtezError, CtezResult},
    events::{CtezEvent, EventLog},
    math::{mul_div, safe_add, safe_add_u128, safe_sub, to_u64, Rounding},
    types::{Address, CallContext, DexSide},
    BTreeMap,
};

pub use swap::{SwapEngine, SwapQuote, SwapRequest};

// ============ Accounting Types ============

/// Cumulative proceeds and subsidy per liquidity share, scaled by
/// `FEE_INDEX_PRECISION`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct FeeIndex {
    pub proceeds: u128,
    pub subsidy: u128,
}

/// Per-address liquidity record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LiquidityOwner {
    /// Shares held
    pub liquidity_shares: u64,
    /// Settled, unpaid proceeds
    pub proceeds_owed: u64,
    /// Settled, unpaid subsidy
    pub subsidy_owed: u64,
    /// Pool fee index at the last settlement
    pub last_fee_index: FeeIndex,
}

impl LiquidityOwner {
    /// Nothing held and nothing owed
    pub fn is_empty(&self) -> bool {
        self.liquidity_shares == 0 && self.proceeds_owed == 0 && self.subsidy_owed == 0
    }
}

/// Arguments of `add_liquidity`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLiquidity {
    /// Amount of the pool's asset deposited
    pub amount: u64,
    /// Slippage bound on minted shares
    pub min_liquidity_minted: u64,
    /// Last timestamp the call may execute at
    pub deadline: u64,
}

/// Arguments of `remove_liquidity`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveLiquidity {
    /// Receiver of every payout
    pub to: Address,
    /// Shares burned
    pub liquidity_burned: u64,
    pub min_self_received: u64,
    pub min_proceeds_received: u64,
    pub min_subsidy_received: u64,
    /// Last timestamp the call may execute at
    pub deadline: u64,
}

/// Amounts paid by `remove_liquidity`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    /// Pool asset returned for the burned shares
    pub self_paid: u64,
    /// Proceeds paid, in the pool asset
    pub proceeds_paid: u64,
    /// Subsidy paid, in ctez
    pub subsidy_paid: u64,
}

/// Amounts paid by `collect`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Collection {
    pub proceeds_paid: u64,
    pub subsidy_paid: u64,
}

/// Fail with `DeadlineHasPassed` once `now` is past `deadline`
pub fn require_deadline(deadline: u64, now: u64) -> CtezResult<()> {
    if now > deadline {
        return Err(CtezError::DeadlineHasPassed { deadline, now });
    }
    Ok(())
}

// ============ Pool ============

/// One side of the ctez/tez pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct HalfDex {
    /// Which asset the pool sells
    pub side: DexSide,
    /// Pool asset available to swaps and LP withdrawals
    pub self_reserves: u64,
    /// Sum of all owner shares plus the locked genesis share
    pub total_liquidity_shares: u64,
    /// Cumulative proceeds credited
    pub proceeds_reserves: u64,
    /// Cumulative subsidy credited
    pub subsidy_reserves: u64,
    /// Cumulative proceeds paid out
    pub proceeds_debts: u64,
    /// Cumulative subsidy paid out
    pub subsidy_debts: u64,
    /// Reward-per-share accumulator
    pub fee_index: FeeIndex,
    liquidity_owners: BTreeMap<Address, LiquidityOwner>,
}

impl HalfDex {
    /// Genesis pool
    pub fn new(side: DexSide) -> Self {
        Self {
            side,
            self_reserves: GENESIS_SELF_RESERVES,
            total_liquidity_shares: GENESIS_LIQUIDITY_SHARES,
            proceeds_reserves: 0,
            subsidy_reserves: 0,
            proceeds_debts: 0,
            subsidy_debts: 0,
            fee_index: FeeIndex::default(),
            liquidity_owners: BTreeMap::new(),
        }
    }

    /// Whether anyone besides the genesis share provides liquidity
    pub fn has_providers(&self) -> bool {
        self.total_liquidity_shares > GENESIS_LIQUIDITY_SHARES
    }

    /// Number of accounts with a record
    pub fn owner_count(&self) -> usize {
        self.liquidity_owners.len()
    }

    /// Sum of all recorded shares
    pub fn owned_shares(&self) -> u64 {
        self.liquidity_owners
            .values()
            .map(|owner| owner.liquidity_shares)
            .fold(0u64, u64::saturating_add)
    }

    /// Stored record of `address`, without pending accrual
    pub fn stored_owner(&self, address: &Address) -> Option<&LiquidityOwner> {
        self.liquidity_owners.get(address)
    }

    /// Record of `address` as if settled now; a zero record when absent
    pub fn liquidity_owner(&self, address: &Address) -> CtezResult<LiquidityOwner> {
        match self.liquidity_owners.get(address) {
            Some(owner) => self.settled(owner),
            None => Ok(LiquidityOwner {
                last_fee_index: self.fee_index,
                ..LiquidityOwner::default()
            }),
        }
    }

    // ============ Accrual ============

    /// Fold newly accrued proceeds and subsidy into a copy of `owner`
    pub fn settled(&self, owner: &LiquidityOwner) -> CtezResult<LiquidityOwner> {
        let proceeds = accrued(
            owner.liquidity_shares,
            self.fee_index.proceeds,
            owner.last_fee_index.proceeds,
        )?;
        let subsidy = accrued(
            owner.liquidity_shares,
            self.fee_index.subsidy,
            owner.last_fee_index.subsidy,
        )?;
        Ok(LiquidityOwner {
            liquidity_shares: owner.liquidity_shares,
            proceeds_owed: safe_add(owner.proceeds_owed, proceeds)?,
            subsidy_owed: safe_add(owner.subsidy_owed, subsidy)?,
            last_fee_index: self.fee_index,
        })
    }

    /// Credit swap fees to current liquidity providers
    pub fn distribute_proceeds(&mut self, amount: u64) -> CtezResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let step = index_step(amount, self.total_liquidity_shares)?;
        let index = safe_add_u128(self.fee_index.proceeds, step)?;
        let reserves = safe_add(self.proceeds_reserves, amount)?;
        self.fee_index.proceeds = index;
        self.proceeds_reserves = reserves;
        Ok(())
    }

    /// Credit protocol subsidy to current liquidity providers
    pub fn distribute_subsidy(&mut self, amount: u64) -> CtezResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let step = index_step(amount, self.total_liquidity_shares)?;
        let index = safe_add_u128(self.fee_index.subsidy, step)?;
        let reserves = safe_add(self.subsidy_reserves, amount)?;
        self.fee_index.subsidy = index;
        self.subsidy_reserves = reserves;
        Ok(())
    }

    fn store(&mut self, address: Address, owner: LiquidityOwner) {
        if owner.is_empty() {
            self.liquidity_owners.remove(&address);
        } else {
            self.liquidity_owners.insert(address, owner);
        }
    }

    // ============ Liquidity Operations ============

    /// Shares minted for depositing `amount` at the current share price
    pub fn shares_for(&self, amount: u64) -> CtezResult<u64> {
        if self.self_reserves == 0 {
            return Ok(amount);
        }
        to_u64(mul_div(
            amount as u128,
            self.total_liquidity_shares as u128,
            self.self_reserves as u128,
            Rounding::Down,
        )?)
    }

    /// Deposit the pool asset for shares; returns the shares minted
    pub fn add_liquidity(
        &mut self,
        call: &CallContext,
        request: &AddLiquidity,
        events: &mut EventLog,
    ) -> CtezResult<u64> {
        // 1. Deadline
        require_deadline(request.deadline, call.now)?;

        // 2. Price the deposit
        // A deposit that buys no share would be absorbed by the pool
        let minted = self.shares_for(request.amount)?;
        let minimum = request.min_liquidity_minted.max(1);
        if minted < minimum {
            return Err(CtezError::InsufficientLiquidityCreated { minted, minimum });
        }

        // 3. Settle before the share count changes
        let mut owner = self.liquidity_owner(&call.sender)?;
        owner.liquidity_shares = safe_add(owner.liquidity_shares, minted)?;
        let total = safe_add(self.total_liquidity_shares, minted)?;
        let reserves = safe_add(self.self_reserves, request.amount)?;

        // 4. Apply
        self.store(call.sender, owner);
        self.total_liquidity_shares = total;
        self.self_reserves = reserves;

        events.emit(CtezEvent::LiquidityAdded {
            side: self.side,
            owner: call.sender,
            deposited: request.amount,
            shares_minted: minted,
            timestamp: call.now,
        });

        Ok(minted)
    }

    /// Burn shares for a proportional slice of reserves plus everything owed
    pub fn remove_liquidity(
        &mut self,
        call: &CallContext,
        request: &RemoveLiquidity,
        events: &mut EventLog,
    ) -> CtezResult<Removal> {
        // 1. Deadline
        require_deadline(request.deadline, call.now)?;

        // 2. Settle and check ownership
        let mut owner = self.liquidity_owner(&call.sender)?;
        if request.liquidity_burned > owner.liquidity_shares {
            return Err(CtezError::InsufficientLiquidityOwned {
                owned: owner.liquidity_shares,
                requested: request.liquidity_burned,
            });
        }

        // 3. Compute payouts
        let removal = Removal {
            self_paid: to_u64(mul_div(
                request.liquidity_burned as u128,
                self.self_reserves as u128,
                self.total_liquidity_shares as u128,
                Rounding::Down,
            )?)?,
            proceeds_paid: owner.proceeds_owed,
            subsidy_paid: owner.subsidy_owed,
        };

        // 4. Slippage bounds
        if removal.self_paid < request.min_self_received {
            return Err(CtezError::InsufficientSelfReceived {
                received: removal.self_paid,
                minimum: request.min_self_received,
            });
        }
        if removal.proceeds_paid < request.min_proceeds_received {
            return Err(CtezError::InsufficientProceedsReceived {
                received: removal.proceeds_paid,
                minimum: request.min_proceeds_received,
            });
        }
        if removal.subsidy_paid < request.min_subsidy_received {
            return Err(CtezError::InsufficientSubsidyReceived {
                received: removal.subsidy_paid,
                minimum: request.min_subsidy_received,
            });
        }

        owner.liquidity_shares -= request.liquidity_burned;
        owner.proceeds_owed = 0;
        owner.subsidy_owed = 0;
        let total = safe_sub(self.total_liquidity_shares, request.liquidity_burned)?;
        let reserves = safe_sub(self.self_reserves, removal.self_paid)?;
        let proceeds_debts = safe_add(self.proceeds_debts, removal.proceeds_paid)?;
        let subsidy_debts = safe_add(self.subsidy_debts, removal.subsidy_paid)?;

        // 5. Apply
        self.store(call.sender, owner);
        self.total_liquidity_shares = total;
        self.self_reserves = reserves;
        self.proceeds_debts = proceeds_debts;
        self.subsidy_debts = subsidy_debts;

        events.emit(CtezEvent::LiquidityRemoved {
            side: self.side,
            owner: call.sender,
            to: request.to,
            shares_burned: request.liquidity_burned,
            self_paid: removal.self_paid,
            proceeds_paid: removal.proceeds_paid,
            subsidy_paid: removal.subsidy_paid,
            timestamp: call.now,
        });

        Ok(removal)
    }

    /// Pay out everything the caller is owed; idempotent
    pub fn collect(&mut self, call: &CallContext, to: &Address, events: &mut EventLog) -> CtezResult<Collection> {
        // 1. Unknown accounts are owed nothing and get no record
        let Some(stored) = self.liquidity_owners.get(&call.sender) else {
            return Ok(Collection::default());
        };

        // 2. Settle
        let mut owner = self.settled(stored)?;
        let collection = Collection {
            proceeds_paid: owner.proceeds_owed,
            subsidy_paid: owner.subsidy_owed,
        };
        owner.proceeds_owed = 0;
        owner.subsidy_owed = 0;
        let proceeds_debts = safe_add(self.proceeds_debts, collection.proceeds_paid)?;
        let subsidy_debts = safe_add(self.subsidy_debts, collection.subsidy_paid)?;

        // 3. Apply
        self.store(call.sender, owner);
        self.proceeds_debts = proceeds_debts;
        self.subsidy_debts = subsidy_debts;

        if collection != Collection::default() {
            events.emit(CtezEvent::Collected {
                side: self.side,
                owner: call.sender,
                to: *to,
                proceeds_paid: collection.proceeds_paid,
                subsidy_paid: collection.subsidy_paid,
                timestamp: call.now,
            });
        }

        Ok(collection)
    }
}

/// Index increment for distributing `amount` over `total_shares`
fn index_step(amount: u64, total_shares: u64) -> CtezResult<u128> {
    mul_div(amount as u128, FEE_INDEX_PRECISION, total_shares as u128, Rounding::Down)
}

/// Reward accrued by `shares` between two index values, rounded down
fn accrued(shares: u64, index: u128, last: u128) -> CtezResult<u64> {
    let delta = index.saturating_sub(last);
    if delta == 0 || shares == 0 {
        return Ok(0);
    }
    to_u64(mul_div(shares as u128, delta, FEE_INDEX_PRECISION, Rounding::Down)?)
}

// ============ Tests ============
