//! Token Operations Module
//!
//! The two asset ledgers the core talks to:
//!
//! - **ctez**: an FA1.2-style fungible token consumed through the
//!   [`Fa12Token`] interface (transfer, approve, balance, allowance, plus an
//!   admin-only `mint_or_burn` the engine uses for oven debt and subsidies)
//! - **tez**: the native reserve asset, moved by the ledger itself
//!
//! [`Fa12Ledger`] and [`TezLedger`] are the in-memory implementations the
//! engine and its tests run against. Both fail loudly on insufficient
//! balance so the enclosing batch aborts.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::math::{safe_add, safe_sub, to_u64};
use crate::types::Address;
use crate::{BTreeMap, CtezError, CtezResult};

// ============================================================================
// Types
// ============================================================================

/// Token supply state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TokenSupply {
    /// Total supply of ctez
    pub total_supply: u64,
    /// Total minted (cumulative)
    pub total_minted: u64,
    /// Total burned (cumulative)
    pub total_burned: u64,
}

impl TokenSupply {
    /// Create new supply tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate circulating supply
    pub fn circulating(&self) -> u64 {
        self.total_minted.saturating_sub(self.total_burned)
    }
}

/// FA1.2 token interface consumed by the engine
pub trait Fa12Token {
    /// Move `amount` from `from` to `to`, spending `sender`'s allowance when
    /// `sender != from`
    fn transfer(&mut self, sender: &Address, from: &Address, to: &Address, amount: u64) -> CtezResult<()>;

    /// Set `spender`'s allowance over `owner`'s tokens
    fn approve(&mut self, owner: &Address, spender: &Address, amount: u64) -> CtezResult<()>;

    /// Balance of `owner`
    fn balance_of(&self, owner: &Address) -> u64;

    /// Allowance granted by `owner` to `spender`
    fn allowance(&self, owner: &Address, spender: &Address) -> u64;

    /// Mint (positive) or burn (negative) `quantity` for `target`; admin only
    fn mint_or_burn(&mut self, caller: &Address, target: &Address, quantity: i128) -> CtezResult<()>;

    /// Current total supply
    fn total_supply(&self) -> u64;
}

// ============================================================================
// In-memory FA1.2 ledger
// ============================================================================

/// In-memory ctez ledger with FA1.2 allowance rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Fa12Ledger {
    /// Only address allowed to mint or burn
    pub admin: Address,
    balances: BTreeMap<Address, u64>,
    allowances: BTreeMap<(Address, Address), u64>,
    supply: TokenSupply,
}

impl Fa12Ledger {
    /// Create an empty ledger administered by `admin`
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            supply: TokenSupply::new(),
        }
    }

    /// Supply counters
    pub fn supply(&self) -> &TokenSupply {
        &self.supply
    }

    fn set_balance(&mut self, owner: &Address, balance: u64) {
        if balance == 0 {
            self.balances.remove(owner);
        } else {
            self.balances.insert(*owner, balance);
        }
    }

    fn debit(&mut self, owner: &Address, amount: u64) -> CtezResult<()> {
        let available = self.balance_of(owner);
        if available < amount {
            return Err(CtezError::InsufficientBalance { available, requested: amount });
        }
        self.set_balance(owner, available - amount);
        Ok(())
    }

    fn credit(&mut self, owner: &Address, amount: u64) -> CtezResult<()> {
        let balance = safe_add(self.balance_of(owner), amount)?;
        self.set_balance(owner, balance);
        Ok(())
    }
}

impl Fa12Token for Fa12Ledger {
    fn transfer(&mut self, sender: &Address, from: &Address, to: &Address, amount: u64) -> CtezResult<()> {
        // 1. Spend allowance when moving someone else's tokens
        let remaining_allowance = if sender != from {
            let available = self.allowance(from, sender);
            if available < amount {
                return Err(CtezError::NotEnoughAllowance { available, requested: amount });
            }
            Some(available - amount)
        } else {
            None
        };

        // 2. Check balance before writing anything
        let available = self.balance_of(from);
        if available < amount {
            return Err(CtezError::InsufficientBalance { available, requested: amount });
        }
        safe_add(self.balance_of(to), amount)?;

        // 3. Apply
        if let Some(remaining) = remaining_allowance {
            if remaining == 0 {
                self.allowances.remove(&(*from, *sender));
            } else {
                self.allowances.insert((*from, *sender), remaining);
            }
        }
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: u64) -> CtezResult<()> {
        let current = self.allowance(owner, spender);
        if current > 0 && amount > 0 {
            return Err(CtezError::UnsafeAllowanceChange { current });
        }
        if amount == 0 {
            self.allowances.remove(&(*owner, *spender));
        } else {
            self.allowances.insert((*owner, *spender), amount);
        }
        Ok(())
    }

    fn balance_of(&self, owner: &Address) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn mint_or_burn(&mut self, caller: &Address, target: &Address, quantity: i128) -> CtezResult<()> {
        if *caller != self.admin {
            return Err(CtezError::UnauthorizedMinter { caller: *caller });
        }
        let amount = to_u64(quantity.unsigned_abs())?;
        if quantity >= 0 {
            let total_supply = safe_add(self.supply.total_supply, amount)?;
            self.credit(target, amount)?;
            self.supply.total_supply = total_supply;
            self.supply.total_minted = self.supply.total_minted.saturating_add(amount);
        } else {
            self.debit(target, amount)?;
            self.supply.total_supply = self.supply.total_supply.saturating_sub(amount);
            self.supply.total_burned = self.supply.total_burned.saturating_add(amount);
        }
        Ok(())
    }

    fn total_supply(&self) -> u64 {
        self.supply.total_supply
    }
}

// ============================================================================
// Native tez ledger
// ============================================================================

/// Native reserve-asset balances (mutez)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TezLedger {
    balances: BTreeMap<Address, u64>,
}

impl TezLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `owner` in mutez
    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Credit `amount` out of thin air (genesis funding)
    pub fn fund(&mut self, owner: &Address, amount: u64) -> CtezResult<()> {
        let balance = safe_add(self.balance_of(owner), amount)?;
        self.balances.insert(*owner, balance);
        Ok(())
    }

    /// Move `amount` mutez between accounts
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> CtezResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(CtezError::InsufficientBalance { available, requested: amount });
        }
        let to_balance = safe_add(self.balance_of(to), amount)?;
        let from_balance = safe_sub(available, amount)?;
        if from_balance == 0 {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, from_balance);
        }
        if from != to {
            self.balances.insert(*to, to_balance);
        } else {
            self.balances.insert(*to, available);
        }
        Ok(())
    }
}
