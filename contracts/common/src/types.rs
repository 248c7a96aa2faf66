//! Core Types for ctez Protocol
//!
//! Fundamental data structures shared across the ctez components.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::BTreeSet;

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for caller-chosen oven numbers
pub type OvenId = u64;

/// Derive a deterministic address from a label
pub fn derive_address(label: &[u8]) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(b"ctez/address/");
    hasher.update(label);
    let result = hasher.finalize();
    let mut address = [0u8; 32];
    address.copy_from_slice(&result);
    address
}

// ============ Oven Types ============

/// Registry key of an oven: numeric id chosen by the owner, plus the owner
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct OvenKey {
    /// Caller-chosen id, unique per owner
    pub id: OvenId,
    /// Owner's address
    pub owner: Address,
}

impl OvenKey {
    /// Creates a new oven key
    pub fn new(id: OvenId, owner: Address) -> Self {
        Self { id, owner }
    }
}

/// Who besides the owner may add collateral to an oven
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Depositors {
    /// Anyone may deposit
    Any,
    /// Only the owner may deposit
    #[default]
    Nobody,
    /// Only the listed addresses (and the owner) may deposit
    Whitelist(BTreeSet<Address>),
}

impl Depositors {
    /// Check whether `depositor` may add collateral to an oven owned by `owner`
    pub fn allows(&self, owner: &Address, depositor: &Address) -> bool {
        if owner == depositor {
            return true;
        }
        match self {
            Depositors::Any => true,
            Depositors::Nobody => false,
            Depositors::Whitelist(allowed) => allowed.contains(depositor),
        }
    }
}

// ============ Dex Types ============

/// Which half-dex a liquidity operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum DexSide {
    /// Pool selling tez (liquidity provided in tez)
    SellTez,
    /// Pool selling ctez (liquidity provided in ctez)
    SellCtez,
}

/// Swap direction, named by what the caller sends and receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum SwapDirection {
    /// Send tez, receive ctez from the `sell_ctez` pool
    TezToCtez,
    /// Send ctez, receive tez from the `sell_tez` pool
    CtezToTez,
}

impl SwapDirection {
    /// Pool that pays out the swap
    pub fn destination(&self) -> DexSide {
        match self {
            SwapDirection::TezToCtez => DexSide::SellCtez,
            SwapDirection::CtezToTez => DexSide::SellTez,
        }
    }

    /// Pool whose reserves receive the sent asset
    pub fn source(&self) -> DexSide {
        match self {
            SwapDirection::TezToCtez => DexSide::SellTez,
            SwapDirection::CtezToTez => DexSide::SellCtez,
        }
    }
}

// ============ Call Types ============

/// Ledger-provided context of a single entrypoint invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Address that submitted the call
    pub sender: Address,
    /// Native tez (mutez) attached to the call
    pub amount: u64,
    /// Current ledger time (seconds)
    pub now: u64,
}

impl CallContext {
    /// Call without attached tez
    pub fn new(sender: Address, now: u64) -> Self {
        Self { sender, amount: 0, now }
    }

    /// Same call with `amount` mutez attached
    pub fn with_amount(self, amount: u64) -> Self {
        Self { amount, ..self }
    }
}

/// Runtime wiring supplied at genesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CtezConfig {
    /// Address the engine holds tez and ctez under
    pub engine: Address,
    /// Genesis timestamp
    pub genesis_time: u64,
}

impl CtezConfig {
    /// Creates a config with an explicit engine address
    pub fn new(engine: Address, genesis_time: u64) -> Self {
        Self { engine, genesis_time }
    }
}

impl Default for CtezConfig {
    fn default() -> Self {
        Self {
            engine: derive_address(b"engine"),
            genesis_time: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depositors_policy() {
        let owner = [1u8; 32];
        let friend = [2u8; 32];
        let stranger = [3u8; 32];

        let mut list = BTreeSet::new();
        list.insert(friend);
        let whitelist = Depositors::Whitelist(list);

        assert!(Depositors::Any.allows(&owner, &stranger));
        assert!(!Depositors::Nobody.allows(&owner, &stranger));
        assert!(Depositors::Nobody.allows(&owner, &owner));
        assert!(whitelist.allows(&owner, &friend));
        assert!(!whitelist.allows(&owner, &stranger));
        assert!(whitelist.allows(&owner, &owner));
    }

    #[test]
    fn test_swap_direction_pools() {
        assert_eq!(SwapDirection::TezToCtez.destination(), DexSide::SellCtez);
        assert_eq!(SwapDirection::TezToCtez.source(), DexSide::SellTez);
        assert_eq!(SwapDirection::CtezToTez.destination(), DexSide::SellTez);
        assert_eq!(SwapDirection::CtezToTez.source(), DexSide::SellCtez);
    }

    #[test]
    fn test_derived_addresses_differ() {
        assert_ne!(derive_address(b"alice"), derive_address(b"bob"));
        assert_eq!(derive_address(b"alice"), derive_address(b"alice"));
    }
}
