//! ctez Common Library
//!
//! Shared types, constants, and utilities for all ctez components.
//!
//! ## Protocol Shape
//!
//! ctez is a collateralized synthetic asset on Tezos:
//! - **Ovens**: per-owner vaults locking tez to mint ctez against it
//! - **Half-dex pair**: two single-asset pools (`sell_tez`, `sell_ctez`)
//!   that let holders swap tez and ctez around a drifting target price
//! - **Drift oracle**: target price plus a drift rate, advanced once per
//!   elapsed time step from the observed market price
//!
//! Every component is a pure state transition over explicit state passed
//! by exclusive reference. There is no ambient state.
//!
//! This crate is `no_std` compatible for WASM compilation when built
//! without the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collections for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::{collections::BTreeMap, collections::BTreeSet, vec::Vec};
#[cfg(feature = "std")]
pub use std::{collections::BTreeMap, collections::BTreeSet, vec::Vec};

pub mod constants;
pub mod errors;
pub mod events;
pub mod math;
pub mod token_ops;
pub mod types;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use events::*;
pub use math::*;
pub use token_ops::*;
pub use types::*;
