//! ctez Protocol Engine
//!
//! Wires ovens, the half-dex pair and the drift oracle behind a single set
//! of entrypoints, settled on an FA1.2 ctez ledger and a native tez ledger.
//!
//! ## Execution Model
//!
//! - **Batch**: an ordered list of approvals, transfers and entrypoint calls
//!   from one sender at one ledger time. All steps commit or none do.
//! - **Tick**: every entrypoint first accrues pool subsidies and advances the
//!   drift for the time elapsed since the last update, at most once per
//!   timestamp.
//! - **Custody**: all protocol tez and ctez sit under `config.engine`, which
//!   is also the only ctez minter.
//!
//! ## Usage
//!
//! ```ignore
//! let mut chain = Chain::new(CtezConfig::new(engine, 0))?;
//! chain.fund_tez(&alice, 10_000_000)?;
//! chain.apply(
//!     &Batch::new(alice, 60).call_with_tez(
//!         1_000_000,
//!         Entrypoint::AddTezLiquidity { min_liquidity_minted: 1, deadline: 120 },
//!     ),
//! )?;
//! ```

pub mod batch;
pub mod chain;
pub mod entrypoints;
pub mod state;

pub use batch::{Batch, Step};
pub use chain::Chain;
pub use entrypoints::Entrypoint;
pub use state::CtezState;
