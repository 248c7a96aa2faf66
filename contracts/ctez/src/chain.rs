//! Ledger World
//!
//! [`Chain`] bundles the protocol state with the collaborators it moves
//! assets through: the ctez FA1.2 ledger and the native tez ledger. The
//! engine holds all protocol custody under `config.engine`, which is also
//! the ctez administrator.
//!
//! Protocol operations run only through [`Chain::apply`], which executes a
//! [`Batch`](crate::Batch) atomically.

use ctez_common::{
    constants::dex::GENESIS_SELF_RESERVES,
    errors::CtezResult,
    events::EventLog,
    token_ops::{Fa12Ledger, Fa12Token, TezLedger},
    types::{Address, CtezConfig},
};

use crate::state::CtezState;

/// Protocol state plus the asset ledgers it settles on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    /// Persisted protocol record
    pub state: CtezState,
    /// ctez balances and allowances
    pub ctez: Fa12Ledger,
    /// Native tez balances
    pub tez: TezLedger,
    /// Structured protocol log
    pub events: EventLog,
}

impl Chain {
    /// Originate the protocol
    ///
    /// The genesis reserve unit of each pool is backed by the originator, so
    /// the engine's custody always covers pool reserves.
    pub fn new(config: CtezConfig) -> CtezResult<Self> {
        let engine = config.engine;
        let mut chain = Self {
            state: CtezState::genesis(config),
            ctez: Fa12Ledger::new(engine),
            tez: TezLedger::new(),
            events: EventLog::new(),
        };
        chain.tez.fund(&engine, GENESIS_SELF_RESERVES)?;
        chain
            .ctez
            .mint_or_burn(&engine, &engine, GENESIS_SELF_RESERVES as i128)?;
        Ok(chain)
    }

    /// Engine custody address
    pub fn engine(&self) -> Address {
        self.state.config.engine
    }

    /// Credit native tez to an account (ledger-side funding)
    pub fn fund_tez(&mut self, account: &Address, amount: u64) -> CtezResult<()> {
        self.tez.fund(account, amount)
    }

    /// ctez balance of an account
    pub fn ctez_balance(&self, account: &Address) -> u64 {
        self.ctez.balance_of(account)
    }

    /// tez balance of an account
    pub fn tez_balance(&self, account: &Address) -> u64 {
        self.tez.balance_of(account)
    }
}
