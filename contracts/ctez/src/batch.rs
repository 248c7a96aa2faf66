//! Atomic Batches
//!
//! A batch is an ordered list of steps submitted by one sender at one
//! ledger time. Steps run against a scratch copy of the chain; the copy
//! replaces the live chain only when every step succeeds.

use ctez_common::{
    errors::{CtezError, CtezResult},
    events::CtezEvent,
    token_ops::Fa12Token,
    types::{Address, CallContext},
    Vec,
};

use crate::{chain::Chain, entrypoints::Entrypoint};

/// One step of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Set the sender's ctez allowance for `spender`
    Approve { spender: Address, amount: u64 },
    /// Move ctez from `from` (the sender, or an account that approved it)
    Transfer { from: Address, to: Address, amount: u64 },
    /// Invoke an entrypoint with `amount` mutez attached
    Call { amount: u64, entrypoint: Entrypoint },
}

/// Ordered steps submitted together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub sender: Address,
    pub now: u64,
    pub steps: Vec<Step>,
}

impl Batch {
    pub fn new(sender: Address, now: u64) -> Self {
        Self {
            sender,
            now,
            steps: Vec::new(),
        }
    }

    pub fn approve(mut self, spender: Address, amount: u64) -> Self {
        self.steps.push(Step::Approve { spender, amount });
        self
    }

    /// Reset the allowance to zero, raise it to `amount`, then call
    ///
    /// FA1.2 refuses a direct non-zero to non-zero allowance change.
    pub fn approve_then(self, spender: Address, amount: u64, entrypoint: Entrypoint) -> Self {
        self.approve(spender, 0).approve(spender, amount).call(entrypoint)
    }

    pub fn transfer(mut self, from: Address, to: Address, amount: u64) -> Self {
        self.steps.push(Step::Transfer { from, to, amount });
        self
    }

    /// Call without attached tez
    pub fn call(self, entrypoint: Entrypoint) -> Self {
        self.call_with_tez(0, entrypoint)
    }

    pub fn call_with_tez(mut self, amount: u64, entrypoint: Entrypoint) -> Self {
        self.steps.push(Step::Call { amount, entrypoint });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Chain {
    /// Apply a batch atomically; returns the events it emitted
    ///
    /// On error the chain is left exactly as it was.
    pub fn apply(&mut self, batch: &Batch) -> CtezResult<Vec<CtezEvent>> {
        if batch.is_empty() {
            return Err(CtezError::EmptyBatch);
        }

        let mut scratch = self.clone();
        let first_event = scratch.events.len();
        for step in &batch.steps {
            scratch.run_step(batch.sender, batch.now, step)?;
        }

        let emitted = scratch.events.events()[first_event..].to_vec();
        *self = scratch;
        Ok(emitted)
    }

    /// Apply a single call as its own batch
    pub fn execute(&mut self, sender: Address, now: u64, amount: u64, entrypoint: Entrypoint) -> CtezResult<Vec<CtezEvent>> {
        self.apply(&Batch::new(sender, now).call_with_tez(amount, entrypoint))
    }

    fn run_step(&mut self, sender: Address, now: u64, step: &Step) -> CtezResult<()> {
        match step {
            Step::Approve { spender, amount } => self.ctez.approve(&sender, spender, *amount),
            Step::Transfer { from, to, amount } => self.ctez.transfer(&sender, from, to, *amount),
            Step::Call { amount, entrypoint } => {
                // Attached tez reaches the engine before the entrypoint runs
                let engine = self.engine();
                self.tez.transfer(&sender, &engine, *amount)?;
                let call = CallContext::new(sender, now).with_amount(*amount);
                self.dispatch(&call, entrypoint)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctez_common::types::{CtezConfig, Depositors};

    const ALICE: Address = [1u8; 32];

    fn chain() -> Chain {
        Chain::new(CtezConfig::new([0xEEu8; 32], 0)).unwrap()
    }

    #[test]
    fn test_approve_then_pushes_reset_first() {
        let spender = [7u8; 32];
        let entrypoint = Entrypoint::CollectFromTezLiquidity { to: ALICE };
        let batch = Batch::new(ALICE, 5).approve_then(spender, 40, entrypoint.clone());

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.steps[0], Step::Approve { spender, amount: 0 });
        assert_eq!(batch.steps[1], Step::Approve { spender, amount: 40 });
        assert_eq!(batch.steps[2], Step::Call { amount: 0, entrypoint });
    }

    #[test]
    fn test_empty_batch_rejected() {
        let mut chain = chain();
        let before = chain.clone();
        let result = chain.apply(&Batch::new(ALICE, 1));
        assert_eq!(result, Err(CtezError::EmptyBatch));
        assert_eq!(chain, before);
    }

    #[test]
    fn test_attached_tez_needs_balance() {
        let mut chain = chain();
        let before = chain.clone();
        let result = chain.execute(
            ALICE,
            1,
            500,
            Entrypoint::CreateOven {
                id: 1,
                delegate: None,
                depositors: Depositors::Nobody,
            },
        );
        assert!(matches!(result, Err(CtezError::InsufficientBalance { .. })));
        assert_eq!(chain, before);
    }

    #[test]
    fn test_failed_step_discards_earlier_steps() {
        let mut chain = chain();
        chain.fund_tez(&ALICE, 1_000).unwrap();
        let before = chain.clone();

        // The oven is created, then the withdrawal overdraws it
        let batch = Batch::new(ALICE, 1)
            .call_with_tez(
                1_000,
                Entrypoint::CreateOven {
                    id: 1,
                    delegate: None,
                    depositors: Depositors::Nobody,
                },
            )
            .call(Entrypoint::Withdraw {
                oven: ctez_common::types::OvenKey::new(1, ALICE),
                amount: 1_001,
                to: ALICE,
            });

        let result = chain.apply(&batch);
        assert!(matches!(result, Err(CtezError::InsufficientCollateral { .. })));
        assert_eq!(chain, before);
    }
}
