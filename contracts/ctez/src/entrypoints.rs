//! Engine Entrypoints
//!
//! One entrypoint per protocol operation. Every entrypoint:
//!
//! 1. ticks the clock (pool subsidies, then the drift step)
//! 2. rejects attached tez unless tez is the operation's own input
//! 3. runs the component operation, which checks before it writes
//! 4. settles asset movements on the ctez and tez ledgers
//!
//! Attached tez has already moved from the sender to the engine when an
//! entrypoint starts. Entrypoints run inside a batch, so any failure
//! reverts every preceding step as well.

use ctez_common::{
    errors::{CtezError, CtezResult},
    events::CtezEvent,
    math::safe_add,
    token_ops::Fa12Token,
    types::{Address, CallContext, Depositors, DexSide, OvenId, OvenKey, SwapDirection},
};
use ctez_half_dex::{AddLiquidity, RemoveLiquidity, SwapRequest};

use crate::chain::Chain;

/// A call to one protocol operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entrypoint {
    // ============ Ovens ============
    /// Create an oven owned by the sender, funded with the attached tez
    CreateOven {
        id: OvenId,
        delegate: Option<Address>,
        depositors: Depositors,
    },
    /// Add the attached tez to an oven
    Deposit { oven: OvenKey },
    Withdraw { oven: OvenKey, amount: u64, to: Address },
    /// Positive quantity mints ctez to the owner, negative burns it
    MintOrBurn { oven: OvenKey, quantity: i128 },
    LiquidateOven { oven: OvenKey, quantity: u64, to: Address },
    SetDelegate { oven: OvenKey, delegate: Option<Address> },
    SetDepositors { oven: OvenKey, depositors: Depositors },

    // ============ Liquidity ============
    /// Provide the attached tez to the `sell_tez` pool
    AddTezLiquidity { min_liquidity_minted: u64, deadline: u64 },
    /// Provide ctez (pulled through the engine's allowance) to `sell_ctez`
    AddCtezLiquidity { amount: u64, min_liquidity_minted: u64, deadline: u64 },
    RemoveTezLiquidity(RemoveLiquidity),
    RemoveCtezLiquidity(RemoveLiquidity),
    CollectFromTezLiquidity { to: Address },
    CollectFromCtezLiquidity { to: Address },

    // ============ Swaps ============
    /// Sell the attached tez for ctez
    TezToCtez { min_ctez_bought: u64, to: Address, deadline: u64 },
    /// Sell ctez (pulled through the engine's allowance) for tez
    CtezToTez { ctez_sold: u64, min_tez_bought: u64, to: Address, deadline: u64 },
}

impl Chain {
    /// Run one entrypoint
    pub(crate) fn dispatch(&mut self, call: &CallContext, entrypoint: &Entrypoint) -> CtezResult<()> {
        self.tick(call.now)?;

        match entrypoint {
            Entrypoint::CreateOven { id, delegate, depositors } => {
                self.create_oven(call, *id, *delegate, depositors.clone())
            }
            Entrypoint::Deposit { oven } => self.deposit(call, oven),
            Entrypoint::Withdraw { oven, amount, to } => self.withdraw(call, oven, *amount, to),
            Entrypoint::MintOrBurn { oven, quantity } => self.mint_or_burn(call, oven, *quantity),
            Entrypoint::LiquidateOven { oven, quantity, to } => {
                self.liquidate_oven(call, oven, *quantity, to)
            }
            Entrypoint::SetDelegate { oven, delegate } => self.set_delegate(call, oven, *delegate),
            Entrypoint::SetDepositors { oven, depositors } => {
                self.set_depositors(call, oven, depositors.clone())
            }
            Entrypoint::AddTezLiquidity { min_liquidity_minted, deadline } => {
                self.add_tez_liquidity(call, *min_liquidity_minted, *deadline)
            }
            Entrypoint::AddCtezLiquidity { amount, min_liquidity_minted, deadline } => {
                self.add_ctez_liquidity(call, *amount, *min_liquidity_minted, *deadline)
            }
            Entrypoint::RemoveTezLiquidity(request) => {
                self.remove_liquidity(call, DexSide::SellTez, request)
            }
            Entrypoint::RemoveCtezLiquidity(request) => {
                self.remove_liquidity(call, DexSide::SellCtez, request)
            }
            Entrypoint::CollectFromTezLiquidity { to } => self.collect(call, DexSide::SellTez, to),
            Entrypoint::CollectFromCtezLiquidity { to } => self.collect(call, DexSide::SellCtez, to),
            Entrypoint::TezToCtez { min_ctez_bought, to, deadline } => {
                self.tez_to_ctez(call, *min_ctez_bought, to, *deadline)
            }
            Entrypoint::CtezToTez { ctez_sold, min_tez_bought, to, deadline } => {
                self.ctez_to_tez(call, *ctez_sold, *min_tez_bought, to, *deadline)
            }
        }
    }

    // ============ Clock ============

    /// Accrue pool subsidies for the elapsed time, then advance the drift
    pub(crate) fn tick(&mut self, now: u64) -> CtezResult<()> {
        let elapsed = self.state.context.pending_elapsed(now);
        if elapsed == 0 {
            return Ok(());
        }

        // 1. Subsidies for pools short of their liquidity target
        let engine = self.engine();
        let pricing = self.state.swap_engine();
        for side in [DexSide::SellTez, DexSide::SellCtez] {
            let amount = pricing.subsidy(self.state.dex(side), elapsed)?;
            if amount == 0 {
                continue;
            }
            self.state.dex_mut(side).distribute_subsidy(amount)?;
            self.ctez.mint_or_burn(&engine, &engine, amount as i128)?;
            self.state.total_subsidy_minted = self.state.total_subsidy_minted.saturating_add(amount);
            self.events.emit(CtezEvent::SubsidyAccrued {
                side,
                amount,
                timestamp: now,
            });
        }

        // 2. Drift step from the observed mid price
        let observed = pricing.market_price(&self.state.sell_tez, &self.state.sell_ctez)?;
        if let Some(step) = self.state.context.advance(now, observed) {
            self.events.emit(step.to_event(now));
        }
        Ok(())
    }

    // ============ Oven Entrypoints ============

    fn create_oven(
        &mut self,
        call: &CallContext,
        id: OvenId,
        delegate: Option<Address>,
        depositors: Depositors,
    ) -> CtezResult<()> {
        self.state
            .ovens
            .create(call, id, delegate, depositors, &mut self.events)
            .map(|_| ())
    }

    fn deposit(&mut self, call: &CallContext, oven: &OvenKey) -> CtezResult<()> {
        self.state.ovens.deposit(call, oven, &mut self.events).map(|_| ())
    }

    fn withdraw(&mut self, call: &CallContext, oven: &OvenKey, amount: u64, to: &Address) -> CtezResult<()> {
        reject_tez(call)?;
        let target = self.state.context.target;
        self.state
            .ovens
            .withdraw(call, oven, amount, to, target, &mut self.events)?;
        self.tez.transfer(&self.state.config.engine, to, amount)
    }

    fn mint_or_burn(&mut self, call: &CallContext, oven: &OvenKey, quantity: i128) -> CtezResult<()> {
        reject_tez(call)?;
        let target = self.state.context.target;
        self.state
            .ovens
            .mint_or_burn(call, oven, quantity, target, &mut self.events)?;
        let engine = self.engine();
        self.ctez.mint_or_burn(&engine, &oven.owner, quantity)
    }

    fn liquidate_oven(&mut self, call: &CallContext, oven: &OvenKey, quantity: u64, to: &Address) -> CtezResult<()> {
        reject_tez(call)?;
        let target = self.state.context.target;
        let liquidation = self
            .state
            .ovens
            .liquidate(call, oven, quantity, to, target, &mut self.events)?;
        let engine = self.engine();
        self.ctez
            .mint_or_burn(&engine, &call.sender, -(liquidation.debt_burned as i128))?;
        self.tez.transfer(&engine, to, liquidation.collateral_seized)
    }

    fn set_delegate(&mut self, call: &CallContext, oven: &OvenKey, delegate: Option<Address>) -> CtezResult<()> {
        reject_tez(call)?;
        self.state.ovens.set_delegate(call, oven, delegate, &mut self.events)
    }

    fn set_depositors(&mut self, call: &CallContext, oven: &OvenKey, depositors: Depositors) -> CtezResult<()> {
        reject_tez(call)?;
        self.state
            .ovens
            .set_depositors(call, oven, depositors, &mut self.events)
    }

    // ============ Liquidity Entrypoints ============

    fn add_tez_liquidity(&mut self, call: &CallContext, min_liquidity_minted: u64, deadline: u64) -> CtezResult<()> {
        let request = AddLiquidity {
            amount: call.amount,
            min_liquidity_minted,
            deadline,
        };
        self.state
            .sell_tez
            .add_liquidity(call, &request, &mut self.events)
            .map(|_| ())
    }

    fn add_ctez_liquidity(
        &mut self,
        call: &CallContext,
        amount: u64,
        min_liquidity_minted: u64,
        deadline: u64,
    ) -> CtezResult<()> {
        reject_tez(call)?;
        let request = AddLiquidity {
            amount,
            min_liquidity_minted,
            deadline,
        };
        self.state
            .sell_ctez
            .add_liquidity(call, &request, &mut self.events)?;
        let engine = self.engine();
        self.ctez.transfer(&engine, &call.sender, &engine, amount)
    }

    fn remove_liquidity(&mut self, call: &CallContext, side: DexSide, request: &RemoveLiquidity) -> CtezResult<()> {
        reject_tez(call)?;
        let removal = self
            .state
            .dex_mut(side)
            .remove_liquidity(call, request, &mut self.events)?;
        self.pay_pool_asset(side, &request.to, safe_add(removal.self_paid, removal.proceeds_paid)?)?;
        self.pay_ctez(&request.to, removal.subsidy_paid)
    }

    fn collect(&mut self, call: &CallContext, side: DexSide, to: &Address) -> CtezResult<()> {
        reject_tez(call)?;
        let collection = self.state.dex_mut(side).collect(call, to, &mut self.events)?;
        self.pay_pool_asset(side, to, collection.proceeds_paid)?;
        self.pay_ctez(to, collection.subsidy_paid)
    }

    // ============ Swap Entrypoints ============

    fn tez_to_ctez(&mut self, call: &CallContext, min_ctez_bought: u64, to: &Address, deadline: u64) -> CtezResult<()> {
        let request = SwapRequest {
            sent: call.amount,
            min_received: min_ctez_bought,
            to: *to,
            deadline,
        };
        let quote = self.state.swap_engine().swap(
            SwapDirection::TezToCtez,
            &mut self.state.sell_tez,
            &mut self.state.sell_ctez,
            call,
            &request,
            &mut self.events,
        )?;
        self.pay_ctez(to, quote.bought)
    }

    fn ctez_to_tez(
        &mut self,
        call: &CallContext,
        ctez_sold: u64,
        min_tez_bought: u64,
        to: &Address,
        deadline: u64,
    ) -> CtezResult<()> {
        reject_tez(call)?;
        let request = SwapRequest {
            sent: ctez_sold,
            min_received: min_tez_bought,
            to: *to,
            deadline,
        };
        let quote = self.state.swap_engine().swap(
            SwapDirection::CtezToTez,
            &mut self.state.sell_tez,
            &mut self.state.sell_ctez,
            call,
            &request,
            &mut self.events,
        )?;
        let engine = self.engine();
        self.ctez.transfer(&engine, &call.sender, &engine, ctez_sold)?;
        self.tez.transfer(&engine, to, quote.bought)
    }

    // ============ Payouts ============

    /// Pay in the asset `side` sells (tez for `sell_tez`, ctez for `sell_ctez`)
    fn pay_pool_asset(&mut self, side: DexSide, to: &Address, amount: u64) -> CtezResult<()> {
        match side {
            DexSide::SellTez => {
                let engine = self.engine();
                self.tez.transfer(&engine, to, amount)
            }
            DexSide::SellCtez => self.pay_ctez(to, amount),
        }
    }

    fn pay_ctez(&mut self, to: &Address, amount: u64) -> CtezResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let engine = self.engine();
        self.ctez.transfer(&engine, &engine, to, amount)
    }
}

/// Fail with `TezInTransactionDisallowed` when tez is attached
fn reject_tez(call: &CallContext) -> CtezResult<()> {
    if call.amount > 0 {
        return Err(CtezError::TezInTransactionDisallowed { amount: call.amount });
    }
    Ok(())
}
