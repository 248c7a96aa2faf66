//! Oven Manager - Collateralized Positions for ctez
//!
//! Each oven locks tez and carries ctez debt minted against it. Ovens are
//! keyed by a caller-chosen id plus the owner's address and are never
//! deleted: an emptied oven stays addressable as a zero-balance record.
//!
//! ## Core Operations
//!
//! - **create**: register an oven, optionally funded by the attached tez
//! - **deposit**: lock more tez (owner or an allowed depositor)
//! - **withdraw**: take tez out while staying above the minimum ratio
//! - **mint_or_burn**: grow or shrink the debt
//! - **liquidate**: anyone burns debt of an undercollateralized oven and
//!   seizes collateral at a premium
//! - **set_delegate** / **set_depositors**: owner housekeeping
//!
//! Every operation checks everything first and only then writes, so a
//! failure leaves the registry untouched. Token and tez movements are
//! carried out by the caller of the registry.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod collateral;

use ctez_common::{
    errors::{CtezError, CtezResult},
    events::{CtezEvent, EventLog},
    math::{safe_add, safe_sub, to_u64},
    types::{Address, CallContext, Depositors, OvenId, OvenKey},
    BTreeMap, Vec,
};

pub use collateral::{
    is_undercollateralized, max_liquidatable, require_collateralized, seized_collateral,
};

// ============ Oven ============

/// A single collateral/debt position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Oven {
    /// Registry key (id + owner)
    pub key: OvenKey,
    /// Baker the locked tez is delegated to
    pub delegate: Option<Address>,
    /// Who besides the owner may deposit
    pub depositors: Depositors,
    /// Locked tez (mutez)
    pub collateral: u64,
    /// Outstanding ctez debt
    pub debt: u64,
}

impl Oven {
    /// Fresh oven with no debt
    pub fn new(key: OvenKey, delegate: Option<Address>, depositors: Depositors, collateral: u64) -> Self {
        Self {
            key,
            delegate,
            depositors,
            collateral,
            debt: 0,
        }
    }

    /// Owner's address
    pub fn owner(&self) -> &Address {
        &self.key.owner
    }

    /// Whether the oven is below the minimum ratio at `target`
    pub fn is_undercollateralized(&self, target: u128) -> CtezResult<bool> {
        is_undercollateralized(self.collateral, self.debt, target)
    }

    fn require_owner(&self, caller: &Address) -> CtezResult<()> {
        if self.key.owner != *caller {
            return Err(CtezError::NotOwner {
                expected: self.key.owner,
                actual: *caller,
            });
        }
        Ok(())
    }
}

// ============ Registry ============

/// Result of a liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liquidation {
    /// Debt burned from the oven
    pub debt_burned: u64,
    /// Collateral paid to the liquidator's target
    pub collateral_seized: u64,
}

/// All ovens plus protocol-wide rollups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OvenRegistry {
    ovens: BTreeMap<OvenKey, Oven>,
    /// Sum of collateral across ovens
    pub total_collateral: u64,
    /// Sum of debt across ovens (ctez outstanding from ovens)
    pub total_debt: u64,
}

impl OvenRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an oven
    pub fn get(&self, key: &OvenKey) -> Option<&Oven> {
        self.ovens.get(key)
    }

    /// All ovens owned by `owner`, ordered by id
    pub fn ovens_of(&self, owner: &Address) -> Vec<&Oven> {
        self.ovens
            .values()
            .filter(|oven| oven.key.owner == *owner)
            .collect()
    }

    /// Number of registered ovens
    pub fn len(&self) -> usize {
        self.ovens.len()
    }

    /// Whether no oven was ever created
    pub fn is_empty(&self) -> bool {
        self.ovens.is_empty()
    }

    fn oven(&self, key: &OvenKey) -> CtezResult<&Oven> {
        self.ovens.get(key).ok_or(CtezError::OvenNotFound { oven: *key })
    }

    fn oven_mut(&mut self, key: &OvenKey) -> CtezResult<&mut Oven> {
        self.ovens.get_mut(key).ok_or(CtezError::OvenNotFound { oven: *key })
    }

    /// Register a new oven owned by the caller, funded with the attached tez
    pub fn create(
        &mut self,
        call: &CallContext,
        id: OvenId,
        delegate: Option<Address>,
        depositors: Depositors,
        events: &mut EventLog,
    ) -> CtezResult<OvenKey> {
        let key = OvenKey::new(id, call.sender);

        // 1. Id must be free for this owner
        if self.ovens.contains_key(&key) {
            return Err(CtezError::OvenAlreadyExists { oven: key });
        }

        // 2. Rollup
        let total_collateral = safe_add(self.total_collateral, call.amount)?;

        // 3. Apply
        self.ovens
            .insert(key, Oven::new(key, delegate, depositors.clone(), call.amount));
        self.total_collateral = total_collateral;

        events.emit(CtezEvent::OvenCreated {
            oven: key,
            delegate,
            depositors,
            collateral: call.amount,
            timestamp: call.now,
        });

        Ok(key)
    }

    /// Lock the attached tez into an oven
    pub fn deposit(&mut self, call: &CallContext, key: &OvenKey, events: &mut EventLog) -> CtezResult<u64> {
        // 1. Oven must exist and accept the depositor
        let oven = self.oven(key)?;
        if !oven.depositors.allows(&oven.key.owner, &call.sender) {
            return Err(CtezError::DepositorNotAllowed {
                oven: *key,
                depositor: call.sender,
            });
        }

        // 2. Zero deposit changes nothing
        if call.amount == 0 {
            return Ok(oven.collateral);
        }

        // 3. Compute
        let new_collateral = safe_add(oven.collateral, call.amount)?;
        let total_collateral = safe_add(self.total_collateral, call.amount)?;

        // 4. Apply
        self.oven_mut(key)?.collateral = new_collateral;
        self.total_collateral = total_collateral;

        events.emit(CtezEvent::Deposited {
            oven: *key,
            depositor: call.sender,
            amount: call.amount,
            new_collateral,
            timestamp: call.now,
        });

        Ok(new_collateral)
    }

    /// Release `amount` of collateral; the caller pays it out to `to`
    pub fn withdraw(
        &mut self,
        call: &CallContext,
        key: &OvenKey,
        amount: u64,
        to: &Address,
        target: u128,
        events: &mut EventLog,
    ) -> CtezResult<u64> {
        // 1. Only the owner withdraws
        let oven = self.oven(key)?;
        oven.require_owner(&call.sender)?;

        // 2. Cannot take more than is locked
        if amount > oven.collateral {
            return Err(CtezError::InsufficientCollateral {
                available: oven.collateral,
                requested: amount,
            });
        }

        // 3. Remaining collateral must still cover the debt
        let new_collateral = oven.collateral - amount;
        require_collateralized(new_collateral, oven.debt, target)?;
        let total_collateral = safe_sub(self.total_collateral, amount)?;

        // 4. Apply
        self.oven_mut(key)?.collateral = new_collateral;
        self.total_collateral = total_collateral;

        events.emit(CtezEvent::Withdrawn {
            oven: *key,
            to: *to,
            amount,
            new_collateral,
            timestamp: call.now,
        });

        Ok(new_collateral)
    }

    /// Mint (positive `quantity`) or burn (negative) debt; returns the new debt
    pub fn mint_or_burn(
        &mut self,
        call: &CallContext,
        key: &OvenKey,
        quantity: i128,
        target: u128,
        events: &mut EventLog,
    ) -> CtezResult<u64> {
        // 1. Only the owner changes debt
        let oven = self.oven(key)?;
        oven.require_owner(&call.sender)?;

        // 2. Compute the new debt
        let amount = to_u64(quantity.unsigned_abs())?;
        let (new_debt, total_debt) = if quantity >= 0 {
            let new_debt = safe_add(oven.debt, amount)?;
            // Minting must keep the oven above the minimum ratio
            require_collateralized(oven.collateral, new_debt, target)?;
            (new_debt, safe_add(self.total_debt, amount)?)
        } else {
            if amount > oven.debt {
                return Err(CtezError::ExcessiveBurn {
                    debt: oven.debt,
                    requested: amount,
                });
            }
            (oven.debt - amount, safe_sub(self.total_debt, amount)?)
        };

        // 3. Apply
        self.oven_mut(key)?.debt = new_debt;
        self.total_debt = total_debt;

        events.emit(CtezEvent::MintedOrBurned {
            oven: *key,
            quantity,
            new_debt,
            timestamp: call.now,
        });

        Ok(new_debt)
    }

    /// Burn `quantity` debt of an undercollateralized oven and seize collateral
    ///
    /// The caller of the registry burns the liquidator's ctez and pays the
    /// seized tez to `to`.
    pub fn liquidate(
        &mut self,
        call: &CallContext,
        key: &OvenKey,
        quantity: u64,
        to: &Address,
        target: u128,
        events: &mut EventLog,
    ) -> CtezResult<Liquidation> {
        // 1. Only underwater ovens can be liquidated
        let oven = self.oven(key)?;
        if !oven.is_undercollateralized(target)? {
            return Err(CtezError::NotUndercollateralized { oven: *key });
        }

        // 2. Cap the per-call burn
        let maximum = max_liquidatable(oven.collateral, oven.debt, target)?;
        if quantity > maximum {
            return Err(CtezError::ExcessiveLiquidation {
                requested: quantity,
                maximum,
            });
        }

        // 3. Compute seizure (bounded by collateral through the cap)
        let seized = seized_collateral(quantity, target)?;
        let new_collateral = safe_sub(oven.collateral, seized)?;
        let new_debt = safe_sub(oven.debt, quantity)?;
        let total_collateral = safe_sub(self.total_collateral, seized)?;
        let total_debt = safe_sub(self.total_debt, quantity)?;

        // 4. Apply
        let oven = self.oven_mut(key)?;
        oven.collateral = new_collateral;
        oven.debt = new_debt;
        self.total_collateral = total_collateral;
        self.total_debt = total_debt;

        events.emit(CtezEvent::OvenLiquidated {
            oven: *key,
            liquidator: call.sender,
            to: *to,
            debt_burned: quantity,
            collateral_seized: seized,
            timestamp: call.now,
        });

        Ok(Liquidation {
            debt_burned: quantity,
            collateral_seized: seized,
        })
    }

    /// Change the baker the oven's tez is delegated to
    pub fn set_delegate(
        &mut self,
        call: &CallContext,
        key: &OvenKey,
        delegate: Option<Address>,
        events: &mut EventLog,
    ) -> CtezResult<()> {
        self.oven(key)?.require_owner(&call.sender)?;
        self.oven_mut(key)?.delegate = delegate;

        events.emit(CtezEvent::DelegateSet {
            oven: *key,
            delegate,
            timestamp: call.now,
        });
        Ok(())
    }

    /// Replace the oven's depositor policy
    pub fn set_depositors(
        &mut self,
        call: &CallContext,
        key: &OvenKey,
        depositors: Depositors,
        events: &mut EventLog,
    ) -> CtezResult<()> {
        self.oven(key)?.require_owner(&call.sender)?;
        self.oven_mut(key)?.depositors = depositors.clone();

        events.emit(CtezEvent::DepositorsSet {
            oven: *key,
            depositors,
            timestamp: call.now,
        });
        Ok(())
    }
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;
    use ctez_common::constants::precision::PRICE_PRECISION;
    use ctez_common::events::EventType;
    use ctez_common::BTreeSet;

    const OWNER: Address = [1u8; 32];
    const FRIEND: Address = [2u8; 32];
    const STRANGER: Address = [3u8; 32];
    const PAR: u128 = PRICE_PRECISION;

    fn registry_with_oven(collateral: u64, debt: u64) -> (OvenRegistry, OvenKey, EventLog) {
        let mut registry = OvenRegistry::new();
        let mut events = EventLog::new();
        let call = CallContext::new(OWNER, 10).with_amount(collateral);
        let key = registry
            .create(&call, 1, None, Depositors::Nobody, &mut events)
            .unwrap();
        if debt > 0 {
            registry
                .mint_or_burn(&CallContext::new(OWNER, 10), &key, debt as i128, PAR, &mut events)
                .unwrap();
        }
        (registry, key, events)
    }

    #[test]
    fn test_create_oven() {
        let (registry, key, events) = registry_with_oven(5_000, 0);
        let oven = registry.get(&key).unwrap();
        assert_eq!(oven.collateral, 5_000);
        assert_eq!(oven.debt, 0);
        assert_eq!(oven.owner(), &OWNER);
        assert_eq!(registry.total_collateral, 5_000);
        assert_eq!(events.filter_by_type(EventType::OvenCreated).len(), 1);
    }

    #[test]
    fn test_create_duplicate_fails() {
        let (mut registry, key, mut events) = registry_with_oven(0, 0);
        let before = registry.clone();
        let result = registry.create(&CallContext::new(OWNER, 11), 1, None, Depositors::Any, &mut events);
        assert_eq!(result, Err(CtezError::OvenAlreadyExists { oven: key }));
        assert_eq!(registry, before);

        // Same id under another owner is a different oven
        assert!(registry
            .create(&CallContext::new(FRIEND, 11), 1, None, Depositors::Any, &mut events)
            .is_ok());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ovens_of(&OWNER).len(), 1);
    }

    #[test]
    fn test_deposit_policy() {
        let (mut registry, key, mut events) = registry_with_oven(100, 0);

        let result = registry.deposit(&CallContext::new(STRANGER, 11).with_amount(5), &key, &mut events);
        assert_eq!(result, Err(CtezError::DepositorNotAllowed { oven: key, depositor: STRANGER }));

        let mut allowed = BTreeSet::new();
        allowed.insert(FRIEND);
        registry
            .set_depositors(&CallContext::new(OWNER, 11), &key, Depositors::Whitelist(allowed), &mut events)
            .unwrap();

        assert_eq!(
            registry.deposit(&CallContext::new(FRIEND, 12).with_amount(5), &key, &mut events),
            Ok(105)
        );
        assert_eq!(
            registry.deposit(&CallContext::new(OWNER, 12).with_amount(5), &key, &mut events),
            Ok(110)
        );
        assert_eq!(registry.total_collateral, 110);
    }

    #[test]
    fn test_zero_deposit_is_noop() {
        let (mut registry, key, mut events) = registry_with_oven(100, 0);
        let count = events.len();
        assert_eq!(registry.deposit(&CallContext::new(OWNER, 11), &key, &mut events), Ok(100));
        assert_eq!(events.len(), count);
    }

    #[test]
    fn test_withdraw_to_exact_minimum_ratio() {
        // 20 mutez backing 15 ctez; the minimum is 16
        let (mut registry, key, mut events) = registry_with_oven(20, 15);
        let call = CallContext::new(OWNER, 11);

        let result = registry.withdraw(&call, &key, 5, &OWNER, PAR, &mut events);
        assert_eq!(
            result,
            Err(CtezError::Undercollateralized { collateral: 15, debt: 15, target: PAR })
        );

        assert_eq!(registry.withdraw(&call, &key, 4, &OWNER, PAR, &mut events), Ok(16));
        assert_eq!(registry.total_collateral, 16);
    }

    #[test]
    fn test_withdraw_checks() {
        let (mut registry, key, mut events) = registry_with_oven(100, 0);

        let result = registry.withdraw(&CallContext::new(STRANGER, 11), &key, 1, &STRANGER, PAR, &mut events);
        assert_eq!(result, Err(CtezError::NotOwner { expected: OWNER, actual: STRANGER }));

        let result = registry.withdraw(&CallContext::new(OWNER, 11), &key, 101, &OWNER, PAR, &mut events);
        assert_eq!(result, Err(CtezError::InsufficientCollateral { available: 100, requested: 101 }));

        // Without debt everything can go
        assert_eq!(registry.withdraw(&CallContext::new(OWNER, 11), &key, 100, &OWNER, PAR, &mut events), Ok(0));
        // The emptied oven persists
        assert!(registry.get(&key).is_some());
    }

    #[test]
    fn test_mint_and_burn() {
        let (mut registry, key, mut events) = registry_with_oven(1_600, 0);
        let call = CallContext::new(OWNER, 11);

        assert_eq!(registry.mint_or_burn(&call, &key, 1_500, PAR, &mut events), Ok(1_500));
        assert!(matches!(
            registry.mint_or_burn(&call, &key, 1, PAR, &mut events),
            Err(CtezError::Undercollateralized { .. })
        ));
        assert_eq!(registry.mint_or_burn(&call, &key, -500, PAR, &mut events), Ok(1_000));
        assert_eq!(
            registry.mint_or_burn(&call, &key, -1_001, PAR, &mut events),
            Err(CtezError::ExcessiveBurn { debt: 1_000, requested: 1_001 })
        );
        assert_eq!(registry.total_debt, 1_000);

        let result = registry.mint_or_burn(&CallContext::new(STRANGER, 11), &key, -1, PAR, &mut events);
        assert!(matches!(result, Err(CtezError::NotOwner { .. })));
    }

    #[test]
    fn test_liquidate_healthy_oven_fails() {
        let (mut registry, key, mut events) = registry_with_oven(2_000, 1_000);
        let result = registry.liquidate(&CallContext::new(STRANGER, 11), &key, 1, &STRANGER, PAR, &mut events);
        assert_eq!(result, Err(CtezError::NotUndercollateralized { oven: key }));
    }

    #[test]
    fn test_liquidate_after_target_rises() {
        let (mut registry, key, mut events) = registry_with_oven(1_100, 1_000);
        let target = PAR * 11 / 10;
        let call = CallContext::new(STRANGER, 11);

        let maximum = max_liquidatable(1_100, 1_000, target).unwrap();
        let result = registry.liquidate(&call, &key, maximum + 1, &STRANGER, target, &mut events);
        assert_eq!(result, Err(CtezError::ExcessiveLiquidation { requested: maximum + 1, maximum }));

        let liquidation = registry.liquidate(&call, &key, 100, &STRANGER, target, &mut events).unwrap();
        // 100 ctez at 1.1 tez is 110 mutez, plus 1/31 premium
        assert_eq!(liquidation.collateral_seized, 113);
        let oven = registry.get(&key).unwrap();
        assert_eq!(oven.debt, 900);
        assert_eq!(oven.collateral, 987);
        assert_eq!(registry.total_debt, 900);
        assert_eq!(registry.total_collateral, 987);
    }

    #[test]
    fn test_set_delegate() {
        let (mut registry, key, mut events) = registry_with_oven(0, 0);
        let baker = Some([7u8; 32]);

        let result = registry.set_delegate(&CallContext::new(STRANGER, 11), &key, baker, &mut events);
        assert!(matches!(result, Err(CtezError::NotOwner { .. })));

        registry.set_delegate(&CallContext::new(OWNER, 11), &key, baker, &mut events).unwrap();
        assert_eq!(registry.get(&key).unwrap().delegate, baker);
    }

    #[test]
    fn test_unknown_oven() {
        let mut registry = OvenRegistry::new();
        let mut events = EventLog::new();
        let key = OvenKey::new(9, OWNER);
        let result = registry.deposit(&CallContext::new(OWNER, 1).with_amount(1), &key, &mut events);
        assert_eq!(result, Err(CtezError::OvenNotFound { oven: key }));
    }
}
