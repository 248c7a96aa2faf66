//! Protocol Events for ctez
//!
//! Events are appended to an [`EventLog`] while entrypoints execute. They
//! are the protocol's structured log: each one records what changed and the
//! ledger timestamp it changed at. A batch that fails discards its events
//! together with its state changes.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use crate::types::{Address, DexSide, Depositors, OvenKey, SwapDirection};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Oven Events (0x01 - 0x1F)
    OvenCreated = 0x01,
    Deposited = 0x02,
    Withdrawn = 0x03,
    MintedOrBurned = 0x04,
    OvenLiquidated = 0x05,
    DelegateSet = 0x06,
    DepositorsSet = 0x07,

    // Half-dex Events (0x20 - 0x3F)
    LiquidityAdded = 0x20,
    LiquidityRemoved = 0x21,
    Collected = 0x22,
    Swapped = 0x23,

    // Oracle Events (0x60 - 0x7F)
    DriftAdvanced = 0x60,
    SubsidyAccrued = 0x61,
}

/// Main event enum containing all possible protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum CtezEvent {
    // ============ Oven Events ============

    /// Emitted when a new oven is registered
    OvenCreated {
        oven: OvenKey,
        delegate: Option<Address>,
        depositors: Depositors,
        collateral: u64,
        timestamp: u64,
    },

    /// Emitted when tez is locked into an oven
    Deposited {
        oven: OvenKey,
        depositor: Address,
        amount: u64,
        new_collateral: u64,
        timestamp: u64,
    },

    /// Emitted when the owner takes collateral out
    Withdrawn {
        oven: OvenKey,
        to: Address,
        amount: u64,
        new_collateral: u64,
        timestamp: u64,
    },

    /// Emitted on a mint (positive quantity) or burn (negative quantity)
    MintedOrBurned {
        oven: OvenKey,
        quantity: i128,
        new_debt: u64,
        timestamp: u64,
    },

    /// Emitted when a liquidator burns debt and seizes collateral
    OvenLiquidated {
        oven: OvenKey,
        liquidator: Address,
        to: Address,
        debt_burned: u64,
        collateral_seized: u64,
        timestamp: u64,
    },

    /// Emitted when an oven's baker delegate changes
    DelegateSet {
        oven: OvenKey,
        delegate: Option<Address>,
        timestamp: u64,
    },

    /// Emitted when an oven's depositor policy changes
    DepositorsSet {
        oven: OvenKey,
        depositors: Depositors,
        timestamp: u64,
    },

    // ============ Half-dex Events ============

    /// Emitted when an LP deposits into a half-dex
    LiquidityAdded {
        side: DexSide,
        owner: Address,
        deposited: u64,
        shares_minted: u64,
        timestamp: u64,
    },

    /// Emitted when an LP burns shares
    LiquidityRemoved {
        side: DexSide,
        owner: Address,
        to: Address,
        shares_burned: u64,
        self_paid: u64,
        proceeds_paid: u64,
        subsidy_paid: u64,
        timestamp: u64,
    },

    /// Emitted when an LP collects owed proceeds and subsidy
    Collected {
        side: DexSide,
        owner: Address,
        to: Address,
        proceeds_paid: u64,
        subsidy_paid: u64,
        timestamp: u64,
    },

    /// Emitted on a tez/ctez swap
    Swapped {
        direction: SwapDirection,
        sender: Address,
        to: Address,
        sent: u64,
        bought: u64,
        fee: u64,
        timestamp: u64,
    },

    // ============ Oracle Events ============

    /// Emitted when a time step moves target and drift
    DriftAdvanced {
        old_target: u128,
        new_target: u128,
        old_drift: i128,
        new_drift: i128,
        observed_price: u128,
        elapsed: u64,
        timestamp: u64,
    },

    /// Emitted when a pool is credited freshly minted subsidy
    SubsidyAccrued {
        side: DexSide,
        amount: u64,
        timestamp: u64,
    },
}

impl CtezEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::OvenCreated { .. } => EventType::OvenCreated,
            Self::Deposited { .. } => EventType::Deposited,
            Self::Withdrawn { .. } => EventType::Withdrawn,
            Self::MintedOrBurned { .. } => EventType::MintedOrBurned,
            Self::OvenLiquidated { .. } => EventType::OvenLiquidated,
            Self::DelegateSet { .. } => EventType::DelegateSet,
            Self::DepositorsSet { .. } => EventType::DepositorsSet,
            Self::LiquidityAdded { .. } => EventType::LiquidityAdded,
            Self::LiquidityRemoved { .. } => EventType::LiquidityRemoved,
            Self::Collected { .. } => EventType::Collected,
            Self::Swapped { .. } => EventType::Swapped,
            Self::DriftAdvanced { .. } => EventType::DriftAdvanced,
            Self::SubsidyAccrued { .. } => EventType::SubsidyAccrued,
        }
    }

    /// Get the ledger time the event occurred at
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::OvenCreated { timestamp, .. }
            | Self::Deposited { timestamp, .. }
            | Self::Withdrawn { timestamp, .. }
            | Self::MintedOrBurned { timestamp, .. }
            | Self::OvenLiquidated { timestamp, .. }
            | Self::DelegateSet { timestamp, .. }
            | Self::DepositorsSet { timestamp, .. }
            | Self::LiquidityAdded { timestamp, .. }
            | Self::LiquidityRemoved { timestamp, .. }
            | Self::Collected { timestamp, .. }
            | Self::Swapped { timestamp, .. }
            | Self::DriftAdvanced { timestamp, .. }
            | Self::SubsidyAccrued { timestamp, .. } => *timestamp,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<CtezEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: CtezEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[CtezEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<CtezEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&CtezEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Most recent event, if any
    pub fn last(&self) -> Option<&CtezEvent> {
        self.events.last()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oven() -> OvenKey {
        OvenKey::new(7, [2u8; 32])
    }

    #[test]
    fn test_event_type() {
        let event = CtezEvent::Deposited {
            oven: oven(),
            depositor: [2u8; 32],
            amount: 5_000_000,
            new_collateral: 5_000_000,
            timestamp: 100,
        };

        assert_eq!(event.event_type(), EventType::Deposited);
        assert_eq!(event.timestamp(), 100);
    }

    #[test]
    fn test_event_serialization() {
        let event = CtezEvent::MintedOrBurned {
            oven: oven(),
            quantity: -1_500,
            new_debt: 8_500,
            timestamp: 200,
        };

        let bytes = event.to_bytes();
        let restored = CtezEvent::from_bytes(&bytes).unwrap();

        assert_eq!(event, restored);
        assert!(CtezEvent::from_bytes(&[0xFF]).is_none());
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.emit(CtezEvent::OvenCreated {
            oven: oven(),
            delegate: None,
            depositors: Depositors::Any,
            collateral: 0,
            timestamp: 100,
        });

        log.emit(CtezEvent::SubsidyAccrued {
            side: DexSide::SellCtez,
            amount: 42,
            timestamp: 100,
        });

        assert_eq!(log.len(), 2);
        assert!(log.has_events());
        assert_eq!(log.filter_by_type(EventType::OvenCreated).len(), 1);
        assert_eq!(log.last().map(|e| e.event_type()), Some(EventType::SubsidyAccrued));

        log.clear();
        assert!(!log.has_events());
    }
}
