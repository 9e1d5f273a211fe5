//! Strategy Events
//!
//! Every change the engine makes to the position is recorded as an event.
//! Events are collected in an [`EventLog`] during an invocation and can be
//! serialized for indexing off-chain.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Amount, Wad};
use crate::Vec;

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Position Events (0x01 - 0x1F)
    PositionOpened = 0x01,
    CollateralAdded = 0x02,
    CollateralWithdrawn = 0x03,
    DebtMinted = 0x04,
    DebtRepaid = 0x05,
    PositionClosed = 0x06,

    // Reserve Events (0x20 - 0x3F)
    ReserveDeposit = 0x20,
    ReserveWithdrawal = 0x21,
    YieldHarvested = 0x22,

    // Liquidation Events (0x40 - 0x5F)
    CollateralSold = 0x40,
    Liquidated = 0x41,

    // Pool Events (0x60 - 0x7F)
    Reported = 0x60,
    Migrated = 0x61,
}

/// Main event enum containing all strategy events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum StrategyEvent {
    // ============ Position Events ============

    /// Emitted when the position is opened
    PositionOpened {
        collateral: Amount,
        debt: Amount,
        ratio: Wad,
        timestamp: u64,
    },

    /// Emitted when collateral is added to an open position
    CollateralAdded {
        amount: Amount,
        new_collateral: Amount,
        timestamp: u64,
    },

    /// Emitted when collateral is pulled out of the position
    CollateralWithdrawn {
        amount: Amount,
        new_collateral: Amount,
        timestamp: u64,
    },

    /// Emitted when more debt is borrowed
    DebtMinted {
        amount: Amount,
        new_debt: Amount,
        ratio_before: Wad,
        timestamp: u64,
    },

    /// Emitted when debt is repaid
    DebtRepaid {
        amount: Amount,
        new_debt: Amount,
        ratio_before: Wad,
        timestamp: u64,
    },

    /// Emitted when debt and collateral both reach zero
    PositionClosed {
        collateral_returned: Amount,
        timestamp: u64,
    },

    // ============ Reserve Events ============

    /// Emitted when borrowed funds are parked in the reserve
    ReserveDeposit {
        amount: Amount,
        timestamp: u64,
    },

    /// Emitted when shares are redeemed from the reserve
    ReserveWithdrawal {
        shares: Amount,
        received: Amount,
        timestamp: u64,
    },

    /// Emitted when reserve surplus is realized as base asset
    YieldHarvested {
        investment_sold: Amount,
        base_received: Amount,
        timestamp: u64,
    },

    // ============ Liquidation Events ============

    /// Emitted when collateral is sold to repay debt
    CollateralSold {
        base_sold: Amount,
        investment_received: Amount,
        timestamp: u64,
    },

    /// Emitted at the end of every liquidation request
    Liquidated {
        requested: Amount,
        freed: Amount,
        loss: Amount,
        timestamp: u64,
    },

    // ============ Pool Events ============

    /// Emitted when a profit/loss report is produced
    Reported {
        profit: Amount,
        loss: Amount,
        debt_payment: Amount,
        timestamp: u64,
    },

    /// Emitted when holdings are handed to a successor engine
    Migrated {
        base: Amount,
        investment: Amount,
        reserve_shares: Amount,
        timestamp: u64,
    },
}

impl StrategyEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PositionOpened { .. } => EventType::PositionOpened,
            Self::CollateralAdded { .. } => EventType::CollateralAdded,
            Self::CollateralWithdrawn { .. } => EventType::CollateralWithdrawn,
            Self::DebtMinted { .. } => EventType::DebtMinted,
            Self::DebtRepaid { .. } => EventType::DebtRepaid,
            Self::PositionClosed { .. } => EventType::PositionClosed,
            Self::ReserveDeposit { .. } => EventType::ReserveDeposit,
            Self::ReserveWithdrawal { .. } => EventType::ReserveWithdrawal,
            Self::YieldHarvested { .. } => EventType::YieldHarvested,
            Self::CollateralSold { .. } => EventType::CollateralSold,
            Self::Liquidated { .. } => EventType::Liquidated,
            Self::Reported { .. } => EventType::Reported,
            Self::Migrated { .. } => EventType::Migrated,
        }
    }

    /// Get the network timestamp when the event occurred
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::PositionOpened { timestamp, .. }
            | Self::CollateralAdded { timestamp, .. }
            | Self::CollateralWithdrawn { timestamp, .. }
            | Self::DebtMinted { timestamp, .. }
            | Self::DebtRepaid { timestamp, .. }
            | Self::PositionClosed { timestamp, .. }
            | Self::ReserveDeposit { timestamp, .. }
            | Self::ReserveWithdrawal { timestamp, .. }
            | Self::YieldHarvested { timestamp, .. }
            | Self::CollateralSold { timestamp, .. }
            | Self::Liquidated { timestamp, .. }
            | Self::Reported { timestamp, .. }
            | Self::Migrated { timestamp, .. } => *timestamp,
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
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<StrategyEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: StrategyEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[StrategyEvent] {
        &self.events
    }

    /// Take ownership of all events, leaving the log empty
    pub fn drain(&mut self) -> Vec<StrategyEvent> {
        core::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&StrategyEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
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

    /// Drop events recorded after `len`, used to discard an aborted invocation
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }
}
