//! Core Types for the CDP Strategy
//!
//! Data structures shared between the engine and its callers: the engine's
//! own ledger, the per-invocation market snapshot, position readings and the
//! results handed back to the pool framework.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Type alias for owner identifiers (32-byte hash)
pub type Address = [u8; 32];

/// Token amount, 18 decimals
pub type Amount = u128;

/// 1e18-scaled ratio, price or rate
pub type Wad = u128;

/// Assets the engine moves through the swap venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Asset {
    /// Collateral asset the pool is denominated in
    Base,
    /// Asset borrowed against the collateral
    Investment,
}

// ============ Ledger ============

/// Funds held directly by the engine, outside the position and the reserve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct IdleBalances {
    /// Idle base asset
    pub base: Amount,
    /// Idle investment asset
    pub investment: Amount,
}

impl IdleBalances {
    /// Create a ledger with the given balances
    pub fn new(base: Amount, investment: Amount) -> Self {
        Self { base, investment }
    }
}

// ============ Market Snapshot ============

/// Market readings captured once at the start of a top-level invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MarketSnapshot {
    /// Investment units per base unit (1e18 scale)
    pub price: Wad,
    /// Whether `price` came from a fresh oracle refresh rather than the
    /// cached last good price
    pub price_is_fresh: bool,
    /// Facility borrowing rate (1e18 scale)
    pub borrow_rate: Wad,
    /// Network base fee in wei
    pub base_fee: u128,
    /// Whether `base_fee` is the conservative fallback
    pub base_fee_is_fallback: bool,
    /// Network timestamp (seconds), used as the swap deadline
    pub timestamp: u64,
}

impl MarketSnapshot {
    /// Discretionary actions need a fresh price
    pub fn allows_discretionary(&self) -> bool {
        self.price_is_fresh
    }
}

// ============ Position ============

/// Read-only snapshot of the position and the engine's holdings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PositionState {
    /// Base asset locked in the facility
    pub collateral: Amount,
    /// Investment asset owed to the facility
    pub debt: Amount,
    /// Idle base asset
    pub idle_base: Amount,
    /// Idle investment asset
    pub idle_investment: Amount,
    /// Investment value parked in the reserve
    pub parked_value: Amount,
    /// Reserve shares owned by the engine
    pub reserve_shares: Amount,
    /// Collateralization ratio at the snapshot price
    pub ratio: Wad,
}

impl PositionState {
    /// Investment asset available for repayment (idle plus parked)
    pub fn available_investment(&self) -> Amount {
        self.idle_investment.saturating_add(self.parked_value)
    }
}

// ============ Results ============

/// What a rebalance did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum RebalanceAction {
    /// Ratio inside the band, or a gate vetoed the mint side
    None,
    /// Debt was repaid
    Repaid {
        /// Amount repaid
        amount: Amount,
        /// Debt after the repayment
        new_debt: Amount,
    },
    /// More debt was minted
    Minted {
        /// Amount borrowed
        amount: Amount,
        /// Debt after the mint
        new_debt: Amount,
    },
}

impl RebalanceAction {
    /// True if the rebalance changed the position
    pub fn is_action(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Result of freeing base asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LiquidationOutcome {
    /// Base asset made available, never above the request
    pub freed: Amount,
    /// Part of the request that could not be produced
    pub loss: Amount,
}

impl LiquidationOutcome {
    /// Split a request into what the idle balance covers and what it doesn't
    pub fn settle(amount_needed: Amount, idle_base: Amount) -> Self {
        let freed = amount_needed.min(idle_base);
        Self {
            freed,
            loss: amount_needed - freed,
        }
    }
}

/// Result of realizing reserve surplus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct HarvestOutcome {
    /// Investment asset withdrawn from the reserve
    pub withdrawn: Amount,
    /// Base asset received from the swap
    pub base_received: Amount,
}

/// Profit/loss report for the pool framework
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Report {
    /// Gain since the last report, in base asset
    pub profit: Amount,
    /// Loss since the last report, in base asset
    pub loss: Amount,
    /// Base asset returned against the pool's outstanding debt
    pub debt_payment: Amount,
}

/// Holdings passed to a successor engine on migration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MigrationHandoff {
    /// Idle base asset swept along with the migration
    pub base: Amount,
    /// Idle investment asset
    pub investment: Amount,
    /// Reserve shares
    pub reserve_shares: Amount,
}
