//! Error Types for the CDP Strategy
//!
//! Typed errors with stable codes. Collaborator failures are fatal for the
//! invocation that hit them; configuration errors are rejected before any
//! state is touched. Running short of liquidity is not an error at all: it
//! surfaces as a non-zero `loss` in a liquidation outcome.

use crate::String;

/// Result type alias for strategy operations
pub type StrategyResult<T> = Result<T, StrategyError>;

/// External collaborators the engine calls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    /// Price oracle
    Oracle,
    /// Lending facility holding the position
    LendingFacility,
    /// Yield-bearing reserve holding the borrowed asset
    YieldReserve,
    /// Swap venue
    SwapVenue,
    /// Network fee / clock source
    Network,
}

impl Collaborator {
    /// Short lowercase name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::LendingFacility => "lending_facility",
            Self::YieldReserve => "yield_reserve",
            Self::SwapVenue => "swap_venue",
            Self::Network => "network",
        }
    }
}

impl core::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed (reverted) collaborator call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct Revert {
    /// Reason reported by the collaborator
    pub reason: String,
}

impl Revert {
    /// Create a revert with the given reason
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Main error enum for all strategy errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    // ============ Price Errors ============
    /// Oracle returned zero or a price that makes ratio math undefined
    #[error("invalid price: {price}")]
    InvalidPrice { price: u128 },

    // ============ Collaborator Errors ============
    /// A mutating or reading collaborator call failed
    #[error("{collaborator} reverted during {operation}: {reason}")]
    CollaboratorReverted {
        collaborator: Collaborator,
        operation: &'static str,
        reason: String,
    },

    /// Network base fee could not be read
    #[error("network base fee unavailable")]
    BaseFeeUnavailable,

    // ============ Configuration Errors ============
    /// Parameter change would break a configuration invariant
    #[error("configuration rejected: {param}: {reason}")]
    ConfigurationRejected {
        param: &'static str,
        reason: &'static str,
    },

    // ============ Invocation Errors ============
    /// A top-level call was made while another one is in progress
    #[error("reentrant call rejected")]
    Reentrancy,

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,
}

impl StrategyError {
    /// Wrap a collaborator revert
    pub fn reverted(collaborator: Collaborator, operation: &'static str, revert: Revert) -> Self {
        Self::CollaboratorReverted {
            collaborator,
            operation,
            reason: revert.reason,
        }
    }

    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPrice { .. } => "E001_INVALID_PRICE",
            Self::CollaboratorReverted { .. } => "E010_COLLABORATOR_REVERTED",
            Self::BaseFeeUnavailable => "E011_BASE_FEE_UNAVAILABLE",
            Self::ConfigurationRejected { .. } => "E020_CONFIG_REJECTED",
            Self::Reentrancy => "E030_REENTRANCY",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
        }
    }

    /// Returns true if the condition clears on its own or via a retry by the
    /// scheduler on its next cycle
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidPrice { .. } | Self::BaseFeeUnavailable | Self::Reentrancy
        )
    }
}

/// Map a collaborator `Result` into a `StrategyResult`
pub trait RevertExt<T> {
    /// Attach the collaborator and operation to a revert
    fn or_revert(self, collaborator: Collaborator, operation: &'static str) -> StrategyResult<T>;
}

impl<T> RevertExt<T> for Result<T, Revert> {
    fn or_revert(self, collaborator: Collaborator, operation: &'static str) -> StrategyResult<T> {
        self.map_err(|revert| StrategyError::reverted(collaborator, operation, revert))
    }
}
