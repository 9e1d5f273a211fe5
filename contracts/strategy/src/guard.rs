//! Reentrancy Guard
//!
//! One top-level operation at a time. A collaborator that calls back into
//! the engine while an operation is running gets `Reentrancy` instead of a
//! half-updated ledger.

use cdp_strategy_common::errors::{StrategyError, StrategyResult};

/// Tracks whether a top-level operation is in progress
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: bool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Mark an operation as started
    pub fn enter(&mut self) -> StrategyResult<()> {
        if self.entered {
            return Err(StrategyError::Reentrancy);
        }
        self.entered = true;
        Ok(())
    }

    /// Mark the operation as finished
    pub fn exit(&mut self) {
        self.entered = false;
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }
}
