//! CDP Strategy Engine
//!
//! Manages one collateralized debt position on behalf of a pooled fund:
//! base asset goes in as collateral, the investment asset is borrowed
//! against it and parked in a yield reserve, and the ratio is kept inside a
//! band around the target.
//!
//! ## Core Operations
//!
//! - **report**: deposit, rebalance, harvest and settle profit/loss
//! - **adjust / tend**: put idle funds to work, rebalance
//! - **free / free_all**: liquidate base asset for pool withdrawals
//! - **migrate**: close out and hand holdings to a successor engine
//! - **tend_trigger / harvest_trigger**: keeper scheduling hints
//!
//! ## Collaborators
//!
//! Oracle, lending facility, yield reserve, swap venue and network are
//! traits in [`interfaces`], injected at construction. The engine keeps its
//! own idle ledger and never reaches past those traits.

mod actions;
pub mod driver;
pub mod guard;
pub mod harvest;
pub mod interfaces;
pub mod limiter;
pub mod liquidation;
pub mod reader;
pub mod rebalancer;

#[cfg(test)]
mod testing;


pub use cdp_strategy_common as common;
pub use driver::{Strategy, StrategyCheckpoint};
pub use interfaces::{
    Collaborators, LendingFacility, Network, Oracle, PoolAccount, PoolStrategy, SwapVenue,
    YieldReserve,
};
