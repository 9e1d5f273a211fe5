//! Collaborator Interfaces
//!
//! The engine never holds a concrete oracle, lending facility, reserve,
//! swap venue or network handle. It talks to them through the traits below,
//! injected at construction, so a deployment adapter and an in-memory
//! simulator are interchangeable.
//!
//! Every mutating method moves funds for the engine's own account; the
//! engine mirrors those movements in its idle ledger. Any `Err(Revert)`
//! aborts the invocation that made the call.

use cdp_strategy_common::{
    errors::{Revert, StrategyResult},
    types::{Address, Amount, Asset, LiquidationOutcome, MigrationHandoff, Report, Wad},
};
use serde::{Deserialize, Serialize};
use borsh::{BorshDeserialize, BorshSerialize};

/// Price source for base asset in investment units
pub trait Oracle {
    /// Refresh and return the current price (1e18 scale). May return zero
    /// when the feed is broken.
    fn fetch_price(&mut self) -> Result<Wad, Revert>;

    /// Cached price from the last successful refresh
    fn last_good_price(&self) -> Result<Wad, Revert>;
}

/// Lending facility holding the engine's single position
pub trait LendingFacility {
    /// Open the position: lock `collateral` base, borrow `initial_debt`
    fn open(&mut self, collateral: Amount, initial_debt: Amount) -> Result<(), Revert>;

    /// Lock more base asset
    fn add_collateral(&mut self, amount: Amount) -> Result<(), Revert>;

    /// Release base asset back to the engine
    fn withdraw_collateral(&mut self, amount: Amount) -> Result<(), Revert>;

    /// Borrow more investment asset against the position
    fn borrow_more(&mut self, amount: Amount) -> Result<(), Revert>;

    /// Pay back investment asset
    fn repay(&mut self, amount: Amount) -> Result<(), Revert>;

    /// Outstanding debt of `owner`
    fn debt_of(&self, owner: &Address) -> Result<Amount, Revert>;

    /// Collateral locked by `owner`
    fn collateral_of(&self, owner: &Address) -> Result<Amount, Revert>;

    /// Current borrowing rate (1e18 scale)
    fn current_borrow_rate(&self) -> Result<Wad, Revert>;
}

/// Share-based reserve where borrowed funds earn yield
pub trait YieldReserve {
    /// Deposit investment asset, minting shares to the engine
    fn deposit(&mut self, amount: Amount) -> Result<(), Revert>;

    /// Redeem `shares`; reverts if the realized loss exceeds `max_loss_bps`
    fn withdraw(&mut self, shares: Amount, max_loss_bps: u64) -> Result<Amount, Revert>;

    /// Shares held by `owner`
    fn balance_of(&self, owner: &Address) -> Result<Amount, Revert>;

    /// Investment value of one share, scaled by `10^decimals`
    fn share_price(&self) -> Result<Amount, Revert>;

    /// Share decimals
    fn decimals(&self) -> Result<u8, Revert>;

    /// Move shares to another owner
    fn transfer(&mut self, shares: Amount, to: &Address) -> Result<(), Revert>;
}

/// Venue for swapping between the two assets
pub trait SwapVenue {
    /// Swap exactly `amount_in`, reverting below `min_amount_out` or after
    /// `deadline`
    fn swap_exact_in(
        &mut self,
        token_in: Asset,
        token_out: Asset,
        amount_in: Amount,
        min_amount_out: Amount,
        deadline: u64,
    ) -> Result<Amount, Revert>;
}

/// Network fee and clock source
pub trait Network {
    /// Current base fee in wei
    fn current_network_base_fee(&self) -> Result<u128, Revert>;

    /// Current network timestamp (seconds)
    fn timestamp(&self) -> u64;
}

/// The engine's collaborators, injected at construction
pub struct Collaborators {
    pub oracle: Box<dyn Oracle>,
    pub facility: Box<dyn LendingFacility>,
    pub reserve: Box<dyn YieldReserve>,
    pub swap: Box<dyn SwapVenue>,
    pub network: Box<dyn Network>,
}

// ============ Pool Framework ============

/// Pool-side bookkeeping passed in with each report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PoolAccount {
    /// Base asset the pool has lent to the engine
    pub total_debt: Amount,
    /// Base asset the pool wants back
    pub debt_outstanding: Amount,
}

/// Hooks the pool framework drives
pub trait PoolStrategy {
    /// Put idle funds to work after a report
    fn adjust(&mut self, debt_outstanding: Amount) -> StrategyResult<()>;

    /// Free base asset for a withdrawal
    fn free(&mut self, amount_needed: Amount) -> StrategyResult<LiquidationOutcome>;

    /// Unwind everything, returning the base asset freed
    fn free_all(&mut self) -> StrategyResult<Amount>;

    /// Measure profit or loss and settle what the pool is owed
    fn report(&mut self, pool: PoolAccount) -> StrategyResult<Report>;

    /// Hand holdings to a successor engine owned by `successor`
    fn migrate(&mut self, successor: &Address) -> StrategyResult<MigrationHandoff>;
}
