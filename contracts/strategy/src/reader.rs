//! Position State Reader
//!
//! Read-only views of the position, the reserve holdings and the idle
//! ledger. Nothing here mutates a collaborator.

use cdp_strategy_common::{
    errors::{Collaborator, RevertExt, StrategyError, StrategyResult},
    math::{collateral_ratio, mul_div, safe_add, to_base},
    types::{Amount, PositionState, Wad},
};

use crate::driver::Strategy;

/// `10^decimals` as a share unit
pub fn share_unit(decimals: u8) -> StrategyResult<u128> {
    10u128
        .checked_pow(u32::from(decimals))
        .ok_or(StrategyError::Overflow)
}

/// Investment value of `shares` at `share_price` per `unit` shares
pub fn share_value(shares: Amount, share_price: Amount, unit: u128) -> StrategyResult<Amount> {
    mul_div(shares, share_price, unit)
}

/// Shares worth `value` at `share_price`, truncated
pub fn shares_for_value(value: Amount, share_price: Amount, unit: u128) -> StrategyResult<Amount> {
    mul_div(value, unit, share_price)
}

/// Everything the engine controls, net of debt, in base units
///
/// `idle_base + collateral + to_base(idle_investment + parked) - to_base(debt)`,
/// saturating at zero.
pub fn estimate_total_assets(state: &PositionState, price: Wad) -> StrategyResult<Amount> {
    let gross = safe_add(state.idle_base, state.collateral)?;
    let investment = state.available_investment();

    if investment == 0 && state.debt == 0 {
        return Ok(gross);
    }

    let holdings = safe_add(gross, to_base(investment, price)?)?;
    Ok(holdings.saturating_sub(to_base(state.debt, price)?))
}

impl Strategy {
    /// Base asset locked in the facility
    pub fn collateral(&self) -> StrategyResult<Amount> {
        self.facility
            .collateral_of(&self.owner)
            .or_revert(Collaborator::LendingFacility, "collateral_of")
    }

    /// Investment asset owed to the facility
    pub fn debt(&self) -> StrategyResult<Amount> {
        self.facility
            .debt_of(&self.owner)
            .or_revert(Collaborator::LendingFacility, "debt_of")
    }

    pub fn idle_base(&self) -> Amount {
        self.idle.base
    }

    pub fn idle_investment(&self) -> Amount {
        self.idle.investment
    }

    /// Reserve shares held by the engine
    pub fn reserve_shares(&self) -> StrategyResult<Amount> {
        self.reserve
            .balance_of(&self.owner)
            .or_revert(Collaborator::YieldReserve, "balance_of")
    }

    /// Share price and share unit of the reserve
    pub(crate) fn share_terms(&self) -> StrategyResult<(Amount, u128)> {
        let price = self
            .reserve
            .share_price()
            .or_revert(Collaborator::YieldReserve, "share_price")?;
        let decimals = self
            .reserve
            .decimals()
            .or_revert(Collaborator::YieldReserve, "decimals")?;
        Ok((price, share_unit(decimals)?))
    }

    /// Investment value parked in the reserve
    pub fn parked_value(&self) -> StrategyResult<Amount> {
        let shares = self.reserve_shares()?;
        if shares == 0 {
            return Ok(0);
        }
        let (share_price, unit) = self.share_terms()?;
        share_value(shares, share_price, unit)
    }

    /// Cached oracle price, for views that must not refresh it
    pub(crate) fn cached_price(&self) -> StrategyResult<Wad> {
        self.oracle
            .last_good_price()
            .or_revert(Collaborator::Oracle, "last_good_price")
    }

    /// Collateralization ratio at the last good price
    pub fn current_ratio(&self) -> StrategyResult<Wad> {
        self.ratio_at(self.cached_price()?)
    }

    pub(crate) fn ratio_at(&self, price: Wad) -> StrategyResult<Wad> {
        collateral_ratio(self.collateral()?, self.debt()?, price)
    }

    /// Full position reading at the last good price
    pub fn snapshot(&self) -> StrategyResult<PositionState> {
        self.snapshot_at(self.cached_price()?)
    }

    pub(crate) fn snapshot_at(&self, price: Wad) -> StrategyResult<PositionState> {
        let collateral = self.collateral()?;
        let debt = self.debt()?;
        let reserve_shares = self.reserve_shares()?;
        let parked_value = if reserve_shares == 0 {
            0
        } else {
            let (share_price, unit) = self.share_terms()?;
            share_value(reserve_shares, share_price, unit)?
        };

        Ok(PositionState {
            collateral,
            debt,
            idle_base: self.idle.base,
            idle_investment: self.idle.investment,
            parked_value,
            reserve_shares,
            ratio: collateral_ratio(collateral, debt, price)?,
        })
    }

    /// Total assets in base units at the last good price
    pub fn estimated_total_assets(&self) -> StrategyResult<Amount> {
        self.estimated_total_assets_at(self.cached_price()?)
    }

    pub(crate) fn estimated_total_assets_at(&self, price: Wad) -> StrategyResult<Amount> {
        estimate_total_assets(&self.snapshot_at(price)?, price)
    }
}
