//! Collateral Withdrawal Limiter
//!
//! How much collateral can leave the position while the ratio stays at or
//! above the lower band edge.

use cdp_strategy_common::{
    errors::StrategyResult,
    math::collateral_for_ratio,
    params::StrategyParams,
    types::{Amount, Wad},
};

use crate::driver::Strategy;

/// Collateral withdrawable without dropping below `lower_band()`.
///
/// All of it when there is no debt; zero when the position is already
/// under the lower edge.
pub fn max_withdrawable(
    collateral: Amount,
    debt: Amount,
    price: Wad,
    params: &StrategyParams,
) -> StrategyResult<Amount> {
    if debt == 0 {
        return Ok(collateral);
    }
    let min_collateral = collateral_for_ratio(debt, price, params.lower_band())?;
    Ok(collateral.saturating_sub(min_collateral))
}

impl Strategy {
    /// Withdrawable collateral at the last good price
    pub fn max_withdrawable(&self) -> StrategyResult<Amount> {
        self.withdrawable_at(self.cached_price()?)
    }

    pub(crate) fn withdrawable_at(&self, price: Wad) -> StrategyResult<Amount> {
        max_withdrawable(self.collateral()?, self.debt()?, price, &self.params)
    }
}
