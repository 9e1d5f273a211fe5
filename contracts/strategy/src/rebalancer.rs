//! Debt Rebalancer
//!
//! Keeps the collateralization ratio inside
//! `[target_ratio - tolerance, target_ratio + tolerance]`.
//!
//! ## Key Features
//!
//! - **Repay path**: below the band, shrink debt to `debt * ratio / target`
//! - **Mint path**: above the band, borrow up to the target and park it
//! - **Debt floor**: never leave a non-zero debt at or under the floor
//!
//! Repaying is mandatory and ignores every gate. Minting is discretionary:
//! it needs a fresh price, an acceptable base fee and an acceptable borrow
//! rate.
//!
//! The sizing functions are pure; `impl Strategy` below executes them.

use tracing::{debug, warn};

use cdp_strategy_common::{
    constants::limits::REPAY_EPSILON,
    errors::StrategyResult,
    math::{debt_at_ratio, mul_div},
    params::StrategyParams,
    types::{Amount, MarketSnapshot, RebalanceAction, Wad},
};

use crate::driver::Strategy;
use crate::reader::shares_for_value;

// ============ Sizing ============

/// Largest partial repayment that keeps the remaining debt above the floor
pub fn repay_above_floor(debt: Amount, debt_floor: Amount) -> Amount {
    debt.saturating_sub(debt_floor).saturating_sub(REPAY_EPSILON)
}

/// Repayment that brings a position at `ratio` back to the target.
///
/// Returns zero when there is no debt or the ratio is not below the band.
/// When the target debt would land at or under the floor, the whole debt is
/// repaid if `available_investment` covers it; otherwise the debt is left
/// just above the floor.
pub fn plan_repay(
    debt: Amount,
    ratio: Wad,
    available_investment: Amount,
    params: &StrategyParams,
) -> StrategyResult<Amount> {
    if debt == 0 || ratio >= params.lower_band() {
        return Ok(0);
    }

    let new_debt = mul_div(debt, ratio, params.target_ratio)?;
    if new_debt > params.debt_floor {
        return Ok(debt - new_debt);
    }

    if available_investment >= debt {
        Ok(debt)
    } else {
        Ok(repay_above_floor(debt, params.debt_floor))
    }
}

/// Cap a planned repayment to what is on hand and what is owed.
///
/// A partial repayment that would leave the debt inside `(0, debt_floor]`
/// is cut back to [`repay_above_floor`].
pub fn cap_repay(planned: Amount, idle_investment: Amount, debt: Amount, debt_floor: Amount) -> Amount {
    let amount = planned.min(idle_investment).min(debt);
    let remaining = debt - amount;

    if remaining > 0 && remaining <= debt_floor {
        amount.min(repay_above_floor(debt, debt_floor))
    } else {
        amount
    }
}

/// Additional debt that brings the position up to the target ratio.
///
/// Zero when there is no collateral, when the target debt doesn't clear the
/// floor, or when the position is already at or past the target.
pub fn plan_mint(
    collateral: Amount,
    debt: Amount,
    price: Wad,
    params: &StrategyParams,
) -> StrategyResult<Amount> {
    if collateral == 0 {
        return Ok(0);
    }

    let new_debt = debt_at_ratio(collateral, price, params.target_ratio)?;
    if new_debt <= params.debt_floor || new_debt <= debt {
        return Ok(0);
    }
    Ok(new_debt - debt)
}

// ============ Execution ============

impl Strategy {
    /// Repay or mint depending on where `ratio` sits relative to the band
    pub(crate) fn rebalance(
        &mut self,
        market: &MarketSnapshot,
        ratio: Wad,
    ) -> StrategyResult<RebalanceAction> {
        if ratio < self.params.lower_band() {
            return self.repay_toward_target(market, ratio);
        }
        if ratio <= self.params.upper_band() {
            return Ok(RebalanceAction::None);
        }

        if !self.borrow_rate_acceptable(market.borrow_rate) {
            debug!(borrow_rate = market.borrow_rate, "borrow rate above gate, mint vetoed");
            return Ok(RebalanceAction::None);
        }
        if let Some(reason) = self.discretionary_veto(market) {
            warn!(reason, "mint skipped");
            return Ok(RebalanceAction::None);
        }
        self.mint_toward_target(market)
    }

    /// Repay path, also used by the liquidation orchestrator with a
    /// hypothetical ratio
    pub(crate) fn repay_toward_target(
        &mut self,
        market: &MarketSnapshot,
        ratio: Wad,
    ) -> StrategyResult<RebalanceAction> {
        let debt = self.debt()?;
        if debt == 0 {
            return Ok(RebalanceAction::None);
        }

        let available = self.idle.investment.saturating_add(self.parked_value()?);
        let planned = plan_repay(debt, ratio, available, &self.params)?;
        if planned == 0 {
            return Ok(RebalanceAction::None);
        }

        self.settle_repayment(market, planned, debt)
    }

    /// Operator repayment of `amount`, through the same floor guard
    pub(crate) fn repay_exact(
        &mut self,
        market: &MarketSnapshot,
        amount: Amount,
    ) -> StrategyResult<RebalanceAction> {
        let debt = self.debt()?;
        if debt == 0 || amount == 0 {
            return Ok(RebalanceAction::None);
        }
        self.settle_repayment(market, amount.min(debt), debt)
    }

    fn settle_repayment(
        &mut self,
        market: &MarketSnapshot,
        planned: Amount,
        debt: Amount,
    ) -> StrategyResult<RebalanceAction> {
        self.source_investment(market, planned)?;

        let amount = cap_repay(planned, self.idle.investment, debt, self.params.debt_floor);
        if amount == 0 {
            warn!(planned, debt, idle_investment = self.idle.investment, "nothing repayable above the debt floor");
            return Ok(RebalanceAction::None);
        }

        let new_debt = self.repay_debt(market, amount)?;
        Ok(RebalanceAction::Repaid { amount, new_debt })
    }

    /// Top up idle investment to `needed` from the reserve
    pub(crate) fn source_investment(
        &mut self,
        market: &MarketSnapshot,
        needed: Amount,
    ) -> StrategyResult<()> {
        if self.idle.investment >= needed {
            return Ok(());
        }

        let held = self.reserve_shares()?;
        if held == 0 {
            return Ok(());
        }
        let (share_price, unit) = self.share_terms()?;
        if share_price == 0 {
            warn!("reserve share price is zero, nothing to source");
            return Ok(());
        }

        // One extra share unit covers truncation in the share price
        let shortfall = needed - self.idle.investment;
        let shares = shares_for_value(shortfall, share_price, unit)?
            .saturating_add(1)
            .min(held);
        self.redeem_shares(market, shares)?;
        Ok(())
    }

    fn mint_toward_target(&mut self, market: &MarketSnapshot) -> StrategyResult<RebalanceAction> {
        let amount = plan_mint(self.collateral()?, self.debt()?, market.price, &self.params)?;
        if amount == 0 {
            return Ok(RebalanceAction::None);
        }

        let new_debt = self.borrow(market, amount)?;
        self.deploy_investment(market)?;
        Ok(RebalanceAction::Minted { amount, new_debt })
    }
}
