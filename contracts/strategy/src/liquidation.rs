//! Liquidation Orchestrator
//!
//! Frees a requested amount of base asset for the pool.
//!
//! ## Steps
//!
//! 1. Idle base already covers the request → done
//! 2. Size the collateral shortfall
//! 3. Repay debt as if that collateral were already gone
//! 4. Withdraw what the limiter allows
//! 5. Still short and not leaving debt behind → close the position out
//! 6. Whatever idle base exists now is freed; the rest is loss
//!
//! Running short is never an error. It comes back as `loss`.

use tracing::{debug, info, warn};

use cdp_strategy_common::{
    constants::{
        fees::BPS_DENOMINATOR,
        limits::MAX_CLOSE_OUT_ROUNDS,
        scale::{NO_DEBT_RATIO, WAD},
    },
    errors::{StrategyError, StrategyResult},
    events::StrategyEvent,
    math::{collateral_for_ratio, mul_div, to_base, to_investment},
    types::{Amount, Asset, LiquidationOutcome, MarketSnapshot, Wad},
};

use crate::driver::Strategy;
use crate::rebalancer::cap_repay;

/// Ratio the position would have with `shortfall` collateral removed.
///
/// A debt-free position reads as the no-debt sentinel without consulting
/// the price, so an unlevered position can be unwound on a dead oracle.
/// The result saturates at the same sentinel.
pub fn hypothetical_ratio(
    collateral: Amount,
    debt: Amount,
    shortfall: Amount,
    price: Wad,
) -> StrategyResult<Wad> {
    if debt == 0 {
        return Ok(NO_DEBT_RATIO);
    }
    let remaining = to_investment(collateral, price)?
        .saturating_sub(to_investment(shortfall, price)?);

    match mul_div(remaining, WAD, debt) {
        Err(StrategyError::Overflow) => Ok(NO_DEBT_RATIO),
        other => other,
    }
}

/// Collateral to sell in one close-out round.
///
/// Enough to buy `needed` investment after slippage, but never so much that
/// the remaining collateral backs `debt` below `min_ratio`.
pub fn close_out_sale(
    collateral: Amount,
    debt: Amount,
    needed: Amount,
    price: Wad,
    min_ratio: Wad,
    max_loss_bps: u64,
) -> StrategyResult<Amount> {
    // One unit of headroom against truncation in the floor
    let floor = collateral_for_ratio(debt, price, min_ratio)?.saturating_add(1);
    let sellable = collateral.saturating_sub(floor);

    let kept_bps = BPS_DENOMINATOR.saturating_sub(max_loss_bps);
    if kept_bps == 0 {
        return Ok(sellable);
    }
    let wanted = mul_div(
        to_base(needed, price)?,
        u128::from(BPS_DENOMINATOR),
        u128::from(kept_bps),
    )?
    .saturating_add(1);

    Ok(wanted.min(sellable))
}

impl Strategy {
    /// Free `amount_needed` base asset into the idle ledger
    pub(crate) fn liquidate(
        &mut self,
        market: &MarketSnapshot,
        amount_needed: Amount,
    ) -> StrategyResult<LiquidationOutcome> {
        // 1. Idle base covers it
        if self.idle.base >= amount_needed {
            return Ok(self.record_liquidation(market, amount_needed));
        }

        // 2. Shortfall, bounded by what is locked
        let collateral = self.collateral()?;
        let debt = self.debt()?;
        let shortfall = (amount_needed - self.idle.base).min(collateral);

        if shortfall > 0 {
            // 3. Repay as though the shortfall were already withdrawn
            let ratio = hypothetical_ratio(collateral, debt, shortfall, market.price)?;
            self.repay_toward_target(market, ratio)?;

            // 4. Withdraw within the band
            let amount = shortfall.min(self.withdrawable_at(market.price)?);
            if amount > 0 {
                self.withdraw_collateral(market, amount)?;
            }
        }

        // 5. Sell collateral against the remaining debt
        if self.idle.base < amount_needed && !self.params.leave_debt_behind && self.debt()? > 0 {
            self.close_out(market)?;
        }

        // 6. Settle
        Ok(self.record_liquidation(market, amount_needed))
    }

    /// Liquidate everything the engine controls
    pub(crate) fn liquidate_all(
        &mut self,
        market: &MarketSnapshot,
    ) -> StrategyResult<LiquidationOutcome> {
        let total = self.estimated_total_assets_at(market.price)?;
        self.liquidate(market, total)
    }

    /// Repay the debt in full by redeeming the reserve and selling
    /// collateral, then pull whatever collateral is left.
    ///
    /// Each sale keeps the position at or above `min_ratio`. If the debt
    /// can't be cleared within that limit the position is left open.
    pub(crate) fn close_out(&mut self, market: &MarketSnapshot) -> StrategyResult<()> {
        let shares = self.reserve_shares()?;
        if shares > 0 {
            self.redeem_shares(market, shares)?;
        }

        let mut rounds = 0u8;
        loop {
            let debt = self.debt()?;
            if debt == 0 {
                break;
            }

            let amount = cap_repay(debt, self.idle.investment, debt, self.params.debt_floor);
            let debt = if amount > 0 {
                self.repay_debt(market, amount)?
            } else {
                debt
            };
            if debt == 0 {
                break;
            }
            if rounds >= MAX_CLOSE_OUT_ROUNDS {
                warn!(debt, rounds, "close-out round limit reached");
                break;
            }
            rounds += 1;

            let collateral = self.collateral()?;
            let needed = debt.saturating_sub(self.idle.investment);
            let sale = close_out_sale(
                collateral,
                debt,
                needed,
                market.price,
                self.params.min_ratio,
                self.params.max_loss_bps,
            )?;
            if sale == 0 {
                warn!(debt, collateral, "close-out stalled at the minimum ratio");
                break;
            }

            self.withdraw_collateral(market, sale)?;
            let received = self.swap_exact(market, Asset::Base, Asset::Investment, sale)?;
            self.events.emit(StrategyEvent::CollateralSold {
                base_sold: sale,
                investment_received: received,
                timestamp: market.timestamp,
            });
            debug!(round = rounds, sale, received, debt, "collateral sold");
        }

        if self.debt()? > 0 {
            return Ok(());
        }

        let collateral = self.collateral()?;
        if collateral > 0 {
            self.withdraw_collateral(market, collateral)?;
        }
        let leftover = self.idle.investment;
        if leftover > 0 {
            self.swap_exact(market, Asset::Investment, Asset::Base, leftover)?;
        }
        Ok(())
    }

    fn record_liquidation(
        &mut self,
        market: &MarketSnapshot,
        amount_needed: Amount,
    ) -> LiquidationOutcome {
        let outcome = LiquidationOutcome::settle(amount_needed, self.idle.base);
        self.events.emit(StrategyEvent::Liquidated {
            requested: amount_needed,
            freed: outcome.freed,
            loss: outcome.loss,
            timestamp: market.timestamp,
        });
        if outcome.loss > 0 {
            warn!(requested = amount_needed, freed = outcome.freed, loss = outcome.loss, "liquidation short");
        } else {
            info!(requested = amount_needed, "liquidation complete");
        }
        outcome
    }
}
