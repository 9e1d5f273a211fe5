//! Collaborator Actions
//!
//! The only place the engine moves funds. Each action calls one
//! collaborator, mirrors the movement in the idle ledger and records an
//! event. Higher layers decide *what* to do; these just do it.

use tracing::{debug, info};

use cdp_strategy_common::{
    errors::{Collaborator, RevertExt, StrategyResult},
    events::StrategyEvent,
    math::{apply_max_loss, collateral_ratio, safe_add, safe_sub, to_base, to_investment},
    types::{Amount, Asset, MarketSnapshot},
};

use crate::driver::Strategy;

impl Strategy {
    /// Lock `collateral` and borrow `initial_debt`
    pub(crate) fn open_position(
        &mut self,
        market: &MarketSnapshot,
        collateral: Amount,
        initial_debt: Amount,
    ) -> StrategyResult<()> {
        self.facility
            .open(collateral, initial_debt)
            .or_revert(Collaborator::LendingFacility, "open")?;
        self.idle.base = safe_sub(self.idle.base, collateral)?;
        self.idle.investment = safe_add(self.idle.investment, initial_debt)?;

        let ratio = collateral_ratio(collateral, initial_debt, market.price)?;
        self.events.emit(StrategyEvent::PositionOpened {
            collateral,
            debt: initial_debt,
            ratio,
            timestamp: market.timestamp,
        });
        info!(collateral, initial_debt, ratio, "position opened");
        Ok(())
    }

    pub(crate) fn add_collateral(
        &mut self,
        market: &MarketSnapshot,
        amount: Amount,
    ) -> StrategyResult<()> {
        self.facility
            .add_collateral(amount)
            .or_revert(Collaborator::LendingFacility, "add_collateral")?;
        self.idle.base = safe_sub(self.idle.base, amount)?;

        let new_collateral = self.collateral()?;
        self.events.emit(StrategyEvent::CollateralAdded {
            amount,
            new_collateral,
            timestamp: market.timestamp,
        });
        debug!(amount, new_collateral, "collateral added");
        Ok(())
    }

    pub(crate) fn withdraw_collateral(
        &mut self,
        market: &MarketSnapshot,
        amount: Amount,
    ) -> StrategyResult<()> {
        self.facility
            .withdraw_collateral(amount)
            .or_revert(Collaborator::LendingFacility, "withdraw_collateral")?;
        self.idle.base = safe_add(self.idle.base, amount)?;

        let new_collateral = self.collateral()?;
        self.events.emit(StrategyEvent::CollateralWithdrawn {
            amount,
            new_collateral,
            timestamp: market.timestamp,
        });
        debug!(amount, new_collateral, "collateral withdrawn");

        if new_collateral == 0 && self.debt()? == 0 {
            self.events.emit(StrategyEvent::PositionClosed {
                collateral_returned: amount,
                timestamp: market.timestamp,
            });
            info!(collateral_returned = amount, "position closed");
        }
        Ok(())
    }

    /// Borrow more; returns the new debt
    pub(crate) fn borrow(
        &mut self,
        market: &MarketSnapshot,
        amount: Amount,
    ) -> StrategyResult<Amount> {
        let ratio_before = self.ratio_at(market.price)?;
        self.facility
            .borrow_more(amount)
            .or_revert(Collaborator::LendingFacility, "borrow_more")?;
        self.idle.investment = safe_add(self.idle.investment, amount)?;

        let new_debt = self.debt()?;
        self.events.emit(StrategyEvent::DebtMinted {
            amount,
            new_debt,
            ratio_before,
            timestamp: market.timestamp,
        });
        info!(amount, new_debt, ratio_before, "debt minted");
        Ok(new_debt)
    }

    /// Repay from idle investment; returns the new debt
    pub(crate) fn repay_debt(
        &mut self,
        market: &MarketSnapshot,
        amount: Amount,
    ) -> StrategyResult<Amount> {
        let ratio_before = self.ratio_at(market.price)?;
        self.facility
            .repay(amount)
            .or_revert(Collaborator::LendingFacility, "repay")?;
        self.idle.investment = safe_sub(self.idle.investment, amount)?;

        let new_debt = self.debt()?;
        self.events.emit(StrategyEvent::DebtRepaid {
            amount,
            new_debt,
            ratio_before,
            timestamp: market.timestamp,
        });
        info!(amount, new_debt, ratio_before, "debt repaid");
        Ok(new_debt)
    }

    /// Park all idle investment in the reserve
    pub(crate) fn deploy_investment(&mut self, market: &MarketSnapshot) -> StrategyResult<Amount> {
        let amount = self.idle.investment;
        if amount == 0 {
            return Ok(0);
        }
        self.reserve
            .deposit(amount)
            .or_revert(Collaborator::YieldReserve, "deposit")?;
        self.idle.investment = 0;

        self.events.emit(StrategyEvent::ReserveDeposit {
            amount,
            timestamp: market.timestamp,
        });
        debug!(amount, "investment parked in reserve");
        Ok(amount)
    }

    /// Redeem shares within the loss tolerance; returns investment received
    pub(crate) fn redeem_shares(
        &mut self,
        market: &MarketSnapshot,
        shares: Amount,
    ) -> StrategyResult<Amount> {
        let received = self
            .reserve
            .withdraw(shares, self.params.max_loss_bps)
            .or_revert(Collaborator::YieldReserve, "withdraw")?;
        self.idle.investment = safe_add(self.idle.investment, received)?;

        self.events.emit(StrategyEvent::ReserveWithdrawal {
            shares,
            received,
            timestamp: market.timestamp,
        });
        debug!(shares, received, "reserve shares redeemed");
        Ok(received)
    }

    /// Swap `amount_in` at the snapshot price less the loss tolerance
    pub(crate) fn swap_exact(
        &mut self,
        market: &MarketSnapshot,
        token_in: Asset,
        token_out: Asset,
        amount_in: Amount,
    ) -> StrategyResult<Amount> {
        let quoted = match token_in {
            Asset::Base => to_investment(amount_in, market.price)?,
            Asset::Investment => to_base(amount_in, market.price)?,
        };
        let min_amount_out = apply_max_loss(quoted, self.params.max_loss_bps)?;

        let amount_out = self
            .swap
            .swap_exact_in(token_in, token_out, amount_in, min_amount_out, market.timestamp)
            .or_revert(Collaborator::SwapVenue, "swap_exact_in")?;

        self.debit(token_in, amount_in)?;
        self.credit(token_out, amount_out)?;
        debug!(?token_in, ?token_out, amount_in, amount_out, min_amount_out, "swapped");
        Ok(amount_out)
    }

    fn debit(&mut self, asset: Asset, amount: Amount) -> StrategyResult<()> {
        match asset {
            Asset::Base => self.idle.base = safe_sub(self.idle.base, amount)?,
            Asset::Investment => self.idle.investment = safe_sub(self.idle.investment, amount)?,
        }
        Ok(())
    }

    fn credit(&mut self, asset: Asset, amount: Amount) -> StrategyResult<()> {
        match asset {
            Asset::Base => self.idle.base = safe_add(self.idle.base, amount)?,
            Asset::Investment => self.idle.investment = safe_add(self.idle.investment, amount)?,
        }
        Ok(())
    }
}
