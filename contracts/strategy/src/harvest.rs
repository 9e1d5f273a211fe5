//! Yield Harvest
//!
//! Whatever the reserve holds beyond the debt is yield. Redeem it and swap
//! it into base asset so the next report counts it as profit.

use tracing::info;

use cdp_strategy_common::{
    errors::StrategyResult,
    events::StrategyEvent,
    types::{Amount, Asset, HarvestOutcome, MarketSnapshot},
};

use crate::driver::Strategy;
use crate::reader::shares_for_value;

/// Parked value in excess of the debt
pub fn harvestable_surplus(parked_value: Amount, debt: Amount) -> Amount {
    parked_value.saturating_sub(debt)
}

impl Strategy {
    pub(crate) fn harvest_profit(&mut self, market: &MarketSnapshot) -> StrategyResult<HarvestOutcome> {
        let surplus = harvestable_surplus(self.parked_value()?, self.debt()?);
        if surplus == 0 {
            return Ok(HarvestOutcome::default());
        }

        let (share_price, unit) = self.share_terms()?;
        // Truncated so principal stays parked
        let shares = shares_for_value(surplus, share_price, unit)?.min(self.reserve_shares()?);
        if shares == 0 {
            return Ok(HarvestOutcome::default());
        }

        let withdrawn = self.redeem_shares(market, shares)?;
        let base_received = if withdrawn > 0 {
            self.swap_exact(market, Asset::Investment, Asset::Base, withdrawn)?
        } else {
            0
        };

        self.events.emit(StrategyEvent::YieldHarvested {
            investment_sold: withdrawn,
            base_received,
            timestamp: market.timestamp,
        });
        info!(surplus, withdrawn, base_received, "yield harvested");

        Ok(HarvestOutcome {
            withdrawn,
            base_received,
        })
    }
}
