//! Position Driver
//!
//! The [`Strategy`] engine and the control loop the pool framework drives.
//!
//! Every top-level operation runs through [`Strategy::invoke`]:
//! 1. Reject the call if another operation is in progress
//! 2. Capture the market snapshot once
//! 3. Run the operation against that snapshot
//! 4. On error, restore the idle ledger and drop the events recorded so far
//!
//! ## Report Cycle
//!
//! snapshot → deposit idle base → rebalance → harvest → profit/loss against
//! the pool's books → liquidate what the pool is owed → report

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cdp_strategy_common::{
    check,
    constants::gates,
    errors::{Collaborator, RevertExt, StrategyError, StrategyResult},
    events::{EventLog, StrategyEvent},
    math::{debt_at_ratio, safe_add, safe_sub},
    params::StrategyParams,
    types::{
        Address, Amount, IdleBalances, LiquidationOutcome, MarketSnapshot, MigrationHandoff,
        RebalanceAction, Report, Wad,
    },
};

use crate::guard::ReentrancyGuard;
use crate::interfaces::{
    Collaborators, LendingFacility, Network, Oracle, PoolAccount, PoolStrategy, SwapVenue,
    YieldReserve,
};
use crate::rebalancer::cap_repay;

// ============ Engine State ============

/// Persistable engine state, without the collaborator handles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StrategyCheckpoint {
    /// Account the engine holds the position and reserve shares under
    pub owner: Address,
    /// Operator parameters
    pub params: StrategyParams,
    /// Idle ledger
    pub idle: IdleBalances,
}

/// Engine managing one collateralized debt position for a pool
pub struct Strategy {
    pub(crate) owner: Address,
    pub(crate) params: StrategyParams,
    pub(crate) idle: IdleBalances,
    pub(crate) events: EventLog,
    pub(crate) guard: ReentrancyGuard,
    pub(crate) oracle: Box<dyn Oracle>,
    pub(crate) facility: Box<dyn LendingFacility>,
    pub(crate) reserve: Box<dyn YieldReserve>,
    pub(crate) swap: Box<dyn SwapVenue>,
    pub(crate) network: Box<dyn Network>,
}

impl core::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Strategy")
            .field("owner", &self.owner)
            .field("params", &self.params)
            .field("idle", &self.idle)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl Strategy {
    /// Creates an engine with validated parameters and an empty ledger.
    ///
    /// # Errors
    /// Returns `ConfigurationRejected` if `params` break a band invariant.
    pub fn new(
        owner: Address,
        params: StrategyParams,
        collaborators: Collaborators,
    ) -> StrategyResult<Self> {
        Self::from_checkpoint(
            StrategyCheckpoint {
                owner,
                params,
                idle: IdleBalances::default(),
            },
            collaborators,
        )
    }

    /// Rebuild an engine from persisted state
    pub fn from_checkpoint(
        checkpoint: StrategyCheckpoint,
        collaborators: Collaborators,
    ) -> StrategyResult<Self> {
        checkpoint.params.validate()?;

        let Collaborators {
            oracle,
            facility,
            reserve,
            swap,
            network,
        } = collaborators;

        Ok(Self {
            owner: checkpoint.owner,
            params: checkpoint.params,
            idle: checkpoint.idle,
            events: EventLog::new(),
            guard: ReentrancyGuard::new(),
            oracle,
            facility,
            reserve,
            swap,
            network,
        })
    }

    /// Current persistable state
    pub fn checkpoint(&self) -> StrategyCheckpoint {
        StrategyCheckpoint {
            owner: self.owner,
            params: self.params.clone(),
            idle: self.idle,
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn idle_balances(&self) -> IdleBalances {
        self.idle
    }

    /// Events recorded since the last [`Strategy::take_events`]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<StrategyEvent> {
        self.events.drain()
    }

    /// Credit base asset transferred in by the pool
    pub fn credit_base(&mut self, amount: Amount) -> StrategyResult<()> {
        check!(!self.guard.is_entered(), StrategyError::Reentrancy);
        self.idle.base = safe_add(self.idle.base, amount)?;
        debug!(amount, idle_base = self.idle.base, "base asset received from pool");
        Ok(())
    }

    // ============ Invocation ============

    /// Run one top-level operation atomically with respect to the engine's
    /// own state
    pub(crate) fn invoke<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Self, &MarketSnapshot) -> StrategyResult<T>,
    ) -> StrategyResult<T> {
        self.guard.enter()?;
        let ledger = self.idle;
        let mark = self.events.len();

        let result = self.capture_market().and_then(|market| f(self, &market));

        if let Err(err) = &result {
            self.idle = ledger;
            self.events.truncate(mark);
            warn!(
                operation,
                code = err.code(),
                recoverable = err.is_recoverable(),
                error = %err,
                "operation aborted, ledger restored"
            );
        }
        self.guard.exit();
        result
    }

    /// Read price, borrow rate, base fee and clock once
    pub(crate) fn capture_market(&mut self) -> StrategyResult<MarketSnapshot> {
        let fetched = self
            .oracle
            .fetch_price()
            .or_revert(Collaborator::Oracle, "fetch_price")?;

        let (price, price_is_fresh) = if fetched == 0 {
            let cached = self
                .oracle
                .last_good_price()
                .or_revert(Collaborator::Oracle, "last_good_price")?;
            warn!(cached, "oracle returned zero price, falling back to last good price");
            (cached, false)
        } else {
            (fetched, true)
        };

        let borrow_rate = self
            .facility
            .current_borrow_rate()
            .or_revert(Collaborator::LendingFacility, "current_borrow_rate")?;

        let (base_fee, base_fee_is_fallback) = match self.read_base_fee() {
            Ok(fee) => (fee, false),
            Err(_) => (gates::FALLBACK_BASE_FEE, true),
        };

        Ok(MarketSnapshot {
            price,
            price_is_fresh,
            borrow_rate,
            base_fee,
            base_fee_is_fallback,
            timestamp: self.network.timestamp(),
        })
    }

    pub(crate) fn read_base_fee(&self) -> StrategyResult<u128> {
        self.network.current_network_base_fee().map_err(|revert| {
            warn!(reason = %revert, "base fee unavailable, assuming fallback");
            StrategyError::BaseFeeUnavailable
        })
    }

    // ============ Gates ============

    pub(crate) fn base_fee_acceptable(&self, base_fee: u128) -> bool {
        base_fee <= self.params.max_acceptable_base_fee
    }

    pub(crate) fn borrow_rate_acceptable(&self, borrow_rate: Wad) -> bool {
        borrow_rate <= self.params.max_borrowing_rate
    }

    /// Reason a discretionary action (mint, open, harvest) must not run on
    /// this snapshot, if any. Repayment never consults this.
    pub(crate) fn discretionary_veto(&self, market: &MarketSnapshot) -> Option<&'static str> {
        if !market.allows_discretionary() {
            return Some("price not fresh");
        }
        if market.base_fee_is_fallback {
            return Some("base fee unavailable");
        }
        if !self.base_fee_acceptable(market.base_fee) {
            return Some("base fee above gate");
        }
        None
    }

    // ============ Deposits ============

    /// Put idle base beyond what the pool is owed into the position,
    /// opening it on first use
    pub(crate) fn deposit_idle_base(
        &mut self,
        market: &MarketSnapshot,
        debt_outstanding: Amount,
    ) -> StrategyResult<()> {
        let available = self.idle.base.saturating_sub(debt_outstanding);
        if available == 0 {
            return Ok(());
        }

        let collateral = self.collateral()?;
        let debt = self.debt()?;

        if collateral > 0 || debt > 0 {
            self.add_collateral(market, available)?;
            return Ok(());
        }

        // Opening borrows, so it goes through the same gates as a mint
        if let Some(reason) = self.discretionary_veto(market) {
            warn!(available, reason, "position left unopened");
            return Ok(());
        }
        if !self.borrow_rate_acceptable(market.borrow_rate) {
            debug!(borrow_rate = market.borrow_rate, "borrow rate above gate, position left unopened");
            return Ok(());
        }

        let initial_debt = debt_at_ratio(available, market.price, self.params.target_ratio)?;
        if initial_debt <= self.params.debt_floor {
            debug!(available, initial_debt, "deposit too small to borrow above the debt floor");
            return Ok(());
        }

        self.open_position(market, available, initial_debt)?;
        self.deploy_investment(market)?;
        Ok(())
    }

    // ============ Supplementary Operations ============

    /// Rebalance only
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn tend(&mut self) -> StrategyResult<RebalanceAction> {
        self.invoke("tend", |s, market| {
            let ratio = s.ratio_at(market.price)?;
            let action = s.rebalance(market, ratio)?;
            if action.is_action() {
                info!(?action, ratio, "tend rebalanced position");
            }
            Ok(action)
        })
    }

    /// Whether a keeper should call [`Strategy::tend`]
    pub fn tend_trigger(&self) -> StrategyResult<bool> {
        let price = self.cached_price()?;
        let ratio = self.ratio_at(price)?;

        // Under-collateralized positions are always worth a tend
        if ratio < self.params.lower_band() {
            return Ok(true);
        }
        if ratio <= self.params.upper_band() {
            return Ok(false);
        }

        let fee_ok = self
            .read_base_fee()
            .map(|fee| self.base_fee_acceptable(fee))
            .unwrap_or(false);
        let rate = self
            .facility
            .current_borrow_rate()
            .or_revert(Collaborator::LendingFacility, "current_borrow_rate")?;
        if !fee_ok || !self.borrow_rate_acceptable(rate) {
            return Ok(false);
        }

        let mint = crate::rebalancer::plan_mint(
            self.collateral()?,
            self.debt()?,
            price,
            &self.params,
        )?;
        Ok(mint > 0)
    }

    /// Whether a keeper should call [`PoolStrategy::report`]
    pub fn harvest_trigger(&self) -> StrategyResult<bool> {
        let fee_ok = self
            .read_base_fee()
            .map(|fee| self.base_fee_acceptable(fee))
            .unwrap_or(false);
        if !fee_ok {
            return Ok(false);
        }
        let surplus = crate::harvest::harvestable_surplus(self.parked_value()?, self.debt()?);
        Ok(surplus > 0)
    }

    /// Operator-initiated repayment through the debt-floor guard
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn emergency_repay(&mut self, amount: Amount) -> StrategyResult<RebalanceAction> {
        self.invoke("emergency_repay", |s, market| s.repay_exact(market, amount))
    }

    /// Take over holdings from a migrated predecessor
    pub fn accept_migration(&mut self, handoff: MigrationHandoff) -> StrategyResult<()> {
        check!(!self.guard.is_entered(), StrategyError::Reentrancy);
        self.idle.base = safe_add(self.idle.base, handoff.base)?;
        self.idle.investment = safe_add(self.idle.investment, handoff.investment)?;
        info!(
            base = handoff.base,
            investment = handoff.investment,
            reserve_shares = handoff.reserve_shares,
            "migration accepted"
        );
        Ok(())
    }

    // ============ Operator Setters ============

    fn configure(
        &mut self,
        f: impl FnOnce(&mut StrategyParams) -> StrategyResult<()>,
    ) -> StrategyResult<()> {
        check!(!self.guard.is_entered(), StrategyError::Reentrancy);
        f(&mut self.params)
    }

    pub fn set_target_ratio(&mut self, target_ratio: Wad) -> StrategyResult<()> {
        self.configure(|p| p.set_target_ratio(target_ratio))
    }

    pub fn set_tolerance(&mut self, tolerance: Wad) -> StrategyResult<()> {
        self.configure(|p| p.set_tolerance(tolerance))
    }

    pub fn set_max_loss_bps(&mut self, max_loss_bps: u64) -> StrategyResult<()> {
        self.configure(|p| p.set_max_loss_bps(max_loss_bps))
    }

    pub fn set_max_acceptable_base_fee(&mut self, max_base_fee: u128) -> StrategyResult<()> {
        self.configure(|p| p.set_max_acceptable_base_fee(max_base_fee))
    }

    pub fn set_max_borrowing_rate(&mut self, max_borrowing_rate: Wad) -> StrategyResult<()> {
        self.configure(|p| p.set_max_borrowing_rate(max_borrowing_rate))
    }

    pub fn set_leave_debt_behind(&mut self, leave_debt_behind: bool) -> StrategyResult<()> {
        self.configure(|p| p.set_leave_debt_behind(leave_debt_behind))
    }

    /// Repay the debt from the reserve and release the collateral, selling
    /// collateral only if the reserve falls short. Surplus shares stay put.
    fn unwind_position(&mut self, market: &MarketSnapshot) -> StrategyResult<()> {
        let debt = self.debt()?;
        if debt > 0 {
            self.source_investment(market, debt)?;
            let amount = cap_repay(debt, self.idle.investment, debt, self.params.debt_floor);
            if amount > 0 {
                self.repay_debt(market, amount)?;
            }
        }

        if self.debt()? > 0 {
            return self.close_out(market);
        }
        let collateral = self.collateral()?;
        if collateral > 0 {
            self.withdraw_collateral(market, collateral)?;
        }
        Ok(())
    }

    /// Hand freed base asset to the pool
    fn release_base(&mut self, amount: Amount) -> StrategyResult<()> {
        self.idle.base = safe_sub(self.idle.base, amount)?;
        Ok(())
    }
}

// ============ Pool Framework Hooks ============

impl PoolStrategy for Strategy {
    #[tracing::instrument(level = "debug", skip(self))]
    fn adjust(&mut self, debt_outstanding: Amount) -> StrategyResult<()> {
        self.invoke("adjust", |s, market| {
            s.deposit_idle_base(market, debt_outstanding)?;
            let ratio = s.ratio_at(market.price)?;
            s.rebalance(market, ratio)?;
            s.deploy_investment(market)?;
            Ok(())
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn free(&mut self, amount_needed: Amount) -> StrategyResult<LiquidationOutcome> {
        self.invoke("free", |s, market| {
            let outcome = s.liquidate(market, amount_needed)?;
            s.release_base(outcome.freed)?;
            Ok(outcome)
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn free_all(&mut self) -> StrategyResult<Amount> {
        self.invoke("free_all", |s, market| {
            let outcome = s.liquidate_all(market)?;
            s.release_base(outcome.freed)?;
            Ok(outcome.freed)
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn report(&mut self, pool: PoolAccount) -> StrategyResult<Report> {
        self.invoke("report", |s, market| {
            // 1. Deploy idle base the pool isn't asking back
            s.deposit_idle_base(market, pool.debt_outstanding)?;

            // 2. Bring the ratio back into the band
            let ratio = s.ratio_at(market.price)?;
            s.rebalance(market, ratio)?;

            // 3. Realize reserve surplus
            match s.discretionary_veto(market) {
                None => {
                    s.harvest_profit(market)?;
                }
                Some(reason) => warn!(reason, "harvest skipped"),
            }

            // 4. Profit or loss against the pool's books
            let total_assets = s.estimated_total_assets_at(market.price)?;
            let mut profit = total_assets.saturating_sub(pool.total_debt);
            let loss = pool.total_debt.saturating_sub(total_assets);

            // 5. Free what the pool is owed
            let requested = safe_add(profit, pool.debt_outstanding)?;
            let outcome = s.liquidate(market, requested)?;
            let debt_payment = pool.debt_outstanding.min(outcome.freed);
            profit = profit.min(outcome.freed - debt_payment);
            s.release_base(safe_add(profit, debt_payment)?)?;

            let report = Report {
                profit,
                loss,
                debt_payment,
            };
            s.events.emit(StrategyEvent::Reported {
                profit,
                loss,
                debt_payment,
                timestamp: market.timestamp,
            });
            info!(profit, loss, debt_payment, total_assets, "report complete");
            Ok(report)
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn migrate(&mut self, successor: &Address) -> StrategyResult<MigrationHandoff> {
        self.invoke("migrate", |s, market| {
            s.unwind_position(market)?;
            let remaining_debt = s.debt()?;
            if remaining_debt > 0 {
                warn!(remaining_debt, "migrating with debt still open");
            }

            let reserve_shares = s.reserve_shares()?;
            if reserve_shares > 0 {
                s.reserve
                    .transfer(reserve_shares, successor)
                    .or_revert(Collaborator::YieldReserve, "transfer")?;
            }

            let handoff = MigrationHandoff {
                base: s.idle.base,
                investment: s.idle.investment,
                reserve_shares,
            };
            s.idle = IdleBalances::default();

            s.events.emit(StrategyEvent::Migrated {
                base: handoff.base,
                investment: handoff.investment,
                reserve_shares,
                timestamp: market.timestamp,
            });
            info!(?handoff, "holdings handed to successor");
            Ok(handoff)
        })
    }
}
