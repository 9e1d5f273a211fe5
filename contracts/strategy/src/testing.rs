//! In-memory collaborators for tests
//!
//! One shared [`World`] backs every simulated collaborator, so a test can
//! move the price, grow the reserve or force a revert between calls and see
//! exactly what the engine did to each counterparty.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use cdp_strategy_common::{
    constants::{fees::BPS_DENOMINATOR, limits::DEFAULT_DEBT_FLOOR, scale::WAD},
    errors::Revert,
    math::{collateral_ratio, mul_div, to_base, to_investment},
    params::StrategyParams,
    types::{Address, Amount, Asset, Wad},
};

use crate::driver::Strategy;
use crate::interfaces::{Collaborators, LendingFacility, Network, Oracle, SwapVenue, YieldReserve};

pub const OWNER: Address = [7u8; 32];
pub const SUCCESSOR: Address = [8u8; 32];
pub const PRICE: Wad = 2_000 * WAD;
pub const GWEI: u128 = 1_000_000_000;

/// One facility position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trove {
    pub collateral: Amount,
    pub debt: Amount,
}

/// State shared by every simulated collaborator
#[derive(Debug, Clone)]
pub struct World {
    pub price: Wad,
    pub last_good_price: Wad,
    pub borrow_rate: Wad,
    pub min_net_debt: Amount,
    pub mcr: Wad,
    pub troves: BTreeMap<Address, Trove>,
    pub share_price: Amount,
    pub share_decimals: u8,
    pub shares: BTreeMap<Address, Amount>,
    pub reserve_loss_bps: u64,
    pub swap_fee_bps: u64,
    pub swap_count: usize,
    pub base_fee: Option<u128>,
    pub timestamp: u64,
    /// Name of a collaborator call to revert
    pub fail: Option<&'static str>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            price: PRICE,
            last_good_price: PRICE,
            borrow_rate: WAD / 200,
            min_net_debt: DEFAULT_DEBT_FLOOR,
            mcr: WAD * 110 / 100,
            troves: BTreeMap::new(),
            share_price: WAD,
            share_decimals: 18,
            shares: BTreeMap::new(),
            reserve_loss_bps: 0,
            swap_fee_bps: 0,
            swap_count: 0,
            base_fee: Some(20 * GWEI),
            timestamp: 1_700_000_000,
            fail: None,
        }
    }
}

impl World {
    pub fn trove(&self, owner: &Address) -> Trove {
        self.troves.get(owner).copied().unwrap_or_default()
    }

    pub fn shares_of(&self, owner: &Address) -> Amount {
        self.shares.get(owner).copied().unwrap_or_default()
    }

    pub fn unit(&self) -> u128 {
        10u128.pow(u32::from(self.share_decimals))
    }

    pub fn parked_value(&self, owner: &Address) -> Amount {
        mul_div(self.shares_of(owner), self.share_price, self.unit()).unwrap()
    }

    /// Seed a position directly
    pub fn set_trove(&mut self, owner: Address, collateral: Amount, debt: Amount) {
        self.troves.insert(owner, Trove { collateral, debt });
    }

    /// Seed reserve shares worth `value` at the current share price
    pub fn park(&mut self, owner: Address, value: Amount) {
        let shares = mul_div(value, self.unit(), self.share_price).unwrap();
        *self.shares.entry(owner).or_default() += shares;
    }

    fn check(&self, op: &'static str) -> Result<(), Revert> {
        match self.fail {
            Some(name) if name == op => Err(Revert::new(format!("{op} forced to fail"))),
            _ => Ok(()),
        }
    }

    fn check_ratio(&self, trove: &Trove) -> Result<(), Revert> {
        if trove.debt == 0 {
            return Ok(());
        }
        let ratio = collateral_ratio(trove.collateral, trove.debt, self.price)
            .map_err(|e| Revert::new(e.to_string()))?;
        if ratio < self.mcr {
            return Err(Revert::new("ratio below minimum collateral ratio"));
        }
        Ok(())
    }

    fn check_net_debt(&self, debt: Amount) -> Result<(), Revert> {
        if debt != 0 && debt <= self.min_net_debt {
            return Err(Revert::new("net debt must be above minimum"));
        }
        Ok(())
    }
}

pub type SharedWorld = Rc<RefCell<World>>;

pub fn shared(world: World) -> SharedWorld {
    Rc::new(RefCell::new(world))
}

// ============ Simulated Collaborators ============

pub struct SimOracle(SharedWorld);

impl Oracle for SimOracle {
    fn fetch_price(&mut self) -> Result<Wad, Revert> {
        let mut w = self.0.borrow_mut();
        w.check("fetch_price")?;
        if w.price > 0 {
            w.last_good_price = w.price;
        }
        Ok(w.price)
    }

    fn last_good_price(&self) -> Result<Wad, Revert> {
        let w = self.0.borrow();
        w.check("last_good_price")?;
        Ok(w.last_good_price)
    }
}

pub struct SimFacility {
    world: SharedWorld,
    owner: Address,
}

impl LendingFacility for SimFacility {
    fn open(&mut self, collateral: Amount, initial_debt: Amount) -> Result<(), Revert> {
        let mut w = self.world.borrow_mut();
        w.check("open")?;
        if w.trove(&self.owner) != Trove::default() {
            return Err(Revert::new("trove already open"));
        }
        if initial_debt == 0 {
            return Err(Revert::new("net debt must be above minimum"));
        }
        w.check_net_debt(initial_debt)?;
        let trove = Trove {
            collateral,
            debt: initial_debt,
        };
        w.check_ratio(&trove)?;
        w.troves.insert(self.owner, trove);
        Ok(())
    }

    fn add_collateral(&mut self, amount: Amount) -> Result<(), Revert> {
        let mut w = self.world.borrow_mut();
        w.check("add_collateral")?;
        w.troves.entry(self.owner).or_default().collateral += amount;
        Ok(())
    }

    fn withdraw_collateral(&mut self, amount: Amount) -> Result<(), Revert> {
        let mut w = self.world.borrow_mut();
        w.check("withdraw_collateral")?;
        let mut trove = w.trove(&self.owner);
        if amount > trove.collateral {
            return Err(Revert::new("withdrawal exceeds collateral"));
        }
        trove.collateral -= amount;
        w.check_ratio(&trove)?;
        w.troves.insert(self.owner, trove);
        Ok(())
    }

    fn borrow_more(&mut self, amount: Amount) -> Result<(), Revert> {
        let mut w = self.world.borrow_mut();
        w.check("borrow_more")?;
        let mut trove = w.trove(&self.owner);
        trove.debt += amount;
        w.check_net_debt(trove.debt)?;
        w.check_ratio(&trove)?;
        w.troves.insert(self.owner, trove);
        Ok(())
    }

    fn repay(&mut self, amount: Amount) -> Result<(), Revert> {
        let mut w = self.world.borrow_mut();
        w.check("repay")?;
        let mut trove = w.trove(&self.owner);
        if amount > trove.debt {
            return Err(Revert::new("repayment exceeds debt"));
        }
        trove.debt -= amount;
        w.check_net_debt(trove.debt)?;
        w.troves.insert(self.owner, trove);
        Ok(())
    }

    fn debt_of(&self, owner: &Address) -> Result<Amount, Revert> {
        let w = self.world.borrow();
        w.check("debt_of")?;
        Ok(w.trove(owner).debt)
    }

    fn collateral_of(&self, owner: &Address) -> Result<Amount, Revert> {
        let w = self.world.borrow();
        w.check("collateral_of")?;
        Ok(w.trove(owner).collateral)
    }

    fn current_borrow_rate(&self) -> Result<Wad, Revert> {
        let w = self.world.borrow();
        w.check("current_borrow_rate")?;
        Ok(w.borrow_rate)
    }
}

pub struct SimReserve {
    world: SharedWorld,
    owner: Address,
}

impl YieldReserve for SimReserve {
    fn deposit(&mut self, amount: Amount) -> Result<(), Revert> {
        let mut w = self.world.borrow_mut();
        w.check("deposit")?;
        let shares = mul_div(amount, w.unit(), w.share_price).map_err(|e| Revert::new(e.to_string()))?;
        *w.shares.entry(self.owner).or_default() += shares;
        Ok(())
    }

    fn withdraw(&mut self, shares: Amount, max_loss_bps: u64) -> Result<Amount, Revert> {
        let mut w = self.world.borrow_mut();
        w.check("withdraw")?;
        let held = w.shares_of(&self.owner);
        if shares > held {
            return Err(Revert::new("insufficient shares"));
        }
        if w.reserve_loss_bps > max_loss_bps {
            return Err(Revert::new("withdrawal loss above tolerance"));
        }
        let value = mul_div(shares, w.share_price, w.unit()).map_err(|e| Revert::new(e.to_string()))?;
        let kept = u128::from(BPS_DENOMINATOR - w.reserve_loss_bps);
        let received = mul_div(value, kept, u128::from(BPS_DENOMINATOR)).map_err(|e| Revert::new(e.to_string()))?;
        w.shares.insert(self.owner, held - shares);
        Ok(received)
    }

    fn balance_of(&self, owner: &Address) -> Result<Amount, Revert> {
        let w = self.world.borrow();
        w.check("balance_of")?;
        Ok(w.shares_of(owner))
    }

    fn share_price(&self) -> Result<Amount, Revert> {
        Ok(self.world.borrow().share_price)
    }

    fn decimals(&self) -> Result<u8, Revert> {
        Ok(self.world.borrow().share_decimals)
    }

    fn transfer(&mut self, shares: Amount, to: &Address) -> Result<(), Revert> {
        let mut w = self.world.borrow_mut();
        w.check("transfer")?;
        let held = w.shares_of(&self.owner);
        if shares > held {
            return Err(Revert::new("insufficient shares"));
        }
        w.shares.insert(self.owner, held - shares);
        *w.shares.entry(*to).or_default() += shares;
        Ok(())
    }
}

pub struct SimSwap(SharedWorld);

impl SwapVenue for SimSwap {
    fn swap_exact_in(
        &mut self,
        token_in: Asset,
        token_out: Asset,
        amount_in: Amount,
        min_amount_out: Amount,
        deadline: u64,
    ) -> Result<Amount, Revert> {
        let mut w = self.0.borrow_mut();
        w.check("swap_exact_in")?;
        if token_in == token_out {
            return Err(Revert::new("identical assets"));
        }
        if deadline < w.timestamp {
            return Err(Revert::new("deadline passed"));
        }
        let gross = match token_in {
            Asset::Base => to_investment(amount_in, w.price),
            Asset::Investment => to_base(amount_in, w.price),
        }
        .map_err(|e| Revert::new(e.to_string()))?;
        let kept = u128::from(BPS_DENOMINATOR - w.swap_fee_bps);
        let out = mul_div(gross, kept, u128::from(BPS_DENOMINATOR)).map_err(|e| Revert::new(e.to_string()))?;
        if out < min_amount_out {
            return Err(Revert::new("insufficient output amount"));
        }
        w.swap_count += 1;
        Ok(out)
    }
}

pub struct SimNetwork(SharedWorld);

impl Network for SimNetwork {
    fn current_network_base_fee(&self) -> Result<u128, Revert> {
        self.0
            .borrow()
            .base_fee
            .ok_or_else(|| Revert::new("base fee opcode unavailable"))
    }

    fn timestamp(&self) -> u64 {
        self.0.borrow().timestamp
    }
}

pub fn collaborators(world: &SharedWorld, owner: Address) -> Collaborators {
    Collaborators {
        oracle: Box::new(SimOracle(world.clone())),
        facility: Box::new(SimFacility {
            world: world.clone(),
            owner,
        }),
        reserve: Box::new(SimReserve {
            world: world.clone(),
            owner,
        }),
        swap: Box::new(SimSwap(world.clone())),
        network: Box::new(SimNetwork(world.clone())),
    }
}

/// Engine with default parameters owned by [`OWNER`]
pub fn strategy(world: &SharedWorld) -> Strategy {
    strategy_with(world, StrategyParams::default())
}

pub fn strategy_with(world: &SharedWorld, params: StrategyParams) -> Strategy {
    Strategy::new(OWNER, params, collaborators(world, OWNER)).expect("valid test params")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_accounting_at_protocol_scale() {
        let mut w = World::default();
        w.share_price = WAD * 105 / 100;
        w.park(OWNER, 1_000_000 * WAD);
        assert!(w.parked_value(&OWNER) <= 1_000_000 * WAD);
        assert!(1_000_000 * WAD - w.parked_value(&OWNER) < 2);
    }

    #[test]
    fn test_reserve_withdraw_large_position() {
        let world = shared(World::default());
        world.borrow_mut().park(OWNER, 50_000 * WAD);
        world.borrow_mut().reserve_loss_bps = 1;

        let mut reserve = SimReserve {
            world: world.clone(),
            owner: OWNER,
        };
        let received = reserve.withdraw(10_000 * WAD, 1).unwrap();
        assert_eq!(received, 9_999 * WAD);
        assert_eq!(world.borrow().parked_value(&OWNER), 40_000 * WAD);
        assert!(reserve.withdraw(WAD, 0).is_err());
    }

    #[test]
    fn test_swap_applies_fee_at_scale() {
        let world = shared(World::default());
        world.borrow_mut().swap_fee_bps = 30;
        let mut swap = SimSwap(world.clone());

        let quote = 200_000 * WAD;
        let out = swap
            .swap_exact_in(Asset::Base, Asset::Investment, 100 * WAD, 0, u64::MAX)
            .unwrap();
        assert_eq!(out, quote * 9_970 / 10_000);
        assert!(swap
            .swap_exact_in(Asset::Base, Asset::Investment, 100 * WAD, quote, u64::MAX)
            .is_err());
    }
}
