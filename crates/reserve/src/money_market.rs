//! External money-market adapter
//!
//! When a reserve's pass-through is on, idle liquidity sits in an external
//! money market and its balance growth is harvested into the supply index at
//! every state update. The adapter is a capability interface; the mock
//! simulates yield with an explicit `accrue`.

use crate::error::MoneyMarketError;
use alloy_primitives::U256;
use opensky_core::Asset;
use std::collections::HashMap;

/// Deposit/withdraw/balance view of an external money market
pub trait MoneyMarket: Send + Sync {
    fn balance_of(&self, asset: &Asset) -> U256;

    fn deposit(&mut self, asset: &Asset, amount: U256) -> Result<(), MoneyMarketError>;

    fn withdraw(&mut self, asset: &Asset, amount: U256) -> Result<(), MoneyMarketError>;
}

/// In-memory money market with simulated yield
#[derive(Debug, Default, Clone)]
pub struct MockMoneyMarket {
    balances: HashMap<Asset, U256>,
}

impl MockMoneyMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate yield: grow the held balance by `amount`
    pub fn accrue(&mut self, asset: &Asset, amount: U256) {
        let entry = self.balances.entry(asset.clone()).or_insert(U256::ZERO);
        *entry += amount;
    }
}

impl MoneyMarket for MockMoneyMarket {
    fn balance_of(&self, asset: &Asset) -> U256 {
        self.balances.get(asset).copied().unwrap_or(U256::ZERO)
    }

    fn deposit(&mut self, asset: &Asset, amount: U256) -> Result<(), MoneyMarketError> {
        let entry = self.balances.entry(asset.clone()).or_insert(U256::ZERO);
        *entry = entry
            .checked_add(amount)
            .ok_or(MoneyMarketError::BalanceOverflow)?;
        Ok(())
    }

    fn withdraw(&mut self, asset: &Asset, amount: U256) -> Result<(), MoneyMarketError> {
        let balance = self.balance_of(asset);
        if balance < amount {
            return Err(MoneyMarketError::WithdrawExceedsBalance {
                requested: amount.to_string(),
                available: balance.to_string(),
            });
        }
        self.balances.insert(asset.clone(), balance - amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_withdraw_cycle() {
        let mut mm = MockMoneyMarket::new();
        let weth = Asset::new("WETH");

        mm.deposit(&weth, U256::from(100u64)).unwrap();
        assert_eq!(mm.balance_of(&weth), U256::from(100u64));

        mm.withdraw(&weth, U256::from(30u64)).unwrap();
        assert_eq!(mm.balance_of(&weth), U256::from(70u64));
    }

    #[test]
    fn test_overdraw_rejected() {
        let mut mm = MockMoneyMarket::new();
        let weth = Asset::new("WETH");

        mm.deposit(&weth, U256::from(10u64)).unwrap();
        let result = mm.withdraw(&weth, U256::from(11u64));
        assert!(matches!(
            result,
            Err(MoneyMarketError::WithdrawExceedsBalance { .. })
        ));
    }

    #[test]
    fn test_accrue_grows_balance() {
        let mut mm = MockMoneyMarket::new();
        let weth = Asset::new("WETH");

        mm.deposit(&weth, U256::from(100u64)).unwrap();
        mm.accrue(&weth, U256::from(5u64));
        assert_eq!(mm.balance_of(&weth), U256::from(105u64));
    }
}
