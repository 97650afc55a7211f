//! In-memory cash balances
//!
//! Off-chain stand-in for underlying-token custody. Balances are keyed by
//! (account, asset); a transfer either fully applies or fails - there is no
//! partial application.

use crate::error::CustodyError;
use alloy_primitives::U256;
use opensky_core::{AccountId, Asset};
use std::collections::HashMap;

/// Cash balance map
#[derive(Debug, Default, Clone)]
pub struct CashLedger {
    balances: HashMap<(AccountId, Asset), U256>,
}

impl CashLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get balance for an account (zero if never credited)
    pub fn balance_of(&self, account: &AccountId, asset: &Asset) -> U256 {
        self.balances
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Credit an account out of thin air.
    ///
    /// Only the faucet/genesis path uses this; everything else moves money
    /// with [`CashLedger::transfer`].
    pub fn credit(
        &mut self,
        account: &AccountId,
        asset: &Asset,
        amount: U256,
    ) -> Result<(), CustodyError> {
        if amount.is_zero() {
            return Err(CustodyError::AmountZero);
        }
        let entry = self
            .balances
            .entry((account.clone(), asset.clone()))
            .or_insert(U256::ZERO);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| CustodyError::BalanceOverflow {
                account: account.clone(),
                asset: asset.clone(),
            })?;
        Ok(())
    }

    /// Move `amount` of `asset` from one account to another.
    ///
    /// Fails with `InsufficientBalance` without touching either side.
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        asset: &Asset,
        amount: U256,
    ) -> Result<(), CustodyError> {
        if amount.is_zero() {
            return Err(CustodyError::AmountZero);
        }

        let from_balance = self.balance_of(from, asset);
        if from_balance < amount {
            return Err(CustodyError::InsufficientBalance {
                account: from.clone(),
                asset: asset.clone(),
                available: from_balance.to_string(),
                required: amount.to_string(),
            });
        }

        let to_balance = self.balance_of(to, asset);
        let new_to = to_balance
            .checked_add(amount)
            .ok_or_else(|| CustodyError::BalanceOverflow {
                account: to.clone(),
                asset: asset.clone(),
            })?;

        self.balances
            .insert((from.clone(), asset.clone()), from_balance - amount);
        self.balances.insert((to.clone(), asset.clone()), new_to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> Asset {
        Asset::new("WETH")
    }

    #[test]
    fn test_credit_and_balance() {
        let mut cash = CashLedger::new();
        let alice = AccountId::new("alice");

        cash.credit(&alice, &weth(), U256::from(100u64)).unwrap();
        assert_eq!(cash.balance_of(&alice, &weth()), U256::from(100u64));
    }

    #[test]
    fn test_transfer_moves_funds() {
        let mut cash = CashLedger::new();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        cash.credit(&alice, &weth(), U256::from(100u64)).unwrap();
        cash.transfer(&alice, &bob, &weth(), U256::from(40u64)).unwrap();

        assert_eq!(cash.balance_of(&alice, &weth()), U256::from(60u64));
        assert_eq!(cash.balance_of(&bob, &weth()), U256::from(40u64));
    }

    #[test]
    fn test_transfer_insufficient_rejected() {
        let mut cash = CashLedger::new();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        cash.credit(&alice, &weth(), U256::from(10u64)).unwrap();
        let result = cash.transfer(&alice, &bob, &weth(), U256::from(11u64));

        assert!(matches!(result, Err(CustodyError::InsufficientBalance { .. })));
        // nothing moved
        assert_eq!(cash.balance_of(&alice, &weth()), U256::from(10u64));
        assert_eq!(cash.balance_of(&bob, &weth()), U256::ZERO);
    }

    #[test]
    fn test_zero_transfer_rejected() {
        let mut cash = CashLedger::new();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        let result = cash.transfer(&alice, &bob, &weth(), U256::ZERO);
        assert_eq!(result, Err(CustodyError::AmountZero));
    }
}
