//! Liquidity-share token
//!
//! Balances are stored scaled by 1/index so that the compounding supply
//! index alone credits every holder: `balance = scaled * index`. Minting and
//! burning convert through the index of the moment.

use crate::error::ReserveError;
use alloy_primitives::U256;
use opensky_core::{math, AccountId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scaled-balance share token of one reserve
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct OToken {
    scaled_balances: HashMap<AccountId, U256>,
    scaled_total_supply: U256,
}

impl OToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scaled_balance_of(&self, who: &AccountId) -> U256 {
        self.scaled_balances.get(who).copied().unwrap_or(U256::ZERO)
    }

    pub fn scaled_total_supply(&self) -> U256 {
        self.scaled_total_supply
    }

    /// Real balance at the given supply index
    pub fn balance_of(&self, who: &AccountId, index: U256) -> Result<U256, ReserveError> {
        Ok(math::ray_mul(self.scaled_balance_of(who), index)?)
    }

    /// Real total supply at the given supply index
    pub fn total_supply(&self, index: U256) -> Result<U256, ReserveError> {
        Ok(math::ray_mul(self.scaled_total_supply, index)?)
    }

    /// Mint shares worth `amount` underlying at `index`
    pub fn mint(&mut self, to: &AccountId, amount: U256, index: U256) -> Result<U256, ReserveError> {
        let scaled = math::ray_div(amount, index)?;
        self.mint_scaled(to, scaled);
        Ok(scaled)
    }

    /// Mint raw scaled units (treasury income path)
    pub fn mint_scaled(&mut self, to: &AccountId, scaled: U256) {
        if scaled.is_zero() {
            return;
        }
        let entry = self
            .scaled_balances
            .entry(to.clone())
            .or_insert(U256::ZERO);
        *entry += scaled;
        self.scaled_total_supply += scaled;
    }

    /// Burn shares worth `amount` underlying at `index`
    pub fn burn(
        &mut self,
        from: &AccountId,
        amount: U256,
        index: U256,
    ) -> Result<U256, ReserveError> {
        let scaled = math::ray_div(amount, index)?;
        let balance = self.scaled_balance_of(from);
        if balance < scaled {
            return Err(ReserveError::InsufficientShares {
                available: balance.to_string(),
                required: scaled.to_string(),
            });
        }
        self.scaled_balances.insert(from.clone(), balance - scaled);
        self.scaled_total_supply -= scaled;
        Ok(scaled)
    }

    /// Transfer shares worth `amount` underlying at `index`
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: U256,
        index: U256,
    ) -> Result<(), ReserveError> {
        let scaled = math::ray_div(amount, index)?;
        let balance = self.scaled_balance_of(from);
        if balance < scaled {
            return Err(ReserveError::InsufficientShares {
                available: balance.to_string(),
                required: scaled.to_string(),
            });
        }
        self.scaled_balances.insert(from.clone(), balance - scaled);
        let entry = self
            .scaled_balances
            .entry(to.clone())
            .or_insert(U256::ZERO);
        *entry += scaled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opensky_core::{RAY, WAD};

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    #[test]
    fn test_mint_at_initial_index() {
        let mut token = OToken::new();
        token.mint(&alice(), WAD, RAY).unwrap();

        assert_eq!(token.scaled_balance_of(&alice()), WAD);
        assert_eq!(token.balance_of(&alice(), RAY).unwrap(), WAD);
        assert_eq!(token.total_supply(RAY).unwrap(), WAD);
    }

    #[test]
    fn test_index_growth_credits_holders() {
        let mut token = OToken::new();
        token.mint(&alice(), WAD, RAY).unwrap();

        // index grows 5%
        let index = RAY + RAY / U256::from(20u64);
        let balance = token.balance_of(&alice(), index).unwrap();
        assert_eq!(balance, WAD + WAD / U256::from(20u64));
    }

    #[test]
    fn test_mint_at_grown_index_scales_down() {
        let mut token = OToken::new();
        let index = U256::from(2u64) * RAY;
        token.mint(&alice(), WAD, index).unwrap();

        assert_eq!(token.scaled_balance_of(&alice()), WAD / U256::from(2u64));
        assert_eq!(token.balance_of(&alice(), index).unwrap(), WAD);
    }

    #[test]
    fn test_burn_more_than_balance_rejected() {
        let mut token = OToken::new();
        token.mint(&alice(), WAD, RAY).unwrap();

        let result = token.burn(&alice(), WAD * U256::from(2u64), RAY);
        assert!(matches!(result, Err(ReserveError::InsufficientShares { .. })));
    }

    #[test]
    fn test_transfer_moves_shares() {
        let mut token = OToken::new();
        let bob = AccountId::new("bob");
        token.mint(&alice(), WAD, RAY).unwrap();

        token
            .transfer(&alice(), &bob, WAD / U256::from(4u64), RAY)
            .unwrap();
        assert_eq!(
            token.balance_of(&alice(), RAY).unwrap(),
            WAD * U256::from(3u64) / U256::from(4u64)
        );
        assert_eq!(token.balance_of(&bob, RAY).unwrap(), WAD / U256::from(4u64));
        // total supply unchanged
        assert_eq!(token.total_supply(RAY).unwrap(), WAD);
    }
}
