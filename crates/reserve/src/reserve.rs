//! Per-asset reserve accounting
//!
//! A reserve tracks deposits through a compounding supply index, borrows
//! through a principal total plus an aggregated per-second interest rate,
//! and optionally passes idle liquidity through an external money market.
//!
//! Accrual is split in two phases so that composite operations stay atomic:
//! [`Reserve::preview_accrual`] is pure and fallible, [`Reserve::apply_accrual`]
//! is infallible. Callers run every fallible check against the preview before
//! mutating anything.

use crate::error::ReserveError;
use crate::money_market::MoneyMarket;
use crate::otoken::OToken;
use alloy_primitives::U256;
use opensky_core::{math, AccountId, Asset, ReserveId, RAY};
use tracing::debug;

/// Result of folding pending income into the supply index.
///
/// `new_index >= last_supply_index` always holds: income is non-negative and
/// the index only ever grows.
#[derive(Debug, Clone, Copy)]
pub struct Accrual {
    pub now: u64,
    pub new_index: U256,
    /// Scaled oToken units minted to the treasury for its cut
    pub treasury_scaled_mint: U256,
    /// Interest accrued on borrows since the last update (wei)
    pub borrow_interest_delta: U256,
    /// Money-market balance observed during the preview
    pub observed_money_market_balance: U256,
}

/// One lending reserve (one underlying asset)
#[derive(Debug)]
pub struct Reserve {
    pub reserve_id: ReserveId,
    pub underlying_asset: Asset,
    pub otoken: OToken,
    pub treasury: AccountId,

    pub is_money_market_on: bool,
    /// Compounding multiplier from scaled shares to real balance (ray)
    pub last_supply_index: U256,
    /// Outstanding principal across all active loans (wei)
    pub total_borrows: U256,
    /// Sum of active loans' interest-per-second (ray-scaled wei/second)
    pub borrowing_interest_per_second: U256,
    /// Interest accrued into the index but not yet repaid (wei)
    pub accrued_borrow_interest: U256,
    pub last_update_timestamp: u64,
    pub last_money_market_balance: U256,
    /// Basis points of each income event diverted to the treasury
    pub treasury_factor_bps: u64,
    /// Un-lent liquidity held locally (wei); zero while the money market is on
    pub local_cash: U256,
}

impl Reserve {
    pub fn new(
        reserve_id: ReserveId,
        underlying_asset: Asset,
        treasury: AccountId,
        treasury_factor_bps: u64,
        now: u64,
    ) -> Self {
        Self {
            reserve_id,
            underlying_asset,
            otoken: OToken::new(),
            treasury,
            is_money_market_on: false,
            last_supply_index: RAY,
            total_borrows: U256::ZERO,
            borrowing_interest_per_second: U256::ZERO,
            accrued_borrow_interest: U256::ZERO,
            last_update_timestamp: now,
            last_money_market_balance: U256::ZERO,
            treasury_factor_bps,
            local_cash: U256::ZERO,
        }
    }

    /// Liquidity immediately available for withdraw/borrow (wei)
    pub fn available_liquidity(&self) -> U256 {
        self.local_cash + self.last_money_market_balance
    }

    /// Outstanding principal plus all accrued interest at `now` (wei)
    pub fn total_borrows_balance(&self, now: u64) -> Result<U256, ReserveError> {
        let pending = if now > self.last_update_timestamp {
            math::ray_mul(
                self.borrowing_interest_per_second,
                U256::from(now - self.last_update_timestamp),
            )?
        } else {
            U256::ZERO
        };
        Ok(self.total_borrows + self.accrued_borrow_interest + pending)
    }

    /// Real value of all outstanding shares at the stored index (wei)
    pub fn total_deposits(&self) -> Result<U256, ReserveError> {
        self.otoken.total_supply(self.last_supply_index)
    }

    /// Current supply index without mutating state (view).
    ///
    /// Folds pending money-market growth and borrow interest exactly as a
    /// state update would.
    pub fn normalized_income(
        &self,
        now: u64,
        mm: &dyn MoneyMarket,
    ) -> Result<U256, ReserveError> {
        Ok(self.preview_accrual(now, U256::ZERO, mm)?.new_index)
    }

    /// Compute the accrual that a state update at `now` would apply.
    ///
    /// Pure: reads the money market but mutates nothing. `additional_income`
    /// is extra realized income (penalties) delivered by the caller in the
    /// same operation.
    pub fn preview_accrual(
        &self,
        now: u64,
        additional_income: U256,
        mm: &dyn MoneyMarket,
    ) -> Result<Accrual, ReserveError> {
        if now < self.last_update_timestamp {
            return Err(ReserveError::ClockWentBackwards {
                last: self.last_update_timestamp,
                now,
            });
        }

        let observed = if self.is_money_market_on {
            mm.balance_of(&self.underlying_asset)
        } else {
            self.last_money_market_balance
        };
        if observed < self.last_money_market_balance {
            return Err(ReserveError::MoneyMarketBalanceDecreased {
                last: self.last_money_market_balance.to_string(),
                observed: observed.to_string(),
            });
        }
        let money_market_delta = observed - self.last_money_market_balance;

        let time_delta = U256::from(now - self.last_update_timestamp);
        let borrow_interest_delta =
            math::ray_mul(self.borrowing_interest_per_second, time_delta)?;

        // all income terms ray-scaled (wei * RAY)
        let total_income = additional_income
            .checked_mul(RAY)
            .and_then(|a| money_market_delta.checked_mul(RAY).and_then(|m| a.checked_add(m)))
            .and_then(|a| borrow_interest_delta.checked_mul(RAY).and_then(|b| a.checked_add(b)))
            .ok_or(math::MathError::Overflow)?;

        let scaled_supply = self.otoken.scaled_total_supply();
        if total_income.is_zero() || scaled_supply.is_zero() {
            return Ok(Accrual {
                now,
                new_index: self.last_supply_index,
                treasury_scaled_mint: U256::ZERO,
                borrow_interest_delta,
                observed_money_market_balance: observed,
            });
        }

        let treasury_income = math::percent_mul(total_income, self.treasury_factor_bps)?;
        let users_income = total_income - treasury_income;

        // floor on both: keeps the sum of balances bounded by total supply
        let index_increment = users_income / scaled_supply;
        let new_index = self
            .last_supply_index
            .checked_add(index_increment)
            .ok_or(math::MathError::Overflow)?;
        let treasury_scaled_mint = treasury_income / new_index;

        Ok(Accrual {
            now,
            new_index,
            treasury_scaled_mint,
            borrow_interest_delta,
            observed_money_market_balance: observed,
        })
    }

    /// Apply a previously computed accrual. Infallible by construction.
    pub fn apply_accrual(&mut self, accrual: &Accrual) {
        debug!(
            reserve = %self.reserve_id,
            index = %accrual.new_index,
            treasury_scaled = %accrual.treasury_scaled_mint,
            "accrual applied"
        );
        self.last_supply_index = accrual.new_index;
        self.accrued_borrow_interest += accrual.borrow_interest_delta;
        self.last_money_market_balance = accrual.observed_money_market_balance;
        self.last_update_timestamp = accrual.now;
        let treasury = self.treasury.clone();
        self.otoken.mint_scaled(&treasury, accrual.treasury_scaled_mint);
    }

    /// Fold pending income into the index (deposit/withdraw/borrow/repay all
    /// start here).
    pub fn update_state(
        &mut self,
        now: u64,
        additional_income: U256,
        mm: &dyn MoneyMarket,
    ) -> Result<Accrual, ReserveError> {
        let accrual = self.preview_accrual(now, additional_income, mm)?;
        self.apply_accrual(&accrual);
        Ok(accrual)
    }

    /// Accept `amount` of underlying on behalf of a depositor.
    ///
    /// The caller has already moved the cash into custody; this updates the
    /// index, mints shares and forwards to the money market if it is on.
    pub fn deposit(
        &mut self,
        now: u64,
        amount: U256,
        on_behalf_of: &AccountId,
        mm: &mut dyn MoneyMarket,
    ) -> Result<(), ReserveError> {
        if amount.is_zero() {
            return Err(ReserveError::AmountZero);
        }

        let accrual = self.preview_accrual(now, U256::ZERO, mm)?;
        // fallible conversion before any mutation
        let scaled = math::ray_div(amount, accrual.new_index)?;

        if self.is_money_market_on {
            mm.deposit(&self.underlying_asset, amount)?;
        }

        self.apply_accrual(&accrual);
        if self.is_money_market_on {
            self.last_money_market_balance += amount;
        } else {
            self.local_cash += amount;
        }
        self.otoken.mint_scaled(on_behalf_of, scaled);
        Ok(())
    }

    /// Burn shares worth `amount` and release the underlying.
    pub fn withdraw(
        &mut self,
        now: u64,
        amount: U256,
        from: &AccountId,
        mm: &mut dyn MoneyMarket,
    ) -> Result<(), ReserveError> {
        if amount.is_zero() {
            return Err(ReserveError::AmountZero);
        }

        let accrual = self.preview_accrual(now, U256::ZERO, mm)?;

        let available = self.local_cash + accrual.observed_money_market_balance;
        if amount > available {
            return Err(ReserveError::InsufficientLiquidity {
                available: available.to_string(),
                requested: amount.to_string(),
            });
        }

        let scaled = math::ray_div(amount, accrual.new_index)?;
        let scaled_balance = self.otoken.scaled_balance_of(from);
        if scaled_balance < scaled {
            return Err(ReserveError::InsufficientShares {
                available: scaled_balance.to_string(),
                required: scaled.to_string(),
            });
        }

        if self.is_money_market_on {
            mm.withdraw(&self.underlying_asset, amount)?;
        }

        self.apply_accrual(&accrual);
        if self.is_money_market_on {
            self.last_money_market_balance -= amount;
        } else {
            self.local_cash -= amount;
        }
        // cannot fail: balance was checked against the same index
        let _ = self.otoken.burn(from, amount, accrual.new_index);
        Ok(())
    }

    /// Register a freshly minted loan: move principal out of liquidity and
    /// onto the borrow book.
    pub fn add_borrows(
        &mut self,
        amount: U256,
        interest_per_second: U256,
        mm: &mut dyn MoneyMarket,
    ) -> Result<(), ReserveError> {
        let available = self.available_liquidity();
        if amount > available {
            return Err(ReserveError::InsufficientLiquidity {
                available: available.to_string(),
                requested: amount.to_string(),
            });
        }

        if self.is_money_market_on {
            mm.withdraw(&self.underlying_asset, amount)?;
            self.last_money_market_balance -= amount;
        } else {
            self.local_cash -= amount;
        }

        self.total_borrows += amount;
        self.borrowing_interest_per_second += interest_per_second;
        Ok(())
    }

    /// Settle a loan: return principal (plus interest already counted as
    /// income) to liquidity and take it off the borrow book.
    ///
    /// `received` is the full cash delivered (principal + interest + any
    /// penalty); `interest` the interest portion.
    pub fn remove_borrows(
        &mut self,
        principal: U256,
        interest: U256,
        received: U256,
        interest_per_second: U256,
        mm: &mut dyn MoneyMarket,
    ) -> Result<(), ReserveError> {
        if !received.is_zero() {
            if self.is_money_market_on {
                mm.deposit(&self.underlying_asset, received)?;
                self.last_money_market_balance += received;
            } else {
                self.local_cash += received;
            }
        }

        // saturating: per-loan rounding can differ from the aggregate by wei
        self.total_borrows = self.total_borrows.saturating_sub(principal);
        self.accrued_borrow_interest = self.accrued_borrow_interest.saturating_sub(interest);
        self.borrowing_interest_per_second = self
            .borrowing_interest_per_second
            .saturating_sub(interest_per_second);
        Ok(())
    }

    /// Move the entire local balance into the money market.
    ///
    /// Fails loudly if the pass-through is already on.
    pub fn open_money_market(&mut self, mm: &mut dyn MoneyMarket) -> Result<(), ReserveError> {
        if self.is_money_market_on {
            return Err(ReserveError::MoneyMarketAlreadyOpen);
        }
        if !self.local_cash.is_zero() {
            mm.deposit(&self.underlying_asset, self.local_cash)?;
        }
        self.last_money_market_balance = mm.balance_of(&self.underlying_asset);
        self.local_cash = U256::ZERO;
        self.is_money_market_on = true;
        Ok(())
    }

    /// Pull the entire balance back from the money market.
    ///
    /// Fails loudly if the pass-through is already off.
    pub fn close_money_market(&mut self, mm: &mut dyn MoneyMarket) -> Result<(), ReserveError> {
        if !self.is_money_market_on {
            return Err(ReserveError::MoneyMarketAlreadyClosed);
        }
        let balance = mm.balance_of(&self.underlying_asset);
        if !balance.is_zero() {
            mm.withdraw(&self.underlying_asset, balance)?;
        }
        self.local_cash += balance;
        self.last_money_market_balance = U256::ZERO;
        self.is_money_market_on = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money_market::MockMoneyMarket;
    use opensky_core::WAD;

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn bob() -> AccountId {
        AccountId::new("bob")
    }

    fn fresh_reserve(treasury_bps: u64) -> Reserve {
        Reserve::new(
            ReserveId(1),
            Asset::new("WETH"),
            AccountId::system("TREASURY"),
            treasury_bps,
            1_000,
        )
    }

    #[test]
    fn test_first_deposit_index_is_ray() {
        let mut reserve = fresh_reserve(0);
        let mut mm = MockMoneyMarket::new();

        reserve.deposit(1_000, WAD, &alice(), &mut mm).unwrap();

        assert_eq!(reserve.last_supply_index, RAY);
        assert_eq!(reserve.otoken.total_supply(RAY).unwrap(), WAD);
        assert_eq!(reserve.otoken.balance_of(&alice(), RAY).unwrap(), WAD);
        assert_eq!(reserve.available_liquidity(), WAD);
    }

    #[test]
    fn test_zero_deposit_rejected() {
        let mut reserve = fresh_reserve(0);
        let mut mm = MockMoneyMarket::new();

        let result = reserve.deposit(1_000, U256::ZERO, &alice(), &mut mm);
        assert_eq!(result, Err(ReserveError::AmountZero));
    }

    #[test]
    fn test_withdraw_more_than_liquidity_rejected() {
        let mut reserve = fresh_reserve(0);
        let mut mm = MockMoneyMarket::new();

        reserve.deposit(1_000, WAD, &alice(), &mut mm).unwrap();
        let result = reserve.withdraw(1_001, WAD * U256::from(2u64), &alice(), &mut mm);
        assert!(matches!(
            result,
            Err(ReserveError::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn test_money_market_growth_raises_index() {
        let mut reserve = fresh_reserve(0);
        let mut mm = MockMoneyMarket::new();

        reserve.deposit(1_000, WAD, &alice(), &mut mm).unwrap();
        reserve.open_money_market(&mut mm).unwrap();

        // 10% yield appears in the money market
        mm.accrue(&Asset::new("WETH"), WAD / U256::from(10u64));
        reserve.update_state(2_000, U256::ZERO, &mm).unwrap();

        assert_eq!(reserve.last_supply_index, RAY + RAY / U256::from(10u64));
        let balance = reserve
            .otoken
            .balance_of(&alice(), reserve.last_supply_index)
            .unwrap();
        assert_eq!(balance, WAD + WAD / U256::from(10u64));
    }

    #[test]
    fn test_index_never_decreases() {
        let mut reserve = fresh_reserve(500);
        let mut mm = MockMoneyMarket::new();

        reserve.deposit(1_000, WAD, &alice(), &mut mm).unwrap();
        reserve.open_money_market(&mut mm).unwrap();
        let mut last_index = reserve.last_supply_index;

        for step in 1..5u64 {
            mm.accrue(&Asset::new("WETH"), U256::from(1234u64) * U256::from(step));
            reserve
                .update_state(1_000 + step * 100, U256::ZERO, &mm)
                .unwrap();
            assert!(reserve.last_supply_index >= last_index);
            last_index = reserve.last_supply_index;
        }
    }

    #[test]
    fn test_treasury_takes_cut() {
        // 20% treasury factor
        let mut reserve = fresh_reserve(2_000);
        let mut mm = MockMoneyMarket::new();

        reserve.deposit(1_000, WAD, &alice(), &mut mm).unwrap();
        reserve.open_money_market(&mut mm).unwrap();

        mm.accrue(&Asset::new("WETH"), WAD / U256::from(10u64));
        reserve.update_state(2_000, U256::ZERO, &mm).unwrap();

        let index = reserve.last_supply_index;
        let treasury_balance = reserve
            .otoken
            .balance_of(&AccountId::system("TREASURY"), index)
            .unwrap();
        let alice_balance = reserve.otoken.balance_of(&alice(), index).unwrap();

        // treasury got ~20% of the 0.1 WAD income
        let expected_cut = WAD / U256::from(50u64);
        assert!(treasury_balance <= expected_cut);
        assert!(treasury_balance >= expected_cut - U256::from(10u64));

        // no value created from nothing
        let total = reserve.otoken.total_supply(index).unwrap();
        assert!(alice_balance + treasury_balance <= total);
    }

    #[test]
    fn test_accounting_invariant_with_borrows() {
        let mut reserve = fresh_reserve(1_000);
        let mut mm = MockMoneyMarket::new();

        reserve.deposit(1_000, WAD * U256::from(10u64), &alice(), &mut mm).unwrap();
        reserve.deposit(1_000, WAD * U256::from(5u64), &bob(), &mut mm).unwrap();

        // borrow 6 WETH at a 10% yearly rate
        let ips = WAD * U256::from(6u64) * (RAY / U256::from(10u64))
            / U256::from(opensky_core::SECONDS_PER_YEAR);
        reserve
            .add_borrows(WAD * U256::from(6u64), ips, &mut mm)
            .unwrap();

        // a year passes
        let now = 1_000 + opensky_core::SECONDS_PER_YEAR;
        reserve.update_state(now, U256::ZERO, &mm).unwrap();

        let deposits = reserve.total_deposits().unwrap();
        let liquidity = reserve.available_liquidity();
        let borrows = reserve.total_borrows_balance(now).unwrap();

        // within a few wei of rounding
        let lhs = liquidity + borrows;
        let diff = if lhs > deposits { lhs - deposits } else { deposits - lhs };
        assert!(diff <= U256::from(10u64), "diff {}", diff);
    }

    #[test]
    fn test_money_market_toggle_guards() {
        let mut reserve = fresh_reserve(0);
        let mut mm = MockMoneyMarket::new();

        assert_eq!(
            reserve.close_money_market(&mut mm),
            Err(ReserveError::MoneyMarketAlreadyClosed)
        );

        reserve.deposit(1_000, WAD, &alice(), &mut mm).unwrap();
        reserve.open_money_market(&mut mm).unwrap();
        assert_eq!(
            reserve.open_money_market(&mut mm),
            Err(ReserveError::MoneyMarketAlreadyOpen)
        );

        // toggle moved everything
        assert_eq!(reserve.local_cash, U256::ZERO);
        assert_eq!(reserve.last_money_market_balance, WAD);

        reserve.close_money_market(&mut mm).unwrap();
        assert_eq!(reserve.local_cash, WAD);
        assert_eq!(reserve.last_money_market_balance, U256::ZERO);
    }

    #[test]
    fn test_clock_backwards_rejected() {
        let mut reserve = fresh_reserve(0);
        let mm = MockMoneyMarket::new();
        let result = reserve.preview_accrual(500, U256::ZERO, &mm);
        assert!(matches!(result, Err(ReserveError::ClockWentBackwards { .. })));
    }
}
