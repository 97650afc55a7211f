//! The pool - single consistency boundary
//!
//! Every composite operation takes `&mut self` plus the external
//! collaborators it needs (money market, oracle), and follows the same
//! discipline: validate and compute on immutable state first, then mutate.
//! An error never leaves partial state behind; the mutate phase only runs
//! steps whose preconditions were already proven.

use crate::error::PoolError;
use alloy_primitives::U256;
use opensky_auction::{Auction, AuctionError, AuctionStatus};
use opensky_bespoke::{BespokeMarket, BorrowOffer, OfferSignature};
use opensky_core::{
    math, AccountId, Asset, AuctionId, LoanId, NftId, ReserveId, RoleRegistry,
    StaticRoleRegistry,
};
use opensky_ledger::{
    auction_escrow, bespoke_escrow, loan_escrow, money_market_account, treasury, CashLedger,
    CustodyError, NftRegistry,
};
use opensky_loan::{CollectionConfig, FlashClaimReceiver, Loan, LoanError, LoanStatus};
use opensky_oracle::PriceOracle;
use opensky_rates::{DefaultInterestRateStrategy, InterestRateStrategy};
use opensky_reserve::{MoneyMarket, Reserve};
use std::collections::HashMap;
use tracing::{info, warn};

/// Global ledger state behind one mutable boundary
pub struct Pool {
    pub cash: CashLedger,
    pub nfts: NftRegistry,
    pub bespoke: BespokeMarket,
    roles: StaticRoleRegistry,
    reserves: HashMap<ReserveId, Reserve>,
    strategies: HashMap<ReserveId, Box<dyn InterestRateStrategy>>,
    loans: HashMap<LoanId, Loan>,
    auctions: HashMap<AuctionId, Auction>,
    /// Links liquidation auctions back to the loan they settle
    auction_loans: HashMap<AuctionId, LoanId>,
    collections: HashMap<String, CollectionConfig>,
    paused: bool,
    next_reserve_id: u32,
    next_loan_id: u64,
    next_auction_id: u64,
}

const BESPOKE_OVERDUE_DURATION: u64 = 7 * 86_400;
const BESPOKE_PREPAYMENT_FEE_BPS: u64 = 25;
const BESPOKE_OVERDUE_FEE_BPS: u64 = 100;

impl Pool {
    pub fn new(roles: StaticRoleRegistry) -> Self {
        Self {
            cash: CashLedger::new(),
            nfts: NftRegistry::new(),
            bespoke: BespokeMarket::new(
                BESPOKE_OVERDUE_DURATION,
                BESPOKE_PREPAYMENT_FEE_BPS,
                BESPOKE_OVERDUE_FEE_BPS,
            ),
            roles,
            reserves: HashMap::new(),
            strategies: HashMap::new(),
            loans: HashMap::new(),
            auctions: HashMap::new(),
            auction_loans: HashMap::new(),
            collections: HashMap::new(),
            paused: false,
            next_reserve_id: 1,
            next_loan_id: 1,
            next_auction_id: 1,
        }
    }

    // === guards ===

    fn ensure_not_paused(&self) -> Result<(), PoolError> {
        if self.paused {
            return Err(PoolError::Paused);
        }
        Ok(())
    }

    fn ensure_governance(&self, who: &AccountId) -> Result<(), PoolError> {
        if !self.roles.is_governance(who) {
            return Err(PoolError::NotAuthorized {
                who: who.clone(),
                role: "governance",
            });
        }
        Ok(())
    }

    fn ensure_cash(&self, who: &AccountId, asset: &Asset, required: U256) -> Result<(), PoolError> {
        let available = self.cash.balance_of(who, asset);
        if available < required {
            return Err(PoolError::InsufficientFunds {
                who: who.clone(),
                available: available.to_string(),
                required: required.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_nft_owner(&self, nft: &NftId, who: &AccountId) -> Result<(), PoolError> {
        let owner = self.nfts.owner_of(nft)?;
        if owner != who {
            return Err(CustodyError::NotNftOwner {
                who: who.clone(),
                nft: nft.clone(),
                owner: owner.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn reserve(&self, reserve_id: ReserveId) -> Result<&Reserve, PoolError> {
        self.reserves
            .get(&reserve_id)
            .ok_or(PoolError::ReserveNotFound(reserve_id))
    }

    fn collection_config(&self, collection: &str) -> Result<&CollectionConfig, PoolError> {
        self.collections
            .get(collection)
            .filter(|c| c.enabled)
            .ok_or_else(|| PoolError::CollectionNotWhitelisted(collection.to_string()))
    }

    // === views ===

    pub fn reserve_view(&self, reserve_id: ReserveId) -> Result<&Reserve, PoolError> {
        self.reserve(reserve_id)
    }

    pub fn loan_view(&self, loan_id: LoanId) -> Result<&Loan, PoolError> {
        self.loans
            .get(&loan_id)
            .ok_or(PoolError::LoanNotFound(loan_id))
    }

    pub fn auction_view(&self, auction_id: AuctionId) -> Result<&Auction, PoolError> {
        self.auctions
            .get(&auction_id)
            .ok_or(PoolError::AuctionNotFound(auction_id))
    }

    pub fn loan_status(&self, loan_id: LoanId, now: u64) -> Result<LoanStatus, PoolError> {
        Ok(self.loan_view(loan_id)?.status(now))
    }

    pub fn auction_price(&self, auction_id: AuctionId, now: u64) -> Result<U256, PoolError> {
        Ok(self.auction_view(auction_id)?.price(now)?)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current supply index of a reserve, pending income included (view)
    pub fn reserve_normalized_income(
        &self,
        reserve_id: ReserveId,
        now: u64,
        mm: &dyn MoneyMarket,
    ) -> Result<U256, PoolError> {
        Ok(self.reserve(reserve_id)?.normalized_income(now, mm)?)
    }

    /// Absolute gap between `available + borrows` and `deposits` (wei).
    ///
    /// Should stay within a few wei of zero after any state update.
    pub fn accounting_gap(&self, reserve_id: ReserveId, now: u64) -> Result<U256, PoolError> {
        let reserve = self.reserve(reserve_id)?;
        let lhs = reserve.available_liquidity() + reserve.total_borrows_balance(now)?;
        let deposits = reserve.total_deposits()?;
        Ok(if lhs > deposits {
            lhs - deposits
        } else {
            deposits - lhs
        })
    }

    // === governance ===

    pub fn create_reserve(
        &mut self,
        caller: &AccountId,
        asset: Asset,
        treasury_factor_bps: u64,
        base_borrow_rate: U256,
        rate_slope1: U256,
        rate_slope2: U256,
        optimal_utilization_rate: U256,
        now: u64,
    ) -> Result<ReserveId, PoolError> {
        self.ensure_governance(caller)?;
        if self
            .reserves
            .values()
            .any(|r| r.underlying_asset == asset)
        {
            return Err(PoolError::ReserveAlreadyExists(asset.to_string()));
        }
        let strategy = DefaultInterestRateStrategy::new(
            base_borrow_rate,
            rate_slope1,
            rate_slope2,
            optimal_utilization_rate,
        )?;

        let reserve_id = ReserveId(self.next_reserve_id);
        self.next_reserve_id += 1;
        self.reserves.insert(
            reserve_id,
            Reserve::new(reserve_id, asset, treasury(), treasury_factor_bps, now),
        );
        self.strategies.insert(reserve_id, Box::new(strategy));
        info!(%reserve_id, "reserve created");
        Ok(reserve_id)
    }

    pub fn set_collection_config(
        &mut self,
        caller: &AccountId,
        collection: &str,
        config: CollectionConfig,
    ) -> Result<(), PoolError> {
        self.ensure_governance(caller)?;
        self.collections.insert(collection.to_uppercase(), config);
        Ok(())
    }

    pub fn pause(&mut self, caller: &AccountId) -> Result<(), PoolError> {
        if !self.roles.is_emergency_admin(caller) {
            return Err(PoolError::NotAuthorized {
                who: caller.clone(),
                role: "emergency admin",
            });
        }
        self.paused = true;
        warn!("pool paused");
        Ok(())
    }

    pub fn unpause(&mut self, caller: &AccountId) -> Result<(), PoolError> {
        if !self.roles.is_emergency_admin(caller) {
            return Err(PoolError::NotAuthorized {
                who: caller.clone(),
                role: "emergency admin",
            });
        }
        self.paused = false;
        Ok(())
    }

    pub fn open_money_market(
        &mut self,
        caller: &AccountId,
        reserve_id: ReserveId,
        now: u64,
        mm: &mut dyn MoneyMarket,
    ) -> Result<(), PoolError> {
        self.ensure_governance(caller)?;
        let reserve = self
            .reserves
            .get_mut(&reserve_id)
            .ok_or(PoolError::ReserveNotFound(reserve_id))?;
        if reserve.is_money_market_on {
            return Err(opensky_reserve::ReserveError::MoneyMarketAlreadyOpen.into());
        }
        reserve.update_state(now, U256::ZERO, mm)?;
        let moved = reserve.local_cash;
        let asset = reserve.underlying_asset.clone();
        reserve.open_money_market(mm)?;
        if !moved.is_zero() {
            self.cash.transfer(
                &AccountId::reserve_vault(reserve_id),
                &money_market_account(),
                &asset,
                moved,
            )?;
        }
        Ok(())
    }

    pub fn close_money_market(
        &mut self,
        caller: &AccountId,
        reserve_id: ReserveId,
        now: u64,
        mm: &mut dyn MoneyMarket,
    ) -> Result<(), PoolError> {
        self.ensure_governance(caller)?;
        let reserve = self
            .reserves
            .get_mut(&reserve_id)
            .ok_or(PoolError::ReserveNotFound(reserve_id))?;
        if !reserve.is_money_market_on {
            return Err(opensky_reserve::ReserveError::MoneyMarketAlreadyClosed.into());
        }
        reserve.update_state(now, U256::ZERO, mm)?;
        let moved = reserve.last_money_market_balance;
        let asset = reserve.underlying_asset.clone();
        reserve.close_money_market(mm)?;
        if !moved.is_zero() {
            self.cash.transfer(
                &money_market_account(),
                &AccountId::reserve_vault(reserve_id),
                &asset,
                moved,
            )?;
        }
        Ok(())
    }

    // === reserve operations ===

    pub fn deposit(
        &mut self,
        caller: &AccountId,
        reserve_id: ReserveId,
        amount: U256,
        on_behalf_of: &AccountId,
        now: u64,
        mm: &mut dyn MoneyMarket,
    ) -> Result<(), PoolError> {
        self.ensure_not_paused()?;
        if amount.is_zero() {
            return Err(PoolError::AmountZero);
        }
        let asset = self.reserve(reserve_id)?.underlying_asset.clone();
        self.ensure_cash(caller, &asset, amount)?;

        let reserve = self
            .reserves
            .get_mut(&reserve_id)
            .ok_or(PoolError::ReserveNotFound(reserve_id))?;
        reserve.deposit(now, amount, on_behalf_of, mm)?;
        let forwarded = reserve.is_money_market_on;

        let vault = AccountId::reserve_vault(reserve_id);
        self.cash.transfer(caller, &vault, &asset, amount)?;
        if forwarded {
            self.cash
                .transfer(&vault, &money_market_account(), &asset, amount)?;
        }
        info!(%reserve_id, %amount, depositor = %on_behalf_of, "deposit");
        Ok(())
    }

    pub fn withdraw(
        &mut self,
        caller: &AccountId,
        reserve_id: ReserveId,
        amount: U256,
        now: u64,
        mm: &mut dyn MoneyMarket,
    ) -> Result<(), PoolError> {
        self.ensure_not_paused()?;
        if amount.is_zero() {
            return Err(PoolError::AmountZero);
        }
        let asset = self.reserve(reserve_id)?.underlying_asset.clone();

        let reserve = self
            .reserves
            .get_mut(&reserve_id)
            .ok_or(PoolError::ReserveNotFound(reserve_id))?;
        let from_money_market = reserve.is_money_market_on;
        reserve.withdraw(now, amount, caller, mm)?;

        let vault = AccountId::reserve_vault(reserve_id);
        if from_money_market {
            self.cash
                .transfer(&money_market_account(), &vault, &asset, amount)?;
        }
        self.cash.transfer(&vault, caller, &asset, amount)?;
        info!(%reserve_id, %amount, to = %caller, "withdraw");
        Ok(())
    }

    // === loans ===

    #[allow(clippy::too_many_arguments)]
    pub fn borrow(
        &mut self,
        caller: &AccountId,
        reserve_id: ReserveId,
        amount: U256,
        duration: u64,
        nft: NftId,
        now: u64,
        mm: &mut dyn MoneyMarket,
        oracle: &dyn PriceOracle,
    ) -> Result<LoanId, PoolError> {
        self.ensure_not_paused()?;
        if amount.is_zero() {
            return Err(PoolError::AmountZero);
        }

        let reserve = self.reserve(reserve_id)?;
        let asset = reserve.underlying_asset.clone();
        let config = self.collection_config(&nft.collection)?.clone();
        if !config.duration_allowed(duration) {
            return Err(PoolError::DurationOutOfRange {
                duration,
                min: config.min_borrow_duration,
                max: config.max_borrow_duration,
            });
        }
        self.ensure_nft_owner(&nft, caller)?;

        let price = oracle.latest_price(&nft.collection)?;
        let limit = math::percent_mul(price, config.collateral_factor_bps)?;
        if amount > limit {
            return Err(PoolError::BorrowLimitExceeded {
                amount: amount.to_string(),
                limit: limit.to_string(),
            });
        }

        let reserve = self.reserve(reserve_id)?;
        let accrual = reserve.preview_accrual(now, U256::ZERO, mm)?;
        let available = reserve.local_cash + accrual.observed_money_market_balance;
        if amount > available {
            return Err(opensky_reserve::ReserveError::InsufficientLiquidity {
                available: available.to_string(),
                requested: amount.to_string(),
            }
            .into());
        }

        // rate from post-borrow utilization
        let strategy = self
            .strategies
            .get(&reserve_id)
            .ok_or(PoolError::ReserveNotFound(reserve_id))?;
        let borrow_rate = strategy.borrow_rate(
            reserve.total_borrows + amount,
            available - amount,
        )?;

        let loan_id = LoanId(self.next_loan_id);
        let loan = Loan::mint(
            loan_id,
            reserve_id,
            nft.clone(),
            caller.clone(),
            amount,
            borrow_rate,
            now,
            duration,
            config.extendable_duration,
            config.overdue_duration,
            config.prepayment_fee_factor_bps,
            config.overdue_loan_fee_factor_bps,
        )?;

        // mutate
        let interest_per_second = loan.interest_per_second;
        let from_money_market = {
            let reserve = self
                .reserves
                .get_mut(&reserve_id)
                .ok_or(PoolError::ReserveNotFound(reserve_id))?;
            reserve.apply_accrual(&accrual);
            reserve.add_borrows(amount, interest_per_second, mm)?;
            reserve.is_money_market_on
        };

        self.nfts.transfer(&nft, caller, &loan_escrow())?;

        let vault = AccountId::reserve_vault(reserve_id);
        if from_money_market {
            self.cash
                .transfer(&money_market_account(), caller, &asset, amount)?;
        } else {
            self.cash.transfer(&vault, caller, &asset, amount)?;
        }

        self.next_loan_id += 1;
        self.loans.insert(loan_id, loan);
        info!(%loan_id, %reserve_id, %amount, borrower = %caller, "loan minted");
        Ok(loan_id)
    }

    /// Repay and burn a loan. Only the receipt holder; rejected once
    /// Liquidatable. Returns the total paid.
    pub fn repay(
        &mut self,
        caller: &AccountId,
        loan_id: LoanId,
        now: u64,
        mm: &mut dyn MoneyMarket,
    ) -> Result<U256, PoolError> {
        self.ensure_not_paused()?;
        let loan = self.loan_view(loan_id)?;
        loan.require_holder(caller)?;

        let status = loan.status(now);
        if !matches!(
            status,
            LoanStatus::Borrowing | LoanStatus::Extendable | LoanStatus::Overdue
        ) {
            return Err(LoanError::WrongStatus {
                loan: loan_id,
                status,
                operation: "repay",
            }
            .into());
        }

        let reserve_id = loan.reserve_id;
        let principal = loan.amount;
        let interest = loan.borrow_interest(now)?;
        let penalty = loan.penalty(now)?;
        let total = principal + interest + penalty;
        let interest_per_second = loan.interest_per_second;
        let nft = loan.nft.clone();

        let asset = self.reserve(reserve_id)?.underlying_asset.clone();
        self.ensure_cash(caller, &asset, total)?;
        let accrual = self
            .reserve(reserve_id)?
            .preview_accrual(now, penalty, mm)?;

        // mutate
        let to_money_market = {
            let reserve = self
                .reserves
                .get_mut(&reserve_id)
                .ok_or(PoolError::ReserveNotFound(reserve_id))?;
            reserve.apply_accrual(&accrual);
            reserve.remove_borrows(principal, interest, total, interest_per_second, mm)?;
            reserve.is_money_market_on
        };

        let vault = AccountId::reserve_vault(reserve_id);
        self.cash.transfer(caller, &vault, &asset, total)?;
        if to_money_market {
            self.cash
                .transfer(&vault, &money_market_account(), &asset, total)?;
        }

        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(PoolError::LoanNotFound(loan_id))?;
        loan.end_by_repay(now)?;
        let holder = loan.owner.clone();
        self.nfts.transfer(&nft, &loan_escrow(), &holder)?;
        info!(%loan_id, %total, "loan repaid");
        Ok(total)
    }

    /// Atomically end a loan and mint its replacement, netting the cash
    /// difference with the caller. Permitted while Extendable or Overdue.
    #[allow(clippy::too_many_arguments)]
    pub fn extend(
        &mut self,
        caller: &AccountId,
        loan_id: LoanId,
        new_amount: U256,
        new_duration: u64,
        on_behalf_of: &AccountId,
        now: u64,
        mm: &mut dyn MoneyMarket,
    ) -> Result<LoanId, PoolError> {
        self.ensure_not_paused()?;
        if new_amount.is_zero() {
            return Err(PoolError::AmountZero);
        }
        let loan = self.loan_view(loan_id)?;
        loan.require_holder(caller)?;

        let status = loan.status(now);
        if !matches!(status, LoanStatus::Extendable | LoanStatus::Overdue) {
            return Err(LoanError::WrongStatus {
                loan: loan_id,
                status,
                operation: "extend",
            }
            .into());
        }

        let reserve_id = loan.reserve_id;
        let nft = loan.nft.clone();
        let config = self.collection_config(&nft.collection)?.clone();
        if !config.duration_allowed(new_duration) {
            return Err(PoolError::DurationOutOfRange {
                duration: new_duration,
                min: config.min_borrow_duration,
                max: config.max_borrow_duration,
            });
        }

        let old_principal = loan.amount;
        let old_interest = loan.borrow_interest(now)?;
        let penalty = loan.penalty(now)?;
        let owed = old_principal + old_interest + penalty;
        let old_ips = loan.interest_per_second;

        let reserve = self.reserve(reserve_id)?;
        let asset = reserve.underlying_asset.clone();
        let accrual = reserve.preview_accrual(now, penalty, mm)?;

        // liquidity after the old loan settles, before the new one draws
        let available_settled =
            reserve.local_cash + accrual.observed_money_market_balance + owed;
        if new_amount > available_settled {
            return Err(opensky_reserve::ReserveError::InsufficientLiquidity {
                available: available_settled.to_string(),
                requested: new_amount.to_string(),
            }
            .into());
        }

        let borrows_post = reserve.total_borrows.saturating_sub(old_principal) + new_amount;
        let strategy = self
            .strategies
            .get(&reserve_id)
            .ok_or(PoolError::ReserveNotFound(reserve_id))?;
        let borrow_rate = strategy.borrow_rate(borrows_post, available_settled - new_amount)?;

        // net cash flow with the caller
        let (pay_in, pay_out) = if owed > new_amount {
            (owed - new_amount, U256::ZERO)
        } else {
            (U256::ZERO, new_amount - owed)
        };
        if !pay_in.is_zero() {
            self.ensure_cash(caller, &asset, pay_in)?;
        }

        let new_loan_id = LoanId(self.next_loan_id);
        let new_loan = Loan::mint(
            new_loan_id,
            reserve_id,
            nft.clone(),
            on_behalf_of.clone(),
            new_amount,
            borrow_rate,
            now,
            new_duration,
            config.extendable_duration,
            config.overdue_duration,
            config.prepayment_fee_factor_bps,
            config.overdue_loan_fee_factor_bps,
        )?;
        let new_ips = new_loan.interest_per_second;

        // mutate: settle old, mint new, move only the net cash
        let money_market_on = {
            let reserve = self
                .reserves
                .get_mut(&reserve_id)
                .ok_or(PoolError::ReserveNotFound(reserve_id))?;
            reserve.apply_accrual(&accrual);
            reserve.remove_borrows(old_principal, old_interest, owed, old_ips, mm)?;
            reserve.add_borrows(new_amount, new_ips, mm)?;
            reserve.is_money_market_on
        };

        let vault = AccountId::reserve_vault(reserve_id);
        if !pay_in.is_zero() {
            self.cash.transfer(caller, &vault, &asset, pay_in)?;
            if money_market_on {
                self.cash
                    .transfer(&vault, &money_market_account(), &asset, pay_in)?;
            }
        }
        if !pay_out.is_zero() {
            if money_market_on {
                self.cash
                    .transfer(&money_market_account(), caller, &asset, pay_out)?;
            } else {
                self.cash.transfer(&vault, caller, &asset, pay_out)?;
            }
        }

        let old_loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(PoolError::LoanNotFound(loan_id))?;
        old_loan.end_by_repay(now)?;

        self.next_loan_id += 1;
        self.loans.insert(new_loan_id, new_loan);
        info!(%loan_id, %new_loan_id, "loan extended");
        Ok(new_loan_id)
    }

    pub fn transfer_loan(
        &mut self,
        caller: &AccountId,
        loan_id: LoanId,
        to: &AccountId,
    ) -> Result<(), PoolError> {
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(PoolError::LoanNotFound(loan_id))?;
        loan.transfer_receipt(caller, to)?;
        Ok(())
    }

    /// Lend the escrowed collateral to a callback; it must be back in escrow
    /// when the callback returns or the whole operation rolls back.
    pub fn flash_claim(
        &mut self,
        caller: &AccountId,
        loan_id: LoanId,
        receiver: &mut dyn FlashClaimReceiver,
        now: u64,
    ) -> Result<(), PoolError> {
        self.ensure_not_paused()?;
        let loan = self.loan_view(loan_id)?;
        loan.require_holder(caller)?;

        let status = loan.status(now);
        if !matches!(
            status,
            LoanStatus::Borrowing | LoanStatus::Extendable | LoanStatus::Overdue
        ) {
            return Err(LoanError::WrongStatus {
                loan: loan_id,
                status,
                operation: "flash claim",
            }
            .into());
        }
        let nft = loan.nft.clone();
        let escrow = loan_escrow();

        let snapshot = self.nfts.clone();
        self.nfts
            .transfer(&nft, &escrow, &receiver.receiver_account())?;

        let outcome = receiver.on_flash_claim(&mut self.nfts, &nft, caller, &escrow);
        let returned = self.nfts.is_owner(&nft, &escrow);

        match outcome {
            Ok(()) if returned => Ok(()),
            Ok(()) => {
                self.nfts = snapshot;
                Err(PoolError::FlashClaimFailed(
                    "collateral not returned to escrow".to_string(),
                ))
            }
            Err(reason) => {
                self.nfts = snapshot;
                Err(PoolError::FlashClaimFailed(reason))
            }
        }
    }

    // === liquidation ===

    /// Force a Liquidatable loan into liquidation and open its Dutch
    /// auction. Liquidation-operator only.
    pub fn start_liquidation(
        &mut self,
        caller: &AccountId,
        loan_id: LoanId,
        now: u64,
        mm: &mut dyn MoneyMarket,
    ) -> Result<AuctionId, PoolError> {
        if !self.roles.is_liquidation_operator(caller) {
            return Err(PoolError::NotAuthorized {
                who: caller.clone(),
                role: "liquidation operator",
            });
        }
        let loan = self.loan_view(loan_id)?;
        let status = loan.status(now);
        if status != LoanStatus::Liquidatable {
            return Err(LoanError::WrongStatus {
                loan: loan_id,
                status,
                operation: "start liquidation",
            }
            .into());
        }

        let reserve_id = loan.reserve_id;
        let nft = loan.nft.clone();
        let old_ips = loan.interest_per_second;
        // outstanding balance becomes the auction reserve price; the 1.2x
        // floor therefore always covers the debt
        let reserve_price = loan.borrow_balance(now)?;

        let reserve = self.reserve(reserve_id)?;
        let asset = reserve.underlying_asset.clone();
        let accrual = reserve.preview_accrual(now, U256::ZERO, mm)?;

        let auction_id = AuctionId(self.next_auction_id);
        let auction = Auction::create(
            auction_id,
            nft.clone(),
            asset,
            loan_escrow(),
            reserve_price,
            now,
        )?;

        // mutate
        {
            let reserve = self
                .reserves
                .get_mut(&reserve_id)
                .ok_or(PoolError::ReserveNotFound(reserve_id))?;
            reserve.apply_accrual(&accrual);
            // principal and accrued interest stay owed; only the per-second
            // aggregation stops, since the loan's interest is now pinned
            reserve.remove_borrows(U256::ZERO, U256::ZERO, U256::ZERO, old_ips, mm)?;
        }
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(PoolError::LoanNotFound(loan_id))?;
        loan.start_liquidation(now)?;

        self.nfts.transfer(&nft, &loan_escrow(), &auction_escrow())?;
        self.next_auction_id += 1;
        self.auctions.insert(auction_id, auction);
        self.auction_loans.insert(auction_id, loan_id);
        info!(%loan_id, %auction_id, %reserve_price, "liquidation started");
        Ok(auction_id)
    }

    // === auctions ===

    /// List an NFT for sale (voluntary Dutch auction)
    pub fn create_auction(
        &mut self,
        caller: &AccountId,
        nft: NftId,
        currency: Asset,
        reserve_price: U256,
        now: u64,
    ) -> Result<AuctionId, PoolError> {
        self.ensure_not_paused()?;
        self.ensure_nft_owner(&nft, caller)?;

        let auction_id = AuctionId(self.next_auction_id);
        let auction = Auction::create(
            auction_id,
            nft.clone(),
            currency,
            caller.clone(),
            reserve_price,
            now,
        )?;

        self.nfts.transfer(&nft, caller, &auction_escrow())?;
        self.next_auction_id += 1;
        self.auctions.insert(auction_id, auction);
        Ok(auction_id)
    }

    /// Buy at the current Dutch price. For liquidation auctions the
    /// proceeds settle the loan: the owed part returns to the reserve, any
    /// surplus goes to the receipt holder.
    pub fn buy_auction(
        &mut self,
        caller: &AccountId,
        auction_id: AuctionId,
        now: u64,
        mm: &mut dyn MoneyMarket,
    ) -> Result<U256, PoolError> {
        self.ensure_not_paused()?;
        let auction = self.auction_view(auction_id)?;
        if auction.status != AuctionStatus::Live {
            return Err(AuctionError::WrongStatus {
                auction: auction_id,
                status: auction.status,
                operation: "buy",
            }
            .into());
        }
        let price = auction.price(now)?;
        let asset = auction.underlying_asset.clone();
        let nft = auction.nft.clone();
        let token_owner = auction.token_owner.clone();
        self.ensure_cash(caller, &asset, price)?;

        match self.auction_loans.get(&auction_id).copied() {
            Some(loan_id) => {
                let loan = self.loan_view(loan_id)?;
                let reserve_id = loan.reserve_id;
                let principal = loan.amount;
                // interest is pinned at borrow_end
                let owed = loan.borrow_balance(now)?;
                // the 1.2x floor guarantees price >= owed
                let surplus = price
                    .checked_sub(owed)
                    .ok_or(opensky_core::MathError::Overflow)?;
                let holder = loan.owner.clone();

                let accrual = self
                    .reserve(reserve_id)?
                    .preview_accrual(now, U256::ZERO, mm)?;

                // mutate
                let to_money_market = {
                    let reserve = self
                        .reserves
                        .get_mut(&reserve_id)
                        .ok_or(PoolError::ReserveNotFound(reserve_id))?;
                    reserve.apply_accrual(&accrual);
                    reserve.remove_borrows(
                        principal,
                        owed - principal,
                        owed,
                        U256::ZERO,
                        mm,
                    )?;
                    reserve.is_money_market_on
                };

                let vault = AccountId::reserve_vault(reserve_id);
                self.cash.transfer(caller, &vault, &asset, owed)?;
                if to_money_market {
                    self.cash
                        .transfer(&vault, &money_market_account(), &asset, owed)?;
                }
                if !surplus.is_zero() {
                    self.cash.transfer(caller, &holder, &asset, surplus)?;
                }

                let auction = self
                    .auctions
                    .get_mut(&auction_id)
                    .ok_or(PoolError::AuctionNotFound(auction_id))?;
                auction.buy(caller, now)?;
                let loan = self
                    .loans
                    .get_mut(&loan_id)
                    .ok_or(PoolError::LoanNotFound(loan_id))?;
                loan.end_by_liquidation(now)?;
                self.nfts.transfer(&nft, &auction_escrow(), caller)?;
                info!(%auction_id, %loan_id, %price, buyer = %caller, "liquidation settled");
            }
            None => {
                let auction = self
                    .auctions
                    .get_mut(&auction_id)
                    .ok_or(PoolError::AuctionNotFound(auction_id))?;
                auction.buy(caller, now)?;
                self.cash.transfer(caller, &token_owner, &asset, price)?;
                self.nfts.transfer(&nft, &auction_escrow(), caller)?;
                info!(%auction_id, %price, buyer = %caller, "auction sold");
            }
        }
        Ok(price)
    }

    /// Cancel a live auction; token owner only. Liquidation auctions are
    /// owned by the loan escrow and cannot be cancelled by users.
    pub fn cancel_auction(
        &mut self,
        caller: &AccountId,
        auction_id: AuctionId,
    ) -> Result<(), PoolError> {
        let auction = self
            .auctions
            .get_mut(&auction_id)
            .ok_or(PoolError::AuctionNotFound(auction_id))?;
        let nft = auction.nft.clone();
        let token_owner = auction.token_owner.clone();
        auction.cancel(caller)?;
        self.nfts.transfer(&nft, &auction_escrow(), &token_owner)?;
        Ok(())
    }

    // === bespoke market ===

    pub fn register_signer(&mut self, account: AccountId, public_key: String) {
        self.bespoke.register_signer(account, public_key);
    }

    pub fn whitelist_bespoke_currency(
        &mut self,
        caller: &AccountId,
        currency: Asset,
    ) -> Result<(), PoolError> {
        self.ensure_governance(caller)?;
        self.bespoke.whitelist_currency(currency);
        Ok(())
    }

    /// Match a signed borrow offer. The lender funds oToken-first: shares
    /// are redeemed through the reserve up to the supply amount, the
    /// shortfall comes from raw cash.
    pub fn take_borrow_offer(
        &mut self,
        caller: &AccountId,
        offer: &BorrowOffer,
        signature: &OfferSignature,
        supply_amount: U256,
        supply_duration: u64,
        now: u64,
        mm: &mut dyn MoneyMarket,
    ) -> Result<u64, PoolError> {
        self.ensure_not_paused()?;
        self.bespoke
            .validate_take(offer, signature, supply_amount, supply_duration, now)?;
        self.ensure_nft_owner(&offer.nft, &offer.borrower)?;

        let reserve = self.reserve(offer.reserve_id)?;
        let asset = offer.currency.clone();

        // blended funding: yield-bearing shares first, raw cash for the rest
        let from_otoken = if reserve.underlying_asset == asset {
            let accrual = reserve.preview_accrual(now, U256::ZERO, mm)?;
            let share_balance = reserve.otoken.balance_of(caller, accrual.new_index)?;
            let liquidity = reserve.local_cash + accrual.observed_money_market_balance;
            share_balance.min(supply_amount).min(liquidity)
        } else {
            U256::ZERO
        };
        let from_cash = supply_amount - from_otoken;
        if !from_cash.is_zero() {
            self.ensure_cash(caller, &asset, from_cash)?;
        }

        // mutate
        if !from_otoken.is_zero() {
            let from_money_market = {
                let reserve = self
                    .reserves
                    .get_mut(&offer.reserve_id)
                    .ok_or(PoolError::ReserveNotFound(offer.reserve_id))?;
                let on = reserve.is_money_market_on;
                reserve.withdraw(now, from_otoken, caller, mm)?;
                on
            };
            let vault = AccountId::reserve_vault(offer.reserve_id);
            if from_money_market {
                self.cash
                    .transfer(&money_market_account(), &vault, &asset, from_otoken)?;
            }
            self.cash
                .transfer(&vault, &offer.borrower, &asset, from_otoken)?;
        }
        if !from_cash.is_zero() {
            self.cash
                .transfer(caller, &offer.borrower, &asset, from_cash)?;
        }

        self.nfts
            .transfer(&offer.nft, &offer.borrower, &bespoke_escrow())?;
        let loan_id = self
            .bespoke
            .commit_take(offer, supply_amount, supply_duration, caller, now)?;
        info!(bespoke_loan = loan_id, %supply_amount, lender = %caller, "offer taken");
        Ok(loan_id)
    }

    /// Repay a bespoke loan: principal + interest + penalty to the
    /// lend-receipt holder, collateral back to the borrow-receipt holder.
    pub fn bespoke_repay(
        &mut self,
        caller: &AccountId,
        loan_id: u64,
        now: u64,
    ) -> Result<U256, PoolError> {
        self.ensure_not_paused()?;
        let terms = self.bespoke.prepare_repay(loan_id, caller, now)?;
        self.ensure_cash(caller, &terms.currency, terms.total)?;

        self.cash
            .transfer(caller, &terms.pay_to, &terms.currency, terms.total)?;
        self.nfts
            .transfer(&terms.nft, &bespoke_escrow(), &terms.collateral_to)?;
        self.bespoke.finish(loan_id, now)?;
        info!(bespoke_loan = loan_id, total = %terms.total, "bespoke repaid");
        Ok(terms.total)
    }

    /// Foreclose a Liquidatable bespoke loan: collateral to the lend-receipt
    /// holder, no repayment.
    pub fn bespoke_foreclose(
        &mut self,
        caller: &AccountId,
        loan_id: u64,
        now: u64,
    ) -> Result<(), PoolError> {
        self.ensure_not_paused()?;
        let terms = self.bespoke.prepare_foreclose(loan_id, caller, now)?;

        self.nfts
            .transfer(&terms.nft, &bespoke_escrow(), &terms.collateral_to)?;
        self.bespoke.finish(loan_id, now)?;
        info!(bespoke_loan = loan_id, "bespoke foreclosed");
        Ok(())
    }
}
