//! Bespoke P2P market
//!
//! A lender takes a borrower's signed offer directly; no pooled reserve sits
//! in between. The match is atomic: signature, nonce, deadline and range
//! checks all pass before anything is consumed, and the pool applies the
//! computed settlement in the same operation.
//!
//! The market mints a pair of transferable receipts per loan: the lend
//! receipt collects repayment (or the collateral on foreclosure), the borrow
//! receipt reclaims the collateral on repayment.

use crate::error::BespokeError;
use crate::nonce::NonceRegistry;
use crate::offer::{BorrowOffer, OfferSignature};
use alloy_primitives::U256;
use opensky_core::{math, AccountId, Asset, NftId, ReserveId, SECONDS_PER_YEAR};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use strum_macros::{Display, EnumString};

/// Bespoke loan states - the pooled machine without an Extendable phase
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BespokeStatus {
    Borrowing,
    Overdue,
    Liquidatable,
    End,
}

/// One matched bespoke loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BespokeLoan {
    pub id: u64,
    pub reserve_id: ReserveId,
    pub nft: NftId,
    pub borrower: AccountId,
    pub lender: AccountId,
    /// Transferable claim on repayment / foreclosure proceeds
    pub lend_receipt_holder: AccountId,
    /// Transferable claim on the collateral after repayment
    pub borrow_receipt_holder: AccountId,
    pub currency: Asset,
    pub amount: U256,
    pub borrow_rate: U256,
    pub interest_per_second: U256,
    pub borrow_begin: u64,
    pub borrow_overdue_time: u64,
    pub liquidatable_time: u64,
    pub borrow_end: Option<u64>,
    ended: bool,
    pub prepayment_fee_factor_bps: u64,
    pub overdue_loan_fee_factor_bps: u64,
}

impl BespokeLoan {
    pub fn status(&self, now: u64) -> BespokeStatus {
        if self.ended {
            return BespokeStatus::End;
        }
        if now < self.borrow_overdue_time {
            BespokeStatus::Borrowing
        } else if now < self.liquidatable_time {
            BespokeStatus::Overdue
        } else {
            BespokeStatus::Liquidatable
        }
    }

    pub fn borrow_interest(&self, now: u64) -> Result<U256, BespokeError> {
        let until = match self.borrow_end {
            Some(end) => end.min(now),
            None => now,
        };
        let elapsed = until.saturating_sub(self.borrow_begin);
        Ok(math::ray_mul(
            self.interest_per_second,
            U256::from(elapsed),
        )?)
    }

    pub fn penalty(&self, now: u64) -> Result<U256, BespokeError> {
        let factor = match self.status(now) {
            BespokeStatus::Borrowing => self.prepayment_fee_factor_bps,
            BespokeStatus::Overdue => self.overdue_loan_fee_factor_bps,
            _ => return Ok(U256::ZERO),
        };
        Ok(math::percent_mul(self.amount, factor)?)
    }

    pub fn total_owed(&self, now: u64) -> Result<U256, BespokeError> {
        Ok(self.amount + self.borrow_interest(now)? + self.penalty(now)?)
    }
}

/// What the pool must settle on repayment
#[derive(Debug, Clone)]
pub struct RepayTerms {
    pub loan_id: u64,
    pub currency: Asset,
    pub nft: NftId,
    /// principal + interest + penalty
    pub total: U256,
    pub interest: U256,
    pub penalty: U256,
    /// Lend-receipt holder, receives the payment
    pub pay_to: AccountId,
    /// Borrow-receipt holder, receives the collateral back
    pub collateral_to: AccountId,
}

/// What the pool must settle on foreclosure
#[derive(Debug, Clone)]
pub struct ForecloseTerms {
    pub loan_id: u64,
    pub nft: NftId,
    /// Lend-receipt holder, receives the collateral
    pub collateral_to: AccountId,
}

/// The bespoke offer-matching market
#[derive(Default)]
pub struct BespokeMarket {
    /// Registered ed25519 keys (hex) per borrower account
    signers: HashMap<AccountId, String>,
    nonces: NonceRegistry,
    whitelisted_currencies: HashSet<Asset>,
    loans: HashMap<u64, BespokeLoan>,
    next_loan_id: u64,
    /// Window after the due date before foreclosure opens
    pub overdue_duration: u64,
    pub prepayment_fee_factor_bps: u64,
    pub overdue_loan_fee_factor_bps: u64,
}

impl BespokeMarket {
    pub fn new(
        overdue_duration: u64,
        prepayment_fee_factor_bps: u64,
        overdue_loan_fee_factor_bps: u64,
    ) -> Self {
        Self {
            overdue_duration,
            prepayment_fee_factor_bps,
            overdue_loan_fee_factor_bps,
            next_loan_id: 1,
            ..Default::default()
        }
    }

    /// Bind an account to its offer-signing key
    pub fn register_signer(&mut self, account: AccountId, public_key_hex: String) {
        self.signers.insert(account, public_key_hex);
    }

    pub fn whitelist_currency(&mut self, currency: Asset) {
        self.whitelisted_currencies.insert(currency);
    }

    pub fn loan(&self, loan_id: u64) -> Result<&BespokeLoan, BespokeError> {
        self.loans
            .get(&loan_id)
            .ok_or(BespokeError::LoanNotFound(loan_id))
    }

    pub fn min_nonce(&self, signer: &AccountId) -> u64 {
        self.nonces.min_nonce(signer)
    }

    /// All checks for taking an offer; consumes nothing.
    pub fn validate_take(
        &self,
        offer: &BorrowOffer,
        signature: &OfferSignature,
        supply_amount: U256,
        supply_duration: u64,
        now: u64,
    ) -> Result<(), BespokeError> {
        if !self.whitelisted_currencies.contains(&offer.currency) {
            return Err(BespokeError::CurrencyNotWhitelisted(
                offer.currency.to_string(),
            ));
        }
        if now > offer.deadline {
            return Err(BespokeError::OfferExpired {
                deadline: offer.deadline,
                now,
            });
        }
        if supply_amount < offer.borrow_amount_min || supply_amount > offer.borrow_amount_max {
            return Err(BespokeError::AmountOutOfRange {
                amount: supply_amount.to_string(),
                min: offer.borrow_amount_min.to_string(),
                max: offer.borrow_amount_max.to_string(),
            });
        }
        if supply_duration < offer.borrow_duration_min
            || supply_duration > offer.borrow_duration_max
        {
            return Err(BespokeError::DurationOutOfRange {
                duration: supply_duration,
                min: offer.borrow_duration_min,
                max: offer.borrow_duration_max,
            });
        }

        let registered = self
            .signers
            .get(&offer.borrower)
            .ok_or_else(|| BespokeError::SignerNotRegistered(offer.borrower.clone()))?;
        if registered != &signature.public_key {
            return Err(BespokeError::SignerKeyMismatch(offer.borrower.clone()));
        }
        signature.verify(&offer.signing_bytes())?;

        self.nonces.check(&offer.borrower, offer.nonce)
    }

    /// Consume the offer and record the loan. The caller has already run
    /// [`BespokeMarket::validate_take`] and moved the funds and collateral.
    pub fn commit_take(
        &mut self,
        offer: &BorrowOffer,
        supply_amount: U256,
        supply_duration: u64,
        lender: &AccountId,
        now: u64,
    ) -> Result<u64, BespokeError> {
        let interest_per_second = supply_amount
            .checked_mul(offer.borrow_rate)
            .ok_or(math::MathError::Overflow)?
            / U256::from(SECONDS_PER_YEAR);

        self.nonces.consume(&offer.borrower, offer.nonce)?;

        let loan_id = self.next_loan_id;
        self.next_loan_id += 1;

        let borrow_overdue_time = now + supply_duration;
        self.loans.insert(
            loan_id,
            BespokeLoan {
                id: loan_id,
                reserve_id: offer.reserve_id,
                nft: offer.nft.clone(),
                borrower: offer.borrower.clone(),
                lender: lender.clone(),
                lend_receipt_holder: lender.clone(),
                borrow_receipt_holder: offer.borrower.clone(),
                currency: offer.currency.clone(),
                amount: supply_amount,
                borrow_rate: offer.borrow_rate,
                interest_per_second,
                borrow_begin: now,
                borrow_overdue_time,
                liquidatable_time: borrow_overdue_time + self.overdue_duration,
                borrow_end: None,
                ended: false,
                prepayment_fee_factor_bps: self.prepayment_fee_factor_bps,
                overdue_loan_fee_factor_bps: self.overdue_loan_fee_factor_bps,
            },
        );
        Ok(loan_id)
    }

    /// Compute repayment terms. Permitted while not Liquidatable; the caller
    /// must hold the borrow receipt.
    pub fn prepare_repay(
        &self,
        loan_id: u64,
        who: &AccountId,
        now: u64,
    ) -> Result<RepayTerms, BespokeError> {
        let loan = self.loan(loan_id)?;

        if &loan.borrow_receipt_holder != who {
            return Err(BespokeError::NotReceiptHolder {
                loan: loan_id,
                who: who.clone(),
                receipt: "borrow",
            });
        }

        let status = loan.status(now);
        match status {
            BespokeStatus::Borrowing | BespokeStatus::Overdue => {}
            _ => {
                return Err(BespokeError::WrongStatus {
                    loan: loan_id,
                    status,
                    operation: "repay",
                })
            }
        }

        let interest = loan.borrow_interest(now)?;
        let penalty = loan.penalty(now)?;
        Ok(RepayTerms {
            loan_id,
            currency: loan.currency.clone(),
            nft: loan.nft.clone(),
            total: loan.amount + interest + penalty,
            interest,
            penalty,
            pay_to: loan.lend_receipt_holder.clone(),
            collateral_to: loan.borrow_receipt_holder.clone(),
        })
    }

    /// Compute foreclosure terms. Permitted only once Liquidatable; the
    /// caller must hold the lend receipt.
    pub fn prepare_foreclose(
        &self,
        loan_id: u64,
        who: &AccountId,
        now: u64,
    ) -> Result<ForecloseTerms, BespokeError> {
        let loan = self.loan(loan_id)?;

        if &loan.lend_receipt_holder != who {
            return Err(BespokeError::NotReceiptHolder {
                loan: loan_id,
                who: who.clone(),
                receipt: "lend",
            });
        }

        let status = loan.status(now);
        if status != BespokeStatus::Liquidatable {
            return Err(BespokeError::WrongStatus {
                loan: loan_id,
                status,
                operation: "foreclose",
            });
        }

        Ok(ForecloseTerms {
            loan_id,
            nft: loan.nft.clone(),
            collateral_to: loan.lend_receipt_holder.clone(),
        })
    }

    /// Mark a loan settled after the pool applied the terms
    pub fn finish(&mut self, loan_id: u64, now: u64) -> Result<(), BespokeError> {
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(BespokeError::LoanNotFound(loan_id))?;
        loan.ended = true;
        loan.borrow_end = Some(now);
        Ok(())
    }

    pub fn transfer_lend_receipt(
        &mut self,
        loan_id: u64,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), BespokeError> {
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(BespokeError::LoanNotFound(loan_id))?;
        if &loan.lend_receipt_holder != from {
            return Err(BespokeError::NotReceiptHolder {
                loan: loan_id,
                who: from.clone(),
                receipt: "lend",
            });
        }
        loan.lend_receipt_holder = to.clone();
        Ok(())
    }

    pub fn transfer_borrow_receipt(
        &mut self,
        loan_id: u64,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), BespokeError> {
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(BespokeError::LoanNotFound(loan_id))?;
        if &loan.borrow_receipt_holder != from {
            return Err(BespokeError::NotReceiptHolder {
                loan: loan_id,
                who: from.clone(),
                receipt: "borrow",
            });
        }
        loan.borrow_receipt_holder = to.clone();
        Ok(())
    }

    /// Burn specific offer nonces for a signer
    pub fn cancel_offers(&mut self, signer: &AccountId, nonces: &[u64]) {
        self.nonces.cancel(signer, nonces);
    }

    /// Raise the signer's minimum-nonce floor, voiding everything below it
    pub fn cancel_all_offers(
        &mut self,
        signer: &AccountId,
        new_floor: u64,
    ) -> Result<(), BespokeError> {
        self.nonces.cancel_all_below(signer, new_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::OfferSigner;
    use opensky_core::{RAY, WAD};

    const DAY: u64 = 86_400;

    struct Fixture {
        market: BespokeMarket,
        signer: OfferSigner,
        offer: BorrowOffer,
        signature: OfferSignature,
    }

    fn fixture() -> Fixture {
        let mut market = BespokeMarket::new(7 * DAY, 25, 100);
        let signer = OfferSigner::generate();
        let alice = AccountId::new("alice");

        market.register_signer(alice.clone(), signer.public_key_hex());
        market.whitelist_currency(Asset::new("WETH"));

        let offer = BorrowOffer {
            reserve_id: ReserveId(1),
            nft: NftId::new("PUNK", 7),
            token_amount: 1,
            borrower: alice,
            borrow_amount_min: WAD / U256::from(2u64),
            borrow_amount_max: WAD * U256::from(2u64),
            borrow_duration_min: DAY,
            borrow_duration_max: 30 * DAY,
            borrow_rate: RAY / U256::from(10u64),
            currency: Asset::new("WETH"),
            nonce: 5,
            deadline: 1_000_000,
        };
        let signature = signer.sign(&offer);

        Fixture {
            market,
            signer,
            offer,
            signature,
        }
    }

    fn lender() -> AccountId {
        AccountId::new("bob")
    }

    #[test]
    fn test_take_happy_path() {
        let mut f = fixture();
        let now = 500_000;

        f.market
            .validate_take(&f.offer, &f.signature, WAD, 10 * DAY, now)
            .unwrap();
        let loan_id = f
            .market
            .commit_take(&f.offer, WAD, 10 * DAY, &lender(), now)
            .unwrap();

        let loan = f.market.loan(loan_id).unwrap();
        assert_eq!(loan.amount, WAD);
        assert_eq!(loan.status(now), BespokeStatus::Borrowing);
        assert_eq!(loan.status(now + 10 * DAY), BespokeStatus::Overdue);
        assert_eq!(loan.status(now + 17 * DAY), BespokeStatus::Liquidatable);
    }

    #[test]
    fn test_nonce_consumed_by_take() {
        let mut f = fixture();
        let now = 500_000;

        f.market
            .validate_take(&f.offer, &f.signature, WAD, 10 * DAY, now)
            .unwrap();
        f.market
            .commit_take(&f.offer, WAD, 10 * DAY, &lender(), now)
            .unwrap();

        let result = f
            .market
            .validate_take(&f.offer, &f.signature, WAD, 10 * DAY, now);
        assert_eq!(result, Err(BespokeError::NonceAlreadyUsed { nonce: 5 }));
    }

    #[test]
    fn test_cancel_all_voids_unused_nonce() {
        let mut f = fixture();
        let alice = f.offer.borrower.clone();

        f.market.cancel_all_offers(&alice, 6).unwrap();

        let result = f
            .market
            .validate_take(&f.offer, &f.signature, WAD, 10 * DAY, 500_000);
        assert_eq!(
            result,
            Err(BespokeError::NonceBelowFloor { nonce: 5, floor: 6 })
        );
    }

    #[test]
    fn test_expired_offer_rejected() {
        let f = fixture();
        let result = f
            .market
            .validate_take(&f.offer, &f.signature, WAD, 10 * DAY, 1_000_001);
        assert!(matches!(result, Err(BespokeError::OfferExpired { .. })));
    }

    #[test]
    fn test_range_checks() {
        let f = fixture();
        let now = 500_000;

        let too_much = f.market.validate_take(
            &f.offer,
            &f.signature,
            WAD * U256::from(3u64),
            10 * DAY,
            now,
        );
        assert!(matches!(too_much, Err(BespokeError::AmountOutOfRange { .. })));

        let too_long = f
            .market
            .validate_take(&f.offer, &f.signature, WAD, 31 * DAY, now);
        assert!(matches!(too_long, Err(BespokeError::DurationOutOfRange { .. })));
    }

    #[test]
    fn test_unlisted_currency_rejected() {
        let mut f = fixture();
        f.offer.currency = Asset::new("DAI");
        let signature = f.signer.sign(&f.offer);

        let result = f
            .market
            .validate_take(&f.offer, &signature, WAD, 10 * DAY, 500_000);
        assert!(matches!(
            result,
            Err(BespokeError::CurrencyNotWhitelisted(_))
        ));
    }

    #[test]
    fn test_repay_terms_and_boundary() {
        let mut f = fixture();
        let now = 500_000;
        let alice = f.offer.borrower.clone();

        f.market
            .validate_take(&f.offer, &f.signature, WAD, 10 * DAY, now)
            .unwrap();
        let loan_id = f
            .market
            .commit_take(&f.offer, WAD, 10 * DAY, &lender(), now)
            .unwrap();

        // overdue but not yet liquidatable: repay allowed with overdue fee
        let overdue_at = now + 12 * DAY;
        let terms = f.market.prepare_repay(loan_id, &alice, overdue_at).unwrap();
        assert_eq!(terms.penalty, math::percent_mul(WAD, 100).unwrap());
        assert_eq!(terms.pay_to, lender());

        // once liquidatable, repay is a state error
        let late = now + 17 * DAY;
        let result = f.market.prepare_repay(loan_id, &alice, late);
        assert!(matches!(result, Err(BespokeError::WrongStatus { .. })));
    }

    #[test]
    fn test_foreclose_only_when_liquidatable() {
        let mut f = fixture();
        let now = 500_000;

        f.market
            .validate_take(&f.offer, &f.signature, WAD, 10 * DAY, now)
            .unwrap();
        let loan_id = f
            .market
            .commit_take(&f.offer, WAD, 10 * DAY, &lender(), now)
            .unwrap();

        let early = f.market.prepare_foreclose(loan_id, &lender(), now + DAY);
        assert!(matches!(early, Err(BespokeError::WrongStatus { .. })));

        let terms = f
            .market
            .prepare_foreclose(loan_id, &lender(), now + 17 * DAY)
            .unwrap();
        assert_eq!(terms.collateral_to, lender());
    }

    #[test]
    fn test_lend_receipt_transfer_moves_claim() {
        let mut f = fixture();
        let now = 500_000;
        let carol = AccountId::new("carol");

        f.market
            .validate_take(&f.offer, &f.signature, WAD, 10 * DAY, now)
            .unwrap();
        let loan_id = f
            .market
            .commit_take(&f.offer, WAD, 10 * DAY, &lender(), now)
            .unwrap();

        f.market
            .transfer_lend_receipt(loan_id, &lender(), &carol)
            .unwrap();

        let terms = f
            .market
            .prepare_foreclose(loan_id, &carol, now + 17 * DAY)
            .unwrap();
        assert_eq!(terms.collateral_to, carol);
    }
}
