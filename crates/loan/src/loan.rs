//! Loan lifecycle
//!
//! A loan's status is a pure function of the clock and its four deadline
//! fields; nothing is scheduled. The two exceptions are explicit,
//! irreversible transitions: `start_liquidation` (pins `borrow_end`) and the
//! settlement paths that move a loan to `End`.
//!
//! The receipt is transferable: whoever holds it may repay and reclaim the
//! collateral, or collect surplus on liquidation settlement.

use crate::error::LoanError;
use alloy_primitives::U256;
use opensky_core::{math, AccountId, LoanId, NftId, ReserveId, SECONDS_PER_YEAR};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Lifecycle states, ordered by progression
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    None,
    Borrowing,
    Extendable,
    Overdue,
    Liquidatable,
    Liquidating,
    End,
}

/// One collateralized loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub reserve_id: ReserveId,
    pub nft: NftId,
    /// Original borrower; collateral returns here on repayment
    pub borrower: AccountId,
    /// Current receipt holder
    pub owner: AccountId,
    /// Principal (wei)
    pub amount: U256,
    /// Per-year borrow rate fixed at mint (ray)
    pub borrow_rate: U256,
    /// amount * borrow_rate / SECONDS_PER_YEAR (ray-scaled wei/second)
    pub interest_per_second: U256,
    pub borrow_begin: u64,
    pub borrow_duration: u64,
    pub extendable_time: u64,
    pub borrow_overdue_time: u64,
    pub liquidatable_time: u64,
    /// Pinned by `start_liquidation` or settlement; interest stops here
    pub borrow_end: Option<u64>,
    status_override: Option<LoanStatus>,
    pub prepayment_fee_factor_bps: u64,
    pub overdue_loan_fee_factor_bps: u64,
}

impl Loan {
    /// Mint a new loan starting at `now`.
    #[allow(clippy::too_many_arguments)]
    pub fn mint(
        loan_id: LoanId,
        reserve_id: ReserveId,
        nft: NftId,
        borrower: AccountId,
        amount: U256,
        borrow_rate: U256,
        now: u64,
        borrow_duration: u64,
        extendable_duration: u64,
        overdue_duration: u64,
        prepayment_fee_factor_bps: u64,
        overdue_loan_fee_factor_bps: u64,
    ) -> Result<Self, LoanError> {
        let interest_per_second = amount
            .checked_mul(borrow_rate)
            .ok_or(math::MathError::Overflow)?
            / U256::from(SECONDS_PER_YEAR);

        let borrow_overdue_time = now + borrow_duration;
        Ok(Self {
            loan_id,
            reserve_id,
            nft,
            owner: borrower.clone(),
            borrower,
            amount,
            borrow_rate,
            interest_per_second,
            borrow_begin: now,
            borrow_duration,
            extendable_time: borrow_overdue_time.saturating_sub(extendable_duration),
            borrow_overdue_time,
            liquidatable_time: borrow_overdue_time + overdue_duration,
            borrow_end: None,
            status_override: None,
            prepayment_fee_factor_bps,
            overdue_loan_fee_factor_bps,
        })
    }

    /// Current status, derived from the clock unless explicitly overridden
    pub fn status(&self, now: u64) -> LoanStatus {
        if let Some(status) = self.status_override {
            return status;
        }
        if now < self.extendable_time {
            LoanStatus::Borrowing
        } else if now < self.borrow_overdue_time {
            LoanStatus::Extendable
        } else if now < self.liquidatable_time {
            LoanStatus::Overdue
        } else {
            LoanStatus::Liquidatable
        }
    }

    /// Interest accrued since mint (wei). Stops at the pinned `borrow_end`.
    pub fn borrow_interest(&self, now: u64) -> Result<U256, LoanError> {
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

    /// Status-dependent penalty (wei): prepayment fee while Borrowing,
    /// overdue fee while Overdue, zero otherwise.
    pub fn penalty(&self, now: u64) -> Result<U256, LoanError> {
        let factor = match self.status(now) {
            LoanStatus::Borrowing => self.prepayment_fee_factor_bps,
            LoanStatus::Overdue => self.overdue_loan_fee_factor_bps,
            _ => return Ok(U256::ZERO),
        };
        Ok(math::percent_mul(self.amount, factor)?)
    }

    /// Principal + interest + penalty at `now` (wei)
    pub fn total_owed(&self, now: u64) -> Result<U256, LoanError> {
        Ok(self.amount + self.borrow_interest(now)? + self.penalty(now)?)
    }

    /// Principal + interest, no penalty (liquidation reserve price)
    pub fn borrow_balance(&self, now: u64) -> Result<U256, LoanError> {
        Ok(self.amount + self.borrow_interest(now)?)
    }

    /// Force the loan into Liquidating and pin `borrow_end`.
    ///
    /// Only valid from computed status Liquidatable; irreversible.
    pub fn start_liquidation(&mut self, now: u64) -> Result<(), LoanError> {
        let status = self.status(now);
        if status != LoanStatus::Liquidatable {
            return Err(LoanError::WrongStatus {
                loan: self.loan_id,
                status,
                operation: "start liquidation",
            });
        }
        self.status_override = Some(LoanStatus::Liquidating);
        self.borrow_end = Some(now);
        Ok(())
    }

    /// End the loan through repayment. Rejected once Liquidatable.
    pub fn end_by_repay(&mut self, now: u64) -> Result<(), LoanError> {
        let status = self.status(now);
        match status {
            LoanStatus::Borrowing | LoanStatus::Extendable | LoanStatus::Overdue => {
                self.status_override = Some(LoanStatus::End);
                self.borrow_end = Some(now);
                Ok(())
            }
            _ => Err(LoanError::WrongStatus {
                loan: self.loan_id,
                status,
                operation: "repay",
            }),
        }
    }

    /// End the loan through liquidation settlement. Only from Liquidating.
    pub fn end_by_liquidation(&mut self, now: u64) -> Result<(), LoanError> {
        let status = self.status(now);
        if status != LoanStatus::Liquidating {
            return Err(LoanError::WrongStatus {
                loan: self.loan_id,
                status,
                operation: "settle liquidation",
            });
        }
        self.status_override = Some(LoanStatus::End);
        Ok(())
    }

    /// Reassign the receipt. `from` must be the current holder.
    pub fn transfer_receipt(&mut self, from: &AccountId, to: &AccountId) -> Result<(), LoanError> {
        if &self.owner != from {
            return Err(LoanError::NotReceiptHolder {
                loan: self.loan_id,
                who: from.clone(),
                owner: self.owner.clone(),
            });
        }
        self.owner = to.clone();
        Ok(())
    }

    pub fn require_holder(&self, who: &AccountId) -> Result<(), LoanError> {
        if &self.owner != who {
            return Err(LoanError::NotReceiptHolder {
                loan: self.loan_id,
                who: who.clone(),
                owner: self.owner.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opensky_core::{RAY, WAD};

    const DAY: u64 = 86_400;

    fn loan() -> Loan {
        // 1.5 WETH for 365 days at 10%, extendable window 30 days,
        // overdue window 7 days, fees 25 / 100 bps
        Loan::mint(
            LoanId(1),
            ReserveId(1),
            NftId::new("PUNK", 7),
            AccountId::new("alice"),
            WAD + WAD / U256::from(2u64),
            RAY / U256::from(10u64),
            1_000,
            365 * DAY,
            30 * DAY,
            7 * DAY,
            25,
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_status_timeline() {
        let loan = loan();

        assert_eq!(loan.status(1_000), LoanStatus::Borrowing);
        // just inside the extendable window
        assert_eq!(
            loan.status(1_000 + 365 * DAY - 30 * DAY + 1),
            LoanStatus::Extendable
        );
        assert_eq!(loan.status(1_000 + 365 * DAY), LoanStatus::Overdue);
        assert_eq!(loan.status(1_000 + 372 * DAY), LoanStatus::Liquidatable);
    }

    #[test]
    fn test_status_monotonic() {
        let loan = loan();
        let mut last = LoanStatus::None;
        for offset in (0..400 * DAY).step_by(DAY as usize) {
            let status = loan.status(1_000 + offset);
            assert!(status >= last, "status regressed at offset {}", offset);
            last = status;
        }
    }

    #[test]
    fn test_interest_accrues_linearly() {
        let loan = loan();
        let year = 1_000 + 365 * DAY;

        let interest = loan.borrow_interest(year).unwrap();
        // 10% of 1.5 WETH over a year
        let expected = WAD * U256::from(15u64) / U256::from(100u64);
        let diff = if interest > expected {
            interest - expected
        } else {
            expected - interest
        };
        assert!(diff <= U256::from(10u64), "diff {}", diff);
    }

    #[test]
    fn test_penalty_by_status() {
        let loan = loan();
        let principal = WAD + WAD / U256::from(2u64);

        // Borrowing: prepayment fee 25 bps
        assert_eq!(
            loan.penalty(1_000).unwrap(),
            math::percent_mul(principal, 25).unwrap()
        );
        // Extendable: none
        assert_eq!(
            loan.penalty(1_000 + 364 * DAY).unwrap(),
            U256::ZERO
        );
        // Overdue: 100 bps
        assert_eq!(
            loan.penalty(1_000 + 366 * DAY).unwrap(),
            math::percent_mul(principal, 100).unwrap()
        );
        // Liquidatable: none
        assert_eq!(loan.penalty(1_000 + 373 * DAY).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_repay_boundary() {
        let liquidatable_time = 1_000 + 372 * DAY;

        let mut loan_ok = loan();
        assert!(loan_ok.end_by_repay(liquidatable_time - 1).is_ok());

        let mut loan_late = loan();
        let result = loan_late.end_by_repay(liquidatable_time);
        assert!(matches!(result, Err(LoanError::WrongStatus { .. })));
    }

    #[test]
    fn test_start_liquidation_only_when_liquidatable() {
        let mut early = loan();
        assert!(matches!(
            early.start_liquidation(1_000),
            Err(LoanError::WrongStatus { .. })
        ));

        let mut late = loan();
        let t = 1_000 + 372 * DAY;
        late.start_liquidation(t).unwrap();
        assert_eq!(late.status(t + DAY), LoanStatus::Liquidating);

        // interest stops at the pinned borrow_end
        assert_eq!(
            late.borrow_interest(t + 100 * DAY).unwrap(),
            late.borrow_interest(t).unwrap()
        );

        // irreversible: repay is no longer possible
        assert!(matches!(
            late.end_by_repay(t + DAY),
            Err(LoanError::WrongStatus { .. })
        ));
    }

    #[test]
    fn test_receipt_transfer() {
        let mut loan = loan();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        assert!(matches!(
            loan.transfer_receipt(&bob, &alice),
            Err(LoanError::NotReceiptHolder { .. })
        ));

        loan.transfer_receipt(&alice, &bob).unwrap();
        assert!(loan.require_holder(&bob).is_ok());
        assert!(loan.require_holder(&alice).is_err());
    }
}
