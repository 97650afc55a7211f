//! Loan errors

use crate::loan::LoanStatus;
use opensky_core::{AccountId, LoanId, MathError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("loan {loan} is {status}, cannot {operation}")]
    WrongStatus {
        loan: LoanId,
        status: LoanStatus,
        operation: &'static str,
    },

    #[error("{who} does not hold the receipt for loan {loan} (holder: {owner})")]
    NotReceiptHolder {
        loan: LoanId,
        who: AccountId,
        owner: AccountId,
    },
}
