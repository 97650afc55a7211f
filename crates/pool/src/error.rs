//! Pool errors
//!
//! Every crate's error flows up into `PoolError`; one failed operation means
//! one error and zero mutated state.

use opensky_auction::AuctionError;
use opensky_bespoke::BespokeError;
use opensky_core::{AccountId, AuctionId, LoanId, MathError, ReserveId};
use opensky_events::JournalError;
use opensky_ledger::CustodyError;
use opensky_loan::LoanError;
use opensky_oracle::OracleError;
use opensky_rates::RateError;
use opensky_reserve::ReserveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("pool is paused")]
    Paused,

    #[error("{who} lacks the {role} role")]
    NotAuthorized { who: AccountId, role: &'static str },

    #[error("reserve {0} not found")]
    ReserveNotFound(ReserveId),

    #[error("a reserve for {0} already exists")]
    ReserveAlreadyExists(String),

    #[error("loan {0} not found")]
    LoanNotFound(LoanId),

    #[error("auction {0} not found")]
    AuctionNotFound(AuctionId),

    #[error("collection {0} is not whitelisted")]
    CollectionNotWhitelisted(String),

    #[error("amount cannot be zero")]
    AmountZero,

    #[error("duration {duration} outside [{min}, {max}]")]
    DurationOutOfRange { duration: u64, min: u64, max: u64 },

    #[error("amount {amount} exceeds oracle borrow limit {limit}")]
    BorrowLimitExceeded { amount: String, limit: String },

    #[error("insufficient funds: {who} has {available}, needs {required}")]
    InsufficientFunds {
        who: AccountId,
        available: String,
        required: String,
    },

    #[error("flash claim failed: {0}")]
    FlashClaimFailed(String),

    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error(transparent)]
    Reserve(#[from] ReserveError),

    #[error(transparent)]
    Loan(#[from] LoanError),

    #[error(transparent)]
    Auction(#[from] AuctionError),

    #[error(transparent)]
    Bespoke(#[from] BespokeError),

    #[error(transparent)]
    Rate(#[from] RateError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}
