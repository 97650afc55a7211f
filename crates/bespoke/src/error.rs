//! Bespoke market errors

use crate::market::BespokeStatus;
use opensky_core::{AccountId, MathError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BespokeError {
    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("currency {0} is not whitelisted")]
    CurrencyNotWhitelisted(String),

    #[error("offer expired at {deadline}, now {now}")]
    OfferExpired { deadline: u64, now: u64 },

    #[error("supply amount {amount} outside offer range [{min}, {max}]")]
    AmountOutOfRange {
        amount: String,
        min: String,
        max: String,
    },

    #[error("supply duration {duration} outside offer range [{min}, {max}]")]
    DurationOutOfRange { duration: u64, min: u64, max: u64 },

    #[error("no signing key registered for {0}")]
    SignerNotRegistered(AccountId),

    #[error("signature public key does not match the registered key for {0}")]
    SignerKeyMismatch(AccountId),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("nonce {nonce} already used")]
    NonceAlreadyUsed { nonce: u64 },

    #[error("nonce {nonce} below minimum {floor}")]
    NonceBelowFloor { nonce: u64, floor: u64 },

    #[error("new minimum nonce {new_floor} must exceed current {current}")]
    FloorNotRaised { new_floor: u64, current: u64 },

    #[error("bespoke loan {0} not found")]
    LoanNotFound(u64),

    #[error("bespoke loan {loan} is {status}, cannot {operation}")]
    WrongStatus {
        loan: u64,
        status: BespokeStatus,
        operation: &'static str,
    },

    #[error("{who} does not hold the {receipt} receipt of bespoke loan {loan}")]
    NotReceiptHolder {
        loan: u64,
        who: AccountId,
        receipt: &'static str,
    },
}
