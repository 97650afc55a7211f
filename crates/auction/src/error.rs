//! Auction errors

use crate::auction::AuctionStatus;
use opensky_core::{AccountId, AuctionId, MathError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuctionError {
    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("reserve price must be greater than zero")]
    ReservePriceZero,

    #[error("auction {auction} is {status}, cannot {operation}")]
    WrongStatus {
        auction: AuctionId,
        status: AuctionStatus,
        operation: &'static str,
    },

    #[error("{who} is not the token owner of auction {auction} (owner: {owner})")]
    NotTokenOwner {
        auction: AuctionId,
        who: AccountId,
        owner: AccountId,
    },
}
