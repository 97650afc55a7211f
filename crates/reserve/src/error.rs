//! Reserve errors

use opensky_core::MathError;
use thiserror::Error;

/// Errors from the external money-market adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyMarketError {
    #[error("money market withdraw of {requested} exceeds balance {available}")]
    WithdrawExceedsBalance { requested: String, available: String },

    #[error("money market balance overflow")]
    BalanceOverflow,
}

/// Errors from reserve accounting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReserveError {
    #[error("amount cannot be zero")]
    AmountZero,

    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("insufficient liquidity: available {available}, requested {requested}")]
    InsufficientLiquidity { available: String, requested: String },

    #[error("insufficient shares: scaled balance {available}, required {required}")]
    InsufficientShares { available: String, required: String },

    #[error("money market error: {0}")]
    MoneyMarket(#[from] MoneyMarketError),

    #[error("money market is already open")]
    MoneyMarketAlreadyOpen,

    #[error("money market is already closed")]
    MoneyMarketAlreadyClosed,

    #[error("money market balance decreased: last {last}, observed {observed}")]
    MoneyMarketBalanceDecreased { last: String, observed: String },

    #[error("clock went backwards: last update {last}, now {now}")]
    ClockWentBackwards { last: u64, now: u64 },
}
