//! Oracle errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("no price data for collection {0}")]
    PriceNotAvailable(String),

    #[error("requested {requested} rounds, only {available} recorded")]
    NotEnoughRounds { requested: usize, available: usize },
}
