//! Oracle interface

use crate::OracleError;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// One recorded price observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRound {
    /// Floor price in wei of the reserve's underlying
    pub price: U256,
    /// Unix seconds at which the round was recorded
    pub timestamp: u64,
}

/// Floor-price feed per NFT collection.
///
/// Status and limits are always computed against an explicit `now` so the
/// engine stays demand-driven; the oracle never runs its own clock.
pub trait PriceOracle: Send + Sync {
    /// Most recent recorded price
    fn latest_price(&self, collection: &str) -> Result<U256, OracleError>;

    /// Arithmetic mean of the last `rounds` observations
    fn twap_by_rounds(&self, collection: &str, rounds: usize) -> Result<U256, OracleError>;

    /// Arithmetic mean of observations within `[now - interval, now]`
    fn twap_by_interval(
        &self,
        collection: &str,
        interval: u64,
        now: u64,
    ) -> Result<U256, OracleError>;
}
