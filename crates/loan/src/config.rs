//! Per-collection lending configuration
//!
//! Only whitelisted NFT collections can collateralize a loan. The config
//! fixes the duration windows and fee factors every loan on that collection
//! is minted with.

use serde::{Deserialize, Serialize};

/// Whitelist entry for one NFT collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub enabled: bool,
    /// Share of the oracle price that can be borrowed (bps)
    pub collateral_factor_bps: u64,
    pub min_borrow_duration: u64,
    pub max_borrow_duration: u64,
    /// Window before `borrow_overdue_time` in which the loan is Extendable
    pub extendable_duration: u64,
    /// Window after `borrow_overdue_time` before the loan is Liquidatable
    pub overdue_duration: u64,
    pub prepayment_fee_factor_bps: u64,
    pub overdue_loan_fee_factor_bps: u64,
}

impl CollectionConfig {
    pub fn duration_allowed(&self, duration: u64) -> bool {
        duration >= self.min_borrow_duration && duration <= self.max_borrow_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_bounds_inclusive() {
        let config = CollectionConfig {
            enabled: true,
            collateral_factor_bps: 5_000,
            min_borrow_duration: 100,
            max_borrow_duration: 200,
            extendable_duration: 10,
            overdue_duration: 5,
            prepayment_fee_factor_bps: 25,
            overdue_loan_fee_factor_bps: 100,
        };

        assert!(config.duration_allowed(100));
        assert!(config.duration_allowed(200));
        assert!(!config.duration_allowed(99));
        assert!(!config.duration_allowed(201));
    }
}
