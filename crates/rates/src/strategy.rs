//! Utilization-driven borrow rate
//!
//! All ratios are ray fixed point. The returned rate is per-year; the loan
//! layer converts to per-second at mint time.

use alloy_primitives::U256;
use opensky_core::{math, MathError, RAY};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from rate computation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("optimal utilization must be in (0, RAY]")]
    InvalidOptimalUtilization,
}

/// Computes a per-year borrow rate (ray) from reserve utilization
pub trait InterestRateStrategy: Send + Sync {
    fn borrow_rate(&self, total_borrows: U256, total_liquidity: U256) -> Result<U256, RateError>;
}

/// Two-slope rate curve around an optimal utilization point.
///
/// Below the optimal point the rate climbs gently along `rate_slope1`; above
/// it the excess utilization is priced on `rate_slope2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultInterestRateStrategy {
    /// Rate at zero utilization (ray, per-year)
    pub base_borrow_rate: U256,
    /// Slope applied up to the optimal utilization (ray)
    pub rate_slope1: U256,
    /// Slope applied to excess utilization (ray)
    pub rate_slope2: U256,
    /// Optimal utilization (ray, in (0, RAY])
    pub optimal_utilization_rate: U256,
}

impl DefaultInterestRateStrategy {
    pub fn new(
        base_borrow_rate: U256,
        rate_slope1: U256,
        rate_slope2: U256,
        optimal_utilization_rate: U256,
    ) -> Result<Self, RateError> {
        if optimal_utilization_rate.is_zero() || optimal_utilization_rate > RAY {
            return Err(RateError::InvalidOptimalUtilization);
        }
        Ok(Self {
            base_borrow_rate,
            rate_slope1,
            rate_slope2,
            optimal_utilization_rate,
        })
    }

    fn utilization(&self, total_borrows: U256, total_liquidity: U256) -> Result<U256, RateError> {
        let total = total_borrows
            .checked_add(total_liquidity)
            .ok_or(MathError::Overflow)?;
        if total.is_zero() {
            return Ok(U256::ZERO);
        }
        Ok(math::ray_div(total_borrows, total)?)
    }
}

impl InterestRateStrategy for DefaultInterestRateStrategy {
    fn borrow_rate(&self, total_borrows: U256, total_liquidity: U256) -> Result<U256, RateError> {
        let utilization = self.utilization(total_borrows, total_liquidity)?;

        if utilization <= self.optimal_utilization_rate {
            // base + slope1 * u / optimal
            let scaled = math::ray_mul(
                self.rate_slope1,
                math::ray_div(utilization, self.optimal_utilization_rate)?,
            )?;
            Ok(self
                .base_borrow_rate
                .checked_add(scaled)
                .ok_or(MathError::Overflow)?)
        } else {
            // base + slope1 + slope2 * (u - optimal) / (1 - optimal)
            let excess = math::ray_div(
                utilization - self.optimal_utilization_rate,
                RAY - self.optimal_utilization_rate,
            )?;
            let steep = math::ray_mul(self.rate_slope2, excess)?;
            Ok(self
                .base_borrow_rate
                .checked_add(self.rate_slope1)
                .and_then(|r| r.checked_add(steep))
                .ok_or(MathError::Overflow)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2% base, 4% slope1, 100% slope2, 80% optimal
    fn strategy() -> DefaultInterestRateStrategy {
        DefaultInterestRateStrategy::new(
            ray_pct(2),
            ray_pct(4),
            ray_pct(100),
            ray_pct(80),
        )
        .unwrap()
    }

    fn ray_pct(pct: u64) -> U256 {
        RAY * U256::from(pct) / U256::from(100u64)
    }

    #[test]
    fn test_rate_at_zero_utilization() {
        let rate = strategy().borrow_rate(U256::ZERO, U256::from(1000u64)).unwrap();
        assert_eq!(rate, ray_pct(2));
    }

    #[test]
    fn test_rate_at_optimal_utilization() {
        // 80 borrowed, 20 free -> utilization exactly optimal
        let rate = strategy()
            .borrow_rate(U256::from(80u64), U256::from(20u64))
            .unwrap();
        assert_eq!(rate, ray_pct(6));
    }

    #[test]
    fn test_rate_below_optimal_scales_on_slope1() {
        // utilization 40% = half of optimal -> base + slope1/2
        let rate = strategy()
            .borrow_rate(U256::from(40u64), U256::from(60u64))
            .unwrap();
        assert_eq!(rate, ray_pct(4));
    }

    #[test]
    fn test_rate_above_optimal_uses_slope2() {
        // utilization 90% -> excess = (0.9-0.8)/(1-0.8) = 0.5
        let rate = strategy()
            .borrow_rate(U256::from(90u64), U256::from(10u64))
            .unwrap();
        assert_eq!(rate, ray_pct(2) + ray_pct(4) + ray_pct(50));
    }

    #[test]
    fn test_empty_reserve_is_base_rate() {
        let rate = strategy().borrow_rate(U256::ZERO, U256::ZERO).unwrap();
        assert_eq!(rate, ray_pct(2));
    }

    #[test]
    fn test_invalid_optimal_rejected() {
        let result = DefaultInterestRateStrategy::new(
            U256::ZERO,
            U256::ZERO,
            U256::ZERO,
            U256::ZERO,
        );
        assert_eq!(result.unwrap_err(), RateError::InvalidOptimalUtilization);
    }
}
