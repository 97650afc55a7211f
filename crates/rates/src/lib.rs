//! OpenSky interest rate strategies
//!
//! A reserve's borrow rate is a function of its utilization. The strategy is
//! a capability interface so each reserve can be configured with its own
//! curve; the default is the classic two-slope model around an optimal
//! utilization point.

pub mod strategy;

pub use strategy::{DefaultInterestRateStrategy, InterestRateStrategy, RateError};
