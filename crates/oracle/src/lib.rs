//! OpenSky collateral price oracle
//!
//! Floor-price feed per NFT collection, with TWAP queries by round count or
//! time interval. The trait is the seam; the mock stores rounds in memory
//! and is what tests and the CLI use.

pub mod error;
pub mod mock;
pub mod types;

pub use error::OracleError;
pub use mock::MockOracle;
pub use types::{PriceOracle, PriceRound};
