//! In-memory oracle with stored rounds

use crate::types::{PriceOracle, PriceRound};
use crate::OracleError;
use alloy_primitives::U256;
use std::collections::HashMap;

/// Mock oracle: per-collection round history, appended by `set_price`
#[derive(Debug, Default, Clone)]
pub struct MockOracle {
    rounds: HashMap<String, Vec<PriceRound>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new price round for a collection
    pub fn set_price(&mut self, collection: impl Into<String>, price: U256, timestamp: u64) {
        self.rounds
            .entry(collection.into().to_uppercase())
            .or_default()
            .push(PriceRound { price, timestamp });
    }

    fn history(&self, collection: &str) -> Result<&Vec<PriceRound>, OracleError> {
        self.rounds
            .get(&collection.to_uppercase())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| OracleError::PriceNotAvailable(collection.to_string()))
    }

    fn average(rounds: &[&PriceRound]) -> U256 {
        let mut sum = U256::ZERO;
        for round in rounds {
            sum += round.price;
        }
        sum / U256::from(rounds.len() as u64)
    }
}

impl PriceOracle for MockOracle {
    fn latest_price(&self, collection: &str) -> Result<U256, OracleError> {
        let history = self.history(collection)?;
        Ok(history[history.len() - 1].price)
    }

    fn twap_by_rounds(&self, collection: &str, rounds: usize) -> Result<U256, OracleError> {
        let history = self.history(collection)?;
        if rounds == 0 || rounds > history.len() {
            return Err(OracleError::NotEnoughRounds {
                requested: rounds,
                available: history.len(),
            });
        }
        let window: Vec<&PriceRound> = history[history.len() - rounds..].iter().collect();
        Ok(Self::average(&window))
    }

    fn twap_by_interval(
        &self,
        collection: &str,
        interval: u64,
        now: u64,
    ) -> Result<U256, OracleError> {
        let history = self.history(collection)?;
        let cutoff = now.saturating_sub(interval);
        let window: Vec<&PriceRound> = history
            .iter()
            .filter(|r| r.timestamp >= cutoff && r.timestamp <= now)
            .collect();
        if window.is_empty() {
            return Err(OracleError::PriceNotAvailable(collection.to_string()));
        }
        Ok(Self::average(&window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_latest_price() {
        let mut oracle = MockOracle::new();
        oracle.set_price("PUNK", eth(10), 100);
        oracle.set_price("PUNK", eth(12), 200);

        assert_eq!(oracle.latest_price("PUNK").unwrap(), eth(12));
        assert_eq!(oracle.latest_price("punk").unwrap(), eth(12));
    }

    #[test]
    fn test_missing_collection() {
        let oracle = MockOracle::new();
        assert!(matches!(
            oracle.latest_price("PUNK"),
            Err(OracleError::PriceNotAvailable(_))
        ));
    }

    #[test]
    fn test_twap_by_rounds() {
        let mut oracle = MockOracle::new();
        oracle.set_price("PUNK", eth(10), 100);
        oracle.set_price("PUNK", eth(20), 200);
        oracle.set_price("PUNK", eth(30), 300);

        assert_eq!(oracle.twap_by_rounds("PUNK", 2).unwrap(), eth(25));
        assert_eq!(oracle.twap_by_rounds("PUNK", 3).unwrap(), eth(20));
    }

    #[test]
    fn test_twap_by_rounds_bounds() {
        let mut oracle = MockOracle::new();
        oracle.set_price("PUNK", eth(10), 100);

        assert!(matches!(
            oracle.twap_by_rounds("PUNK", 5),
            Err(OracleError::NotEnoughRounds { .. })
        ));
    }

    #[test]
    fn test_twap_by_interval() {
        let mut oracle = MockOracle::new();
        oracle.set_price("PUNK", eth(10), 100);
        oracle.set_price("PUNK", eth(20), 900);
        oracle.set_price("PUNK", eth(40), 1000);

        // only the two rounds within the last 200 seconds
        assert_eq!(oracle.twap_by_interval("PUNK", 200, 1000).unwrap(), eth(30));
    }
}
