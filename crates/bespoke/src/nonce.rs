//! Per-signer nonce accounting
//!
//! A nonce is usable exactly once, and only while it sits at or above the
//! signer's minimum-nonce floor. Raising the floor invalidates every offer
//! below it wholesale, used or not; individual nonces can also be burned.

use crate::error::BespokeError;
use opensky_core::AccountId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone)]
struct NonceState {
    used: HashSet<u64>,
    min_nonce: u64,
}

/// Nonce registry across all signers
#[derive(Debug, Default, Clone)]
pub struct NonceRegistry {
    states: HashMap<AccountId, NonceState>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_nonce(&self, signer: &AccountId) -> u64 {
        self.states.get(signer).map(|s| s.min_nonce).unwrap_or(0)
    }

    pub fn is_used(&self, signer: &AccountId, nonce: u64) -> bool {
        self.states
            .get(signer)
            .map(|s| s.used.contains(&nonce))
            .unwrap_or(false)
    }

    /// Check a nonce without consuming it
    pub fn check(&self, signer: &AccountId, nonce: u64) -> Result<(), BespokeError> {
        let floor = self.min_nonce(signer);
        if nonce < floor {
            return Err(BespokeError::NonceBelowFloor { nonce, floor });
        }
        if self.is_used(signer, nonce) {
            return Err(BespokeError::NonceAlreadyUsed { nonce });
        }
        Ok(())
    }

    /// Check and permanently consume a nonce
    pub fn consume(&mut self, signer: &AccountId, nonce: u64) -> Result<(), BespokeError> {
        self.check(signer, nonce)?;
        self.states
            .entry(signer.clone())
            .or_default()
            .used
            .insert(nonce);
        Ok(())
    }

    /// Burn specific nonces (individual offer cancellation)
    pub fn cancel(&mut self, signer: &AccountId, nonces: &[u64]) {
        let state = self.states.entry(signer.clone()).or_default();
        for &nonce in nonces {
            state.used.insert(nonce);
        }
    }

    /// Raise the signer's minimum-nonce floor; must strictly increase
    pub fn cancel_all_below(
        &mut self,
        signer: &AccountId,
        new_floor: u64,
    ) -> Result<(), BespokeError> {
        let state = self.states.entry(signer.clone()).or_default();
        if new_floor <= state.min_nonce {
            return Err(BespokeError::FloorNotRaised {
                new_floor,
                current: state.min_nonce,
            });
        }
        state.min_nonce = new_floor;
        Ok(())
    }
}
