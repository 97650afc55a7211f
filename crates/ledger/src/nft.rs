//! NFT ownership registry
//!
//! Ownership of a record IS the authorization: the holder of a collateral
//! NFT (or a loan receipt) is whoever this registry says, and a transfer
//! reassigns that explicit owner field. Escrow is just ownership by a
//! system account.

use crate::error::CustodyError;
use opensky_core::{AccountId, NftId};
use std::collections::HashMap;

/// Owner map for NFTs and NFT-like receipts
#[derive(Debug, Default, Clone)]
pub struct NftRegistry {
    owners: HashMap<NftId, AccountId>,
}

impl NftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new NFT with an initial owner
    pub fn mint(&mut self, nft: NftId, owner: AccountId) -> Result<(), CustodyError> {
        if self.owners.contains_key(&nft) {
            return Err(CustodyError::NftAlreadyExists { nft });
        }
        self.owners.insert(nft, owner);
        Ok(())
    }

    /// Remove an NFT-like receipt from the registry (burn on settlement)
    pub fn burn(&mut self, nft: &NftId) -> Result<AccountId, CustodyError> {
        self.owners
            .remove(nft)
            .ok_or_else(|| CustodyError::NftNotFound { nft: nft.clone() })
    }

    pub fn owner_of(&self, nft: &NftId) -> Result<&AccountId, CustodyError> {
        self.owners
            .get(nft)
            .ok_or_else(|| CustodyError::NftNotFound { nft: nft.clone() })
    }

    pub fn is_owner(&self, nft: &NftId, who: &AccountId) -> bool {
        self.owners.get(nft) == Some(who)
    }

    /// Transfer an NFT; `from` must be the current owner
    pub fn transfer(
        &mut self,
        nft: &NftId,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), CustodyError> {
        let owner = self.owner_of(nft)?;
        if owner != from {
            return Err(CustodyError::NotNftOwner {
                who: from.clone(),
                nft: nft.clone(),
                owner: owner.clone(),
            });
        }
        self.owners.insert(nft.clone(), to.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn punk(token_id: u64) -> NftId {
        NftId::new("PUNK", token_id)
    }

    #[test]
    fn test_mint_and_owner() {
        let mut registry = NftRegistry::new();
        let alice = AccountId::new("alice");

        registry.mint(punk(1), alice.clone()).unwrap();
        assert_eq!(registry.owner_of(&punk(1)).unwrap(), &alice);
    }

    #[test]
    fn test_double_mint_rejected() {
        let mut registry = NftRegistry::new();
        let alice = AccountId::new("alice");

        registry.mint(punk(1), alice.clone()).unwrap();
        let result = registry.mint(punk(1), alice);
        assert!(matches!(result, Err(CustodyError::NftAlreadyExists { .. })));
    }

    #[test]
    fn test_transfer_requires_ownership() {
        let mut registry = NftRegistry::new();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        registry.mint(punk(1), alice.clone()).unwrap();

        let result = registry.transfer(&punk(1), &bob, &alice);
        assert!(matches!(result, Err(CustodyError::NotNftOwner { .. })));

        registry.transfer(&punk(1), &alice, &bob).unwrap();
        assert_eq!(registry.owner_of(&punk(1)).unwrap(), &bob);
    }

    #[test]
    fn test_burn_removes() {
        let mut registry = NftRegistry::new();
        let alice = AccountId::new("alice");

        registry.mint(punk(1), alice.clone()).unwrap();
        let last_owner = registry.burn(&punk(1)).unwrap();
        assert_eq!(last_owner, alice);
        assert!(registry.owner_of(&punk(1)).is_err());
    }
}
