//! Shared identifier types
//!
//! Reserves, loans and auctions are keyed by plain integer ids behind a
//! single consistency boundary; accounts and assets are uppercased strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a lending reserve (one per underlying asset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReserveId(pub u32);

impl fmt::Display for ReserveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a pooled loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanId(pub u64);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a Dutch auction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuctionId(pub u64);

impl fmt::Display for AuctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account in the custody ledger.
///
/// Accounts are uppercased strings. System accounts (escrows, vaults,
/// treasury) use the same namespace as user accounts but are created through
/// [`AccountId::system`] for readability at call sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_uppercase())
    }

    /// System-owned account (escrow, vault, treasury)
    pub fn system(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    /// Per-reserve vault holding un-lent liquidity
    pub fn reserve_vault(reserve_id: crate::ReserveId) -> Self {
        Self::new(format!("RESERVE_{}_VAULT", reserve_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Currency code of an underlying asset (WETH, USDC, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Asset(String);

impl Asset {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A specific NFT: collection code plus token id.
///
/// Ownership of an NFT record is the authorization mechanism for everything
/// collateral-related; see the custody ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NftId {
    pub collection: String,
    pub token_id: u64,
}

impl NftId {
    pub fn new(collection: impl Into<String>, token_id: u64) -> Self {
        Self {
            collection: collection.into().to_uppercase(),
            token_id,
        }
    }
}

impl fmt::Display for NftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.collection, self.token_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_uppercased() {
        let id = AccountId::new("alice");
        assert_eq!(id.as_str(), "ALICE");
    }

    #[test]
    fn test_reserve_vault_account() {
        let vault = AccountId::reserve_vault(ReserveId(3));
        assert_eq!(vault.as_str(), "RESERVE_3_VAULT");
    }

    #[test]
    fn test_nft_display() {
        let nft = NftId::new("punk", 42);
        assert_eq!(nft.to_string(), "PUNK#42");
    }
}
