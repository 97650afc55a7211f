//! OpenSky custody ledger
//!
//! Holds what the host chain would otherwise hold for us: underlying-token
//! balances per account, and NFT ownership (collateral and receipts).
//! Well-known system accounts name the escrows.

pub mod cash;
pub mod error;
pub mod nft;

pub use cash::CashLedger;
pub use error::CustodyError;
pub use nft::NftRegistry;

use opensky_core::AccountId;

/// Escrow holding collateral of active pooled loans
pub fn loan_escrow() -> AccountId {
    AccountId::system("LOAN_ESCROW")
}

/// Escrow holding NFTs listed in Dutch auctions
pub fn auction_escrow() -> AccountId {
    AccountId::system("AUCTION_ESCROW")
}

/// Escrow holding collateral of bespoke P2P loans
pub fn bespoke_escrow() -> AccountId {
    AccountId::system("BESPOKE_ESCROW")
}

/// Account representing funds forwarded to the external money market
pub fn money_market_account() -> AccountId {
    AccountId::system("MONEY_MARKET")
}

/// Protocol treasury
pub fn treasury() -> AccountId {
    AccountId::system("TREASURY")
}
