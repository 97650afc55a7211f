//! Custody errors

use opensky_core::{AccountId, Asset, NftId};
use thiserror::Error;

/// Errors from the custody ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("transfer amount cannot be zero")]
    AmountZero,

    #[error("insufficient balance on {account} for {asset}: available {available}, required {required}")]
    InsufficientBalance {
        account: AccountId,
        asset: Asset,
        available: String,
        required: String,
    },

    #[error("balance overflow on {account} for {asset}")]
    BalanceOverflow { account: AccountId, asset: Asset },

    #[error("nft {nft} already exists")]
    NftAlreadyExists { nft: NftId },

    #[error("nft {nft} not found")]
    NftNotFound { nft: NftId },

    #[error("{who} is not the owner of {nft} (owner: {owner})")]
    NotNftOwner {
        who: AccountId,
        nft: NftId,
        owner: AccountId,
    },
}
