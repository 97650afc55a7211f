//! Replayable commands
//!
//! Every state-mutating operation is expressed as a serializable command.
//! The journal stores the command with its logical timestamp, and startup
//! replay pushes the same commands through the same code paths, so the
//! rebuilt state matches bit for bit.

use alloy_primitives::U256;
use opensky_bespoke::{BorrowOffer, OfferSignature};
use opensky_core::{AccountId, Asset, AuctionId, LoanId, NftId, ReserveId};
use opensky_events::OperationKind;
use opensky_loan::CollectionConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PoolCommand {
    CreateReserve {
        caller: AccountId,
        asset: Asset,
        treasury_factor_bps: u64,
        base_borrow_rate: U256,
        rate_slope1: U256,
        rate_slope2: U256,
        optimal_utilization_rate: U256,
    },
    SetCollectionConfig {
        caller: AccountId,
        collection: String,
        config: CollectionConfig,
    },
    /// Environment: credit underlying out of thin air (genesis/test money)
    Faucet {
        account: AccountId,
        asset: Asset,
        amount: U256,
    },
    /// Environment: register an NFT with an owner
    MintNft { owner: AccountId, nft: NftId },
    /// Environment: record an oracle price round
    SetOraclePrice {
        collection: String,
        price: U256,
    },
    /// Environment: simulate money-market yield
    AccrueYield { asset: Asset, amount: U256 },
    Deposit {
        caller: AccountId,
        reserve_id: ReserveId,
        amount: U256,
        on_behalf_of: AccountId,
    },
    Withdraw {
        caller: AccountId,
        reserve_id: ReserveId,
        amount: U256,
    },
    Borrow {
        caller: AccountId,
        reserve_id: ReserveId,
        amount: U256,
        duration: u64,
        nft: NftId,
    },
    Repay {
        caller: AccountId,
        loan_id: LoanId,
    },
    Extend {
        caller: AccountId,
        loan_id: LoanId,
        new_amount: U256,
        new_duration: u64,
        on_behalf_of: AccountId,
    },
    StartLiquidation {
        caller: AccountId,
        loan_id: LoanId,
    },
    TransferLoan {
        caller: AccountId,
        loan_id: LoanId,
        to: AccountId,
    },
    CreateAuction {
        caller: AccountId,
        nft: NftId,
        currency: Asset,
        reserve_price: U256,
    },
    BuyAuction {
        caller: AccountId,
        auction_id: AuctionId,
    },
    CancelAuction {
        caller: AccountId,
        auction_id: AuctionId,
    },
    RegisterSigner {
        account: AccountId,
        public_key: String,
    },
    WhitelistBespokeCurrency {
        caller: AccountId,
        currency: Asset,
    },
    TakeBorrowOffer {
        caller: AccountId,
        offer: BorrowOffer,
        signature: OfferSignature,
        supply_amount: U256,
        supply_duration: u64,
    },
    BespokeRepay {
        caller: AccountId,
        loan_id: u64,
    },
    BespokeForeclose {
        caller: AccountId,
        loan_id: u64,
    },
    TransferLendReceipt {
        caller: AccountId,
        loan_id: u64,
        to: AccountId,
    },
    TransferBorrowReceipt {
        caller: AccountId,
        loan_id: u64,
        to: AccountId,
    },
    CancelOffers {
        caller: AccountId,
        nonces: Vec<u64>,
    },
    CancelAllOffers {
        caller: AccountId,
        new_floor: u64,
    },
    OpenMoneyMarket {
        caller: AccountId,
        reserve_id: ReserveId,
    },
    CloseMoneyMarket {
        caller: AccountId,
        reserve_id: ReserveId,
    },
    Pause { caller: AccountId },
    Unpause { caller: AccountId },
}

impl PoolCommand {
    /// Journal kind for this command
    pub fn kind(&self) -> OperationKind {
        match self {
            PoolCommand::CreateReserve { .. } => OperationKind::CreateReserve,
            PoolCommand::SetCollectionConfig { .. } => OperationKind::Governance,
            PoolCommand::Faucet { .. } => OperationKind::Faucet,
            PoolCommand::MintNft { .. } => OperationKind::Faucet,
            PoolCommand::SetOraclePrice { .. } => OperationKind::Governance,
            PoolCommand::AccrueYield { .. } => OperationKind::Governance,
            PoolCommand::Deposit { .. } => OperationKind::Deposit,
            PoolCommand::Withdraw { .. } => OperationKind::Withdraw,
            PoolCommand::Borrow { .. } => OperationKind::Borrow,
            PoolCommand::Repay { .. } => OperationKind::Repay,
            PoolCommand::Extend { .. } => OperationKind::Extend,
            PoolCommand::StartLiquidation { .. } => OperationKind::StartLiquidation,
            PoolCommand::TransferLoan { .. } => OperationKind::TransferLoan,
            PoolCommand::CreateAuction { .. } => OperationKind::CreateAuction,
            PoolCommand::BuyAuction { .. } => OperationKind::BuyAuction,
            PoolCommand::CancelAuction { .. } => OperationKind::CancelAuction,
            PoolCommand::RegisterSigner { .. } => OperationKind::Governance,
            PoolCommand::WhitelistBespokeCurrency { .. } => OperationKind::Governance,
            PoolCommand::TakeBorrowOffer { .. } => OperationKind::TakeBorrowOffer,
            PoolCommand::BespokeRepay { .. } => OperationKind::BespokeRepay,
            PoolCommand::BespokeForeclose { .. } => OperationKind::BespokeForeclose,
            PoolCommand::TransferLendReceipt { .. } => OperationKind::TransferBespokeReceipt,
            PoolCommand::TransferBorrowReceipt { .. } => OperationKind::TransferBespokeReceipt,
            PoolCommand::CancelOffers { .. } => OperationKind::CancelOffers,
            PoolCommand::CancelAllOffers { .. } => OperationKind::CancelAllOffers,
            PoolCommand::OpenMoneyMarket { .. } => OperationKind::OpenMoneyMarket,
            PoolCommand::CloseMoneyMarket { .. } => OperationKind::CloseMoneyMarket,
            PoolCommand::Pause { .. } => OperationKind::Pause,
            PoolCommand::Unpause { .. } => OperationKind::Unpause,
        }
    }
}
