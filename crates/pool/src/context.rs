//! Application context - wires everything together
//!
//! Owns the pool, the mock external collaborators (money market, oracle)
//! and the journal. Every mutation goes through [`AppContext::execute`]:
//! apply the command against live state, then journal it. On startup the
//! journal is replayed through the same code paths, rebuilding identical
//! state.

use crate::command::PoolCommand;
use crate::error::PoolError;
use crate::pool::Pool;
use chrono::Utc;
use opensky_core::{AccountId, StaticRoleRegistry};
use opensky_events::{
    calculate_record_hash, JournalReader, JournalStore, OperationRecord,
};
use opensky_ledger::money_market_account;
use opensky_oracle::MockOracle;
use opensky_reserve::MockMoneyMarket;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Default privileged accounts, granted at startup
pub const GOVERNOR: &str = "GOVERNOR";
pub const LIQUIDATOR: &str = "LIQUIDATOR";
pub const ADMIN: &str = "ADMIN";

pub struct AppContext {
    pub pool: Pool,
    pub money_market: MockMoneyMarket,
    pub oracle: MockOracle,
    store: JournalStore,
    journal_path: PathBuf,
    last_sequence: u64,
    last_hash: String,
}

impl AppContext {
    /// Open (or create) a data directory and replay its journal
    pub fn new(data_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let journal_path = data_path.as_ref().join("journal");
        std::fs::create_dir_all(&journal_path)?;

        let store = JournalStore::new(&journal_path)?;

        let mut roles = StaticRoleRegistry::new();
        roles.grant_governance(AccountId::new(GOVERNOR));
        roles.grant_liquidation_operator(AccountId::new(LIQUIDATOR));
        roles.grant_emergency_admin(AccountId::new(ADMIN));

        let mut ctx = Self {
            pool: Pool::new(roles),
            money_market: MockMoneyMarket::new(),
            oracle: MockOracle::new(),
            store,
            journal_path: journal_path.clone(),
            last_sequence: 0,
            last_hash: "GENESIS".to_string(),
        };

        let reader = JournalReader::from_directory(&journal_path)?;
        for record in reader.read_all()? {
            let command: PoolCommand = serde_json::from_value(record.payload.clone())?;
            ctx.apply(&command, record.at)
                .map_err(|e| anyhow::anyhow!("journal replay failed at seq {}: {}", record.sequence, e))?;
            ctx.last_sequence = record.sequence;
            ctx.last_hash = record.hash.clone();
        }

        Ok(ctx)
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Apply a command and journal it.
    ///
    /// A failed command journals nothing and mutates nothing.
    pub fn execute(
        &mut self,
        command: PoolCommand,
        at: u64,
        correlation_id: &str,
    ) -> Result<serde_json::Value, PoolError> {
        let outcome = self.apply(&command, at)?;

        let mut record = OperationRecord {
            sequence: self.last_sequence + 1,
            prev_hash: self.last_hash.clone(),
            hash: String::new(),
            timestamp: Utc::now(),
            at,
            kind: command.kind(),
            correlation_id: correlation_id.to_string(),
            payload: serde_json::to_value(&command).map_err(opensky_events::JournalError::from)?,
        };
        record.hash = calculate_record_hash(&record);
        self.store.append(&record)?;

        self.last_sequence = record.sequence;
        self.last_hash = record.hash;
        Ok(outcome)
    }

    /// Dispatch a command against live state (no journaling)
    fn apply(&mut self, command: &PoolCommand, at: u64) -> Result<serde_json::Value, PoolError> {
        match command {
            PoolCommand::CreateReserve {
                caller,
                asset,
                treasury_factor_bps,
                base_borrow_rate,
                rate_slope1,
                rate_slope2,
                optimal_utilization_rate,
            } => {
                let reserve_id = self.pool.create_reserve(
                    caller,
                    asset.clone(),
                    *treasury_factor_bps,
                    *base_borrow_rate,
                    *rate_slope1,
                    *rate_slope2,
                    *optimal_utilization_rate,
                    at,
                )?;
                Ok(json!({ "reserve_id": reserve_id }))
            }
            PoolCommand::SetCollectionConfig {
                caller,
                collection,
                config,
            } => {
                self.pool
                    .set_collection_config(caller, collection, config.clone())?;
                Ok(json!({}))
            }
            PoolCommand::Faucet {
                account,
                asset,
                amount,
            } => {
                self.pool.cash.credit(account, asset, *amount)?;
                Ok(json!({}))
            }
            PoolCommand::MintNft { owner, nft } => {
                self.pool.nfts.mint(nft.clone(), owner.clone())?;
                Ok(json!({}))
            }
            PoolCommand::SetOraclePrice { collection, price } => {
                self.oracle.set_price(collection.clone(), *price, at);
                Ok(json!({}))
            }
            PoolCommand::AccrueYield { asset, amount } => {
                self.money_market.accrue(asset, *amount);
                self.pool
                    .cash
                    .credit(&money_market_account(), asset, *amount)?;
                Ok(json!({}))
            }
            PoolCommand::Deposit {
                caller,
                reserve_id,
                amount,
                on_behalf_of,
            } => {
                self.pool
                    .deposit(caller, *reserve_id, *amount, on_behalf_of, at, &mut self.money_market)?;
                Ok(json!({}))
            }
            PoolCommand::Withdraw {
                caller,
                reserve_id,
                amount,
            } => {
                self.pool
                    .withdraw(caller, *reserve_id, *amount, at, &mut self.money_market)?;
                Ok(json!({}))
            }
            PoolCommand::Borrow {
                caller,
                reserve_id,
                amount,
                duration,
                nft,
            } => {
                let loan_id = self.pool.borrow(
                    caller,
                    *reserve_id,
                    *amount,
                    *duration,
                    nft.clone(),
                    at,
                    &mut self.money_market,
                    &self.oracle,
                )?;
                Ok(json!({ "loan_id": loan_id }))
            }
            PoolCommand::Repay { caller, loan_id } => {
                let paid = self.pool.repay(caller, *loan_id, at, &mut self.money_market)?;
                Ok(json!({ "paid": paid.to_string() }))
            }
            PoolCommand::Extend {
                caller,
                loan_id,
                new_amount,
                new_duration,
                on_behalf_of,
            } => {
                let new_loan_id = self.pool.extend(
                    caller,
                    *loan_id,
                    *new_amount,
                    *new_duration,
                    on_behalf_of,
                    at,
                    &mut self.money_market,
                )?;
                Ok(json!({ "loan_id": new_loan_id }))
            }
            PoolCommand::StartLiquidation { caller, loan_id } => {
                let auction_id =
                    self.pool
                        .start_liquidation(caller, *loan_id, at, &mut self.money_market)?;
                Ok(json!({ "auction_id": auction_id }))
            }
            PoolCommand::TransferLoan {
                caller,
                loan_id,
                to,
            } => {
                self.pool.transfer_loan(caller, *loan_id, to)?;
                Ok(json!({}))
            }
            PoolCommand::CreateAuction {
                caller,
                nft,
                currency,
                reserve_price,
            } => {
                let auction_id = self.pool.create_auction(
                    caller,
                    nft.clone(),
                    currency.clone(),
                    *reserve_price,
                    at,
                )?;
                Ok(json!({ "auction_id": auction_id }))
            }
            PoolCommand::BuyAuction { caller, auction_id } => {
                let price = self
                    .pool
                    .buy_auction(caller, *auction_id, at, &mut self.money_market)?;
                Ok(json!({ "price": price.to_string() }))
            }
            PoolCommand::CancelAuction { caller, auction_id } => {
                self.pool.cancel_auction(caller, *auction_id)?;
                Ok(json!({}))
            }
            PoolCommand::RegisterSigner {
                account,
                public_key,
            } => {
                self.pool
                    .register_signer(account.clone(), public_key.clone());
                Ok(json!({}))
            }
            PoolCommand::WhitelistBespokeCurrency { caller, currency } => {
                self.pool
                    .whitelist_bespoke_currency(caller, currency.clone())?;
                Ok(json!({}))
            }
            PoolCommand::TakeBorrowOffer {
                caller,
                offer,
                signature,
                supply_amount,
                supply_duration,
            } => {
                let loan_id = self.pool.take_borrow_offer(
                    caller,
                    offer,
                    signature,
                    *supply_amount,
                    *supply_duration,
                    at,
                    &mut self.money_market,
                )?;
                Ok(json!({ "bespoke_loan_id": loan_id }))
            }
            PoolCommand::BespokeRepay { caller, loan_id } => {
                let paid = self.pool.bespoke_repay(caller, *loan_id, at)?;
                Ok(json!({ "paid": paid.to_string() }))
            }
            PoolCommand::BespokeForeclose { caller, loan_id } => {
                self.pool.bespoke_foreclose(caller, *loan_id, at)?;
                Ok(json!({}))
            }
            PoolCommand::TransferLendReceipt {
                caller,
                loan_id,
                to,
            } => {
                self.pool
                    .bespoke
                    .transfer_lend_receipt(*loan_id, caller, to)?;
                Ok(json!({}))
            }
            PoolCommand::TransferBorrowReceipt {
                caller,
                loan_id,
                to,
            } => {
                self.pool
                    .bespoke
                    .transfer_borrow_receipt(*loan_id, caller, to)?;
                Ok(json!({}))
            }
            PoolCommand::CancelOffers { caller, nonces } => {
                self.pool.bespoke.cancel_offers(caller, nonces);
                Ok(json!({}))
            }
            PoolCommand::CancelAllOffers { caller, new_floor } => {
                self.pool.bespoke.cancel_all_offers(caller, *new_floor)?;
                Ok(json!({}))
            }
            PoolCommand::OpenMoneyMarket { caller, reserve_id } => {
                self.pool
                    .open_money_market(caller, *reserve_id, at, &mut self.money_market)?;
                Ok(json!({}))
            }
            PoolCommand::CloseMoneyMarket { caller, reserve_id } => {
                self.pool
                    .close_money_market(caller, *reserve_id, at, &mut self.money_market)?;
                Ok(json!({}))
            }
            PoolCommand::Pause { caller } => {
                self.pool.pause(caller)?;
                Ok(json!({}))
            }
            PoolCommand::Unpause { caller } => {
                self.pool.unpause(caller)?;
                Ok(json!({}))
            }
        }
    }
}
