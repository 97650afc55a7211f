//! OpenSky CLI - main entry point

use alloy_primitives::U256;
use clap::{Parser, Subcommand};
use opensky_core::{AccountId, Asset, AuctionId, LoanId, NftId, ReserveId, RAY};
use opensky_loan::CollectionConfig;
use opensky_pool::{AppContext, PoolCommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "opensky")]
#[command(about = "OpenSky - NFT-collateralized lending ledger", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Logical timestamp (unix seconds); defaults to the wall clock
    #[arg(long)]
    at: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and print journal status
    Init,

    /// Create a lending reserve (governance)
    CreateReserve {
        asset: String,
        #[arg(long, default_value = "1000")]
        treasury_factor_bps: u64,
        #[arg(long, default_value = "200")]
        base_rate_bps: u64,
        #[arg(long, default_value = "400")]
        slope1_bps: u64,
        #[arg(long, default_value = "10000")]
        slope2_bps: u64,
        #[arg(long, default_value = "8000")]
        optimal_utilization_bps: u64,
    },

    /// Whitelist an NFT collection (governance)
    Whitelist {
        collection: String,
        #[arg(long, default_value = "5000")]
        collateral_factor_bps: u64,
        #[arg(long, default_value = "86400")]
        min_duration: u64,
        #[arg(long, default_value = "31536000")]
        max_duration: u64,
        #[arg(long, default_value = "2592000")]
        extendable_duration: u64,
        #[arg(long, default_value = "604800")]
        overdue_duration: u64,
        #[arg(long, default_value = "25")]
        prepayment_fee_bps: u64,
        #[arg(long, default_value = "100")]
        overdue_fee_bps: u64,
    },

    /// Credit underlying to an account (environment)
    Faucet {
        account: String,
        amount: U256,
        asset: String,
    },

    /// Register an NFT with an owner (environment)
    MintNft {
        owner: String,
        collection: String,
        token_id: u64,
    },

    /// Record an oracle price round (environment)
    SetPrice { collection: String, price: U256 },

    /// Simulate money-market yield (environment)
    AccrueYield { asset: String, amount: U256 },

    /// Deposit into a reserve
    Deposit {
        user: String,
        reserve: u32,
        amount: U256,
    },

    /// Withdraw from a reserve
    Withdraw {
        user: String,
        reserve: u32,
        amount: U256,
    },

    /// Borrow against an NFT
    Borrow {
        user: String,
        reserve: u32,
        amount: U256,
        duration: u64,
        collection: String,
        token_id: u64,
    },

    /// Repay a loan
    Repay { user: String, loan: u64 },

    /// Extend a loan into a new one
    Extend {
        user: String,
        loan: u64,
        new_amount: U256,
        new_duration: u64,
    },

    /// Start liquidation of a loan (liquidation operator)
    StartLiquidation {
        #[arg(long, default_value = "LIQUIDATOR")]
        operator: String,
        loan: u64,
    },

    /// List an NFT in a Dutch auction
    CreateAuction {
        user: String,
        collection: String,
        token_id: u64,
        currency: String,
        reserve_price: U256,
    },

    /// Buy from a live auction at the current price
    Buy { user: String, auction: u64 },

    /// Cancel a live auction (token owner)
    CancelAuction { user: String, auction: u64 },

    /// Show a loan's current status
    Status { loan: u64 },

    /// Show an auction's current price
    Price { auction: u64 },

    /// Show an account's cash balance
    Balance { account: String, asset: String },

    /// Toggle the money-market pass-through on (governance)
    OpenMoneyMarket { reserve: u32 },

    /// Toggle the money-market pass-through off (governance)
    CloseMoneyMarket { reserve: u32 },

    /// Generate a bespoke offer signing key
    Keygen {
        #[arg(long, default_value = "offer.key")]
        output: PathBuf,
    },

    /// Register a borrower's offer-signing key
    RegisterSigner { account: String, public_key: String },

    /// Raise a signer's minimum offer nonce, voiding everything below
    CancelAllOffers { account: String, new_floor: u64 },

    /// Verify the journal hash chain
    Audit,
}

fn governor() -> AccountId {
    AccountId::new(opensky_pool::GOVERNOR)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let at = cli
        .at
        .unwrap_or_else(|| chrono::Utc::now().timestamp() as u64);
    let correlation_id = Uuid::new_v4().to_string();

    let mut ctx = AppContext::new(&cli.data)?;

    let ray_bps = |bps: u64| RAY * U256::from(bps) / U256::from(10_000u64);

    match cli.command {
        Commands::Init => {
            println!("journal at {}", ctx.journal_path().display());
            println!("replayed {} records", ctx.last_sequence());
        }

        Commands::CreateReserve {
            asset,
            treasury_factor_bps,
            base_rate_bps,
            slope1_bps,
            slope2_bps,
            optimal_utilization_bps,
        } => {
            let outcome = ctx.execute(
                PoolCommand::CreateReserve {
                    caller: governor(),
                    asset: Asset::new(asset),
                    treasury_factor_bps,
                    base_borrow_rate: ray_bps(base_rate_bps),
                    rate_slope1: ray_bps(slope1_bps),
                    rate_slope2: ray_bps(slope2_bps),
                    optimal_utilization_rate: ray_bps(optimal_utilization_bps),
                },
                at,
                &correlation_id,
            )?;
            println!("{}", outcome);
        }

        Commands::Whitelist {
            collection,
            collateral_factor_bps,
            min_duration,
            max_duration,
            extendable_duration,
            overdue_duration,
            prepayment_fee_bps,
            overdue_fee_bps,
        } => {
            ctx.execute(
                PoolCommand::SetCollectionConfig {
                    caller: governor(),
                    collection,
                    config: CollectionConfig {
                        enabled: true,
                        collateral_factor_bps,
                        min_borrow_duration: min_duration,
                        max_borrow_duration: max_duration,
                        extendable_duration,
                        overdue_duration,
                        prepayment_fee_factor_bps: prepayment_fee_bps,
                        overdue_loan_fee_factor_bps: overdue_fee_bps,
                    },
                },
                at,
                &correlation_id,
            )?;
            println!("collection whitelisted");
        }

        Commands::Faucet {
            account,
            amount,
            asset,
        } => {
            ctx.execute(
                PoolCommand::Faucet {
                    account: AccountId::new(account),
                    asset: Asset::new(asset),
                    amount,
                },
                at,
                &correlation_id,
            )?;
            println!("credited");
        }

        Commands::MintNft {
            owner,
            collection,
            token_id,
        } => {
            ctx.execute(
                PoolCommand::MintNft {
                    owner: AccountId::new(owner),
                    nft: NftId::new(collection, token_id),
                },
                at,
                &correlation_id,
            )?;
            println!("minted");
        }

        Commands::SetPrice { collection, price } => {
            ctx.execute(
                PoolCommand::SetOraclePrice { collection, price },
                at,
                &correlation_id,
            )?;
            println!("price recorded");
        }

        Commands::AccrueYield { asset, amount } => {
            ctx.execute(
                PoolCommand::AccrueYield {
                    asset: Asset::new(asset),
                    amount,
                },
                at,
                &correlation_id,
            )?;
            println!("yield accrued");
        }

        Commands::Deposit {
            user,
            reserve,
            amount,
        } => {
            ctx.execute(
                PoolCommand::Deposit {
                    caller: AccountId::new(&user),
                    reserve_id: ReserveId(reserve),
                    amount,
                    on_behalf_of: AccountId::new(&user),
                },
                at,
                &correlation_id,
            )?;
            println!("deposited");
        }

        Commands::Withdraw {
            user,
            reserve,
            amount,
        } => {
            ctx.execute(
                PoolCommand::Withdraw {
                    caller: AccountId::new(user),
                    reserve_id: ReserveId(reserve),
                    amount,
                },
                at,
                &correlation_id,
            )?;
            println!("withdrawn");
        }

        Commands::Borrow {
            user,
            reserve,
            amount,
            duration,
            collection,
            token_id,
        } => {
            let outcome = ctx.execute(
                PoolCommand::Borrow {
                    caller: AccountId::new(user),
                    reserve_id: ReserveId(reserve),
                    amount,
                    duration,
                    nft: NftId::new(collection, token_id),
                },
                at,
                &correlation_id,
            )?;
            println!("{}", outcome);
        }

        Commands::Repay { user, loan } => {
            let outcome = ctx.execute(
                PoolCommand::Repay {
                    caller: AccountId::new(user),
                    loan_id: LoanId(loan),
                },
                at,
                &correlation_id,
            )?;
            println!("{}", outcome);
        }

        Commands::Extend {
            user,
            loan,
            new_amount,
            new_duration,
        } => {
            let outcome = ctx.execute(
                PoolCommand::Extend {
                    caller: AccountId::new(&user),
                    loan_id: LoanId(loan),
                    new_amount,
                    new_duration,
                    on_behalf_of: AccountId::new(&user),
                },
                at,
                &correlation_id,
            )?;
            println!("{}", outcome);
        }

        Commands::StartLiquidation { operator, loan } => {
            let outcome = ctx.execute(
                PoolCommand::StartLiquidation {
                    caller: AccountId::new(operator),
                    loan_id: LoanId(loan),
                },
                at,
                &correlation_id,
            )?;
            println!("{}", outcome);
        }

        Commands::CreateAuction {
            user,
            collection,
            token_id,
            currency,
            reserve_price,
        } => {
            let outcome = ctx.execute(
                PoolCommand::CreateAuction {
                    caller: AccountId::new(user),
                    nft: NftId::new(collection, token_id),
                    currency: Asset::new(currency),
                    reserve_price,
                },
                at,
                &correlation_id,
            )?;
            println!("{}", outcome);
        }

        Commands::Buy { user, auction } => {
            let outcome = ctx.execute(
                PoolCommand::BuyAuction {
                    caller: AccountId::new(user),
                    auction_id: AuctionId(auction),
                },
                at,
                &correlation_id,
            )?;
            println!("{}", outcome);
        }

        Commands::CancelAuction { user, auction } => {
            ctx.execute(
                PoolCommand::CancelAuction {
                    caller: AccountId::new(user),
                    auction_id: AuctionId(auction),
                },
                at,
                &correlation_id,
            )?;
            println!("canceled");
        }

        Commands::Status { loan } => {
            let status = ctx.pool.loan_status(LoanId(loan), at)?;
            println!("{}", status);
        }

        Commands::Price { auction } => {
            let price = ctx.pool.auction_price(AuctionId(auction), at)?;
            println!("{}", price);
        }

        Commands::Balance { account, asset } => {
            let balance = ctx
                .pool
                .cash
                .balance_of(&AccountId::new(account), &Asset::new(asset));
            println!("{}", balance);
        }

        Commands::OpenMoneyMarket { reserve } => {
            ctx.execute(
                PoolCommand::OpenMoneyMarket {
                    caller: governor(),
                    reserve_id: ReserveId(reserve),
                },
                at,
                &correlation_id,
            )?;
            println!("money market open");
        }

        Commands::CloseMoneyMarket { reserve } => {
            ctx.execute(
                PoolCommand::CloseMoneyMarket {
                    caller: governor(),
                    reserve_id: ReserveId(reserve),
                },
                at,
                &correlation_id,
            )?;
            println!("money market closed");
        }

        Commands::Keygen { output } => {
            use opensky_bespoke::OfferSigner;

            let signer = OfferSigner::generate();
            std::fs::write(&output, signer.seed_hex())?;
            println!("seed saved to {}", output.display());
            println!("public key: {}", signer.public_key_hex());
        }

        Commands::RegisterSigner {
            account,
            public_key,
        } => {
            ctx.execute(
                PoolCommand::RegisterSigner {
                    account: AccountId::new(account),
                    public_key,
                },
                at,
                &correlation_id,
            )?;
            println!("signer registered");
        }

        Commands::CancelAllOffers { account, new_floor } => {
            ctx.execute(
                PoolCommand::CancelAllOffers {
                    caller: AccountId::new(account),
                    new_floor,
                },
                at,
                &correlation_id,
            )?;
            println!("offers below {} voided", new_floor);
        }

        Commands::Audit => {
            use opensky_events::{verify_chain, JournalReader};

            let reader = JournalReader::from_directory(ctx.journal_path())?;
            let records = reader.read_all()?;
            match verify_chain(&records) {
                Ok(()) => println!("hash chain verified ({} records)", records.len()),
                Err(e) => println!("hash chain broken: {}", e),
            }
        }
    }

    Ok(())
}
