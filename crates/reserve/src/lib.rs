//! OpenSky reserve - the pool accounting ledger
//!
//! One reserve per underlying asset: deposits tracked through scaled oToken
//! shares and a compounding supply index, borrows through a principal total
//! plus an aggregated interest-per-second, and an optional money-market
//! pass-through whose balance growth is harvested as income.

pub mod error;
pub mod money_market;
pub mod otoken;
pub mod reserve;

pub use error::{MoneyMarketError, ReserveError};
pub use money_market::{MockMoneyMarket, MoneyMarket};
pub use otoken::OToken;
pub use reserve::{Accrual, Reserve};
