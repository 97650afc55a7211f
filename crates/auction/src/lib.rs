//! OpenSky auction - Dutch auction engine
//!
//! Liquidated collateral (and voluntary listings) sell through a price that
//! decays deterministically from 10x the reserve price to a 1.2x floor,
//! quantized into 5-minute steps. The engine validates transitions and
//! computes settlement amounts; the pool moves the money.

pub mod auction;
pub mod error;

pub use auction::{Auction, AuctionStatus, DURATION_ONE, DURATION_TWO, SPACING};
pub use error::AuctionError;
