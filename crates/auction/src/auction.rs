//! Dutch auction
//!
//! Price decays from 10x the reserve price to a 1.2x floor in two linear
//! phases, quantized into 5-minute steps: the price only moves at step
//! boundaries, so there is nothing to gain from shopping sub-step timestamps.
//! Phase boundaries land exactly on the turning and floor prices.

use crate::error::AuctionError;
use alloy_primitives::U256;
use opensky_core::{math, AccountId, Asset, AuctionId, NftId};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// First decay phase: start price down to the turning price
pub const DURATION_ONE: u64 = 2 * 86_400;

/// Second decay phase: turning price down to the floor
pub const DURATION_TWO: u64 = 3 * 86_400;

/// Price step spacing (seconds)
pub const SPACING: u64 = 300;

const START_MULTIPLE: u64 = 10;
const TURNING_MULTIPLE: u64 = 3;
/// Floor = 1.2x reserve price, in bps
const END_FACTOR_BPS: u64 = 12_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionStatus {
    Live,
    End,
    Canceled,
}

/// One Dutch auction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub auction_id: AuctionId,
    pub nft: NftId,
    pub underlying_asset: Asset,
    pub token_owner: AccountId,
    pub reserve_price: U256,
    pub start_time: u64,
    pub status: AuctionStatus,
    pub buyer: Option<AccountId>,
    pub final_price: Option<U256>,
}

impl Auction {
    pub fn create(
        auction_id: AuctionId,
        nft: NftId,
        underlying_asset: Asset,
        token_owner: AccountId,
        reserve_price: U256,
        now: u64,
    ) -> Result<Self, AuctionError> {
        if reserve_price.is_zero() {
            return Err(AuctionError::ReservePriceZero);
        }
        Ok(Self {
            auction_id,
            nft,
            underlying_asset,
            token_owner,
            reserve_price,
            start_time: now,
            status: AuctionStatus::Live,
            buyer: None,
            final_price: None,
        })
    }

    fn start_price(&self) -> Result<U256, AuctionError> {
        self.reserve_price
            .checked_mul(U256::from(START_MULTIPLE))
            .ok_or_else(|| math::MathError::Overflow.into())
    }

    fn turning_price(&self) -> Result<U256, AuctionError> {
        self.reserve_price
            .checked_mul(U256::from(TURNING_MULTIPLE))
            .ok_or_else(|| math::MathError::Overflow.into())
    }

    fn end_price(&self) -> Result<U256, AuctionError> {
        Ok(math::percent_mul(self.reserve_price, END_FACTOR_BPS)?)
    }

    /// Current price (wei), a non-increasing step function of time
    pub fn price(&self, now: u64) -> Result<U256, AuctionError> {
        let elapsed = now.saturating_sub(self.start_time);

        if elapsed >= DURATION_ONE + DURATION_TWO {
            return self.end_price();
        }

        if elapsed < DURATION_ONE {
            let start = self.start_price()?;
            let turning = self.turning_price()?;
            let steps = U256::from(elapsed / SPACING);
            let total_steps = U256::from(DURATION_ONE / SPACING);
            let decay = math::mul_div(start - turning, steps, total_steps)?;
            Ok(start - decay)
        } else {
            let turning = self.turning_price()?;
            let end = self.end_price()?;
            let steps = U256::from((elapsed - DURATION_ONE) / SPACING);
            let total_steps = U256::from(DURATION_TWO / SPACING);
            let decay = math::mul_div(turning - end, steps, total_steps)?;
            Ok(turning - decay)
        }
    }

    /// Sell to `buyer` at the current price. Live only.
    ///
    /// Returns the price the caller must settle; the auction is terminal
    /// afterwards.
    pub fn buy(&mut self, buyer: &AccountId, now: u64) -> Result<U256, AuctionError> {
        if self.status != AuctionStatus::Live {
            return Err(AuctionError::WrongStatus {
                auction: self.auction_id,
                status: self.status,
                operation: "buy",
            });
        }
        let price = self.price(now)?;
        self.status = AuctionStatus::End;
        self.buyer = Some(buyer.clone());
        self.final_price = Some(price);
        Ok(price)
    }

    /// Cancel. Token owner only, Live only.
    pub fn cancel(&mut self, who: &AccountId) -> Result<(), AuctionError> {
        if self.status != AuctionStatus::Live {
            return Err(AuctionError::WrongStatus {
                auction: self.auction_id,
                status: self.status,
                operation: "cancel",
            });
        }
        if &self.token_owner != who {
            return Err(AuctionError::NotTokenOwner {
                auction: self.auction_id,
                who: who.clone(),
                owner: self.token_owner.clone(),
            });
        }
        self.status = AuctionStatus::Canceled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opensky_core::WAD;

    fn auction(reserve_price: U256) -> Auction {
        Auction::create(
            AuctionId(1),
            NftId::new("PUNK", 7),
            Asset::new("WETH"),
            AccountId::new("alice"),
            reserve_price,
            10_000,
        )
        .unwrap()
    }

    fn half_eth() -> U256 {
        WAD / U256::from(2u64)
    }

    #[test]
    fn test_zero_reserve_price_rejected() {
        let result = Auction::create(
            AuctionId(1),
            NftId::new("PUNK", 7),
            Asset::new("WETH"),
            AccountId::new("alice"),
            U256::ZERO,
            10_000,
        );
        assert_eq!(result.unwrap_err(), AuctionError::ReservePriceZero);
    }

    #[test]
    fn test_price_checkpoints() {
        // reserve 0.5 -> start 5.0, turning 1.5, floor 0.6
        let auction = auction(half_eth());

        assert_eq!(auction.price(10_000).unwrap(), U256::from(5u64) * WAD);
        assert_eq!(
            auction.price(10_000 + DURATION_ONE).unwrap(),
            WAD + half_eth()
        );
        let floor = WAD * U256::from(6u64) / U256::from(10u64);
        assert_eq!(
            auction.price(10_000 + DURATION_ONE + DURATION_TWO).unwrap(),
            floor
        );
        // unchanged long after
        assert_eq!(
            auction.price(10_000 + 10 * (DURATION_ONE + DURATION_TWO)).unwrap(),
            floor
        );
    }

    #[test]
    fn test_price_quantized_to_spacing() {
        let auction = auction(half_eth());

        // price holds within a step, moves at the boundary
        let p0 = auction.price(10_000).unwrap();
        assert_eq!(auction.price(10_000 + SPACING - 1).unwrap(), p0);
        assert!(auction.price(10_000 + SPACING).unwrap() < p0);
    }

    #[test]
    fn test_price_monotonically_non_increasing() {
        let auction = auction(U256::from(987_654_321u64));

        let mut last = auction.price(10_000).unwrap();
        let total = DURATION_ONE + DURATION_TWO + 2 * 86_400;
        let mut t = 10_000;
        while t < 10_000 + total {
            let price = auction.price(t).unwrap();
            assert!(price <= last, "price increased at t={}", t);
            last = price;
            t += 137; // deliberately not a divisor of SPACING
        }

        let floor = math::percent_mul(auction.reserve_price, END_FACTOR_BPS).unwrap();
        assert!(last >= floor);
    }

    #[test]
    fn test_buy_settles_once() {
        let mut auction = auction(half_eth());
        let bob = AccountId::new("bob");

        let price = auction.buy(&bob, 10_000 + DURATION_ONE).unwrap();
        assert_eq!(price, WAD + half_eth());
        assert_eq!(auction.status, AuctionStatus::End);
        assert_eq!(auction.buyer.as_ref().unwrap(), &bob);

        // terminal
        let again = auction.buy(&bob, 10_000 + DURATION_ONE + 1);
        assert!(matches!(again, Err(AuctionError::WrongStatus { .. })));
    }

    #[test]
    fn test_cancel_owner_only_live_only() {
        let mut auction = auction(half_eth());
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        assert!(matches!(
            auction.cancel(&bob),
            Err(AuctionError::NotTokenOwner { .. })
        ));

        auction.cancel(&alice).unwrap();
        assert_eq!(auction.status, AuctionStatus::Canceled);

        // terminal
        assert!(matches!(
            auction.cancel(&alice),
            Err(AuctionError::WrongStatus { .. })
        ));
    }
}
