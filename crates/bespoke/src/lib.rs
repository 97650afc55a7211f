//! OpenSky bespoke - signed peer-to-peer offer market
//!
//! Borrowers sign offers off-line; a lender takes one on-line and the match
//! settles atomically. Nonces make each signature single-use, with a
//! per-signer floor for wholesale cancellation.

pub mod error;
pub mod market;
pub mod nonce;
pub mod offer;

pub use error::BespokeError;
pub use market::{BespokeLoan, BespokeMarket, BespokeStatus, ForecloseTerms, RepayTerms};
pub use nonce::NonceRegistry;
pub use offer::{BorrowOffer, OfferSignature, OfferSigner, OFFER_DOMAIN};
