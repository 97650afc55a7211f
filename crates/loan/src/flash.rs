//! Flash claim
//!
//! The receipt holder of an active loan may run a callback with the escrowed
//! collateral temporarily in hand (airdrop claims on escrowed NFTs). The
//! pool lends the NFT to the receiver, runs the callback, and requires the
//! NFT back in escrow before the operation commits; otherwise the whole
//! operation rolls back.

use opensky_core::{AccountId, NftId};
use opensky_ledger::NftRegistry;

/// Callback invoked with the collateral released to `receiver_account`
pub trait FlashClaimReceiver {
    /// Account the collateral is lent to for the duration of the call
    fn receiver_account(&self) -> AccountId;

    /// Do the work and hand the NFT back to `return_to` before returning.
    ///
    /// A non-Ok return, or an NFT left outside `return_to`, aborts the
    /// whole flash-claim operation.
    fn on_flash_claim(
        &mut self,
        registry: &mut NftRegistry,
        nft: &NftId,
        initiator: &AccountId,
        return_to: &AccountId,
    ) -> Result<(), String>;
}
