//! Signed borrow offers
//!
//! An offer is authorized by an ed25519 signature over a canonical,
//! domain-tagged JSON payload - the off-chain stand-in for typed-data
//! signing, used purely as an authorization gate. The signature binds every
//! field of the offer; the taker picks the concrete amount and duration
//! within the signed ranges.

use crate::error::BespokeError;
use alloy_primitives::U256;
use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier, VerifyingKey};
use opensky_core::{AccountId, Asset, NftId, ReserveId};
use serde::{Deserialize, Serialize};

/// Domain tag mixed into every signing payload
pub const OFFER_DOMAIN: &str = "OPENSKY_BESPOKE_BORROW_OFFER_V1";

/// A borrower's signed intent to borrow against a specific NFT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowOffer {
    pub reserve_id: ReserveId,
    pub nft: NftId,
    /// Number of tokens pledged (1 for unique collateral)
    pub token_amount: u64,
    pub borrower: AccountId,
    pub borrow_amount_min: U256,
    pub borrow_amount_max: U256,
    pub borrow_duration_min: u64,
    pub borrow_duration_max: u64,
    /// Per-year borrow rate (ray)
    pub borrow_rate: U256,
    pub currency: Asset,
    pub nonce: u64,
    /// Unix seconds after which the offer is void
    pub deadline: u64,
}

impl BorrowOffer {
    /// Canonical bytes that get signed
    pub fn signing_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct Tagged<'a> {
            domain: &'static str,
            offer: &'a BorrowOffer,
        }
        serde_json::to_vec(&Tagged {
            domain: OFFER_DOMAIN,
            offer: self,
        })
        .expect("offer serialization should never fail")
    }
}

/// Detached signature over an offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferSignature {
    /// Hex-encoded ed25519 public key (32 bytes)
    pub public_key: String,
    /// Hex-encoded signature (64 bytes)
    pub signature: String,
}

impl OfferSignature {
    /// Verify this signature over `payload`
    pub fn verify(&self, payload: &[u8]) -> Result<(), BespokeError> {
        let pk_bytes = hex::decode(&self.public_key)
            .map_err(|e| BespokeError::InvalidSignature(format!("invalid public key hex: {}", e)))?;
        let sig_bytes = hex::decode(&self.signature)
            .map_err(|e| BespokeError::InvalidSignature(format!("invalid signature hex: {}", e)))?;

        let pk_array: [u8; 32] = pk_bytes
            .try_into()
            .map_err(|_| BespokeError::InvalidSignature("public key must be 32 bytes".to_string()))?;
        let sig_array: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| BespokeError::InvalidSignature("signature must be 64 bytes".to_string()))?;

        let verifying_key = VerifyingKey::from_bytes(&pk_array)
            .map_err(|e| BespokeError::InvalidSignature(format!("invalid public key: {}", e)))?;
        let signature = Signature::from_bytes(&sig_array);

        verifying_key
            .verify(payload, &signature)
            .map_err(|e| BespokeError::InvalidSignature(e.to_string()))
    }
}

/// Offer signer for borrowers (and tests)
pub struct OfferSigner {
    signing_key: SigningKey,
}

impl OfferSigner {
    /// Create from a 32-byte hex seed
    pub fn from_hex(hex_seed: &str) -> Result<Self, BespokeError> {
        let bytes = hex::decode(hex_seed)
            .map_err(|e| BespokeError::InvalidSignature(format!("invalid key hex: {}", e)))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| BespokeError::InvalidSignature("key must be 32 bytes".to_string()))?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Export the seed as hex
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign an offer
    pub fn sign(&self, offer: &BorrowOffer) -> OfferSignature {
        let signature = self.signing_key.sign(&offer.signing_bytes());
        OfferSignature {
            public_key: self.public_key_hex(),
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opensky_core::{RAY, WAD};

    fn offer(borrower: &AccountId) -> BorrowOffer {
        BorrowOffer {
            reserve_id: ReserveId(1),
            nft: NftId::new("PUNK", 7),
            token_amount: 1,
            borrower: borrower.clone(),
            borrow_amount_min: WAD / U256::from(2u64),
            borrow_amount_max: WAD * U256::from(2u64),
            borrow_duration_min: 86_400,
            borrow_duration_max: 30 * 86_400,
            borrow_rate: RAY / U256::from(10u64),
            currency: Asset::new("WETH"),
            nonce: 5,
            deadline: 2_000_000,
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = OfferSigner::generate();
        let alice = AccountId::new("alice");
        let offer = offer(&alice);

        let signature = signer.sign(&offer);
        assert!(signature.verify(&offer.signing_bytes()).is_ok());
    }

    #[test]
    fn test_tampered_offer_fails() {
        let signer = OfferSigner::generate();
        let alice = AccountId::new("alice");
        let mut offer = offer(&alice);

        let signature = signer.sign(&offer);
        offer.borrow_amount_max = WAD * U256::from(100u64);

        assert!(matches!(
            signature.verify(&offer.signing_bytes()),
            Err(BespokeError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_seed_roundtrip() {
        let signer = OfferSigner::generate();
        let restored = OfferSigner::from_hex(&signer.seed_hex()).unwrap();
        assert_eq!(signer.public_key_hex(), restored.public_key_hex());
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = OfferSigner::generate();
        let other = OfferSigner::generate();
        let alice = AccountId::new("alice");
        let offer = offer(&alice);

        let mut signature = signer.sign(&offer);
        signature.public_key = other.public_key_hex();

        assert!(signature.verify(&offer.signing_bytes()).is_err());
    }
}
