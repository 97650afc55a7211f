//! Journal records
//!
//! One record per committed operation. The `payload` is the full command as
//! submitted, and `at` is the logical clock the state machines saw, so a
//! replay through the same code paths rebuilds identical state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// What kind of operation a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Genesis,
    CreateReserve,
    Faucet,
    Deposit,
    Withdraw,
    Borrow,
    Repay,
    Extend,
    StartLiquidation,
    TransferLoan,
    FlashClaim,
    CreateAuction,
    BuyAuction,
    CancelAuction,
    TakeBorrowOffer,
    BespokeRepay,
    BespokeForeclose,
    TransferBespokeReceipt,
    CancelOffers,
    CancelAllOffers,
    OpenMoneyMarket,
    CloseMoneyMarket,
    Governance,
    Pause,
    Unpause,
}

/// A committed operation, chained to its predecessor by hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Strictly increasing, starts at 1
    pub sequence: u64,

    /// Hash of the previous record ("GENESIS" for the first)
    pub prev_hash: String,

    /// SHA-256 over all other fields, hex-encoded
    pub hash: String,

    /// Wall-clock commit time
    pub timestamp: DateTime<Utc>,

    /// Logical clock (unix seconds) the operation executed against
    pub at: u64,

    pub kind: OperationKind,

    pub correlation_id: String,

    /// The full command, replayable
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(OperationKind::TakeBorrowOffer.to_string(), "TAKE_BORROW_OFFER");
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let record = OperationRecord {
            sequence: 1,
            prev_hash: "GENESIS".to_string(),
            hash: "abc".to_string(),
            timestamp: Utc::now(),
            at: 1_700_000_000,
            kind: OperationKind::Deposit,
            correlation_id: "test-1".to_string(),
            payload: serde_json::json!({"reserve_id": 1}),
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: OperationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sequence, 1);
        assert_eq!(parsed.kind, OperationKind::Deposit);
    }
}
