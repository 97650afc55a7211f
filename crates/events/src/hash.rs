//! Hash chain over journal records

use crate::record::OperationRecord;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Calculate SHA-256 hash of a record's content (excluding the hash field)
pub fn calculate_record_hash(record: &OperationRecord) -> String {
    let mut hasher = Sha256::new();

    hasher.update(record.sequence.to_le_bytes());
    hasher.update(record.prev_hash.as_bytes());
    hasher.update(record.timestamp.to_rfc3339().as_bytes());
    hasher.update(record.at.to_le_bytes());
    hasher.update(record.kind.to_string().as_bytes());
    hasher.update(record.correlation_id.as_bytes());
    hasher.update(record.payload.to_string().as_bytes());

    hex::encode(hasher.finalize())
}

/// Errors in hash-chain verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("broken link at seq {sequence}: expected prev_hash '{expected}', got '{actual}'")]
    BrokenLink {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("invalid hash at seq {sequence}: expected '{expected}', got '{actual}'")]
    InvalidHash {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("invalid sequence: expected {expected}, got {actual}")]
    InvalidSequence { expected: u64, actual: u64 },
}

/// Verify chain integrity over an ordered slice of records
pub fn verify_chain(records: &[OperationRecord]) -> Result<(), ChainError> {
    let mut prev_hash = "GENESIS".to_string();

    for (i, record) in records.iter().enumerate() {
        if record.prev_hash != prev_hash {
            return Err(ChainError::BrokenLink {
                sequence: record.sequence,
                expected: prev_hash,
                actual: record.prev_hash.clone(),
            });
        }

        let calculated = calculate_record_hash(record);
        if record.hash != calculated {
            return Err(ChainError::InvalidHash {
                sequence: record.sequence,
                expected: calculated,
                actual: record.hash.clone(),
            });
        }

        if i > 0 && record.sequence != records[i - 1].sequence + 1 {
            return Err(ChainError::InvalidSequence {
                expected: records[i - 1].sequence + 1,
                actual: record.sequence,
            });
        }

        prev_hash = record.hash.clone();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::OperationKind;
    use chrono::Utc;

    fn create_record(sequence: u64, prev_hash: &str) -> OperationRecord {
        let mut record = OperationRecord {
            sequence,
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
            timestamp: Utc::now(),
            at: 1_700_000_000 + sequence,
            kind: OperationKind::Deposit,
            correlation_id: format!("test-{}", sequence),
            payload: serde_json::json!({"seq": sequence}),
        };
        record.hash = calculate_record_hash(&record);
        record
    }

    #[test]
    fn test_hash_deterministic() {
        let record = create_record(1, "GENESIS");
        assert_eq!(calculate_record_hash(&record), calculate_record_hash(&record));
    }

    #[test]
    fn test_verify_valid_chain() {
        let r1 = create_record(1, "GENESIS");
        let r2 = create_record(2, &r1.hash);
        let r3 = create_record(3, &r2.hash);
        assert!(verify_chain(&[r1, r2, r3]).is_ok());
    }

    #[test]
    fn test_verify_broken_chain() {
        let r1 = create_record(1, "GENESIS");
        let r2 = create_record(2, "wrong_hash");
        let result = verify_chain(&[r1, r2]);
        assert!(matches!(result, Err(ChainError::BrokenLink { .. })));
    }

    #[test]
    fn test_tampered_payload_detected() {
        let r1 = create_record(1, "GENESIS");
        let mut r2 = create_record(2, &r1.hash);
        r2.payload = serde_json::json!({"seq": 999});
        let result = verify_chain(&[r1, r2]);
        assert!(matches!(result, Err(ChainError::InvalidHash { .. })));
    }
}
